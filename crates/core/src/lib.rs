//! Core library: document records, the dual-backend store, filtering and the
//! calendar index.

pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod payload;
pub mod query;
pub mod session;
pub mod store;
pub mod upload;
