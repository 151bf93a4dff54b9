use anyhow::Result;
use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use cli::commands::{self, EditArgs};
use docshelf_core::calendar::YearMonth;
use docshelf_core::config;
use docshelf_core::error::StoreError;
use docshelf_core::query::TypeFilter;
use docshelf_core::session::Session;
use docshelf_core::store::RecordStore;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<StoreError>() {
                Some(store_err) => eprintln!("{}", store_err.user_message()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let cfg = config::load(cli.config.as_deref())?;
    let store = RecordStore::initialize(&cfg.storage).await?;
    tracing::info!(mode = %store.mode(), "document store ready");
    let tz: FixedOffset = *chrono::Local::now().offset();
    let mut session = Session::with_time_zone(store, cfg.upload.clone(), tz);

    match cli.command {
        Commands::Add {
            file,
            title,
            description,
            tags,
            content_type,
        } => {
            let title = title.unwrap_or_default();
            commands::add(&mut session, &file, &title, &description, &tags, content_type).await
        }
        Commands::List {
            search,
            kind,
            tag,
            json,
        } => commands::list(&mut session, &search, kind, &tag, json, &tz).await,
        Commands::Show { id, json } => commands::show(&session, id, json, &tz).await,
        Commands::Edit {
            id,
            title,
            description,
            tags,
            file,
            content_type,
        } => {
            let args = EditArgs {
                title,
                description,
                tags,
                file,
                content_type,
            };
            commands::edit(&mut session, id, args).await
        }
        Commands::Rm { id } => commands::remove(&mut session, id).await,
        Commands::Tags => commands::tags(&mut session).await,
        Commands::Calendar { month, day } => commands::calendar(&mut session, month, day, &tz).await,
        Commands::Export { id, out } => commands::export(&session, id, out.as_deref()).await,
    }
}

#[derive(Parser)]
#[command(name = "docshelf")]
#[command(about = "Local document shelf with tags, search and a calendar", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file (pdf, docx, txt, jpg, png, mp4; up to 10 MiB)
    Add {
        /// File to store
        file: PathBuf,
        /// Document title (required)
        #[arg(short, long)]
        title: Option<String>,
        /// Optional description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
        /// Override the detected content type
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List documents, newest first
    List {
        /// Case-insensitive search in title and description
        #[arg(short, long, default_value = "")]
        search: String,
        /// Category filter: all|image|video|document
        #[arg(long = "type", default_value = "all")]
        kind: TypeFilter,
        /// Tag filter, or `all`
        #[arg(long, default_value = "all")]
        tag: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one document's metadata
    Show {
        id: i64,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a document; omitted fields keep their value
    Edit {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Comma-separated tags (replaces the current list)
        #[arg(long)]
        tags: Option<String>,
        /// Replace the stored file
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete a document
    Rm { id: i64 },
    /// List all tags in use
    Tags,
    /// Show a month with the days that have documents
    Calendar {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<YearMonth>,
        /// List the documents of one day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Write a stored file back to disk
    Export {
        id: i64,
        /// Destination path (defaults to the original file name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}
