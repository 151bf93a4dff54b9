use chrono::FixedOffset;
use cli::commands::{self, EditArgs};
use docshelf_core::config::{StorageConfig, UploadConfig};
use docshelf_core::error::{StoreError, ValidationError};
use docshelf_core::query::TypeFilter;
use docshelf_core::session::Session;
use docshelf_core::store::{RecordStore, StoreMode};
use std::fs;

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

async fn session(temp: &tempfile::TempDir, prefer_fallback: bool) -> Session {
    let config = StorageConfig {
        database_path: temp.path().join("shelf.db").to_string_lossy().into_owned(),
        fallback_path: temp.path().join("shelf.json").to_string_lossy().into_owned(),
        prefer_fallback,
    };
    let store = RecordStore::initialize(&config).await.unwrap();
    let expected = if prefer_fallback {
        StoreMode::Fallback
    } else {
        StoreMode::Indexed
    };
    assert_eq!(store.mode(), expected);
    Session::with_time_zone(store, UploadConfig::default(), utc())
}

#[tokio::test]
async fn add_list_edit_export_remove() {
    let temp = tempfile::tempdir().unwrap();
    let mut s = session(&temp, false).await;
    let src = temp.path().join("minutes.txt");
    fs::write(&src, "minutes of the meeting").unwrap();

    let out = commands::add(&mut s, &src, "Minutes", "weekly sync", "Work, Notes", None)
        .await
        .unwrap();
    assert_eq!(out, "Added document 1.");

    let json = commands::list(&mut s, "SYNC", TypeFilter::All, "work", true, &utc())
        .await
        .unwrap();
    let listed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["title"], "Minutes");
    assert_eq!(listed[0]["fileKind"], "txt");
    assert_eq!(listed[0]["category"], "document");
    assert!(listed[0].get("payload").is_none());

    let args = EditArgs {
        title: Some("Minutes (approved)".into()),
        ..Default::default()
    };
    commands::edit(&mut s, 1, args).await.unwrap();
    assert_eq!(s.editing(), None);
    let detail = commands::show(&s, 1, false, &utc()).await.unwrap();
    assert!(detail.contains("Minutes (approved)"));
    assert!(detail.contains("weekly sync"));
    assert!(detail.contains("Work, Notes"));

    let dest = temp.path().join("copy.txt");
    commands::export(&s, 1, Some(dest.as_path())).await.unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "minutes of the meeting");

    assert_eq!(commands::tags(&mut s).await.unwrap(), "notes\nwork");
    commands::remove(&mut s, 1).await.unwrap();
    commands::remove(&mut s, 1).await.unwrap();
    assert_eq!(
        commands::list(&mut s, "", TypeFilter::All, "all", false, &utc())
            .await
            .unwrap(),
        "No documents found."
    );
}

#[tokio::test]
async fn rejected_upload_surfaces_a_store_error() {
    let temp = tempfile::tempdir().unwrap();
    let mut s = session(&temp, true).await;
    let src = temp.path().join("clip.gif");
    fs::write(&src, b"GIF89a....").unwrap();

    let err = commands::add(&mut s, &src, "Clip", "", "", None)
        .await
        .unwrap_err();
    let store_err = err.downcast_ref::<StoreError>().unwrap();
    assert!(store_err.user_message().contains("image/gif"));
    assert!(!temp.path().join("shelf.json").exists());
}

#[tokio::test]
async fn unknown_tag_lists_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let mut s = session(&temp, false).await;
    let src = temp.path().join("a.txt");
    fs::write(&src, "a").unwrap();
    commands::add(&mut s, &src, "A", "", "work", None).await.unwrap();

    let out = commands::list(&mut s, "", TypeFilter::All, "typo", false, &utc())
        .await
        .unwrap();
    assert_eq!(out, "No documents found.");
    let out = commands::list(&mut s, "", TypeFilter::All, "WORK", false, &utc())
        .await
        .unwrap();
    assert!(out.contains(" A [work]"));
}

#[tokio::test]
async fn oversized_file_is_refused_without_storing() {
    let temp = tempfile::tempdir().unwrap();
    let mut s = session(&temp, true).await;
    let src = temp.path().join("big.txt");
    fs::File::create(&src)
        .unwrap()
        .set_len(10 * 1024 * 1024 + 1)
        .unwrap();

    let err = commands::add(&mut s, &src, "Big", "", "", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::Validation(ValidationError::TooLarge { .. }))
    ));
    assert!(!temp.path().join("shelf.json").exists());
}

#[tokio::test]
async fn editing_unknown_document_is_not_found() {
    let temp = tempfile::tempdir().unwrap();
    let mut s = session(&temp, false).await;
    let err = commands::edit(&mut s, 42, EditArgs::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::NotFound(42))
    ));
}

#[tokio::test]
async fn calendar_day_lists_documents_of_that_day() {
    let temp = tempfile::tempdir().unwrap();
    let mut s = session(&temp, true).await;
    let src = temp.path().join("a.txt");
    fs::write(&src, "a").unwrap();
    commands::add(&mut s, &src, "A", "", "", None).await.unwrap();
    let day = s.get(1).await.unwrap().created_at.date_naive();

    let listing = commands::calendar(&mut s, None, Some(day), &utc())
        .await
        .unwrap();
    assert!(listing.contains(" A"));

    let month = docshelf_core::calendar::YearMonth::containing(day);
    let grid = commands::calendar(&mut s, Some(month), None, &utc())
        .await
        .unwrap();
    assert!(grid.ends_with("1 day(s) with documents"));
}
