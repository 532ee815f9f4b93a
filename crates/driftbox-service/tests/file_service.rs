//! End-to-end tests for the file service over the SQLite index and the
//! local filesystem content store.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use driftbox_core::config::StorageConfig;
use driftbox_core::error::ErrorKind;
use driftbox_core::types::id::{FileId, UserId};
use driftbox_core::types::list::ListParams;
use driftbox_core::types::path::Path;
use driftbox_database::SqliteFileIndex;
use driftbox_database::migration::run_sqlite_migrations;
use driftbox_entity::file::{FileContent, FileKind};
use driftbox_service::{FileService, FileUpload};
use driftbox_storage::LocalContents;

async fn setup() -> (FileService, UserId, tempfile::TempDir) {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    run_sqlite_migrations(&pool).await.unwrap();

    let owner = UserId::new();
    sqlx::query("INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3)")
        .bind(owner.to_string())
        .bind("tester")
        .bind("not-a-real-hash")
        .execute(&pool)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let contents = LocalContents::new(&StorageConfig {
        data_dir: dir.path().to_string_lossy().into_owned(),
        files_prefix: "files".to_string(),
        throughput_bytes: 8,
    });

    let service = FileService::new(Arc::new(contents), Arc::new(SqliteFileIndex::new(pool)));
    (service, owner, dir)
}

fn upload_of(path: &str, body: &str) -> FileUpload {
    FileUpload {
        content: FileContent::from_bytes(body.to_string()),
        content_type: "text/plain".to_string(),
        path: path.to_string(),
        size: body.len() as u64,
    }
}

async fn read_all(content: &mut FileContent) -> Vec<u8> {
    let mut out = Vec::new();
    content.read_to_end(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn test_upload_and_download() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    let id = service
        .upload(upload_of("docs/readme.md", "hello driftbox"), owner, &cancel)
        .await
        .unwrap();

    let file = service.by_id(id).await.unwrap().unwrap();
    assert_eq!(file.path.as_str(), "/docs/readme.md");
    assert_eq!(file.name, "readme.md");
    assert_eq!(file.size, 14);

    let mut content = service.download(&file).await.unwrap();
    assert_eq!(read_all(&mut content).await, b"hello driftbox");
}

#[tokio::test]
async fn test_upload_updates_existing_record() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    let first = service
        .upload(upload_of("/note.txt", "v1"), owner, &cancel)
        .await
        .unwrap();
    let second = service
        .upload(upload_of("/note.txt", "version two"), owner, &cancel)
        .await
        .unwrap();

    assert_eq!(first, second);

    let file = service.by_id(second).await.unwrap().unwrap();
    assert_eq!(file.size, 11);

    let mut content = service.download(&file).await.unwrap();
    assert_eq!(read_all(&mut content).await, b"version two");
}

#[tokio::test]
async fn test_cancelled_upload_records_nothing() {
    let (service, owner, _dir) = setup().await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .upload(upload_of("/doomed.txt", "never"), owner, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);

    let path = Path::parse("/doomed.txt").unwrap();
    assert!(
        service
            .by_owner_and_path(owner, &path)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_upload_rejects_escaping_path() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    let err = service
        .upload(upload_of("../../etc/passwd", "nope"), owner, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidPath);
}

#[tokio::test]
async fn test_download_rejects_folders() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    service
        .upload(upload_of("/photos/cat.jpg", "meow"), owner, &cancel)
        .await
        .unwrap();

    let path = Path::parse("/photos").unwrap();
    let folder = service.by_owner_and_path(owner, &path).await.unwrap().unwrap();
    assert_eq!(folder.kind, FileKind::Folder);

    let err = service.download(&folder).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_delete_removes_metadata_and_content() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    let id = service
        .upload(upload_of("/bye.txt", "so long"), owner, &cancel)
        .await
        .unwrap();
    let file = service.by_id(id).await.unwrap().unwrap();

    service.delete(id).await.unwrap();

    assert!(service.by_id(id).await.unwrap().is_none());
    let err = service.download(&file).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let (service, _, _dir) = setup().await;

    let err = service.delete(FileId::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_move_file() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    let id = service
        .upload(upload_of("/old/spot.txt", "movable"), owner, &cancel)
        .await
        .unwrap();
    let file = service.by_id(id).await.unwrap().unwrap();

    let moved = service
        .move_file(file.clone(), "/new/spot.txt", &cancel)
        .await
        .unwrap();
    assert_eq!(moved.id, id);
    assert_eq!(moved.path.as_str(), "/new/spot.txt");

    let mut content = service.download(&moved).await.unwrap();
    assert_eq!(read_all(&mut content).await, b"movable");

    // The old location no longer has content.
    let err = service.download(&file).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_move_folder_is_rejected() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    service
        .upload(upload_of("/stuff/a.txt", "a"), owner, &cancel)
        .await
        .unwrap();

    let path = Path::parse("/stuff").unwrap();
    let folder = service.by_owner_and_path(owner, &path).await.unwrap().unwrap();

    let err = service
        .move_file(folder, "/things", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::FolderUpdate);
}

#[tokio::test]
async fn test_list_children_of_folder() {
    let (service, owner, _dir) = setup().await;
    let cancel = CancellationToken::new();

    service
        .upload(upload_of("/one/a.txt", "a"), owner, &cancel)
        .await
        .unwrap();
    service
        .upload(upload_of("/one/two/b.txt", "b"), owner, &cancel)
        .await
        .unwrap();

    let prefix = Path::parse("/one").unwrap();
    let result = service
        .list(Some(&prefix), ListParams::default())
        .await
        .unwrap();

    let paths: Vec<_> = result.items.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["/one/two", "/one/a.txt"]);
}
