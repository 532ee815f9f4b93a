//! SQLite file index.
//!
//! SQLite has no regex operator, so child-path matching uses a pair of
//! `LIKE` patterns: everything under the prefix, minus everything nested
//! one level deeper.

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use driftbox_core::error::{AppError, ErrorKind};
use driftbox_core::result::AppResult;
use driftbox_core::types::id::{FileId, UserId};
use driftbox_core::types::list::{ListParams, ListResult};
use driftbox_core::types::path::Path;
use driftbox_entity::file::{FOLDER_CONTENT_TYPE, File, FileIndex, FileKind};

use super::{FileRow, assemble_page, decode_after, fetch_limit, map_save_error};

/// [`FileIndex`] backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteFileIndex {
    pool: SqlitePool,
}

impl SqliteFileIndex {
    /// Create a new index over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert the synthesized parent folder row inside the save
    /// transaction, accumulating the child's size into it.
    async fn save_parent_folder(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        file: &File,
    ) -> AppResult<()> {
        let Some(folder) = file.folder() else {
            return Ok(());
        };

        // A file row at the folder path cannot be silently converted.
        let existing: Option<String> =
            sqlx::query_scalar("SELECT type FROM files WHERE user_id = $1 AND path = $2")
                .bind(file.owner_id.to_string())
                .bind(folder.path.as_str())
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to check folder path", e)
                })?;

        if existing.as_deref() == Some(FileKind::File.as_str()) {
            return Err(AppError::conflict(format!(
                "a file already exists at {}",
                folder.path
            )));
        }

        sqlx::query(
            "INSERT INTO files (id, type, content_type, name, path, size, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id, path) \
             DO UPDATE SET size = files.size + excluded.size",
        )
        .bind(FileId::new().to_string())
        .bind(FileKind::Folder.as_str())
        .bind(FOLDER_CONTENT_TYPE)
        .bind(&folder.name)
        .bind(folder.path.as_str())
        .bind(file.size as i64)
        .bind(file.owner_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_save_error(e, "Failed to save parent folder"))?;

        Ok(())
    }
}

#[async_trait]
impl FileIndex for SqliteFileIndex {
    async fn save(&self, file: File) -> AppResult<File> {
        if file.is_folder() {
            return Err(AppError::folder_save(format!(
                "folder {} cannot be saved directly",
                file.path
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        self.save_parent_folder(&mut tx, &file).await?;

        sqlx::query(
            "INSERT INTO files (id, type, content_type, name, path, size, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) \
             DO UPDATE SET \
               type = excluded.type, \
               content_type = excluded.content_type, \
               name = excluded.name, \
               path = excluded.path, \
               size = excluded.size",
        )
        .bind(file.id.to_string())
        .bind(file.kind.as_str())
        .bind(&file.content_type)
        .bind(&file.name)
        .bind(file.path.as_str())
        .bind(file.size as i64)
        .bind(file.owner_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_save_error(e, "Failed to save file"))?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit transaction", e)
        })?;

        Ok(file)
    }

    async fn by_id(&self, id: FileId) -> AppResult<Option<File>> {
        sqlx::query_as::<_, FileRow>(
            "SELECT id, type, content_type, name, path, size, user_id \
             FROM files WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))?
        .map(FileRow::into_file)
        .transpose()
    }

    async fn by_owner_and_path(&self, owner_id: UserId, path: &Path) -> AppResult<Option<File>> {
        sqlx::query_as::<_, FileRow>(
            "SELECT id, type, content_type, name, path, size, user_id \
             FROM files WHERE user_id = $1 AND path = $2",
        )
        .bind(owner_id.to_string())
        .bind(path.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file by path", e))?
        .map(FileRow::into_file)
        .transpose()
    }

    async fn delete(&self, file: &File) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(file.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("file {} not found", file.id)));
        }

        Ok(())
    }

    async fn list(&self, prefix: Option<&Path>, params: ListParams) -> AppResult<ListResult<File>> {
        let after = decode_after(&params)?;
        let limit = fetch_limit(params.first);

        let (total, rows): (i64, Vec<FileRow>) = match prefix {
            Some(p) => {
                let escaped = escape_like(p.as_str().trim_end_matches('/'));
                let children = format!("{escaped}/%");
                let nested = format!("{escaped}/%/%");

                let total: i64 = sqlx::query_scalar(
                    "SELECT count(id) FROM files \
                     WHERE path LIKE $1 ESCAPE '\\' AND path NOT LIKE $2 ESCAPE '\\'",
                )
                .bind(&children)
                .bind(&nested)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count files", e)
                })?;

                if total == 0 {
                    return Ok(ListResult::empty());
                }

                let rows = sqlx::query_as::<_, FileRow>(
                    "WITH numbered_files AS ( \
                         SELECT row_number() OVER (ORDER BY type DESC, path) AS cursor, * \
                         FROM files \
                         WHERE path LIKE $2 ESCAPE '\\' AND path NOT LIKE $3 ESCAPE '\\' \
                         ORDER BY type DESC, path \
                     ) \
                     SELECT * FROM numbered_files WHERE cursor >= $1 LIMIT $4",
                )
                .bind(after)
                .bind(&children)
                .bind(&nested)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to list files", e)
                })?;

                (total, rows)
            }
            None => {
                let total: i64 = sqlx::query_scalar("SELECT count(id) FROM files")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count files", e)
                    })?;

                if total == 0 {
                    return Ok(ListResult::empty());
                }

                let rows = sqlx::query_as::<_, FileRow>(
                    "WITH numbered_files AS ( \
                         SELECT row_number() OVER (ORDER BY type DESC, path) AS cursor, * \
                         FROM files ORDER BY type DESC, path \
                     ) \
                     SELECT * FROM numbered_files WHERE cursor >= $1 LIMIT $2",
                )
                .bind(after)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to list files", e)
                })?;

                (total, rows)
            }
        };

        assemble_page(rows, params.first, total as u64)
    }
}

/// Escape `LIKE` metacharacters so a path prefix matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    use driftbox_core::types::list::Cursor;

    use super::*;
    use crate::migration::run_sqlite_migrations;

    async fn setup() -> (SqliteFileIndex, UserId) {
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

        (SqliteFileIndex::new(pool), owner)
    }

    fn new_file(path: &str, size: u64, owner: UserId) -> File {
        File::create("text/plain", path, size, owner).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_fetch() {
        let (index, owner) = setup().await;

        let file = index
            .save(new_file("/hello/world.txt", 10, owner))
            .await
            .unwrap();

        let by_id = index.by_id(file.id).await.unwrap().unwrap();
        assert_eq!(by_id, file);

        let path = Path::parse("/hello/world.txt").unwrap();
        let by_path = index.by_owner_and_path(owner, &path).await.unwrap().unwrap();
        assert_eq!(by_path, file);
    }

    #[tokio::test]
    async fn test_save_aggregates_folder_size() {
        let (index, owner) = setup().await;

        index.save(new_file("/hello/a.txt", 10, owner)).await.unwrap();
        index.save(new_file("/hello/b.txt", 32, owner)).await.unwrap();

        let path = Path::parse("/hello").unwrap();
        let folder = index.by_owner_and_path(owner, &path).await.unwrap().unwrap();
        assert_eq!(folder.kind, FileKind::Folder);
        assert_eq!(folder.content_type, FOLDER_CONTENT_TYPE);
        assert_eq!(folder.size, 42);
    }

    #[tokio::test]
    async fn test_save_rejects_folder() {
        let (index, owner) = setup().await;

        let mut folder = new_file("/hello", 0, owner);
        folder.kind = FileKind::Folder;

        let err = index.save(folder).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::FolderSave);
    }

    #[tokio::test]
    async fn test_save_updates_existing_record() {
        let (index, owner) = setup().await;

        let mut file = index.save(new_file("/note.md", 5, owner)).await.unwrap();
        file.update_content("text/markdown", 99).unwrap();
        index.save(file.clone()).await.unwrap();

        let stored = index.by_id(file.id).await.unwrap().unwrap();
        assert_eq!(stored.content_type, "text/markdown");
        assert_eq!(stored.size, 99);
    }

    #[tokio::test]
    async fn test_list_orders_folders_first() {
        let (index, owner) = setup().await;

        index.save(new_file("/a.txt", 1, owner)).await.unwrap();
        index.save(new_file("/docs/note.md", 1, owner)).await.unwrap();

        let result = index.list(None, ListParams::default()).await.unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.items[0].kind, FileKind::Folder);
        assert_eq!(result.items[0].path.as_str(), "/docs");
    }

    #[tokio::test]
    async fn test_list_paginates_with_cursor() {
        let (index, owner) = setup().await;

        for path in ["/a", "/b", "/c"] {
            index.save(new_file(path, 1, owner)).await.unwrap();
        }

        let page = index.list(None, ListParams::first(2)).await.unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.total, 3);
        let next = page.next.clone().unwrap();
        let paths: Vec<_> = page.items.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["/a", "/b"]);

        let page = index
            .list(None, ListParams::first(2).after(next))
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.total, 3);
        assert!(page.next.is_none());
        assert_eq!(page.items[0].path.as_str(), "/c");
    }

    #[tokio::test]
    async fn test_list_prefix_returns_immediate_children() {
        let (index, owner) = setup().await;

        index.save(new_file("/one/file.txt", 1, owner)).await.unwrap();
        index
            .save(new_file("/one/two/file.txt", 1, owner))
            .await
            .unwrap();

        let prefix = Path::parse("/one").unwrap();
        let result = index
            .list(Some(&prefix), ListParams::default())
            .await
            .unwrap();

        let paths: Vec<_> = result.items.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["/one/two", "/one/file.txt"]);
        assert!(result.next.is_none());
    }

    #[tokio::test]
    async fn test_list_root_prefix_returns_top_level() {
        let (index, owner) = setup().await;

        index.save(new_file("/top.txt", 1, owner)).await.unwrap();
        index.save(new_file("/one/deep.txt", 1, owner)).await.unwrap();

        let root = Path::parse("/").unwrap();
        let result = index
            .list(Some(&root), ListParams::default())
            .await
            .unwrap();

        let paths: Vec<_> = result.items.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["/one", "/top.txt"]);
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (index, _) = setup().await;

        let result = index.list(None, ListParams::default()).await.unwrap();
        assert_eq!(result.count, 0);
        assert_eq!(result.total, 0);
        assert!(result.items.is_empty());
        assert!(result.next.is_none());
    }

    #[tokio::test]
    async fn test_list_rejects_garbage_cursor() {
        let (index, owner) = setup().await;
        index.save(new_file("/a", 1, owner)).await.unwrap();

        let params = ListParams::default().after(Cursor::from_string("!!! nope !!!"));
        let err = index.list(None, params).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCursor);
    }

    #[tokio::test]
    async fn test_list_rejects_out_of_range_cursor() {
        let (index, owner) = setup().await;
        index.save(new_file("/a", 1, owner)).await.unwrap();

        let params = ListParams::default().after(Cursor::encode(u64::MAX));
        let err = index.list(None, params).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCursor);
    }

    #[tokio::test]
    async fn test_list_with_huge_page_size() {
        let (index, owner) = setup().await;

        for path in ["/a", "/b", "/c"] {
            index.save(new_file(path, 1, owner)).await.unwrap();
        }

        let result = index.list(None, ListParams::first(usize::MAX)).await.unwrap();
        assert_eq!(result.count, 3);
        assert_eq!(result.total, 3);
        assert!(result.next.is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let (index, owner) = setup().await;

        let file = index.save(new_file("/gone.txt", 1, owner)).await.unwrap();
        index.delete(&file).await.unwrap();
        assert!(index.by_id(file.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (index, owner) = setup().await;

        let file = new_file("/never-saved.txt", 1, owner);
        let err = index.delete(&file).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_by_id_missing_is_none() {
        let (index, _) = setup().await;
        assert!(index.by_id(FileId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_over_folder_is_conflict() {
        let (index, owner) = setup().await;

        // Creates the synthesized folder at /x.
        index.save(new_file("/x/a.txt", 1, owner)).await.unwrap();

        let err = index.save(new_file("/x", 1, owner)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_folder_over_file_is_conflict() {
        let (index, owner) = setup().await;

        index.save(new_file("/data", 1, owner)).await.unwrap();

        let err = index.save(new_file("/data/child.txt", 1, owner)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_save_unknown_owner_is_database_error() {
        let (index, _) = setup().await;

        let err = index
            .save(new_file("/orphan.txt", 1, UserId::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);
    }
}
