//! PostgreSQL file index.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use driftbox_core::error::{AppError, ErrorKind};
use driftbox_core::result::AppResult;
use driftbox_core::types::id::{FileId, UserId};
use driftbox_core::types::list::{ListParams, ListResult};
use driftbox_core::types::path::Path;
use driftbox_entity::file::{FOLDER_CONTENT_TYPE, File, FileIndex, FileKind};

use super::{FileRow, assemble_page, decode_after, fetch_limit, map_save_error};

/// [`FileIndex`] backed by PostgreSQL, matching child paths with a regex.
#[derive(Debug, Clone)]
pub struct PgFileIndex {
    pool: PgPool,
}

impl PgFileIndex {
    /// Create a new index over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the synthesized parent folder row inside the save
    /// transaction, accumulating the child's size into it.
    async fn save_parent_folder(
        &self,
        tx: &mut Transaction<'_, Postgres>,
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
impl FileIndex for PgFileIndex {
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

        let regex = match prefix {
            Some(p) => format!("^{}/[^/]*$", escape_regex(p.as_str().trim_end_matches('/'))),
            None => ".*".to_string(),
        };

        let total: i64 = sqlx::query_scalar("SELECT count(id) FROM files WHERE path ~* $1")
            .bind(&regex)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count files", e))?;

        if total == 0 {
            return Ok(ListResult::empty());
        }

        let rows = sqlx::query_as::<_, FileRow>(
            "WITH numbered_files AS ( \
                 SELECT row_number() OVER (ORDER BY type DESC, path) AS cursor, * \
                 FROM files WHERE path ~* $2 ORDER BY type DESC, path \
             ) \
             SELECT * FROM numbered_files WHERE cursor >= $1 LIMIT $3",
        )
        .bind(after)
        .bind(&regex)
        .bind(fetch_limit(params.first))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))?;

        assemble_page(rows, params.first, total as u64)
    }
}

/// Escape regex metacharacters so a path prefix matches literally.
fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
