//! File index implementations, one per database engine.
//!
//! Both engines share the same row shape and page-assembly logic; only the
//! SQL dialect differs (regex matching on PostgreSQL, `LIKE` patterns on
//! SQLite).

pub mod pg;
pub mod sqlite;

use uuid::Uuid;

use driftbox_core::error::{AppError, ErrorKind};
use driftbox_core::result::AppResult;
use driftbox_core::types::id::{FileId, UserId};
use driftbox_core::types::list::{Cursor, ListParams, ListResult};
use driftbox_core::types::path::Path;
use driftbox_entity::file::{File, FileKind};

/// A raw `files` row, shared by both engines.
///
/// The `cursor` column only exists in listing queries; point lookups rely
/// on the default.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileRow {
    #[sqlx(default)]
    pub cursor: i64,
    pub id: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub content_type: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub user_id: String,
}

impl FileRow {
    /// Convert a stored row back into the domain aggregate.
    pub fn into_file(self) -> AppResult<File> {
        let id = parse_uuid(&self.id, "files.id")?;
        let owner_id = parse_uuid(&self.user_id, "files.user_id")?;
        let kind: FileKind = self.kind.parse()?;
        let path = Path::parse(&self.path)?;
        let size = u64::try_from(self.size).map_err(|_| {
            AppError::internal(format!("negative size {} for file {}", self.size, self.id))
        })?;

        Ok(File {
            id: FileId::from_uuid(id),
            kind,
            content_type: self.content_type,
            name: self.name,
            path,
            size,
            owner_id: UserId::from_uuid(owner_id),
        })
    }
}

fn parse_uuid(value: &str, column: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AppError::internal(format!("corrupt {column} value {value:?}: {e}")))
}

/// Decode the `after` cursor into a row sequence number, zero when absent.
///
/// Sequence numbers come out of a signed database column, so encodings
/// beyond `i64::MAX` are as invalid as garbage input.
pub(crate) fn decode_after(params: &ListParams) -> AppResult<i64> {
    match &params.after {
        Some(cursor) => {
            let sequence = cursor.decode()?;
            i64::try_from(sequence).map_err(|_| {
                AppError::invalid_cursor(format!(
                    "invalid 'after' cursor provided: sequence {sequence} out of range"
                ))
            })
        }
        None => Ok(0),
    }
}

/// The row fetch limit for a page: one extra row past `first` to detect
/// the next page, saturating instead of overflowing on absurd sizes.
pub(crate) fn fetch_limit(first: usize) -> i64 {
    i64::try_from(first.saturating_add(1)).unwrap_or(i64::MAX)
}

/// Assemble a page from rows fetched with `first + 1` as the limit.
///
/// When the extra row is present it marks the start of the next page; its
/// sequence number becomes the `next` cursor and the row itself is dropped
/// from the page.
pub(crate) fn assemble_page(
    rows: Vec<FileRow>,
    first: usize,
    total: u64,
) -> AppResult<ListResult<File>> {
    let mut items = rows
        .into_iter()
        .map(|row| Ok((row.cursor, row.into_file()?)))
        .collect::<AppResult<Vec<_>>>()?;

    let next = if items.len() > first {
        let (cursor, _) = items.pop().ok_or_else(|| AppError::internal("empty page"))?;
        Some(Cursor::encode(cursor as u64))
    } else {
        None
    };

    let items: Vec<File> = items.into_iter().map(|(_, file)| file).collect();

    Ok(ListResult {
        count: items.len(),
        total: total as usize,
        next,
        items,
    })
}

/// Map a save-time database error, turning unique violations into
/// [`ErrorKind::Conflict`].
pub(crate) fn map_save_error(e: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::conflict(format!("{message}: a record already exists at this path"));
        }
    }
    AppError::with_source(ErrorKind::Database, message.to_string(), e)
}
