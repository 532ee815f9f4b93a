//! Store contracts implemented by the storage and database crates.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use driftbox_core::result::AppResult;
use driftbox_core::types::id::{FileId, UserId};
use driftbox_core::types::list::{ListParams, ListResult};
use driftbox_core::types::path::Path;

use super::content::FileContent;
use super::model::File;

/// Blob storage for file bytes, addressed by owner and path.
#[async_trait]
pub trait FileContents: Send + Sync + 'static {
    /// Write the content of `file` to its location, replacing any previous
    /// bytes. Rewinds `content` first when the source supports it.
    ///
    /// Honors `cancel` between chunks; a cancelled or failed write leaves
    /// no partial object behind.
    async fn store(
        &self,
        file: &File,
        content: &mut FileContent,
        cancel: &CancellationToken,
    ) -> AppResult<()>;

    /// Open the stored content of `file` for reading.
    ///
    /// Fails with [`ErrorKind::NotFound`](driftbox_core::error::ErrorKind)
    /// when no content exists at the file's location.
    async fn load(&self, file: &File) -> AppResult<FileContent>;

    /// Remove the stored content of `file`.
    ///
    /// Fails with [`ErrorKind::NotFound`](driftbox_core::error::ErrorKind)
    /// when no content exists at the file's location.
    async fn delete(&self, file: &File) -> AppResult<()>;

    /// Copy the content of `from` to the location of `to`. A no-op when
    /// both resolve to the same location.
    async fn copy(&self, from: &File, to: &File, cancel: &CancellationToken) -> AppResult<()>;
}

/// Metadata store for file and folder records.
#[async_trait]
pub trait FileIndex: Send + Sync + 'static {
    /// Persist `file`, upserting the synthesized parent folder rows so
    /// their sizes stay aggregated. Returns the stored record.
    ///
    /// Folders cannot be saved directly; passing one fails with
    /// [`ErrorKind::FolderSave`](driftbox_core::error::ErrorKind).
    async fn save(&self, file: File) -> AppResult<File>;

    /// Look up a record by its identifier.
    async fn by_id(&self, id: FileId) -> AppResult<Option<File>>;

    /// Look up a record by owner and exact path.
    async fn by_owner_and_path(&self, owner_id: UserId, path: &Path) -> AppResult<Option<File>>;

    /// Remove the record for `file`.
    ///
    /// Fails with [`ErrorKind::NotFound`](driftbox_core::error::ErrorKind)
    /// when no such record exists.
    async fn delete(&self, file: &File) -> AppResult<()>;

    /// List records in listing order (folders before files, then by path).
    ///
    /// With a prefix, returns the immediate children of that folder; with
    /// none, returns every record. Pagination follows `params`.
    async fn list(&self, prefix: Option<&Path>, params: ListParams) -> AppResult<ListResult<File>>;
}
