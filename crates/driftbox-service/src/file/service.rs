//! The file service.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use driftbox_core::error::{AppError, ErrorKind};
use driftbox_core::result::AppResult;
use driftbox_core::types::id::{FileId, UserId};
use driftbox_core::types::list::{ListParams, ListResult};
use driftbox_core::types::path::Path;
use driftbox_entity::file::{File, FileContent, FileContents, FileIndex};

/// An incoming upload: the bytes plus the metadata the caller declared.
pub struct FileUpload {
    /// The byte content.
    pub content: FileContent,
    /// MIME type declared by the caller.
    pub content_type: String,
    /// Raw destination path; normalized and validated on upload.
    pub path: String,
    /// Declared size in bytes.
    pub size: u64,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("content_type", &self.content_type)
            .field("path", &self.path)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Orchestrates the content store and the metadata index.
///
/// Content is always written before metadata, so a failed upload can
/// leave an orphaned blob but never a metadata record without bytes.
#[derive(Clone)]
pub struct FileService {
    contents: Arc<dyn FileContents>,
    index: Arc<dyn FileIndex>,
}

impl FileService {
    /// Create a new service over the given stores.
    pub fn new(contents: Arc<dyn FileContents>, index: Arc<dyn FileIndex>) -> Self {
        Self { contents, index }
    }

    /// Upload content to a path, creating a new record or updating the
    /// existing one at that path.
    pub async fn upload(
        &self,
        mut upload: FileUpload,
        owner_id: UserId,
        cancel: &CancellationToken,
    ) -> AppResult<FileId> {
        let path = Path::parse(&upload.path)?;

        let file = match self.index.by_owner_and_path(owner_id, &path).await? {
            Some(mut existing) => {
                existing.update_content(upload.content_type.clone(), upload.size)?;
                existing
            }
            None => File::create(
                upload.content_type.clone(),
                path.as_str(),
                upload.size,
                owner_id,
            )?,
        };

        self.contents
            .store(&file, &mut upload.content, cancel)
            .await
            .map_err(|e| e.context("failed to store the file content"))?;

        let saved = self
            .index
            .save(file)
            .await
            .map_err(|e| e.context("failed to save the file metadata"))?;

        info!(id = %saved.id, path = %saved.path, owner_id = %owner_id, size = saved.size, "Uploaded file");
        Ok(saved.id)
    }

    /// Open the content of a file for reading.
    pub async fn download(&self, file: &File) -> AppResult<FileContent> {
        if file.is_folder() {
            return Err(AppError::validation(format!(
                "folder {} has no content to download",
                file.path
            )));
        }

        self.contents.load(file).await
    }

    /// Remove a record and its content.
    ///
    /// Either side already being gone is tolerated; removal was the goal.
    pub async fn delete(&self, id: FileId) -> AppResult<()> {
        let file = self
            .index
            .by_id(id)
            .await
            .map_err(|e| e.context(format!("failed to load file {id}")))?
            .ok_or_else(|| AppError::not_found(format!("file {id} does not exist")))?;

        if let Err(e) = self.index.delete(&file).await {
            if e.kind != ErrorKind::NotFound {
                return Err(e.context(format!("failed to delete metadata for file {id}")));
            }
        }

        if !file.is_folder() {
            if let Err(e) = self.contents.delete(&file).await {
                if e.kind != ErrorKind::NotFound {
                    return Err(e.context(format!("failed to delete content of file {id}")));
                }
            }
        }

        info!(id = %id, path = %file.path, "Deleted file");
        Ok(())
    }

    /// Move a file to a new path: copy the content, save the updated
    /// record, then remove the old content.
    ///
    /// Folders cannot be moved; their rows are synthesized from the files
    /// below them.
    pub async fn move_file(
        &self,
        file: File,
        new_path: &str,
        cancel: &CancellationToken,
    ) -> AppResult<File> {
        if file.is_folder() {
            return Err(AppError::folder_update(format!(
                "folder {} cannot be moved",
                file.path
            )));
        }

        let old = file.clone();
        let mut file = file;
        file.change_path(new_path)
            .map_err(|e| e.context(format!("failed to change path of file {}", old.id)))?;

        if file.path == old.path {
            return Ok(file);
        }

        self.contents.copy(&old, &file, cancel).await.map_err(|e| {
            e.context(format!(
                "failed to copy file {} content from {} to {}",
                file.id, old.path, file.path
            ))
        })?;

        let updated = self
            .index
            .save(file)
            .await
            .map_err(|e| e.context(format!("failed to store file {}", old.id)))?;

        self.contents.delete(&old).await.map_err(|e| {
            e.context(format!(
                "failed to delete file {} content from {}",
                updated.id, old.path
            ))
        })?;

        info!(id = %updated.id, from = %old.path, to = %updated.path, "Moved file");
        Ok(updated)
    }

    /// List records, optionally restricted to the children of a folder.
    pub async fn list(
        &self,
        prefix: Option<&Path>,
        params: ListParams,
    ) -> AppResult<ListResult<File>> {
        self.index.list(prefix, params).await
    }

    /// Look up a record by its identifier.
    pub async fn by_id(&self, id: FileId) -> AppResult<Option<File>> {
        self.index.by_id(id).await
    }

    /// Look up a record by owner and exact path.
    pub async fn by_owner_and_path(
        &self,
        owner_id: UserId,
        path: &Path,
    ) -> AppResult<Option<File>> {
        self.index.by_owner_and_path(owner_id, path).await
    }
}

impl fmt::Debug for FileService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileService").finish_non_exhaustive()
    }
}
