//! Local filesystem content store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use driftbox_core::error::{AppError, ErrorKind};
use driftbox_core::result::AppResult;
use driftbox_core::config::StorageConfig;
use driftbox_entity::file::{File, FileContent, FileContents};

/// [`FileContents`] writing blobs under `<data_dir>/<files_prefix>/`,
/// one subtree per owner.
#[derive(Debug, Clone)]
pub struct LocalContents {
    data_dir: PathBuf,
    files_prefix: String,
    throughput: usize,
}

impl LocalContents {
    /// Create a new content store from configuration.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            data_dir: PathBuf::from(&config.data_dir),
            files_prefix: config.files_prefix.clone(),
            throughput: config.throughput_bytes,
        }
    }

    /// Resolve the on-disk location for a file.
    fn path_for(&self, file: &File) -> PathBuf {
        self.data_dir
            .join(&self.files_prefix)
            .join(file.owner_id.to_string())
            .join(file.path.as_str().trim_start_matches('/'))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Copy `content` to `fs_path` one chunk at a time, observing `cancel`
    /// between chunks.
    async fn write_chunks(
        &self,
        fs_path: &Path,
        content: &mut FileContent,
        cancel: &CancellationToken,
    ) -> AppResult<u64> {
        let mut out = fs::File::create(fs_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create file: {}", fs_path.display()),
                e,
            )
        })?;

        let mut buf = vec![0u8; self.throughput];
        let mut total = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(AppError::cancelled(format!(
                    "store cancelled while writing {}",
                    fs_path.display()
                )));
            }

            let n = content.read(&mut buf).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to read content chunk", e)
            })?;

            if n == 0 {
                out.flush().await.map_err(|e| {
                    AppError::with_source(ErrorKind::Storage, "Failed to flush file", e)
                })?;
                return Ok(total);
            }

            out.write_all(&buf[..n]).await.map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to write chunk", e)
            })?;
            total += n as u64;
        }
    }
}

#[async_trait]
impl FileContents for LocalContents {
    async fn store(
        &self,
        file: &File,
        content: &mut FileContent,
        cancel: &CancellationToken,
    ) -> AppResult<()> {
        let fs_path = self.path_for(file);
        self.ensure_parent(&fs_path).await?;

        content.rewind().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to rewind content for {}", fs_path.display()),
                e,
            )
        })?;

        match self.write_chunks(&fs_path, content, cancel).await {
            Ok(total) => {
                debug!(
                    path = %file.path,
                    owner_id = %file.owner_id,
                    id = %file.id,
                    bytes_written = total,
                    "Stored file content"
                );
                Ok(())
            }
            Err(e) => {
                // An interrupted write must not leave a partial object.
                if let Err(rm_err) = fs::remove_file(&fs_path).await {
                    if rm_err.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            path = %fs_path.display(),
                            error = %rm_err,
                            "Failed to remove partial file after aborted store"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn load(&self, file: &File) -> AppResult<FileContent> {
        let fs_path = self.path_for(file);

        let fs_file = fs::File::open(&fs_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("no content stored at {}", file.path))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open file: {}", fs_path.display()),
                    e,
                )
            }
        })?;

        debug!(path = %file.path, owner_id = %file.owner_id, id = %file.id, "Loaded file content");
        Ok(FileContent::from_seekable(fs_file))
    }

    async fn delete(&self, file: &File) -> AppResult<()> {
        let fs_path = self.path_for(file);

        fs::remove_file(&fs_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("no content stored at {}", file.path))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete file: {}", fs_path.display()),
                    e,
                )
            }
        })?;

        debug!(path = %file.path, owner_id = %file.owner_id, id = %file.id, "Deleted file content");
        Ok(())
    }

    async fn copy(&self, from: &File, to: &File, cancel: &CancellationToken) -> AppResult<()> {
        if self.path_for(from) == self.path_for(to) {
            return Ok(());
        }

        let mut content = self
            .load(from)
            .await
            .map_err(|e| e.context("failed to open source file for copy"))?;

        self.store(to, &mut content, cancel).await
    }
}
