//! File entity model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use driftbox_core::error::AppError;
use driftbox_core::result::AppResult;
use driftbox_core::types::id::{FileId, UserId};
use driftbox_core::types::path::Path;

/// Content type recorded for synthesized folder rows.
pub const FOLDER_CONTENT_TYPE: &str = "application/x-folder";

/// Whether a record describes a stored file or a synthesized folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

impl FileKind {
    /// The string form persisted in the metadata store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            other => Err(AppError::validation(format!("unknown file kind {other:?}"))),
        }
    }
}

/// A virtual folder synthesized from a file path.
///
/// Folders have no identity of their own in the content store; they exist
/// only as metadata rows whose size aggregates their descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// The folder name (last path segment).
    pub name: String,
    /// The folder path.
    pub path: Path,
}

/// A stored file or a synthesized folder.
///
/// The byte content never lives on the aggregate: it travels separately as
/// a [`FileContent`](super::FileContent) while an upload or download is in
/// flight, which keeps `Clone` a metadata-only copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Unique, time-orderable identifier.
    pub id: FileId,
    /// File or folder.
    pub kind: FileKind,
    /// MIME type of the content.
    pub content_type: String,
    /// The name (last path segment), derived from the path.
    pub name: String,
    /// The full normalized path.
    pub path: Path,
    /// Size in bytes; for folders, the aggregate size of descendants.
    pub size: u64,
    /// The owning user.
    pub owner_id: UserId,
}

impl File {
    /// Create a new file-typed aggregate from untrusted caller input.
    ///
    /// Validates the path, derives the name, and assigns a fresh ID.
    pub fn create(
        content_type: impl Into<String>,
        path: &str,
        size: u64,
        owner_id: UserId,
    ) -> AppResult<Self> {
        let path = Path::parse(path)?;
        let name = path.name().to_string();

        Ok(Self {
            id: FileId::new(),
            kind: FileKind::File,
            content_type: content_type.into(),
            name,
            path,
            size,
            owner_id,
        })
    }

    /// Whether this record is a synthesized folder.
    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }

    /// Replace the content type and size ahead of storing new bytes.
    ///
    /// Folders carry no content; attempting to update one fails with
    /// [`ErrorKind::FolderUpdate`](driftbox_core::error::ErrorKind).
    pub fn update_content(&mut self, content_type: impl Into<String>, size: u64) -> AppResult<()> {
        if self.is_folder() {
            return Err(AppError::folder_update(format!(
                "cannot update the content of folder {}",
                self.path
            )));
        }

        self.content_type = content_type.into();
        self.size = size;
        Ok(())
    }

    /// Move the record to a new path, re-deriving the name.
    pub fn change_path(&mut self, path: &str) -> AppResult<()> {
        let path = Path::parse(path)?;
        self.name = path.name().to_string();
        self.path = path;
        Ok(())
    }

    /// The synthesized parent folder descriptor, or `None` when the parent
    /// is the root (the root is not a listable folder).
    pub fn folder(&self) -> Option<Folder> {
        let parent = self.path.parent();
        if parent.is_root() {
            return None;
        }

        Some(Folder {
            name: parent.name().to_string(),
            path: parent,
        })
    }
}
