//! The hierarchical path model.
//!
//! Folders in Driftbox are virtual: every record addresses itself with a
//! flat, normalized path string, and parent folders are derived from it on
//! demand. [`Path`] is the only way such a string enters the system.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// The path segment separator.
pub const SEPARATOR: char = '/';

/// A normalized, absolute, slash-separated path.
///
/// Invariants: always starts with the separator, contains no `.` or `..`
/// segments and no repeated separators, and never ends with a trailing
/// separator except for the root itself. Construction from untrusted input
/// goes through [`Path::parse`], which rejects anything that would escape
/// the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(String);

impl Path {
    /// The root path, `/`.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Parse and normalize an untrusted path string.
    ///
    /// Empty input yields the root. `.` segments and repeated separators
    /// collapse; `..` segments resolve against the preceding segment and
    /// fail with [`ErrorKind::InvalidPath`](crate::error::ErrorKind) when
    /// they would walk above the root, whether or not the input was
    /// written as absolute.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let mut segments: Vec<&str> = Vec::new();

        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => continue,
                ".." => {
                    if segments.pop().is_none() {
                        return Err(AppError::invalid_path(format!(
                            "path {raw:?} escapes the root"
                        )));
                    }
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Ok(Self::root());
        }

        Ok(Self(format!("/{}", segments.join("/"))))
    }

    /// The path one level up. The root is its own parent.
    pub fn parent(&self) -> Path {
        if self.is_root() {
            return self.clone();
        }

        match self.0.rfind(SEPARATOR).unwrap_or(0) {
            0 => Self::root(),
            idx => Self(self.0[..idx].to_string()),
        }
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The last segment of the path; `/` for the root itself.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return &self.0;
        }

        self.0.rsplit(SEPARATOR).next().unwrap_or(&self.0)
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
