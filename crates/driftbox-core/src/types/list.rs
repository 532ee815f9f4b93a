//! Cursor-based pagination types for listing queries.
//!
//! Cursors encode a server-assigned row sequence number rather than a path
//! or content value, so they stay stable even if a row's path changes
//! between page requests.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};
use crate::result::AppResult;

/// Default page size for list queries.
pub const DEFAULT_FIRST: usize = 100;

/// An opaque pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Encode a row sequence number as an opaque cursor.
    pub fn encode(sequence: u64) -> Self {
        Self(STANDARD.encode(sequence.to_string()))
    }

    /// Decode the cursor back into a row sequence number.
    ///
    /// Any input that does not decode to a valid sequence number fails
    /// with [`ErrorKind::InvalidCursor`].
    pub fn decode(&self) -> AppResult<u64> {
        let bytes = STANDARD.decode(&self.0).map_err(|e| {
            AppError::with_source(
                ErrorKind::InvalidCursor,
                format!("invalid 'after' cursor provided: {e}"),
                e,
            )
        })?;

        let value = String::from_utf8(bytes).map_err(|e| {
            AppError::with_source(
                ErrorKind::InvalidCursor,
                format!("invalid 'after' cursor provided: {e}"),
                e,
            )
        })?;

        value.parse().map_err(|e: std::num::ParseIntError| {
            AppError::with_source(
                ErrorKind::InvalidCursor,
                format!("invalid 'after' cursor provided: {e}"),
                e,
            )
        })
    }

    /// Wrap a caller-supplied opaque string without validating it.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The opaque string form handed to callers.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request parameters for paginated list queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Maximum number of items to return.
    pub first: usize,
    /// Resume after this cursor from a previous page.
    pub after: Option<Cursor>,
}

impl ListParams {
    /// Bound the page size.
    pub fn first(first: usize) -> Self {
        Self {
            first,
            after: None,
        }
    }

    /// Resume after a cursor from a previous page.
    pub fn after(mut self, after: Cursor) -> Self {
        self.after = Some(after);
        self
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST,
            after: None,
        }
    }
}

/// One page of an ordered collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResult<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Number of items actually returned on this page.
    pub count: usize,
    /// Size of the full matching collection at query time.
    pub total: usize,
    /// Cursor resuming after this page, absent on the last page.
    pub next: Option<Cursor>,
}

impl<T> ListResult<T> {
    /// An empty result with no further pages.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            total: 0,
            next: None,
        }
    }

    /// Map the items into another type, preserving pagination data.
    pub fn map<O>(self, mapper: impl Fn(T) -> O) -> ListResult<O> {
        ListResult {
            items: self.items.into_iter().map(mapper).collect(),
            count: self.count,
            total: self.total,
            next: self.next,
        }
    }
}
