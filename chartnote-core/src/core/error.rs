//! Error types for the Chartnote core library.

use crate::core::snapshot::Violation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A page write-back that could not be applied to its owning item.
///
/// Flush failures are non-fatal: the view state machine reports them as a
/// [`ViewEvent::FlushFailed`](crate::ViewEvent::FlushFailed) and completes the
/// navigation anyway, so the host can warn the user that edits were not kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("could not save page {page_index} of item {item_id}: {reason}")]
pub struct FlushFailure {
    /// Item the content was meant for.
    pub item_id: String,
    /// Page index the content was meant for.
    pub page_index: usize,
    /// Human-readable cause.
    pub reason: String,
}

/// All errors that can occur within the Chartnote core library.
#[derive(Debug, Error)]
pub enum ChartnoteError {
    /// A category ID was referenced that does not exist in the store.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// An item ID was referenced that does not exist in the store.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// A loaded snapshot is structurally inconsistent.
    #[error("Invariant violation: {0}")]
    InvariantViolation(#[from] Violation),

    /// Editable content could not be written back into its item.
    #[error("Flush failed: {0}")]
    FlushFailed(#[from] FlushFailure),

    /// A reparent would create a cycle or is otherwise invalid.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// A page index does not address an existing page of the item.
    #[error("Page {index} out of range for item {item_id}")]
    PageOutOfRange { item_id: String, index: usize },

    /// The only remaining page of an item cannot be deleted.
    #[error("Cannot delete the last page of item {0}")]
    LastPage(String),

    /// The opened file is not a valid Chartnote workspace.
    #[error("Invalid workspace: {0}")]
    InvalidWorkspace(String),

    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be (de)serialized as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`ChartnoteError`].
pub type Result<T> = std::result::Result<T, ChartnoteError>;

impl ChartnoteError {
    /// Returns `true` for the "stale reference" class of errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CategoryNotFound(_) | Self::ItemNotFound(_))
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CategoryNotFound(_) => "Category no longer exists".to_string(),
            Self::ItemNotFound(_) => "Note no longer exists".to_string(),
            Self::InvariantViolation(v) => format!("The notes file is damaged: {v}"),
            Self::FlushFailed(f) => format!("Your last edits were not saved: {}", f.reason),
            Self::InvalidMove(msg) => msg.clone(),
            Self::PageOutOfRange { .. } => "That page does not exist".to_string(),
            Self::LastPage(_) => "A note must keep at least one page".to_string(),
            Self::InvalidWorkspace(_) => "Could not open workspace file".to_string(),
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
