//! Result type for cascading removals from a [`NoteStore`](super::store::NoteStore).
//!
//! Deleting a category removes its whole subtree: every descendant category
//! and every item held anywhere beneath it. [`DeleteResult`] lists each id that
//! left the store so the selection, the view and the UI state can drop their
//! references to them.
//!
//! ## Serialization
//!
//! Fields serialize in camelCase (`deletedCategoryIds`, `deletedItemIds`),
//! consistent with the other host-facing types in this crate.
//!
//! ## Examples
//!
//! ```rust
//! use chartnote_core::DeleteResult;
//!
//! let result = DeleteResult {
//!     deleted_category_ids: vec!["a".to_string()],
//!     deleted_item_ids: vec!["i1".to_string(), "i2".to_string()],
//! };
//! assert_eq!(result.deleted_count(), 3);
//! assert!(result.contains("i2"));
//!
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("deletedItemIds"));
//! ```

use serde::{Deserialize, Serialize};

/// The outcome of a delete operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Removed categories, the deleted one first, then descendants depth-first.
    pub deleted_category_ids: Vec<String>,

    /// Removed items.
    pub deleted_item_ids: Vec<String>,
}

impl DeleteResult {
    /// Total number of records that left the store.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted_category_ids.len() + self.deleted_item_ids.len()
    }

    /// Returns `true` if `id` names any removed category or item.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.deleted_category_ids.iter().any(|c| c == id)
            || self.deleted_item_ids.iter().any(|i| i == id)
    }

    /// Iterates over every removed id, categories first.
    pub fn all_ids(&self) -> impl Iterator<Item = &str> {
        self.deleted_category_ids
            .iter()
            .chain(self.deleted_item_ids.iter())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let r = DeleteResult::default();
        assert_eq!(r.deleted_count(), 0);
        assert!(!r.contains("anything"));
        assert_eq!(r.all_ids().count(), 0);
    }

    #[test]
    fn test_all_ids_lists_categories_first() {
        let r = DeleteResult {
            deleted_category_ids: vec!["c1".into(), "c2".into()],
            deleted_item_ids: vec!["i1".into()],
        };
        let all: Vec<&str> = r.all_ids().collect();
        assert_eq!(all, vec!["c1", "c2", "i1"]);
    }
}
