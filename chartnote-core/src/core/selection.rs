//! Tree navigation state: which category or item the user has selected.

use crate::{DeleteResult, NoteStore, Result};
use serde::{Deserialize, Serialize};

/// The current navigation target. A category and an item can never be
/// selected at the same time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    None,
    Category(String),
    Item(String),
}

impl Selection {
    /// Returns the selected id, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Category(id) | Self::Item(id) => Some(id),
        }
    }

    /// Returns `true` if the selection still names a live record in `store`.
    #[must_use]
    pub fn is_live(&self, store: &NoteStore) -> bool {
        match self {
            Self::None => true,
            Self::Category(id) => store.contains_category(id),
            Self::Item(id) => store.contains_item(id),
        }
    }
}

/// Holds the current [`Selection`] and keeps it pointing at live records.
#[derive(Debug, Default)]
pub struct SelectionController {
    current: Selection,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Selection {
        &self.current
    }

    /// Selects a category.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ChartnoteError::CategoryNotFound`] if `id` is not in
    /// `store`; the previous selection is kept.
    pub fn select_category(&mut self, store: &NoteStore, id: &str) -> Result<&Selection> {
        store.category(id)?;
        self.current = Selection::Category(id.to_string());
        Ok(&self.current)
    }

    /// Selects an item.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ChartnoteError::ItemNotFound`] if `id` is not in
    /// `store`; the previous selection is kept.
    pub fn select_item(&mut self, store: &NoteStore, id: &str) -> Result<&Selection> {
        store.item(id)?;
        self.current = Selection::Item(id.to_string());
        Ok(&self.current)
    }

    pub fn clear(&mut self) {
        self.current = Selection::None;
    }

    /// Drops the selection if a delete removed the record it names.
    ///
    /// Cascaded deletes list every removed descendant, so a selection inside
    /// a deleted subtree is cleared too. Returns `true` if it was cleared.
    pub fn on_deleted(&mut self, deleted: &DeleteResult) -> bool {
        let hit = match &self.current {
            Selection::None => false,
            Selection::Category(id) => deleted.deleted_category_ids.contains(id),
            Selection::Item(id) => deleted.deleted_item_ids.contains(id),
        };
        if hit {
            log::debug!("selection {:?} removed by delete; clearing", self.current);
            self.current = Selection::None;
        }
        hit
    }
}
