//! Per-document UI state: panel visibility, split sizes, tree expansion and
//! the last selection, kept apart from the note tree itself.
//!
//! Values are stored as JSON under string keys so that hosts can keep their
//! own entries next to the ones typed here. Entries that belong to one tree
//! node use keys of the form `<prefix>:<id>` and are dropped with
//! [`UiState::forget_deleted`] once the node is gone.

use crate::{DeleteResult, Selection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Split between the main content and the auxiliary panel when nothing has
/// been stored yet.
pub const DEFAULT_PANEL_SIZES: (i32, i32) = (270, 1050);

const PANEL_VISIBLE: &str = "panelVisible";
const PANEL_SIZES: &str = "panelSizes";
const SELECTION: &str = "selection";
const EXPANDED_PREFIX: &str = "expanded";

/// Key-value store for UI chrome state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiState {
    values: BTreeMap<String, Value>,
    #[serde(skip)]
    default_panel_sizes: Option<(i32, i32)>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `sizes` whenever no split has been stored.
    #[must_use]
    pub fn with_default_panel_sizes(mut self, sizes: (i32, i32)) -> Self {
        self.default_panel_sizes = Some(sizes);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over all entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the auxiliary trace panel is shown. Hidden by default.
    pub fn panel_visible(&self) -> bool {
        self.get(PANEL_VISIBLE)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_panel_visible(&mut self, visible: bool) {
        self.set(PANEL_VISIBLE, Value::Bool(visible));
    }

    /// Flips panel visibility and returns the new value. The stored split is
    /// left alone, so showing the panel again restores the last sizes.
    pub fn toggle_panel(&mut self) -> bool {
        let visible = !self.panel_visible();
        self.set_panel_visible(visible);
        visible
    }

    /// Last committed split, or the default split.
    pub fn panel_sizes(&self) -> (i32, i32) {
        self.get(PANEL_SIZES)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(|| self.default_panel_sizes.unwrap_or(DEFAULT_PANEL_SIZES))
    }

    /// Records the split. Call on every splitter move, not only on toggle.
    pub fn set_panel_sizes(&mut self, sizes: (i32, i32)) {
        self.set(PANEL_SIZES, serde_json::json!([sizes.0, sizes.1]));
    }

    /// Last persisted selection; [`Selection::None`] if absent or unreadable.
    pub fn selection(&self) -> Selection {
        self.get(SELECTION)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn set_selection(&mut self, selection: &Selection) {
        match serde_json::to_value(selection) {
            Ok(v) => self.set(SELECTION, v),
            Err(e) => log::warn!("could not record selection: {e}"),
        }
    }

    /// Whether a category is expanded in the tree. Expanded by default.
    pub fn is_expanded(&self, category_id: &str) -> bool {
        self.get(&scoped_key(EXPANDED_PREFIX, category_id))
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    pub fn set_expanded(&mut self, category_id: &str, expanded: bool) {
        self.set(scoped_key(EXPANDED_PREFIX, category_id), Value::Bool(expanded));
    }

    /// Best-effort cleanup after a delete: removes every `<prefix>:<id>` entry
    /// for a deleted id, and the stored selection if it named one. Returns the
    /// number of entries removed.
    pub fn forget_deleted(&mut self, deleted: &DeleteResult) -> usize {
        let before = self.values.len();
        self.values.retain(|key, _| match key.split_once(':') {
            Some((_, id)) => !deleted.contains(id),
            None => true,
        });
        if self.selection().id().is_some_and(|id| deleted.contains(id)) {
            self.values.remove(SELECTION);
        }
        let removed = before - self.values.len();
        if removed == 0 {
            log::debug!("no UI state referenced the deleted ids");
        }
        removed
    }
}

fn scoped_key(prefix: &str, id: &str) -> String {
    format!("{prefix}:{id}")
}
