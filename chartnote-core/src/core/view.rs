//! The editing surface's state machine.
//!
//! The right-hand pane is either [`ViewState::Empty`] or editing one page of
//! one item. Every selection change runs through [`ViewStateMachine::apply`],
//! which writes the open page back into the store before the pane switches
//! away from it and reports what the host has to render as [`ViewEvent`]s.

use crate::{ChartnoteError, DeleteResult, FlushFailure, NoteStore, Result, Selection};
use serde::{Deserialize, Serialize};

/// What the editing pane currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ViewState {
    #[default]
    Empty,
    #[serde(rename_all = "camelCase")]
    Editing { item_id: String, page_index: usize },
}

/// Instructions for the host UI, in the order they must be handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ViewEvent {
    /// Clear the pane; no page content may remain visible.
    ShowEmpty,
    /// Load `content` into the editor as page `page_index` of `item_id`.
    #[serde(rename_all = "camelCase")]
    ShowEditing {
        item_id: String,
        page_index: usize,
        content: String,
    },
    /// The open page was written back; the document is now dirty.
    #[serde(rename_all = "camelCase")]
    Flushed {
        item_id: String,
        page_index: usize,
        content: String,
    },
    /// The open page could not be written back. Warn the user.
    FlushFailed(FlushFailure),
}

/// Drives the editing pane from the current selection.
#[derive(Debug, Default)]
pub struct ViewStateMachine {
    state: ViewState,
    buffer: String,
}

impl ViewStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// The editor's current, possibly unsaved, page text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Replaces the editor text after the user typed into it.
    ///
    /// Returns `false` and ignores the text while the pane is empty.
    pub fn set_buffer(&mut self, text: impl Into<String>) -> bool {
        match self.state {
            ViewState::Empty => false,
            ViewState::Editing { .. } => {
                self.buffer = text.into();
                true
            }
        }
    }

    /// Moves the pane to whatever `selection` calls for.
    ///
    /// Leaving an item always attempts a write-back first. A failed write-back
    /// is reported as [`ViewEvent::FlushFailed`] and the transition completes
    /// anyway. Selecting a category (or nothing) while already empty is a
    /// no-op and yields no events.
    ///
    /// `selection` must name live records. [`crate::Workspace`] only calls
    /// this after the [`crate::SelectionController`] accepted the id; a stale
    /// item id leaves the pane empty.
    pub(crate) fn apply(&mut self, store: &mut NoteStore, selection: &Selection) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        if self.state == ViewState::Empty && !matches!(selection, Selection::Item(_)) {
            return events;
        }

        events.extend(self.flush(store));

        match selection {
            Selection::Item(id) => match store.item(id) {
                Ok(item) => {
                    let page_index = item.last_page_index;
                    events.push(self.show(store, id, page_index));
                }
                Err(e) => {
                    log::warn!("cannot open selected item: {e}");
                    events.extend(self.enter_empty());
                }
            },
            Selection::Category(_) | Selection::None => events.extend(self.enter_empty()),
        }
        log::debug!("view -> {:?}", self.state);
        events
    }

    /// Writes the open page back into its item without leaving it.
    ///
    /// Returns `None` when nothing is being edited.
    pub fn flush(&mut self, store: &mut NoteStore) -> Option<ViewEvent> {
        let ViewState::Editing {
            item_id,
            page_index,
        } = &self.state
        else {
            return None;
        };
        let event = match store.write_page(item_id, *page_index, &self.buffer) {
            Ok(()) => ViewEvent::Flushed {
                item_id: item_id.clone(),
                page_index: *page_index,
                content: self.buffer.clone(),
            },
            Err(ChartnoteError::FlushFailed(failure)) => {
                log::warn!("{failure}");
                ViewEvent::FlushFailed(failure)
            }
            Err(e) => {
                log::warn!("write-back of {item_id} page {page_index} failed: {e}");
                ViewEvent::FlushFailed(FlushFailure {
                    item_id: item_id.clone(),
                    page_index: *page_index,
                    reason: e.to_string(),
                })
            }
        };
        Some(event)
    }

    /// Empties the pane, without a write-back, if a delete removed the item
    /// being edited.
    pub fn on_deleted(&mut self, deleted: &DeleteResult) -> Vec<ViewEvent> {
        let gone = matches!(
            &self.state,
            ViewState::Editing { item_id, .. } if deleted.deleted_item_ids.contains(item_id)
        );
        if gone {
            self.enter_empty().into_iter().collect()
        } else {
            Vec::new()
        }
    }

    /// Shows the next page of the open item. No-op on the last page.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] if the open item is gone.
    pub fn next_page(&mut self, store: &mut NoteStore) -> Result<Vec<ViewEvent>> {
        let Some((item_id, page_index)) = self.editing() else {
            return Ok(Vec::new());
        };
        if page_index + 1 >= store.item(&item_id)?.pages.len() {
            return Ok(Vec::new());
        }
        self.go_to_page(store, page_index + 1)
    }

    /// Shows the previous page of the open item. No-op on the first page.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] if the open item is gone.
    pub fn prev_page(&mut self, store: &mut NoteStore) -> Result<Vec<ViewEvent>> {
        let Some((_, page_index)) = self.editing() else {
            return Ok(Vec::new());
        };
        if page_index == 0 {
            return Ok(Vec::new());
        }
        self.go_to_page(store, page_index - 1)
    }

    /// Flushes the open page and shows page `index` of the same item,
    /// recording it as the item's resume page.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::PageOutOfRange`] (before any write-back) if
    /// `index` does not exist, or [`ChartnoteError::ItemNotFound`].
    pub fn go_to_page(&mut self, store: &mut NoteStore, index: usize) -> Result<Vec<ViewEvent>> {
        let Some((item_id, _)) = self.editing() else {
            return Ok(Vec::new());
        };
        store.page_text(&item_id, index)?;
        let mut events: Vec<ViewEvent> = self.flush(store).into_iter().collect();
        store.set_last_page_index(&item_id, index)?;
        events.push(self.show(store, &item_id, index));
        Ok(events)
    }

    /// Flushes the open page, inserts a blank page after it and shows the
    /// new page.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] if the open item is gone.
    pub fn add_page(&mut self, store: &mut NoteStore) -> Result<Vec<ViewEvent>> {
        let Some((item_id, page_index)) = self.editing() else {
            return Ok(Vec::new());
        };
        store.item(&item_id)?;
        let mut events: Vec<ViewEvent> = self.flush(store).into_iter().collect();
        let after = store
            .item(&item_id)?
            .pages
            .len()
            .checked_sub(1)
            .map(|last| page_index.min(last));
        let at = store.add_page(&item_id, after)?;
        store.set_last_page_index(&item_id, at)?;
        events.push(self.show(store, &item_id, at));
        Ok(events)
    }

    /// Flushes, then deletes the open page and shows the page that takes
    /// its place.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::LastPage`] (before any write-back) when the
    /// open page is the item's only page, or [`ChartnoteError::ItemNotFound`].
    pub fn delete_page(&mut self, store: &mut NoteStore) -> Result<Vec<ViewEvent>> {
        let Some((item_id, page_index)) = self.editing() else {
            return Ok(Vec::new());
        };
        if store.item(&item_id)?.pages.len() <= 1 {
            return Err(ChartnoteError::LastPage(item_id));
        }
        let mut events: Vec<ViewEvent> = self.flush(store).into_iter().collect();
        let next = store.delete_page(&item_id, page_index)?;
        store.set_last_page_index(&item_id, next)?;
        events.push(self.show(store, &item_id, next));
        Ok(events)
    }

    fn editing(&self) -> Option<(String, usize)> {
        match &self.state {
            ViewState::Editing {
                item_id,
                page_index,
            } => Some((item_id.clone(), *page_index)),
            ViewState::Empty => None,
        }
    }

    fn show(&mut self, store: &NoteStore, item_id: &str, page_index: usize) -> ViewEvent {
        self.buffer = store
            .page_text(item_id, page_index)
            .unwrap_or_default()
            .to_string();
        self.state = ViewState::Editing {
            item_id: item_id.to_string(),
            page_index,
        };
        ViewEvent::ShowEditing {
            item_id: item_id.to_string(),
            page_index,
            content: self.buffer.clone(),
        }
    }

    fn enter_empty(&mut self) -> Option<ViewEvent> {
        self.buffer.clear();
        if self.state == ViewState::Empty {
            return None;
        }
        self.state = ViewState::Empty;
        Some(ViewEvent::ShowEmpty)
    }
}
