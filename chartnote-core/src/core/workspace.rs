//! An open Chartnote document: the note tree, navigation, the editing pane
//! and UI state, bound to a SQLite file.

use crate::{
    export_document, ChartnoteError, DeleteResult, Direction, NoteStore, Result, Selection,
    SelectionController, Settings, Storage, Stroke, UiState, ViewEvent, ViewStateMachine,
};
use std::fs;
use std::path::Path;

/// An open Chartnote workspace.
///
/// `Workspace` is the interface a host window talks to. Structural changes
/// are forwarded to the [`NoteStore`]; selection changes run through the
/// [`SelectionController`] and then the [`ViewStateMachine`], and every call
/// that changes what the editing pane shows returns the [`ViewEvent`]s the
/// host must render. Nothing reaches disk until [`save`](Self::save).
pub struct Workspace {
    storage: Storage,
    store: NoteStore,
    selection: SelectionController,
    view: ViewStateMachine,
    ui_state: UiState,
    settings: Settings,
}

impl Workspace {
    /// Creates a new workspace database at `path` holding a single root
    /// category named after the file (e.g. `"Trade Journal"` for
    /// `trade-journal.chartnote`).
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P, settings: Settings) -> Result<Self> {
        let storage = Storage::create(&path)?;
        storage.set_meta("created_at", &chrono::Utc::now().timestamp().to_string())?;
        storage.set_meta("app_version", crate::APP_VERSION)?;

        let filename = path
            .as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled");
        let mut store = NoteStore::new().with_max_page_bytes(settings.max_page_bytes);
        store.create_category(None, &humanize(filename))?;

        let mut ws = Self {
            storage,
            store,
            selection: SelectionController::new(),
            view: ViewStateMachine::new(),
            ui_state: UiState::new().with_default_panel_sizes(settings.default_panel_sizes),
            settings,
        };
        ws.save()?;
        log::info!("created workspace {}", path.as_ref().display());
        Ok(ws)
    }

    /// Creates a workspace named `name` in the configured workspace
    /// directory, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::InvalidWorkspace`] if a workspace of that
    /// name already exists, [`ChartnoteError::Io`] if the directory cannot be
    /// created, or [`ChartnoteError::Database`].
    pub fn create_in_workspace_dir(name: &str, settings: Settings) -> Result<Self> {
        let path = settings.workspace_path(name);
        if path.exists() {
            return Err(ChartnoteError::InvalidWorkspace(format!(
                "{} already exists",
                path.display()
            )));
        }
        fs::create_dir_all(&settings.workspace_directory)?;
        Self::create(path, settings)
    }

    /// Opens an existing workspace, validating the stored tree, and resumes
    /// the last selection if it still exists.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::InvalidWorkspace`] if the file is not
    /// a Chartnote database, [`ChartnoteError::InvariantViolation`] if
    /// the stored tree is inconsistent, or [`ChartnoteError::Database`].
    pub fn open<P: AsRef<Path>>(path: P, settings: Settings) -> Result<Self> {
        let storage = Storage::open(&path)?;
        let (snapshot, ui_state) = storage.load()?;
        let mut store = NoteStore::from_snapshot(snapshot)?;
        store.set_max_page_bytes(settings.max_page_bytes);

        let mut ws = Self {
            storage,
            store,
            selection: SelectionController::new(),
            view: ViewStateMachine::new(),
            ui_state: ui_state.with_default_panel_sizes(settings.default_panel_sizes),
            settings,
        };

        let resumed = ws.ui_state.selection();
        let restored = match &resumed {
            Selection::None => Ok(()),
            Selection::Category(id) => ws.select_category(id).map(drop),
            Selection::Item(id) => ws.select_item(id).map(drop),
        };
        if let Err(e) = restored {
            log::warn!("dropping stale selection {resumed:?}: {e}");
            ws.ui_state.set_selection(&Selection::None);
        }

        log::info!(
            "opened workspace {} ({} categories, {} items)",
            path.as_ref().display(),
            ws.store.category_count(),
            ws.store.item_count()
        );
        Ok(ws)
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        self.selection.current()
    }

    pub fn view(&self) -> &ViewStateMachine {
        &self.view
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui_state
    }

    pub fn ui_state_mut(&mut self) -> &mut UiState {
        &mut self.ui_state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Selects a category, emptying the editing pane.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`]; nothing changes.
    pub fn select_category(&mut self, id: &str) -> Result<Vec<ViewEvent>> {
        self.selection.select_category(&self.store, id)?;
        Ok(self.after_selection())
    }

    /// Selects an item and opens it on its resume page.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`]; nothing changes.
    pub fn select_item(&mut self, id: &str) -> Result<Vec<ViewEvent>> {
        self.selection.select_item(&self.store, id)?;
        Ok(self.after_selection())
    }

    pub fn clear_selection(&mut self) -> Vec<ViewEvent> {
        self.selection.clear();
        self.after_selection()
    }

    fn after_selection(&mut self) -> Vec<ViewEvent> {
        let current = self.selection.current().clone();
        self.ui_state.set_selection(&current);
        self.view.apply(&mut self.store, &current)
    }

    /// Passes editor text through to the open page's buffer.
    pub fn edit(&mut self, text: impl Into<String>) -> bool {
        self.view.set_buffer(text)
    }

    /// See [`NoteStore::create_category`].
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] for an unknown parent.
    pub fn create_category(&mut self, parent_id: Option<&str>, name: &str) -> Result<String> {
        self.store.create_category(parent_id, name)
    }

    /// See [`NoteStore::create_item`].
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] for an unknown category.
    pub fn create_item(&mut self, category_id: &str, name: &str) -> Result<String> {
        self.store.create_item(category_id, name)
    }

    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`].
    pub fn rename_category(&mut self, id: &str, name: &str) -> Result<()> {
        self.store.rename_category(id, name)
    }

    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`].
    pub fn rename_item(&mut self, id: &str, name: &str) -> Result<()> {
        self.store.rename_item(id, name)
    }

    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`].
    pub fn move_category_sibling(&mut self, id: &str, direction: Direction) -> Result<bool> {
        self.store.move_category_sibling(id, direction)
    }

    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`].
    pub fn move_item_sibling(&mut self, id: &str, direction: Direction) -> Result<bool> {
        self.store.move_item_sibling(id, direction)
    }

    /// See [`NoteStore::reparent_category`].
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::InvalidMove`] or a not-found error.
    pub fn reparent_category(&mut self, id: &str, new_parent_id: Option<&str>) -> Result<()> {
        self.store.reparent_category(id, new_parent_id)
    }

    /// Deletes a category with its subtree, then drops every reference the
    /// selection, the editing pane and the UI state held to removed records.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`]; nothing changes.
    pub fn delete_category(&mut self, id: &str) -> Result<(DeleteResult, Vec<ViewEvent>)> {
        let result = self.store.delete_category(id)?;
        let events = self.after_delete(&result);
        Ok((result, events))
    }

    /// Deletes an item; see [`delete_category`](Self::delete_category).
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`]; nothing changes.
    pub fn delete_item(&mut self, id: &str) -> Result<(DeleteResult, Vec<ViewEvent>)> {
        let result = self.store.delete_item(id)?;
        let events = self.after_delete(&result);
        Ok((result, events))
    }

    fn after_delete(&mut self, result: &DeleteResult) -> Vec<ViewEvent> {
        let events = self.view.on_deleted(result);
        self.selection.on_deleted(result);
        self.ui_state.forget_deleted(result);
        events
    }

    /// # Errors
    ///
    /// See [`ViewStateMachine::next_page`].
    pub fn next_page(&mut self) -> Result<Vec<ViewEvent>> {
        self.view.next_page(&mut self.store)
    }

    /// # Errors
    ///
    /// See [`ViewStateMachine::prev_page`].
    pub fn prev_page(&mut self) -> Result<Vec<ViewEvent>> {
        self.view.prev_page(&mut self.store)
    }

    /// # Errors
    ///
    /// See [`ViewStateMachine::go_to_page`].
    pub fn go_to_page(&mut self, index: usize) -> Result<Vec<ViewEvent>> {
        self.view.go_to_page(&mut self.store, index)
    }

    /// # Errors
    ///
    /// See [`ViewStateMachine::add_page`].
    pub fn add_page(&mut self) -> Result<Vec<ViewEvent>> {
        self.view.add_page(&mut self.store)
    }

    /// # Errors
    ///
    /// See [`ViewStateMachine::delete_page`].
    pub fn delete_page(&mut self) -> Result<Vec<ViewEvent>> {
        self.view.delete_page(&mut self.store)
    }

    /// See [`NoteStore::set_page_image`].
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn set_page_image(&mut self, item_id: &str, index: usize, image_path: &str) -> Result<()> {
        self.store.set_page_image(item_id, index, image_path)
    }

    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn set_page_stock(
        &mut self,
        item_id: &str,
        index: usize,
        stock_name: &str,
        ticker: &str,
    ) -> Result<()> {
        self.store.set_page_stock(item_id, index, stock_name, ticker)
    }

    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn set_annotations(
        &mut self,
        item_id: &str,
        index: usize,
        strokes: Vec<Stroke>,
    ) -> Result<()> {
        self.store.set_annotations(item_id, index, strokes)
    }

    /// See [`NoteStore::clear_annotations`].
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn clear_annotations(&mut self, item_id: &str, index: usize) -> Result<usize> {
        self.store.clear_annotations(item_id, index)
    }

    /// Shows or hides the auxiliary panel; returns the new visibility.
    pub fn toggle_panel(&mut self) -> bool {
        self.ui_state.toggle_panel()
    }

    pub fn set_panel_sizes(&mut self, sizes: (i32, i32)) {
        self.ui_state.set_panel_sizes(sizes);
    }

    /// Writes the open page back, then persists the tree and UI state.
    ///
    /// A failed write-back does not stop the save; it is returned as a
    /// [`ViewEvent::FlushFailed`] alongside the successful result.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::Database`] if the file cannot be written.
    pub fn save(&mut self) -> Result<Vec<ViewEvent>> {
        let events: Vec<ViewEvent> = self.view.flush(&mut self.store).into_iter().collect();
        self.storage.save(&self.store.snapshot(), &self.ui_state)?;
        log::info!("saved workspace");
        Ok(events)
    }

    /// Writes the open page back, then writes a portable JSON copy of the
    /// tree and UI state. A failed write-back is reported as in
    /// [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// See [`export_document`].
    pub fn export<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<ViewEvent>> {
        let events: Vec<ViewEvent> = self.view.flush(&mut self.store).into_iter().collect();
        export_document(path, &self.store.snapshot(), &self.ui_state)?;
        Ok(events)
    }
}

/// Turns a file stem into a display name: `"trade-journal"` → `"Trade Journal"`.
fn humanize(filename: &str) -> String {
    filename
        .split(['-', '_'])
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
