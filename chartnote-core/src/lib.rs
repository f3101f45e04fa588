//! Core library for Chartnote: a hierarchical note tool that organises
//! page-based notes ("items") inside a tree of folders ("categories").
//!
//! The primary entry point is [`Workspace`], which represents an open
//! `.chartnote` database file. Structural mutations go through [`NoteStore`];
//! navigation goes through [`SelectionController`] and [`ViewStateMachine`].
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    delete::DeleteResult,
    error::{ChartnoteError, FlushFailure, Result},
    export::{export_document, import_document, ExportDocument, APP_VERSION},
    model::{Category, Direction, Item, Page, Stroke},
    selection::{Selection, SelectionController},
    settings::{load_settings, load_settings_from, save_settings, save_settings_to, Settings},
    snapshot::{Snapshot, Violation},
    storage::Storage,
    store::NoteStore,
    ui_state::UiState,
    view::{ViewEvent, ViewState, ViewStateMachine},
    workspace::Workspace,
};
