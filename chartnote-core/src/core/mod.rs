//! Internal domain modules for the Chartnote core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod delete;
pub mod error;
pub mod export;
pub mod model;
pub mod selection;
pub mod settings;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod ui_state;
pub mod view;
pub mod workspace;

#[doc(inline)]
pub use delete::DeleteResult;
#[doc(inline)]
pub use error::{ChartnoteError, FlushFailure, Result};
#[doc(inline)]
pub use export::{export_document, import_document, ExportDocument, APP_VERSION};
#[doc(inline)]
pub use model::{Category, Direction, Item, Page, Stroke};
#[doc(inline)]
pub use selection::{Selection, SelectionController};
#[doc(inline)]
pub use settings::Settings;
#[doc(inline)]
pub use snapshot::{Snapshot, Violation};
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use store::NoteStore;
#[doc(inline)]
pub use ui_state::UiState;
#[doc(inline)]
pub use view::{ViewEvent, ViewState, ViewStateMachine};
#[doc(inline)]
pub use workspace::Workspace;
