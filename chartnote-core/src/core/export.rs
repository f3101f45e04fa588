//! Portable JSON export and import of a whole workspace.

use crate::{ChartnoteError, Result, Snapshot, UiState};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Version of the crate that wrote an export.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Export format version understood by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Top-level JSON structure of an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub app_version: String,
    pub snapshot: Snapshot,
    #[serde(default)]
    pub ui_state: UiState,
}

/// Writes `snapshot` and `ui_state` to `path` as pretty-printed JSON.
///
/// The file is written next to its destination first and then renamed over
/// it, so readers never observe a half-written export.
///
/// # Errors
///
/// Returns [`ChartnoteError::Io`] or [`ChartnoteError::Json`].
pub fn export_document<P: AsRef<Path>>(path: P, snapshot: &Snapshot, ui_state: &UiState) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let doc = ExportDocument {
        version: FORMAT_VERSION,
        app_version: APP_VERSION.to_string(),
        snapshot: snapshot.clone(),
        ui_state: ui_state.clone(),
    };
    let json = serde_json::to_string_pretty(&doc)?;

    let tmp = tmp_path(path);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    log::info!("exported {} categories to {}", snapshot.categories.len(), path.display());
    Ok(())
}

/// Reads an export file and validates its tree.
///
/// # Errors
///
/// Returns [`ChartnoteError::InvalidWorkspace`] for an export written by a
/// newer format version, [`ChartnoteError::InvariantViolation`] if the tree
/// is inconsistent, or [`ChartnoteError::Io`] / [`ChartnoteError::Json`].
pub fn import_document<P: AsRef<Path>>(path: P) -> Result<ExportDocument> {
    let raw = fs::read_to_string(path.as_ref())?;
    let doc: ExportDocument = serde_json::from_str(&raw)?;
    if doc.version > FORMAT_VERSION {
        return Err(ChartnoteError::InvalidWorkspace(format!(
            "export format {} is newer than supported format {FORMAT_VERSION}",
            doc.version
        )));
    }
    doc.snapshot.validate()?;
    Ok(doc)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoteStore;

    #[test]
    fn test_export_document_serialization() {
        let doc = ExportDocument {
            version: 1,
            app_version: "0.1.0".to_string(),
            snapshot: Snapshot::default(),
            ui_state: UiState::new(),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"version\":1"));
        assert!(json.contains("\"appVersion\":\"0.1.0\""));
        assert!(json.contains("\"uiState\":{}"));
    }

    #[test]
    fn test_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("journal.json");

        let mut store = NoteStore::new();
        let a = store.create_category(None, "Setups").unwrap();
        let i = store.create_item(&a, "Breakout").unwrap();
        store.write_page(&i, 0, "entry above range high").unwrap();
        let mut ui = UiState::new();
        ui.set_panel_visible(true);

        export_document(&path, &store.snapshot(), &ui).unwrap();
        assert!(!tmp_path(&path).exists());

        let doc = import_document(&path).unwrap();
        assert_eq!(doc.app_version, APP_VERSION);
        assert_eq!(doc.snapshot, store.snapshot());
        assert!(doc.ui_state.panel_visible());
    }

    #[test]
    fn test_import_rejects_inconsistent_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        let json = r#"{
            "version": 1,
            "appVersion": "0.0.1",
            "snapshot": {
                "root_category_ids": [],
                "categories": [
                    {"id": "c", "name": "C", "parent_id": "ghost"}
                ],
                "items": []
            }
        }"#;
        fs::write(&path, json).unwrap();
        let err = import_document(&path).unwrap_err();
        assert!(matches!(err, ChartnoteError::InvariantViolation(_)));
    }

    #[test]
    fn test_import_rejects_newer_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        let json = r#"{"version": 99, "appVersion": "9.0.0",
            "snapshot": {"root_category_ids": [], "categories": [], "items": []}}"#;
        fs::write(&path, json).unwrap();
        assert!(matches!(
            import_document(&path),
            Err(ChartnoteError::InvalidWorkspace(_))
        ));
    }
}
