//! SQLite file format for a Chartnote workspace.
//!
//! The tree is stored relationally: each category and item row carries its
//! parent and its position among siblings, and pages carry their item and
//! position. [`Storage::load`] rebuilds the ordered sibling lists from those
//! columns; [`Storage::save`] rewrites every table in one transaction.

use crate::core::model::{Category, Item, Page};
use crate::{ChartnoteError, Result, Snapshot, UiState, Violation};
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;

const TABLES: [&str; 5] = ["categories", "items", "pages", "ui_state", "workspace_meta"];

pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Creates (or reinitialises) a workspace database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Opens an existing workspace database.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::InvalidWorkspace`] if the file is not a
    /// Chartnote database, or [`ChartnoteError::Database`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Validate database structure
        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type='table'
                 AND name IN ('categories', 'items', 'pages', 'ui_state', 'workspace_meta')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ChartnoteError::InvalidWorkspace(e.to_string()))?;

        if table_count != TABLES.len() as i64 {
            return Err(ChartnoteError::InvalidWorkspace(
                "Not a valid Chartnote database".to_string(),
            ));
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Reads a `workspace_meta` value.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::Database`] for any SQLite error other than
    /// "no rows returned".
    pub fn meta(&self, key: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM workspace_meta WHERE key = ?",
            [key],
            |row| row.get::<_, Option<String>>(0),
        );
        match result {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes a `workspace_meta` value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::Database`] for any SQLite failure.
    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO workspace_meta (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }

    /// Replaces the stored tree and UI state with `snapshot` and `ui_state`.
    ///
    /// The rewrite happens inside a single transaction; a failure leaves the
    /// previous contents in place.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::Database`] or [`ChartnoteError::Json`].
    pub fn save(&mut self, snapshot: &Snapshot, ui_state: &UiState) -> Result<()> {
        // Position of each category within its own sibling list.
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (pos, id) in snapshot.root_category_ids.iter().enumerate() {
            positions.insert(id.as_str(), pos);
        }
        for cat in &snapshot.categories {
            for (pos, id) in cat.child_category_ids.iter().enumerate() {
                positions.insert(id.as_str(), pos);
            }
        }
        let mut item_positions: HashMap<&str, usize> = HashMap::new();
        for cat in &snapshot.categories {
            for (pos, id) in cat.item_ids.iter().enumerate() {
                item_positions.insert(id.as_str(), pos);
            }
        }

        let tx = self.conn.transaction()?;
        for table in ["categories", "items", "pages", "ui_state"] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        for cat in &snapshot.categories {
            tx.execute(
                "INSERT INTO categories (id, name, parent_id, position) VALUES (?, ?, ?, ?)",
                rusqlite::params![
                    cat.id,
                    cat.name,
                    cat.parent_id,
                    positions.get(cat.id.as_str()).copied().unwrap_or(0) as i64,
                ],
            )?;
        }
        for item in &snapshot.items {
            tx.execute(
                "INSERT INTO items (id, name, category_id, position, last_page_index)
                 VALUES (?, ?, ?, ?, ?)",
                rusqlite::params![
                    item.id,
                    item.name,
                    item.category_id,
                    item_positions.get(item.id.as_str()).copied().unwrap_or(0) as i64,
                    item.last_page_index as i64,
                ],
            )?;
            for (pos, page) in item.pages.iter().enumerate() {
                tx.execute(
                    "INSERT INTO pages (id, item_id, position, text, image_path, stock_name,
                                        ticker, annotations, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        page.id,
                        item.id,
                        pos as i64,
                        page.text,
                        page.image_path,
                        page.stock_name,
                        page.ticker,
                        serde_json::to_string(&page.annotations)?,
                        page.created_at,
                        page.updated_at,
                    ],
                )?;
            }
        }
        for (key, value) in ui_state.entries() {
            tx.execute(
                "INSERT INTO ui_state (key, value) VALUES (?, ?)",
                rusqlite::params![key, serde_json::to_string(value)?],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO workspace_meta (key, value) VALUES ('saved_at', ?)",
            [chrono::Utc::now().timestamp().to_string()],
        )?;
        tx.commit()?;

        log::debug!(
            "saved {} categories, {} items, {} ui entries",
            snapshot.categories.len(),
            snapshot.items.len(),
            ui_state.len()
        );
        Ok(())
    }

    /// Reads the stored tree and UI state.
    ///
    /// The returned snapshot is not validated; pass it to
    /// [`NoteStore::from_snapshot`](crate::NoteStore::from_snapshot).
    /// Unreadable UI state entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::InvariantViolation`] for a page row whose
    /// item does not exist, [`ChartnoteError::Json`] for unreadable
    /// annotations, or [`ChartnoteError::Database`] for any SQLite failure.
    pub fn load(&self) -> Result<(Snapshot, UiState)> {
        let mut snapshot = Snapshot::default();

        let category_rows: Vec<(String, String, Option<String>)> = {
            let mut stmt = self
                .conn
                .prepare("SELECT id, name, parent_id FROM categories ORDER BY position, id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        let mut category_index: HashMap<String, usize> = HashMap::new();
        for (id, name, parent_id) in category_rows {
            category_index.insert(id.clone(), snapshot.categories.len());
            snapshot.categories.push(Category {
                id,
                name,
                parent_id,
                child_category_ids: Vec::new(),
                item_ids: Vec::new(),
            });
        }
        // Rows are in position order, so appending rebuilds each sibling list
        // in stored order. A missing parent is left for validation to report.
        for i in 0..snapshot.categories.len() {
            let id = snapshot.categories[i].id.clone();
            match snapshot.categories[i].parent_id.clone() {
                None => snapshot.root_category_ids.push(id),
                Some(pid) => {
                    if let Some(&p) = category_index.get(&pid) {
                        snapshot.categories[p].child_category_ids.push(id);
                    }
                }
            }
        }

        let mut pages_by_item: HashMap<String, Vec<Page>> = HashMap::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT id, item_id, text, image_path, stock_name, ticker, annotations,
                        created_at, updated_at
                 FROM pages ORDER BY position, id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(6)?,
                    Page {
                        id: row.get(0)?,
                        text: row.get(2)?,
                        image_path: row.get(3)?,
                        stock_name: row.get(4)?,
                        ticker: row.get(5)?,
                        annotations: Vec::new(),
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    },
                ))
            })?;
            for row in rows {
                let (item_id, annotations, mut page) = row?;
                page.annotations = serde_json::from_str(&annotations)?;
                pages_by_item.entry(item_id).or_default().push(page);
            }
        }

        {
            let mut stmt = self.conn.prepare(
                "SELECT id, name, category_id, last_page_index FROM items ORDER BY position, id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;
            for row in rows {
                let (id, name, category_id, last_page_index) = row?;
                if let Some(&c) = category_index.get(&category_id) {
                    snapshot.categories[c].item_ids.push(id.clone());
                }
                let pages = pages_by_item.remove(&id).unwrap_or_default();
                snapshot.items.push(Item {
                    id,
                    name,
                    category_id,
                    pages,
                    // Negative values cannot address a page; let validation reject them.
                    last_page_index: usize::try_from(last_page_index).unwrap_or(usize::MAX),
                });
            }
        }
        // Pages left over here name no stored item.
        if let Some((item_id, pages)) = pages_by_item.into_iter().min_by(|a, b| a.0.cmp(&b.0)) {
            let page_id = pages.first().map(|p| p.id.clone()).unwrap_or_default();
            return Err(Violation::OrphanPage { page_id, item_id }.into());
        }

        let mut ui_state = UiState::new();
        {
            let mut stmt = self.conn.prepare("SELECT key, value FROM ui_state")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (key, raw) = row?;
                match serde_json::from_str(&raw) {
                    Ok(value) => ui_state.set(key, value),
                    Err(e) => log::warn!("skipping unreadable ui_state entry {key}: {e}"),
                }
            }
        }

        Ok((snapshot, ui_state))
    }
}
