//! Tree records: categories (folders), items (notes) and their pages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A folder node. Owns an ordered list of child categories and an ordered
/// list of items; list order is the sibling order shown in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_category_ids: Vec<String>,
    #[serde(default)]
    pub item_ids: Vec<String>,
}

impl Category {
    pub(crate) fn new(name: &str, parent_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            parent_id,
            child_category_ids: Vec::new(),
            item_ids: Vec::new(),
        }
    }
}

/// A note: an ordered sequence of pages inside exactly one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category_id: String,
    #[serde(default)]
    pub pages: Vec<Page>,
    /// Page to resume on when the item is opened again.
    #[serde(default)]
    pub last_page_index: usize,
}

impl Item {
    /// New items start with a single blank page.
    pub(crate) fn new(name: &str, category_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category_id: category_id.to_string(),
            pages: vec![Page::blank()],
            last_page_index: 0,
        }
    }

    /// Returns the text of the page the item resumes on, or `""` when the
    /// item has no pages.
    #[must_use]
    pub fn resume_text(&self) -> &str {
        self.pages
            .get(self.last_page_index)
            .map_or("", |p| p.text.as_str())
    }

    /// `last_page_index` is valid when it addresses a page, or is 0 for an
    /// item without pages.
    #[must_use]
    pub fn has_valid_last_page(&self) -> bool {
        if self.pages.is_empty() {
            self.last_page_index == 0
        } else {
            self.last_page_index < self.pages.len()
        }
    }
}

/// A freehand line drawn over a page's chart image, as points in image
/// coordinates.
pub type Stroke = Vec<[f64; 2]>;

/// One page of an item: a chart image with the instrument it shows, the
/// lines drawn over it and free-form notes. `text` is opaque to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Chart image relative to the workspace directory; empty when none.
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub stock_name: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub annotations: Vec<Stroke>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Page {
    pub(crate) fn blank() -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            text: String::new(),
            image_path: String::new(),
            stock_name: String::new(),
            ticker: String::new(),
            annotations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Direction of an adjacent-swap within a sibling sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Direction {
    Up,
    Down,
}

/// Swaps `id` with its neighbour in `seq`.
///
/// Returns `None` when `id` is not in `seq`, `Some(false)` when it already
/// sits at the boundary for `direction`, `Some(true)` after a swap.
pub(crate) fn swap_adjacent(seq: &mut [String], id: &str, direction: Direction) -> Option<bool> {
    let pos = seq.iter().position(|s| s == id)?;
    let neighbour = match direction {
        Direction::Up if pos > 0 => pos - 1,
        Direction::Down if pos + 1 < seq.len() => pos + 1,
        _ => return Some(false),
    };
    seq.swap(pos, neighbour);
    Some(true)
}
