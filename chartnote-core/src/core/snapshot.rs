//! Full-tree snapshots exchanged across the load/save boundary, and the
//! structural validation every snapshot passes before it is loaded.

use crate::core::model::{Category, Item};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// The whole tree in plain, serializable form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub root_category_ids: Vec<String>,
    pub categories: Vec<Category>,
    pub items: Vec<Item>,
}

/// A broken tree invariant, naming the offending id(s).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("page {page_id} belongs to missing item {item_id}")]
    OrphanPage { page_id: String, item_id: String },

    #[error("category id {0} appears more than once")]
    DuplicateCategoryId(String),

    #[error("item id {0} appears more than once")]
    DuplicateItemId(String),

    #[error("root list names unknown category {0}")]
    RootNotFound(String),

    #[error("category {0} appears more than once in the root list")]
    DuplicateRoot(String),

    #[error("root category {category_id} has parent {parent_id}")]
    RootHasParent {
        category_id: String,
        parent_id: String,
    },

    #[error("category {0} has no parent but is missing from the root list")]
    UnlistedRoot(String),

    #[error("category {category_id} points to missing parent {parent_id}")]
    DanglingParent {
        category_id: String,
        parent_id: String,
    },

    #[error("category {parent_id} lists unknown child category {child_id}")]
    ChildNotFound { parent_id: String, child_id: String },

    #[error("category {parent_id} lists child {child_id} more than once")]
    DuplicateChild { parent_id: String, child_id: String },

    #[error("category {parent_id} lists child {child_id}, whose parent is different")]
    ChildParentMismatch { parent_id: String, child_id: String },

    #[error("category {child_id} is missing from the child list of its parent {parent_id}")]
    UnlistedChild { parent_id: String, child_id: String },

    #[error("category {0} is its own ancestor")]
    Cycle(String),

    #[error("item {item_id} points to missing category {category_id}")]
    DanglingItemCategory {
        item_id: String,
        category_id: String,
    },

    #[error("category {category_id} lists unknown item {item_id}")]
    ItemNotFound {
        category_id: String,
        item_id: String,
    },

    #[error("category {category_id} lists item {item_id} more than once")]
    DuplicateItem {
        category_id: String,
        item_id: String,
    },

    #[error("category {category_id} lists item {item_id}, which belongs elsewhere")]
    ItemCategoryMismatch {
        category_id: String,
        item_id: String,
    },

    #[error("item {item_id} is missing from the item list of category {category_id}")]
    UnlistedItem {
        category_id: String,
        item_id: String,
    },

    #[error("item {item_id} resumes on page {index} but has {page_count} page(s)")]
    LastPageOutOfRange {
        item_id: String,
        index: usize,
        page_count: usize,
    },
}

impl Snapshot {
    /// Checks every tree invariant and reports the first one that is broken.
    ///
    /// Nothing is repaired: a snapshot either passes unchanged or is rejected.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found.
    pub fn validate(&self) -> std::result::Result<(), Violation> {
        let mut categories: HashMap<&str, &Category> = HashMap::new();
        for c in &self.categories {
            if categories.insert(c.id.as_str(), c).is_some() {
                return Err(Violation::DuplicateCategoryId(c.id.clone()));
            }
        }
        let mut items: HashMap<&str, &Item> = HashMap::new();
        for i in &self.items {
            if items.insert(i.id.as_str(), i).is_some() {
                return Err(Violation::DuplicateItemId(i.id.clone()));
            }
        }

        // Roots
        let mut roots = HashSet::new();
        for id in &self.root_category_ids {
            let cat = categories
                .get(id.as_str())
                .ok_or_else(|| Violation::RootNotFound(id.clone()))?;
            if !roots.insert(id.as_str()) {
                return Err(Violation::DuplicateRoot(id.clone()));
            }
            if let Some(pid) = &cat.parent_id {
                return Err(Violation::RootHasParent {
                    category_id: id.clone(),
                    parent_id: pid.clone(),
                });
            }
        }

        // Parent links, in both directions
        for c in &self.categories {
            match &c.parent_id {
                None => {
                    if !roots.contains(c.id.as_str()) {
                        return Err(Violation::UnlistedRoot(c.id.clone()));
                    }
                }
                Some(pid) => {
                    let parent = categories.get(pid.as_str()).ok_or_else(|| {
                        Violation::DanglingParent {
                            category_id: c.id.clone(),
                            parent_id: pid.clone(),
                        }
                    })?;
                    if !parent.child_category_ids.contains(&c.id) {
                        return Err(Violation::UnlistedChild {
                            parent_id: pid.clone(),
                            child_id: c.id.clone(),
                        });
                    }
                }
            }

            let mut seen = HashSet::new();
            for child_id in &c.child_category_ids {
                let child = categories.get(child_id.as_str()).ok_or_else(|| {
                    Violation::ChildNotFound {
                        parent_id: c.id.clone(),
                        child_id: child_id.clone(),
                    }
                })?;
                if !seen.insert(child_id.as_str()) {
                    return Err(Violation::DuplicateChild {
                        parent_id: c.id.clone(),
                        child_id: child_id.clone(),
                    });
                }
                if child.parent_id.as_deref() != Some(c.id.as_str()) {
                    return Err(Violation::ChildParentMismatch {
                        parent_id: c.id.clone(),
                        child_id: child_id.clone(),
                    });
                }
            }
        }

        // No category may reach itself by following parent links.
        for c in &self.categories {
            let mut visited = HashSet::new();
            let mut current = c;
            while let Some(pid) = &current.parent_id {
                if !visited.insert(current.id.as_str()) {
                    return Err(Violation::Cycle(current.id.clone()));
                }
                // Dangling parents were rejected above.
                match categories.get(pid.as_str()) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }

        // Item membership, in both directions
        for c in &self.categories {
            let mut seen = HashSet::new();
            for item_id in &c.item_ids {
                let item = items
                    .get(item_id.as_str())
                    .ok_or_else(|| Violation::ItemNotFound {
                        category_id: c.id.clone(),
                        item_id: item_id.clone(),
                    })?;
                if !seen.insert(item_id.as_str()) {
                    return Err(Violation::DuplicateItem {
                        category_id: c.id.clone(),
                        item_id: item_id.clone(),
                    });
                }
                if item.category_id != c.id {
                    return Err(Violation::ItemCategoryMismatch {
                        category_id: c.id.clone(),
                        item_id: item_id.clone(),
                    });
                }
            }
        }
        for i in &self.items {
            let cat = categories.get(i.category_id.as_str()).ok_or_else(|| {
                Violation::DanglingItemCategory {
                    item_id: i.id.clone(),
                    category_id: i.category_id.clone(),
                }
            })?;
            if !cat.item_ids.contains(&i.id) {
                return Err(Violation::UnlistedItem {
                    category_id: i.category_id.clone(),
                    item_id: i.id.clone(),
                });
            }
            if !i.has_valid_last_page() {
                return Err(Violation::LastPageOutOfRange {
                    item_id: i.id.clone(),
                    index: i.last_page_index,
                    page_count: i.pages.len(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Page;

    fn cat(id: &str, parent: Option<&str>, children: &[&str], items: &[&str]) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_uppercase(),
            parent_id: parent.map(str::to_string),
            child_category_ids: children.iter().map(|s| s.to_string()).collect(),
            item_ids: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn item(id: &str, category: &str, pages: usize, last: usize) -> Item {
        Item {
            id: id.to_string(),
            name: id.to_string(),
            category_id: category.to_string(),
            pages: (0..pages)
                .map(|n| Page {
                    id: format!("{id}-p{n}"),
                    created_at: 0,
                    updated_at: 0,
                    ..Page::blank()
                })
                .collect(),
            last_page_index: last,
        }
    }

    /// a ─┬─ b ── i2
    ///    └─ i1
    fn valid() -> Snapshot {
        Snapshot {
            root_category_ids: vec!["a".into()],
            categories: vec![
                cat("a", None, &["b"], &["i1"]),
                cat("b", Some("a"), &[], &["i2"]),
            ],
            items: vec![item("i1", "a", 1, 0), item("i2", "b", 3, 2)],
        }
    }

    #[test]
    fn test_valid_snapshot_passes() {
        assert_eq!(valid().validate(), Ok(()));
        assert_eq!(Snapshot::default().validate(), Ok(()));
    }

    #[test]
    fn test_dangling_parent() {
        let mut s = valid();
        s.categories.push(cat("orphan", Some("ghost"), &[], &[]));
        assert_eq!(
            s.validate(),
            Err(Violation::DanglingParent {
                category_id: "orphan".into(),
                parent_id: "ghost".into()
            })
        );
    }

    #[test]
    fn test_duplicate_ids() {
        let mut s = valid();
        s.categories.push(cat("b", Some("a"), &[], &[]));
        assert_eq!(s.validate(), Err(Violation::DuplicateCategoryId("b".into())));

        let mut s = valid();
        s.items.push(item("i1", "a", 1, 0));
        assert_eq!(s.validate(), Err(Violation::DuplicateItemId("i1".into())));
    }

    #[test]
    fn test_root_list_problems() {
        let mut s = valid();
        s.root_category_ids.push("nope".into());
        assert_eq!(s.validate(), Err(Violation::RootNotFound("nope".into())));

        let mut s = valid();
        s.root_category_ids.push("a".into());
        assert_eq!(s.validate(), Err(Violation::DuplicateRoot("a".into())));

        let mut s = valid();
        s.root_category_ids.push("b".into());
        assert!(matches!(s.validate(), Err(Violation::RootHasParent { .. })));

        let mut s = valid();
        s.categories.push(cat("z", None, &[], &[]));
        assert_eq!(s.validate(), Err(Violation::UnlistedRoot("z".into())));
    }

    #[test]
    fn test_child_list_disagrees_with_parent_id() {
        let mut s = valid();
        s.categories[0].child_category_ids.clear();
        assert!(matches!(s.validate(), Err(Violation::UnlistedChild { .. })));

        let mut s = valid();
        s.categories[0].child_category_ids.push("b".into());
        assert!(matches!(s.validate(), Err(Violation::DuplicateChild { .. })));

        let mut s = valid();
        s.categories[1].child_category_ids.push("ghost".into());
        assert!(matches!(s.validate(), Err(Violation::ChildNotFound { .. })));
    }

    #[test]
    fn test_cycle_detected() {
        // x and y parent each other; both agree in both directions.
        let mut s = valid();
        s.categories.push(cat("x", Some("y"), &["y"], &[]));
        s.categories.push(cat("y", Some("x"), &["x"], &[]));
        assert!(matches!(s.validate(), Err(Violation::Cycle(_))));
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let mut s = valid();
        s.categories.push(cat("s", Some("s"), &["s"], &[]));
        assert_eq!(s.validate(), Err(Violation::Cycle("s".into())));
    }

    #[test]
    fn test_item_membership() {
        let mut s = valid();
        s.categories[0].item_ids.clear();
        assert!(matches!(s.validate(), Err(Violation::UnlistedItem { .. })));

        let mut s = valid();
        s.categories[0].item_ids.push("i2".into());
        assert!(matches!(
            s.validate(),
            Err(Violation::ItemCategoryMismatch { .. })
        ));

        let mut s = valid();
        s.items[0].category_id = "ghost".into();
        s.categories[0].item_ids.clear();
        assert!(matches!(
            s.validate(),
            Err(Violation::DanglingItemCategory { .. })
        ));
    }

    #[test]
    fn test_last_page_out_of_range() {
        let mut s = valid();
        s.items[1].last_page_index = 3;
        assert_eq!(
            s.validate(),
            Err(Violation::LastPageOutOfRange {
                item_id: "i2".into(),
                index: 3,
                page_count: 3
            })
        );
    }
}
