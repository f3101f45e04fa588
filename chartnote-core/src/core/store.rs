//! The in-memory note tree and every structural mutation on it.

use crate::core::model::{swap_adjacent, Category, Direction, Item, Page, Stroke};
use crate::{ChartnoteError, DeleteResult, FlushFailure, Result, Snapshot};
use std::collections::HashMap;

/// Single source of truth for categories, items and root ordering.
///
/// Every mutating method validates all of its inputs before touching any
/// record, so a call either applies completely or fails with nothing changed.
/// The store is not internally synchronised; hosts that share it across
/// threads must wrap it in a single-writer lock.
#[derive(Debug, Default)]
pub struct NoteStore {
    categories: HashMap<String, Category>,
    items: HashMap<String, Item>,
    root_category_ids: Vec<String>,
    max_page_bytes: Option<usize>,
}

impl NoteStore {
    /// Creates an empty store with no page size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest page body, in bytes, that [`write_page`](Self::write_page) accepts.
    #[must_use]
    pub fn with_max_page_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_page_bytes = limit;
        self
    }

    pub fn set_max_page_bytes(&mut self, limit: Option<usize>) {
        self.max_page_bytes = limit;
    }

    /// Builds a store from a snapshot after validating every tree invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::InvariantViolation`] naming the first broken
    /// invariant. No store is produced in that case.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        snapshot.validate()?;
        let Snapshot {
            root_category_ids,
            categories,
            items,
        } = snapshot;
        Ok(Self {
            categories: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            root_category_ids,
            max_page_bytes: None,
        })
    }

    /// Returns the whole tree, categories and items in depth-first tree order.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut categories = Vec::with_capacity(self.categories.len());
        let mut items = Vec::with_capacity(self.items.len());
        let mut stack: Vec<&str> = self.root_category_ids.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            let Some(cat) = self.categories.get(id) else {
                continue;
            };
            items.extend(cat.item_ids.iter().filter_map(|i| self.items.get(i)).cloned());
            stack.extend(cat.child_category_ids.iter().rev().map(String::as_str));
            categories.push(cat.clone());
        }
        Snapshot {
            root_category_ids: self.root_category_ids.clone(),
            categories,
            items,
        }
    }

    pub fn root_category_ids(&self) -> &[String] {
        &self.root_category_ids
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn contains_category(&self, id: &str) -> bool {
        self.categories.contains_key(id)
    }

    pub fn contains_item(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Fetches a category by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] if `id` is unknown.
    pub fn category(&self, id: &str) -> Result<&Category> {
        self.categories
            .get(id)
            .ok_or_else(|| ChartnoteError::CategoryNotFound(id.to_string()))
    }

    /// Fetches an item by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] if `id` is unknown.
    pub fn item(&self, id: &str) -> Result<&Item> {
        self.items
            .get(id)
            .ok_or_else(|| ChartnoteError::ItemNotFound(id.to_string()))
    }

    fn item_mut(&mut self, id: &str) -> Result<&mut Item> {
        self.items
            .get_mut(id)
            .ok_or_else(|| ChartnoteError::ItemNotFound(id.to_string()))
    }

    /// Returns `true` if `id` lies strictly below `ancestor_id` in the tree.
    pub fn is_descendant(&self, id: &str, ancestor_id: &str) -> bool {
        let mut current = self.categories.get(id).and_then(|c| c.parent_id.as_deref());
        while let Some(pid) = current {
            if pid == ancestor_id {
                return true;
            }
            current = self.categories.get(pid).and_then(|c| c.parent_id.as_deref());
        }
        false
    }

    /// The ordered sequence a category sits in: the root list, or its
    /// parent's child list.
    fn sibling_seq_mut(&mut self, parent_id: Option<&str>) -> Result<&mut Vec<String>> {
        match parent_id {
            None => Ok(&mut self.root_category_ids),
            Some(pid) => self
                .categories
                .get_mut(pid)
                .map(|p| &mut p.child_category_ids)
                .ok_or_else(|| ChartnoteError::CategoryNotFound(pid.to_string())),
        }
    }

    /// Creates a category at the end of `parent_id`'s children, or at the end
    /// of the root list when `parent_id` is `None`. Returns the new ID.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] if `parent_id` is unknown.
    pub fn create_category(&mut self, parent_id: Option<&str>, name: &str) -> Result<String> {
        let category = Category::new(name, parent_id.map(str::to_string));
        let id = category.id.clone();
        self.sibling_seq_mut(parent_id)?.push(id.clone());
        self.categories.insert(id.clone(), category);
        log::debug!("created category {id} under {parent_id:?}");
        Ok(id)
    }

    /// Creates an item with one blank page at the end of `category_id`'s items.
    /// Returns the new ID.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] if `category_id` is unknown.
    pub fn create_item(&mut self, category_id: &str, name: &str) -> Result<String> {
        let category = self
            .categories
            .get_mut(category_id)
            .ok_or_else(|| ChartnoteError::CategoryNotFound(category_id.to_string()))?;
        let item = Item::new(name, category_id);
        let id = item.id.clone();
        category.item_ids.push(id.clone());
        self.items.insert(id.clone(), item);
        log::debug!("created item {id} in {category_id}");
        Ok(id)
    }

    /// Deletes `id` together with every descendant category and every item
    /// beneath it, and unlinks it from its parent (or the root list).
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] if `id` is unknown.
    pub fn delete_category(&mut self, id: &str) -> Result<DeleteResult> {
        let parent_id = self.category(id)?.parent_id.clone();

        // Collect the whole subtree before removing anything.
        let mut result = DeleteResult::default();
        let mut stack = vec![id.to_string()];
        while let Some(cid) = stack.pop() {
            if let Some(cat) = self.categories.get(&cid) {
                result.deleted_item_ids.extend(cat.item_ids.iter().cloned());
                stack.extend(cat.child_category_ids.iter().rev().cloned());
            }
            result.deleted_category_ids.push(cid);
        }

        self.sibling_seq_mut(parent_id.as_deref())?.retain(|c| c != id);
        for cid in &result.deleted_category_ids {
            self.categories.remove(cid);
        }
        for iid in &result.deleted_item_ids {
            self.items.remove(iid);
        }

        log::info!(
            "deleted category {id} ({} categories, {} items)",
            result.deleted_category_ids.len(),
            result.deleted_item_ids.len()
        );
        Ok(result)
    }

    /// Deletes an item and unlinks it from its category.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] if `id` is unknown.
    pub fn delete_item(&mut self, id: &str) -> Result<DeleteResult> {
        let category_id = self.item(id)?.category_id.clone();
        if let Some(cat) = self.categories.get_mut(&category_id) {
            cat.item_ids.retain(|i| i != id);
        }
        self.items.remove(id);
        log::info!("deleted item {id}");
        Ok(DeleteResult {
            deleted_category_ids: Vec::new(),
            deleted_item_ids: vec![id.to_string()],
        })
    }

    /// Swaps a category with its neighbour among its siblings.
    ///
    /// Returns `false`, leaving the order untouched, when the category is
    /// already first (for [`Direction::Up`]) or last (for [`Direction::Down`]).
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] if `id` is unknown.
    pub fn move_category_sibling(&mut self, id: &str, direction: Direction) -> Result<bool> {
        let parent_id = self.category(id)?.parent_id.clone();
        let seq = self.sibling_seq_mut(parent_id.as_deref())?;
        let moved = swap_adjacent(seq, id, direction)
            .ok_or_else(|| ChartnoteError::CategoryNotFound(id.to_string()))?;
        log::debug!("move category {id} {direction:?}: moved={moved}");
        Ok(moved)
    }

    /// Swaps an item with its neighbour inside its category.
    ///
    /// Boundary behaviour matches [`move_category_sibling`](Self::move_category_sibling).
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] if `id` is unknown.
    pub fn move_item_sibling(&mut self, id: &str, direction: Direction) -> Result<bool> {
        let category_id = self.item(id)?.category_id.clone();
        let category = self
            .categories
            .get_mut(&category_id)
            .ok_or_else(|| ChartnoteError::CategoryNotFound(category_id.clone()))?;
        let moved = swap_adjacent(&mut category.item_ids, id, direction)
            .ok_or_else(|| ChartnoteError::ItemNotFound(id.to_string()))?;
        log::debug!("move item {id} {direction:?}: moved={moved}");
        Ok(moved)
    }

    /// Replaces a category's display name. Any string is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] if `id` is unknown.
    pub fn rename_category(&mut self, id: &str, name: &str) -> Result<()> {
        let category = self
            .categories
            .get_mut(id)
            .ok_or_else(|| ChartnoteError::CategoryNotFound(id.to_string()))?;
        category.name = name.to_string();
        log::debug!("renamed category {id}");
        Ok(())
    }

    /// Replaces an item's display name. Any string is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] if `id` is unknown.
    pub fn rename_item(&mut self, id: &str, name: &str) -> Result<()> {
        self.item_mut(id)?.name = name.to_string();
        log::debug!("renamed item {id}");
        Ok(())
    }

    /// Moves a category, with its subtree, to the end of `new_parent_id`'s
    /// children (or of the root list for `None`).
    ///
    /// Moving a category to the parent it already has leaves it in place.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::CategoryNotFound`] if either ID is unknown,
    /// or [`ChartnoteError::InvalidMove`] if the category would become its
    /// own parent or land beneath one of its descendants.
    pub fn reparent_category(&mut self, id: &str, new_parent_id: Option<&str>) -> Result<()> {
        let old_parent_id = self.category(id)?.parent_id.clone();
        if let Some(pid) = new_parent_id {
            self.category(pid)?;
            if pid == id {
                return Err(ChartnoteError::InvalidMove(
                    "A category cannot be its own parent".to_string(),
                ));
            }
            if self.is_descendant(pid, id) {
                return Err(ChartnoteError::InvalidMove(
                    "Move would create a cycle".to_string(),
                ));
            }
        }
        if old_parent_id.as_deref() == new_parent_id {
            return Ok(());
        }

        self.sibling_seq_mut(old_parent_id.as_deref())?.retain(|c| c != id);
        self.sibling_seq_mut(new_parent_id)?.push(id.to_string());
        if let Some(category) = self.categories.get_mut(id) {
            category.parent_id = new_parent_id.map(str::to_string);
        }
        log::debug!("reparented category {id}: {old_parent_id:?} -> {new_parent_id:?}");
        Ok(())
    }

    /// Returns one page of an item.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn page(&self, item_id: &str, index: usize) -> Result<&Page> {
        self.item(item_id)?
            .pages
            .get(index)
            .ok_or_else(|| ChartnoteError::PageOutOfRange {
                item_id: item_id.to_string(),
                index,
            })
    }

    /// Returns the text of one page.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn page_text(&self, item_id: &str, index: usize) -> Result<&str> {
        self.page(item_id, index).map(|p| p.text.as_str())
    }

    fn page_mut(&mut self, item_id: &str, index: usize) -> Result<&mut Page> {
        self.item_mut(item_id)?
            .pages
            .get_mut(index)
            .ok_or_else(|| ChartnoteError::PageOutOfRange {
                item_id: item_id.to_string(),
                index,
            })
    }

    /// Attaches a chart image to a page, or detaches it with `""`.
    ///
    /// Lines drawn over the previous image no longer line up, so the page's
    /// annotations are cleared.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn set_page_image(&mut self, item_id: &str, index: usize, image_path: &str) -> Result<()> {
        let page = self.page_mut(item_id, index)?;
        page.image_path = image_path.to_string();
        page.annotations.clear();
        page.updated_at = chrono::Utc::now().timestamp();
        log::debug!("set image of {item_id} page {index} to {image_path:?}");
        Ok(())
    }

    /// Records the instrument a page is about.
    ///
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
        let page = self.page_mut(item_id, index)?;
        if page.stock_name != stock_name || page.ticker != ticker {
            page.stock_name = stock_name.to_string();
            page.ticker = ticker.to_string();
            page.updated_at = chrono::Utc::now().timestamp();
        }
        Ok(())
    }

    /// Replaces the lines drawn over a page's image.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn set_annotations(
        &mut self,
        item_id: &str,
        index: usize,
        strokes: Vec<Stroke>,
    ) -> Result<()> {
        let page = self.page_mut(item_id, index)?;
        if page.annotations != strokes {
            page.annotations = strokes;
            page.updated_at = chrono::Utc::now().timestamp();
        }
        Ok(())
    }

    /// Removes every line drawn over a page's image. The image itself stays.
    /// Returns the number of strokes removed.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn clear_annotations(&mut self, item_id: &str, index: usize) -> Result<usize> {
        let page = self.page_mut(item_id, index)?;
        let removed = page.annotations.len();
        if removed > 0 {
            page.annotations.clear();
            page.updated_at = chrono::Utc::now().timestamp();
        }
        log::debug!("cleared {removed} strokes from {item_id} page {index}");
        Ok(removed)
    }

    /// Inserts a blank page directly after page `after`, or at the end when
    /// `after` is `None`. Returns the new page's index.
    ///
    /// `last_page_index` keeps addressing the same page it did before.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn add_page(&mut self, item_id: &str, after: Option<usize>) -> Result<usize> {
        let item = self.item_mut(item_id)?;
        let at = match after {
            None => item.pages.len(),
            Some(i) if i < item.pages.len() => i + 1,
            Some(i) => {
                return Err(ChartnoteError::PageOutOfRange {
                    item_id: item_id.to_string(),
                    index: i,
                })
            }
        };
        let had_pages = !item.pages.is_empty();
        item.pages.insert(at, Page::blank());
        if had_pages && item.last_page_index >= at {
            item.last_page_index += 1;
        }
        Ok(at)
    }

    /// Removes one page. An item's only page cannot be removed.
    ///
    /// Returns the index of the page that now occupies the deleted position,
    /// or the new last page when the final page was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`], [`ChartnoteError::PageOutOfRange`]
    /// or [`ChartnoteError::LastPage`].
    pub fn delete_page(&mut self, item_id: &str, index: usize) -> Result<usize> {
        let item = self.item_mut(item_id)?;
        if index >= item.pages.len() {
            return Err(ChartnoteError::PageOutOfRange {
                item_id: item_id.to_string(),
                index,
            });
        }
        if item.pages.len() == 1 {
            return Err(ChartnoteError::LastPage(item_id.to_string()));
        }
        item.pages.remove(index);
        let last = item.pages.len() - 1;
        if item.last_page_index > index {
            item.last_page_index -= 1;
        }
        item.last_page_index = item.last_page_index.min(last);
        Ok(index.min(last))
    }

    /// Records the page an item should resume on.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::ItemNotFound`] or [`ChartnoteError::PageOutOfRange`].
    pub fn set_last_page_index(&mut self, item_id: &str, index: usize) -> Result<()> {
        let item = self.item_mut(item_id)?;
        let in_range = index < item.pages.len() || (index == 0 && item.pages.is_empty());
        if !in_range {
            return Err(ChartnoteError::PageOutOfRange {
                item_id: item_id.to_string(),
                index,
            });
        }
        item.last_page_index = index;
        Ok(())
    }

    /// Writes edited text back into page `index` of an item.
    ///
    /// An item without pages accepts a write to index 0, which creates its
    /// first page. `updated_at` only moves when the text actually changed.
    ///
    /// # Errors
    ///
    /// Returns [`ChartnoteError::FlushFailed`] if `text` exceeds the store's
    /// page size limit, [`ChartnoteError::ItemNotFound`] or
    /// [`ChartnoteError::PageOutOfRange`] for a stale target.
    pub fn write_page(&mut self, item_id: &str, index: usize, text: &str) -> Result<()> {
        let limit = self.max_page_bytes;
        let item = self.item_mut(item_id)?;
        if index >= item.pages.len() && !(index == 0 && item.pages.is_empty()) {
            return Err(ChartnoteError::PageOutOfRange {
                item_id: item_id.to_string(),
                index,
            });
        }
        if let Some(limit) = limit {
            if text.len() > limit {
                return Err(FlushFailure {
                    item_id: item_id.to_string(),
                    page_index: index,
                    reason: format!("page is {} bytes, the limit is {limit}", text.len()),
                }
                .into());
            }
        }

        if item.pages.is_empty() {
            item.pages.push(Page::blank());
        }
        let page = &mut item.pages[index];
        if page.text != text {
            page.text = text.to_string();
            page.updated_at = chrono::Utc::now().timestamp();
            log::debug!("wrote {} bytes to {item_id} page {index}", text.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every parent/child and category/item link agrees in both directions.
    fn assert_consistent(store: &NoteStore) {
        assert_eq!(store.snapshot().validate(), Ok(()));
        assert_eq!(store.snapshot().categories.len(), store.category_count());
        assert_eq!(store.snapshot().items.len(), store.item_count());
    }

    /// Root "A" holding items I1, I2, I3.
    fn setup_items() -> (NoteStore, String, Vec<String>) {
        let mut store = NoteStore::new();
        let a = store.create_category(None, "A").unwrap();
        let items = (1..=3)
            .map(|n| store.create_item(&a, &format!("I{n}")).unwrap())
            .collect();
        (store, a, items)
    }

    #[test]
    fn test_create_category_appends_to_parent() {
        let mut store = NoteStore::new();
        let a = store.create_category(None, "A").unwrap();
        let b = store.create_category(None, "B").unwrap();
        let a1 = store.create_category(Some(&a), "A1").unwrap();
        let a2 = store.create_category(Some(&a), "A2").unwrap();

        assert_eq!(store.root_category_ids(), &[a.clone(), b]);
        assert_eq!(store.category(&a).unwrap().child_category_ids, vec![a1.clone(), a2]);
        assert_eq!(store.category(&a1).unwrap().parent_id.as_deref(), Some(a.as_str()));
        assert_consistent(&store);
    }

    #[test]
    fn test_create_with_unknown_parent_fails() {
        let mut store = NoteStore::new();
        let err = store.create_category(Some("ghost"), "X").unwrap_err();
        assert!(matches!(err, ChartnoteError::CategoryNotFound(ref id) if id == "ghost"));
        let err = store.create_item("ghost", "X").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.category_count(), 0);
        assert_eq!(store.item_count(), 0);
    }

    #[test]
    fn test_create_item_defaults() {
        let (store, a, items) = setup_items();
        assert_eq!(store.category(&a).unwrap().item_ids, items);
        let item = store.item(&items[0]).unwrap();
        assert_eq!(item.name, "I1");
        assert_eq!(item.category_id, a);
        assert_eq!(item.pages.len(), 1);
        assert_eq!(item.last_page_index, 0);
        assert_consistent(&store);
    }

    #[test]
    fn test_move_item_scenario_round_trip() {
        let (mut store, a, items) = setup_items();
        assert!(store.move_item_sibling(&items[1], Direction::Up).unwrap());
        assert_eq!(
            store.category(&a).unwrap().item_ids,
            vec![items[1].clone(), items[0].clone(), items[2].clone()]
        );
        assert!(store.move_item_sibling(&items[1], Direction::Down).unwrap());
        assert_eq!(store.category(&a).unwrap().item_ids, items);
    }

    #[test]
    fn test_move_first_item_up_is_noop() {
        let (mut store, a, items) = setup_items();
        assert!(!store.move_item_sibling(&items[0], Direction::Up).unwrap());
        assert!(!store.move_item_sibling(&items[2], Direction::Down).unwrap());
        assert_eq!(store.category(&a).unwrap().item_ids, items);
    }

    #[test]
    fn test_move_unknown_id_is_not_found() {
        let (mut store, _, _) = setup_items();
        assert!(store.move_item_sibling("ghost", Direction::Up).unwrap_err().is_not_found());
        assert!(store
            .move_category_sibling("ghost", Direction::Down)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_move_category_round_trip() {
        let mut store = NoteStore::new();
        let roots: Vec<String> = ["A", "B", "C"]
            .iter()
            .map(|n| store.create_category(None, n).unwrap())
            .collect();
        assert!(store.move_category_sibling(&roots[1], Direction::Down).unwrap());
        assert_eq!(
            store.root_category_ids(),
            &[roots[0].clone(), roots[2].clone(), roots[1].clone()]
        );
        assert!(store.move_category_sibling(&roots[1], Direction::Up).unwrap());
        assert_eq!(store.root_category_ids(), roots.as_slice());

        // Nested siblings move inside their parent only.
        let kids: Vec<String> = ["x", "y"]
            .iter()
            .map(|n| store.create_category(Some(&roots[0]), n).unwrap())
            .collect();
        assert!(store.move_category_sibling(&kids[1], Direction::Up).unwrap());
        assert_eq!(
            store.category(&roots[0]).unwrap().child_category_ids,
            vec![kids[1].clone(), kids[0].clone()]
        );
        assert_eq!(store.root_category_ids(), roots.as_slice());
        assert!(!store.move_category_sibling(&roots[0], Direction::Up).unwrap());
    }

    #[test]
    fn test_delete_category_cascades() {
        let mut store = NoteStore::new();
        let a = store.create_category(None, "A").unwrap();
        let keep = store.create_category(None, "Keep").unwrap();
        let b = store.create_category(Some(&a), "B").unwrap();
        let c = store.create_category(Some(&b), "C").unwrap();
        let i1 = store.create_item(&a, "I1").unwrap();
        let i2 = store.create_item(&c, "I2").unwrap();
        let kept_item = store.create_item(&keep, "K").unwrap();

        let result = store.delete_category(&a).unwrap();
        assert_eq!(result.deleted_category_ids, vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(result.deleted_count(), 5);
        for id in [&a, &b, &c] {
            assert!(!store.contains_category(id));
        }
        assert!(!store.contains_item(&i1));
        assert!(!store.contains_item(&i2));
        assert!(store.contains_item(&kept_item));
        assert_eq!(store.root_category_ids(), &[keep]);
        assert_consistent(&store);
    }

    #[test]
    fn test_delete_nested_category_unlinks_from_parent() {
        let mut store = NoteStore::new();
        let a = store.create_category(None, "A").unwrap();
        let b = store.create_category(Some(&a), "B").unwrap();
        store.delete_category(&b).unwrap();
        assert!(store.category(&a).unwrap().child_category_ids.is_empty());
        assert!(store.delete_category(&b).unwrap_err().is_not_found());
        assert_consistent(&store);
    }

    #[test]
    fn test_delete_item() {
        let (mut store, a, items) = setup_items();
        let result = store.delete_item(&items[1]).unwrap();
        assert_eq!(result.deleted_item_ids, vec![items[1].clone()]);
        assert_eq!(
            store.category(&a).unwrap().item_ids,
            vec![items[0].clone(), items[2].clone()]
        );
        assert!(store.delete_item(&items[1]).unwrap_err().is_not_found());
        assert_consistent(&store);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let (mut store, a, items) = setup_items();
        store.delete_item(&items[0]).unwrap();
        let fresh = store.create_item(&a, "again").unwrap();
        assert!(!items.contains(&fresh));
    }

    #[test]
    fn test_rename_accepts_empty_and_duplicates() {
        let (mut store, a, items) = setup_items();
        store.rename_category(&a, "").unwrap();
        store.rename_item(&items[0], "same").unwrap();
        store.rename_item(&items[1], "same").unwrap();
        assert_eq!(store.category(&a).unwrap().name, "");
        assert_eq!(store.item(&items[1]).unwrap().name, "same");
        assert!(store.rename_item("ghost", "x").unwrap_err().is_not_found());
        assert!(store.rename_category("ghost", "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_reparent_category() {
        let mut store = NoteStore::new();
        let a = store.create_category(None, "A").unwrap();
        let b = store.create_category(None, "B").unwrap();
        let a1 = store.create_category(Some(&a), "A1").unwrap();

        store.reparent_category(&a1, Some(&b)).unwrap();
        assert!(store.category(&a).unwrap().child_category_ids.is_empty());
        assert_eq!(store.category(&b).unwrap().child_category_ids, vec![a1.clone()]);

        store.reparent_category(&a1, None).unwrap();
        assert_eq!(store.root_category_ids(), &[a, b, a1]);
        assert_consistent(&store);
    }

    #[test]
    fn test_reparent_prevents_cycle() {
        let mut store = NoteStore::new();
        let a = store.create_category(None, "A").unwrap();
        let b = store.create_category(Some(&a), "B").unwrap();
        let c = store.create_category(Some(&b), "C").unwrap();

        let err = store.reparent_category(&a, Some(&c)).unwrap_err();
        assert!(err.to_string().contains("cycle"), "Expected cycle error, got: {err}");
        assert!(matches!(
            store.reparent_category(&b, Some(&b)),
            Err(ChartnoteError::InvalidMove(_))
        ));
        assert!(store.reparent_category(&b, Some("ghost")).unwrap_err().is_not_found());
        assert!(store.is_descendant(&c, &a));
        assert_consistent(&store);
    }

    #[test]
    fn test_reparent_to_same_parent_keeps_position() {
        let mut store = NoteStore::new();
        let a = store.create_category(None, "A").unwrap();
        let b = store.create_category(None, "B").unwrap();
        store.reparent_category(&a, None).unwrap();
        assert_eq!(store.root_category_ids(), &[a, b]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let (mut store, a, items) = setup_items();
        let sub = store.create_category(Some(&a), "Sub").unwrap();
        store.create_item(&sub, "deep").unwrap();
        store.write_page(&items[0], 0, "hello").unwrap();

        let restored = NoteStore::from_snapshot(store.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(restored.page_text(&items[0], 0).unwrap(), "hello");
    }

    #[test]
    fn test_from_snapshot_rejects_dangling_parent() {
        let mut snapshot = NoteStore::new().snapshot();
        snapshot.categories.push(Category {
            id: "child".into(),
            name: "Child".into(),
            parent_id: Some("ghost".into()),
            child_category_ids: vec![],
            item_ids: vec![],
        });
        let err = NoteStore::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, ChartnoteError::InvariantViolation(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_page_operations() {
        let (mut store, _, items) = setup_items();
        let id = &items[0];
        assert_eq!(store.add_page(id, Some(0)).unwrap(), 1);
        assert_eq!(store.add_page(id, None).unwrap(), 2);
        store.write_page(id, 2, "third").unwrap();
        store.set_last_page_index(id, 2).unwrap();

        // Inserting before the resume page keeps it pointing at the same page.
        assert_eq!(store.add_page(id, Some(0)).unwrap(), 1);
        assert_eq!(store.item(id).unwrap().last_page_index, 3);
        assert_eq!(store.item(id).unwrap().resume_text(), "third");

        assert_eq!(store.delete_page(id, 0).unwrap(), 0);
        assert_eq!(store.item(id).unwrap().last_page_index, 2);
        assert_eq!(store.item(id).unwrap().resume_text(), "third");

        assert_eq!(store.delete_page(id, 2).unwrap(), 1);
        assert_eq!(store.item(id).unwrap().last_page_index, 1);
        assert!(matches!(
            store.set_last_page_index(id, 9),
            Err(ChartnoteError::PageOutOfRange { .. })
        ));
        assert_consistent(&store);
    }

    #[test]
    fn test_cannot_delete_last_page() {
        let (mut store, _, items) = setup_items();
        assert!(matches!(
            store.delete_page(&items[0], 0),
            Err(ChartnoteError::LastPage(_))
        ));
        assert!(matches!(
            store.delete_page(&items[0], 4),
            Err(ChartnoteError::PageOutOfRange { .. })
        ));
    }

    #[test]
    fn test_write_page_respects_limit() {
        let (store, _, items) = setup_items();
        let mut store = store.with_max_page_bytes(Some(4));
        store.write_page(&items[0], 0, "abcd").unwrap();
        let err = store.write_page(&items[0], 0, "abcde").unwrap_err();
        match err {
            ChartnoteError::FlushFailed(f) => {
                assert_eq!(f.item_id, items[0]);
                assert_eq!(f.page_index, 0);
            }
            other => panic!("expected FlushFailed, got {other:?}"),
        }
        assert_eq!(store.page_text(&items[0], 0).unwrap(), "abcd");
    }

    #[test]
    fn test_page_details() {
        let (mut store, _, items) = setup_items();
        let id = &items[0];
        store.set_page_image(id, 0, "images/spy.png").unwrap();
        store.set_page_stock(id, 0, "SPDR S&P 500", "SPY").unwrap();
        store
            .set_annotations(id, 0, vec![vec![[1.0, 2.0], [3.0, 4.0]], vec![[5.0, 6.0]]])
            .unwrap();
        store.write_page(id, 0, "failed breakout").unwrap();

        assert_eq!(store.clear_annotations(id, 0).unwrap(), 2);
        assert_eq!(store.clear_annotations(id, 0).unwrap(), 0);
        let page = store.page(id, 0).unwrap();
        assert!(page.annotations.is_empty());
        assert_eq!(page.image_path, "images/spy.png");
        assert_eq!(page.ticker, "SPY");
        assert_eq!(page.text, "failed breakout");

        assert!(matches!(
            store.clear_annotations(id, 5),
            Err(ChartnoteError::PageOutOfRange { .. })
        ));
        assert!(store.clear_annotations("ghost", 0).unwrap_err().is_not_found());
    }

    #[test]
    fn test_new_image_clears_annotations() {
        let (mut store, _, items) = setup_items();
        let id = &items[0];
        store.set_page_image(id, 0, "images/old.png").unwrap();
        store.set_annotations(id, 0, vec![vec![[0.0, 0.0]]]).unwrap();
        store.set_page_image(id, 0, "images/new.png").unwrap();
        let page = store.page(id, 0).unwrap();
        assert_eq!(page.image_path, "images/new.png");
        assert!(page.annotations.is_empty());
    }

    #[test]
    fn test_write_page_creates_first_page_for_empty_item() {
        let mut snapshot = NoteStore::new().snapshot();
        snapshot.root_category_ids.push("a".into());
        snapshot.categories.push(Category {
            id: "a".into(),
            name: "A".into(),
            parent_id: None,
            child_category_ids: vec![],
            item_ids: vec!["i".into()],
        });
        snapshot.items.push(Item {
            id: "i".into(),
            name: "I".into(),
            category_id: "a".into(),
            pages: vec![],
            last_page_index: 0,
        });
        let mut store = NoteStore::from_snapshot(snapshot).unwrap();
        store.write_page("i", 0, "first").unwrap();
        assert_eq!(store.page_text("i", 0).unwrap(), "first");
        assert!(matches!(
            store.write_page("i", 3, "x"),
            Err(ChartnoteError::PageOutOfRange { .. })
        ));
    }
}
