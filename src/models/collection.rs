use crate::models::{Item, ItemId, ItemStatus};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Registry entry: the item plus the collection it currently belongs to
#[derive(Debug, Clone)]
struct Entry {
    item: Item,
    status: ItemStatus,
}

/// Item registry with ordered per-status index sets.
///
/// Every registered id is a member of exactly one index set, the one named by
/// its entry's status. Index sets keep insertion order; a relocated id goes to
/// the end of its destination.
#[derive(Debug, Default)]
pub struct CollectionStore {
    /// id -> entry
    entries: HashMap<ItemId, Entry>,
    search_results: IndexSet<ItemId>,
    basket: IndexSet<ItemId>,
    invoice: IndexSet<ItemId>,
    last_id: u64,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item and append it to the collection named by `status`
    pub fn insert(&mut self, item: Item, status: ItemStatus) -> ItemId {
        self.last_id += 1;
        let id = ItemId(self.last_id);

        self.entries.insert(id, Entry { item, status });
        self.set_mut(status).insert(id);
        id
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.entries.get(&id).map(|e| &e.item)
    }

    pub fn status(&self, id: ItemId) -> Option<ItemStatus> {
        self.entries.get(&id).map(|e| e.status)
    }

    /// Move an entry to the end of `to`. Returns the previous status, or
    /// `None` if the id is not registered.
    pub fn relocate(&mut self, id: ItemId, to: ItemStatus) -> Option<ItemStatus> {
        let from = self.entries.get(&id)?.status;

        self.set_mut(from).shift_remove(&id);
        self.set_mut(to).insert(id);
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.status = to;
        }
        Some(from)
    }

    /// Drop an entry from the registry and from its collection
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let entry = self.entries.remove(&id)?;
        self.set_mut(entry.status).shift_remove(&id);
        Some(entry.item)
    }

    /// Drop every search-result entry. Basket and invoice are untouched.
    pub fn clear_search_results(&mut self) {
        for id in self.search_results.drain(..) {
            self.entries.remove(&id);
        }
    }

    pub fn ids(&self, status: ItemStatus) -> &IndexSet<ItemId> {
        match status {
            ItemStatus::InSearchResults => &self.search_results,
            ItemStatus::InBasket => &self.basket,
            ItemStatus::InInvoice => &self.invoice,
        }
    }

    /// Ordered `(id, item)` view of one collection
    pub fn items(&self, status: ItemStatus) -> Vec<(ItemId, &Item)> {
        self.ids(status)
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| (*id, &e.item)))
            .collect()
    }

    pub fn len(&self, status: ItemStatus) -> usize {
        self.ids(status).len()
    }

    /// Number of registered entries across all collections
    pub fn total_len(&self) -> usize {
        self.entries.len()
    }

    fn set_mut(&mut self, status: ItemStatus) -> &mut IndexSet<ItemId> {
        match status {
            ItemStatus::InSearchResults => &mut self.search_results,
            ItemStatus::InBasket => &mut self.basket,
            ItemStatus::InInvoice => &mut self.invoice,
        }
    }
}
