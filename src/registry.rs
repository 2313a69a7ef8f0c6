use std::collections::HashMap;

use log::trace;

use crate::record::{Handle, HandleKind, HandleRecord};
use crate::snapshot::{HandleTableEntry, RuntimeView};

/// Which attribution list a discovered reference lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefSlot {
    Global,
    Local,
    Hashtable,
}

/// Central audit store: one [`HandleRecord`] per enumerated handle,
/// iterated in enumeration order, plus the index mapping a hashtable's
/// internal id back to the handle that owns it.
#[derive(Debug, Default)]
pub struct Registry {
    records: HashMap<Handle, HandleRecord>,
    order: Vec<Handle>,
    ht_owners: HashMap<u32, Handle>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one handle-table row. Null rows are skipped and on a
    /// duplicate id the first row wins. A row owned by a hashtable
    /// object also registers that table's internal id, so hashtable
    /// entries can later be attributed back to the owning handle.
    pub fn add_handle<V: RuntimeView>(&mut self, entry: &HandleTableEntry, view: &V) {
        if entry.handle.is_null() || self.records.contains_key(&entry.handle) {
            return;
        }

        if let Some(object) = entry.object {
            if view.object_tag(object).map(HandleKind::from_tag) == Some(HandleKind::Hashtable) {
                if let Some(id) = view.hashtable_id(object) {
                    self.ht_owners.insert(id, entry.handle);
                }
            }
        }

        self.records.insert(
            entry.handle,
            HandleRecord::new(entry.handle, entry.object, entry.recorded),
        );
        self.order.push(entry.handle);
    }

    /// Append an attribution to `handle`'s record. A reference to a
    /// handle outside the audited set is dropped silently; null and
    /// sentinel values land here too.
    pub fn add_reference(&mut self, slot: RefSlot, handle: Handle, name: String) {
        let Some(record) = self.records.get_mut(&handle) else {
            trace!("no record for {handle}, dropping reference {name:?}");
            return;
        };
        match slot {
            RefSlot::Global => record.global_refs.push(name),
            RefSlot::Local => record.local_refs.push(name),
            RefSlot::Hashtable => record.hashtable_refs.push(name),
        }
    }

    /// Handle owning the hashtable with internal id `table_id`.
    pub fn hashtable_owner(&self, table_id: u32) -> Option<Handle> {
        self.ht_owners.get(&table_id).copied()
    }

    pub fn get(&self, handle: Handle) -> Option<&HandleRecord> {
        self.records.get(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.records.contains_key(&handle)
    }

    /// Records in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &HandleRecord> {
        self.order.iter().filter_map(|h| self.records.get(h))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
