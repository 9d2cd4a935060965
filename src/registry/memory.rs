use anyhow::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::Index;
use super::types::DocumentRecord;
use crate::protocol::DocumentId;

/// In-memory registry owned by the directory server.
///
/// The whole map sits behind one mutex, held for the full duration of each
/// operation and never across an await point. Readers therefore see either the
/// state before an `add` or the state after it.
pub struct IndexRegistry {
    entries: Mutex<BTreeMap<DocumentId, Vec<DocumentRecord>>>,
}

impl IndexRegistry {
    /// Creates a new, empty registry behind a shared handle.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `record`, or replaces the title of the record with the same
    /// `(id, host, port)` key while keeping its position.
    pub fn add(&self, record: DocumentRecord) -> String {
        let confirmation = record.to_string();

        let mut entries = self.entries.lock();
        let records = entries.entry(record.id).or_default();
        match records.iter_mut().find(|existing| existing.same_key(&record)) {
            Some(existing) => existing.title = record.title,
            None => records.push(record),
        }

        confirmation
    }

    /// Records for `id` in registration order. Empty if nobody advertises it.
    pub fn lookup(&self, id: DocumentId) -> Vec<DocumentRecord> {
        self.entries.lock().get(&id).cloned().unwrap_or_default()
    }

    /// Every record, by identifier ascending then registration order.
    pub fn list_all(&self) -> Vec<DocumentRecord> {
        self.entries.lock().values().flatten().cloned().collect()
    }

    /// Number of distinct `(id, host, port)` keys.
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IndexRegistry {
    fn default() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Index for IndexRegistry {
    fn add(&self, record: DocumentRecord) -> Result<String> {
        Ok(IndexRegistry::add(self, record))
    }

    fn lookup(&self, id: DocumentId) -> Result<Vec<DocumentRecord>> {
        Ok(IndexRegistry::lookup(self, id))
    }

    fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        Ok(IndexRegistry::list_all(self))
    }
}
