//! In-memory append-only document store.

use super::{DocumentStore, FindOptions, Query, SortOrder};
use crate::error::BackendError;
use crate::types::{RecordId, SnapshotDocument, StoredDocument};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Append-only store kept in process memory.
///
/// Documents are never updated or removed. An instance index maps each
/// instance id to the positions of its documents in the log.
pub struct MemoryDocumentStore {
    /// Documents in insertion order.
    log: RwLock<Vec<StoredDocument>>,

    /// Instance id to log positions.
    by_instance: RwLock<HashMap<String, Vec<usize>>>,

    /// Next id to assign.
    next_id: AtomicU64,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            log: RwLock::new(Vec::new()),
            by_instance: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }

    fn candidates(&self, query: &Query) -> Vec<StoredDocument> {
        let log = self.log.read();

        if let Some(ref instance_id) = query.instance_id {
            let index = self.by_instance.read();
            return index
                .get(instance_id)
                .map(|positions| {
                    positions
                        .iter()
                        .map(|&pos| &log[pos])
                        .filter(|doc| query.matches(doc))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
        }

        log.iter().filter(|doc| query.matches(doc)).cloned().collect()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, document: SnapshotDocument) -> Result<RecordId, BackendError> {
        let mut log = self.log.write();
        let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let position = log.len();
        self.by_instance
            .write()
            .entry(document.instance_id.clone())
            .or_default()
            .push(position);
        log.push(StoredDocument { id, document });

        Ok(id)
    }

    fn find_one(
        &self,
        query: &Query,
        options: FindOptions,
    ) -> Result<Option<StoredDocument>, BackendError> {
        let matches = self.candidates(query);

        let found = match options.sort {
            SortOrder::Natural => matches.into_iter().next(),
            SortOrder::CreatedAtDesc => matches
                .into_iter()
                .max_by_key(|doc| (doc.document.created_at, doc.id)),
        };

        Ok(found)
    }

    fn find(&self, query: &Query) -> Result<Vec<StoredDocument>, BackendError> {
        Ok(self.candidates(query))
    }
}
