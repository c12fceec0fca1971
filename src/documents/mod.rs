//! Keyed document store seam.
//!
//! Snapshot documents are written through the [`DocumentStore`] trait, so any
//! durable store offering insert, single lookup and filtered scan can back
//! a [`SnapshotStore`](crate::store::SnapshotStore). [`MemoryDocumentStore`]
//! is the in-process reference implementation.

mod memory;

pub use memory::MemoryDocumentStore;

use crate::error::BackendError;
use crate::types::{RecordId, SnapshotDocument, StoredDocument};

/// Query on snapshot documents. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub id: Option<RecordId>,
    pub instance_id: Option<String>,
    pub hash: Option<String>,
}

impl Query {
    /// Match a single document by id.
    pub fn by_id(id: RecordId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    /// Match every document of an instance.
    pub fn instance(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: Some(instance_id.into()),
            ..Default::default()
        }
    }

    /// Narrow the query to one content hash.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Check whether a stored document matches.
    pub fn matches(&self, doc: &StoredDocument) -> bool {
        if let Some(id) = self.id {
            if doc.id != id {
                return false;
            }
        }
        if let Some(ref instance_id) = self.instance_id {
            if &doc.document.instance_id != instance_id {
                return false;
            }
        }
        if let Some(ref hash) = self.hash {
            if &doc.document.hash != hash {
                return false;
            }
        }
        true
    }
}

/// Result ordering for [`DocumentStore::find_one`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Store order (insertion order for append-only stores).
    #[default]
    Natural,
    /// Newest `created_at` first.
    CreatedAtDesc,
}

/// Options for [`DocumentStore::find_one`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FindOptions {
    pub sort: SortOrder,
}

impl FindOptions {
    /// Newest document first.
    pub fn newest() -> Self {
        Self {
            sort: SortOrder::CreatedAtDesc,
        }
    }
}

/// A keyed document store holding snapshot documents.
pub trait DocumentStore: Send + Sync {
    /// Insert a document, returning its newly assigned id.
    fn insert(&self, document: SnapshotDocument) -> Result<RecordId, BackendError>;

    /// Find the first document matching `query` under `options`.
    fn find_one(
        &self,
        query: &Query,
        options: FindOptions,
    ) -> Result<Option<StoredDocument>, BackendError>;

    /// Find every document matching `query`, in store order.
    fn find(&self, query: &Query) -> Result<Vec<StoredDocument>, BackendError>;
}
