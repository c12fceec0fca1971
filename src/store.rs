//! Append-only, content-addressed snapshot persistence.

use crate::config::PersistenceConfig;
use crate::documents::{DocumentStore, FindOptions, Query};
use crate::error::{PersistenceError, Result};
use crate::escape;
use crate::guard::HashGuard;
use crate::types::{
    Hash, RecordId, SnapshotDocument, SnapshotRecord, StateObject, StoredDocument, Timestamp,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot persistence over a [`DocumentStore`].
///
/// Records are keyed by process-instance id and deduplicated by content
/// hash: saving a state that already exists for the instance writes
/// nothing. Records are never updated or deleted here.
pub struct SnapshotStore {
    /// Backing document store.
    documents: Arc<dyn DocumentStore>,

    config: PersistenceConfig,

    /// Last timestamp handed out; keeps `created_at` strictly increasing.
    clock: Mutex<Timestamp>,
}

impl SnapshotStore {
    /// Create a snapshot store with default configuration.
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(documents, PersistenceConfig::default())
    }

    /// Create a snapshot store with custom configuration.
    pub fn with_config(documents: Arc<dyn DocumentStore>, config: PersistenceConfig) -> Self {
        Self {
            documents,
            config,
            clock: Mutex::new(Timestamp::default()),
        }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Logical name of the snapshot collection.
    pub fn collection_name(&self) -> &str {
        &self.config.collection_name
    }

    // --- Writes ---

    /// Persist a snapshot of `state` for `instance_id`.
    ///
    /// Returns the new record id, or `None` when a record with the same
    /// instance and content hash already exists. `user_id` defaults to the
    /// configured actor. Validation happens before anything is written;
    /// store failures are returned as-is.
    pub fn save(
        &self,
        instance_id: &str,
        state: &StateObject,
        user_id: Option<&str>,
    ) -> Result<Option<RecordId>> {
        validate_instance_id(instance_id)?;
        state.validate()?;
        let created_by = match user_id {
            Some("") => {
                return Err(PersistenceError::Validation(
                    "user id must not be empty".into(),
                ))
            }
            Some(user) => user.to_string(),
            None => self.config.default_actor.clone(),
        };

        let serialized = state.canonical()?;
        let hash = HashGuard::digest(&serialized).to_hex();

        let existing = self.documents.find_one(
            &Query::instance(instance_id).with_hash(hash.as_str()),
            FindOptions::default(),
        )?;
        if existing.is_some() {
            debug!(instance_id, %hash, "snapshot unchanged, skipping save");
            return Ok(None);
        }

        let document = SnapshotDocument {
            instance_id: instance_id.to_string(),
            state: escape::encode(&serialized).into_owned(),
            hash,
            created_at: self.tick(),
            created_by,
        };

        let id = self.documents.insert(document)?;
        debug!(instance_id, record_id = %id, "snapshot saved");

        Ok(Some(id))
    }

    // --- Reads ---

    /// Whether any snapshot exists for `instance_id`.
    pub fn has(&self, instance_id: &str) -> Result<bool> {
        validate_instance_id(instance_id)?;
        Ok(self
            .documents
            .find_one(&Query::instance(instance_id), FindOptions::default())?
            .is_some())
    }

    /// Load and verify a record by id.
    pub fn load(&self, record_id: RecordId) -> Result<SnapshotRecord> {
        let stored = self
            .documents
            .find_one(&Query::by_id(record_id), FindOptions::default())?
            .ok_or(PersistenceError::RecordNotFound(record_id))?;

        decode(stored)
    }

    /// Load and verify the newest record of an instance.
    pub fn latest(&self, instance_id: &str) -> Result<SnapshotRecord> {
        validate_instance_id(instance_id)?;
        let stored = self
            .documents
            .find_one(&Query::instance(instance_id), FindOptions::newest())?
            .ok_or_else(|| PersistenceError::InstanceNotFound(instance_id.to_string()))?;

        decode(stored)
    }

    /// Every record of an instance, oldest first, each verified.
    pub fn history(&self, instance_id: &str) -> Result<Vec<SnapshotRecord>> {
        validate_instance_id(instance_id)?;
        let mut stored = self.documents.find(&Query::instance(instance_id))?;
        stored.sort_by_key(|doc| (doc.document.created_at, doc.id));

        stored.into_iter().map(decode).collect()
    }

    /// Next timestamp, strictly after the previous one.
    fn tick(&self) -> Timestamp {
        let mut last = self.clock.lock();
        let now = Timestamp::now().max(last.next());
        *last = now;
        now
    }
}

fn validate_instance_id(instance_id: &str) -> Result<()> {
    if instance_id.is_empty() {
        return Err(PersistenceError::Validation(
            "instance id must not be empty".into(),
        ));
    }
    Ok(())
}

/// Reverse the store escaping, verify the digest and parse the state.
fn decode(stored: StoredDocument) -> Result<SnapshotRecord> {
    let StoredDocument { id, document } = stored;

    let expected = Hash::from_hex(&document.hash).map_err(|e| {
        PersistenceError::Corruption(format!("record {id} has a malformed hash: {e}"))
    })?;
    let serialized = escape::decode(&document.state)?;

    let got = HashGuard::digest(&serialized);
    if got != expected {
        warn!(record_id = %id, instance_id = %document.instance_id, "snapshot hash mismatch");
        return Err(PersistenceError::Integrity {
            record: id,
            expected,
            got,
        });
    }

    let state = StateObject::from_json(&serialized)?;

    Ok(SnapshotRecord {
        record_id: id,
        instance_id: document.instance_id,
        state,
        hash: expected,
        created_at: document.created_at,
        created_by: document.created_by,
    })
}
