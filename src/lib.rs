//! # Process Snapshots
//!
//! Verifiable snapshot persistence for a stateful process-execution engine.
//!
//! ## Core Concepts
//!
//! - **Snapshots**: Append-only records of full engine state, keyed by
//!   process-instance id and deduplicated by SHA-256 content hash
//! - **Hash guard**: Every load recomputes the digest; altered state is an
//!   integrity error, never returned
//! - **Hooks**: Named hook sets run before/after engine execute, resume and
//!   stop, attaching listeners that take snapshots at the right moment
//!
//! ## Example
//!
//! ```ignore
//! use process_snapshots::{
//!     HookRegistry, LifecycleOptions, MemoryDocumentStore, PersistenceHooks, SnapshotStore,
//! };
//!
//! let store = Arc::new(SnapshotStore::new(Arc::new(MemoryDocumentStore::new())));
//! let registry = HookRegistry::new();
//! Arc::new(PersistenceHooks::new(Arc::clone(&store))).install(&registry);
//!
//! // Every element event now persists the engine state
//! registry.execute(&engine, LifecycleOptions::default())?;
//!
//! // Pick up where a stopped run left off
//! let latest = store.latest(&instance_id)?;
//! registry.resume(&fresh_engine, latest.state, LifecycleOptions::default()
//!     .with_instance_id(instance_id))?;
//! ```

pub mod config;
pub mod documents;
pub mod engine;
pub mod error;
pub mod escape;
pub mod guard;
pub mod hooks;
pub mod store;
pub mod types;

// Re-exports
pub use config::PersistenceConfig;
pub use documents::{DocumentStore, FindOptions, MemoryDocumentStore, Query, SortOrder};
pub use engine::{Engine, EngineRef, EventContext, EventHandler, LifecycleEvent, LifecycleOptions};
pub use error::{BackendError, PersistenceError, Result};
pub use guard::{HashGuard, StateInput};
pub use hooks::{
    create_listeners, merge, EventFilter, HookPoint, HookRegistry, LifecycleHooks, ListenerSet,
    PersistenceHooks,
};
pub use store::SnapshotStore;
pub use types::*;
