//! Lifecycle hooks and listener composition.
//!
//! - [`HookRegistry`] holds named hook sets and drives them around engine
//!   execute/resume/stop.
//! - [`ListenerSet`] keeps ordered handlers per event; [`merge`] and
//!   [`create_listeners`] compose them.
//! - [`PersistenceHooks`] is the hook set that snapshots engine state.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(SnapshotStore::new(Arc::new(MemoryDocumentStore::new())));
//! let registry = HookRegistry::new();
//! Arc::new(PersistenceHooks::new(store)).install(&registry);
//!
//! registry.execute(&engine, LifecycleOptions::default())?;
//! ```

mod interceptor;
mod listeners;
mod registry;

pub use interceptor::PersistenceHooks;
pub use listeners::{create_listeners, merge, EventFilter, ListenerSet};
pub use registry::{HookPoint, HookRegistry, LifecycleHooks};
