//! Persistence hooks around engine execute/resume/stop.
//!
//! [`PersistenceHooks`] decides which snapshot is taken when:
//!
//! - every allowed element event (everything but `end`) saves the engine's
//!   full state, keyed by the engine's instance id on execute and by the
//!   caller-supplied id on resume;
//! - normal completion saves a final snapshot unless `end` is disabled or
//!   the engine was stopped;
//! - stop always saves the pre-stop state first, whatever the event filter
//!   says; stopping an engine that is already stopped saves nothing.
//!
//! Once an engine is stopped no further snapshots are taken for it, so the
//! stop snapshot stays the last word for that run.

use super::listeners::{create_listeners, merge, ListenerSet};
use super::registry::{HookRegistry, LifecycleHooks};
use crate::engine::{Engine, EngineRef, EventContext, EventHandler, LifecycleEvent, LifecycleOptions};
use crate::error::{PersistenceError, Result};
use crate::store::SnapshotStore;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Where a listener gets the instance id it saves under.
#[derive(Clone, Debug)]
enum InstanceKey {
    /// Ask the engine at save time.
    Engine,
    /// Fixed id supplied by the caller.
    Fixed(String),
}

/// Hook set persisting engine snapshots into a [`SnapshotStore`].
pub struct PersistenceHooks {
    store: Arc<SnapshotStore>,
}

impl PersistenceHooks {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Register under the configured hook name.
    pub fn install(self: &Arc<Self>, registry: &HookRegistry) {
        let name = self.store.config().hook_name.clone();
        info!(hook = %name, "installing persistence hooks");
        registry.add(name, Arc::clone(self) as Arc<dyn LifecycleHooks>);
    }

    /// Remove whatever is registered under the configured hook name.
    pub fn uninstall(&self, registry: &HookRegistry) {
        let name = &self.store.config().hook_name;
        if registry.remove(name).is_some() {
            info!(hook = %name, "uninstalled persistence hooks");
        }
    }

    /// Save the engine's current state, returning whether a record was added.
    fn snapshot(
        store: &SnapshotStore,
        engine: &dyn Engine,
        key: &InstanceKey,
        actor: Option<&str>,
    ) -> Result<bool> {
        let instance_id = match key {
            InstanceKey::Fixed(id) => id.clone(),
            InstanceKey::Engine => engine.instance_id().ok_or_else(|| {
                PersistenceError::Validation("engine has no instance id".into())
            })?,
        };

        let saved = store.save(&instance_id, &engine.state(), actor)?;
        Ok(saved.is_some())
    }

    /// Handler saving state on completion, unless the engine was stopped.
    fn end_handler(&self, engine: &EngineRef, key: InstanceKey, actor: Option<String>) -> EventHandler {
        let store = Arc::clone(&self.store);
        let engine = Arc::downgrade(engine);

        Arc::new(move |ctx: &EventContext| {
            let Some(engine) = engine.upgrade() else {
                return Ok(());
            };
            if engine.is_stopped() {
                debug!(element = %ctx.element_id, "engine stopped, skipping end snapshot");
                return Ok(());
            }
            Self::snapshot(&store, engine.as_ref(), &key, actor.as_deref())
                .map(|_| ())
                .inspect_err(|e| error!(error = %e, "end snapshot failed"))
        })
    }

    /// Listener set saving state on every allowed event except `end`.
    fn event_listener(
        &self,
        engine: &EngineRef,
        key: InstanceKey,
        options: &LifecycleOptions,
    ) -> ListenerSet {
        let store = Arc::clone(&self.store);
        let weak: Weak<dyn Engine> = Arc::downgrade(engine);
        let actor = options.actor.clone();

        let on_event: EventHandler = Arc::new(move |ctx: &EventContext| {
            let Some(engine) = weak.upgrade() else {
                return Ok(());
            };
            if engine.is_stopped() {
                return Ok(());
            }
            Self::snapshot(&store, engine.as_ref(), &key, actor.as_deref())
                .map(|saved| {
                    debug!(event = %ctx.event, element = %ctx.element_id, saved, "event snapshot");
                })
                .inspect_err(|e| error!(event = %ctx.event, error = %e, "event snapshot failed"))
        });

        let filter = options
            .prevent
            .clone()
            .unwrap_or_default()
            .disable(LifecycleEvent::End);
        create_listeners(on_event, Some(&filter))
    }

    /// Whether the caller explicitly disabled the completion snapshot.
    fn end_prevented(options: &LifecycleOptions) -> bool {
        options
            .prevent
            .as_ref()
            .is_some_and(|filter| !filter.allows(LifecycleEvent::End))
    }
}

impl LifecycleHooks for PersistenceHooks {
    fn on_execute_before(&self, engine: &EngineRef, options: &mut LifecycleOptions) -> Result<()> {
        if !Self::end_prevented(options) {
            engine.on(
                LifecycleEvent::End,
                self.end_handler(engine, InstanceKey::Engine, options.actor.clone()),
            );
        }

        let persistence = self.event_listener(engine, InstanceKey::Engine, options);
        options.listener = Some(merge(options.listener.take(), persistence));
        Ok(())
    }

    fn on_resume_before(&self, engine: &EngineRef, options: &mut LifecycleOptions) -> Result<()> {
        let instance_id = resume_instance_id(options)?;
        // A stop raised while the engine is still resuming saves under this id.
        engine.set_instance_id(instance_id.clone());

        let persistence = self.event_listener(engine, InstanceKey::Fixed(instance_id), options);
        options.listener = Some(merge(options.listener.take(), persistence));
        Ok(())
    }

    fn on_resume_after(&self, engine: &EngineRef, options: &mut LifecycleOptions) -> Result<()> {
        let instance_id = resume_instance_id(options)?;
        engine.set_instance_id(instance_id.clone());

        if !Self::end_prevented(options) {
            engine.on(
                LifecycleEvent::End,
                self.end_handler(engine, InstanceKey::Fixed(instance_id), options.actor.clone()),
            );
        }
        Ok(())
    }

    fn on_stop_before(&self, engine: &EngineRef, options: &mut LifecycleOptions) -> Result<()> {
        if engine.is_stopped() {
            debug!("engine already stopped, keeping earlier stop snapshot");
            return Ok(());
        }

        let saved = Self::snapshot(
            &self.store,
            engine.as_ref(),
            &InstanceKey::Engine,
            options.actor.as_deref(),
        )?;
        debug!(saved, "pre-stop snapshot");
        Ok(())
    }
}

fn resume_instance_id(options: &LifecycleOptions) -> Result<String> {
    match options.instance_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(PersistenceError::Validation(
            "resume requires an instance id".into(),
        )),
    }
}
