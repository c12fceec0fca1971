//! Named registry of lifecycle hook sets.

use crate::engine::{EngineRef, LifecycleOptions};
use crate::error::Result;
use crate::types::StateObject;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The four interception points around engine operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPoint {
    ExecuteBefore,
    ResumeBefore,
    ResumeAfter,
    StopBefore,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookPoint::ExecuteBefore => "execute_before",
            HookPoint::ResumeBefore => "resume_before",
            HookPoint::ResumeAfter => "resume_after",
            HookPoint::StopBefore => "stop_before",
        })
    }
}

/// A bundle of callbacks run around engine operations.
///
/// Before-hooks may rewrite the options the engine will receive. Every
/// slot defaults to doing nothing.
pub trait LifecycleHooks: Send + Sync {
    fn on_execute_before(&self, _engine: &EngineRef, _options: &mut LifecycleOptions) -> Result<()> {
        Ok(())
    }

    fn on_resume_before(&self, _engine: &EngineRef, _options: &mut LifecycleOptions) -> Result<()> {
        Ok(())
    }

    fn on_resume_after(&self, _engine: &EngineRef, _options: &mut LifecycleOptions) -> Result<()> {
        Ok(())
    }

    fn on_stop_before(&self, _engine: &EngineRef, _options: &mut LifecycleOptions) -> Result<()> {
        Ok(())
    }
}

/// Registry of hook sets by name.
///
/// Passed explicitly to the engine integration point. Adding under an
/// existing name replaces that entry in place; dispatch follows
/// registration order.
#[derive(Default)]
pub struct HookRegistry {
    entries: RwLock<Vec<(String, Arc<dyn LifecycleHooks>)>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hooks` under `name`, returning any set it replaced.
    pub fn add(
        &self,
        name: impl Into<String>,
        hooks: Arc<dyn LifecycleHooks>,
    ) -> Option<Arc<dyn LifecycleHooks>> {
        let name = name.into();
        let mut entries = self.entries.write();

        if let Some(entry) = entries.iter_mut().find(|(n, _)| *n == name) {
            debug!(name = %name, "replacing hook set");
            return Some(std::mem::replace(&mut entry.1, hooks));
        }

        debug!(name = %name, "registering hook set");
        entries.push((name, hooks));
        None
    }

    /// Unregister the set under `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn LifecycleHooks>> {
        let mut entries = self.entries.write();
        let pos = entries.iter().position(|(n, _)| n == name)?;
        debug!(name, "removing hook set");
        Some(entries.remove(pos).1)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LifecycleHooks>> {
        self.entries
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, hooks)| Arc::clone(hooks))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|(n, _)| n == name)
    }

    /// Registered names in dispatch order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Run one hook slot on every registered set.
    ///
    /// Works on a copy of the entries, so hooks may re-enter the registry.
    /// The first failing hook aborts the dispatch.
    pub fn dispatch(
        &self,
        point: HookPoint,
        engine: &EngineRef,
        options: &mut LifecycleOptions,
    ) -> Result<()> {
        let entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(name, hooks)| (name.clone(), Arc::clone(hooks)))
            .collect();

        for (name, hooks) in entries {
            debug!(hook = %name, %point, "dispatching lifecycle hook");
            match point {
                HookPoint::ExecuteBefore => hooks.on_execute_before(engine, options)?,
                HookPoint::ResumeBefore => hooks.on_resume_before(engine, options)?,
                HookPoint::ResumeAfter => hooks.on_resume_after(engine, options)?,
                HookPoint::StopBefore => hooks.on_stop_before(engine, options)?,
            }
        }
        Ok(())
    }

    // --- Engine integration ---

    /// Execute the engine with hooks applied.
    pub fn execute(&self, engine: &EngineRef, mut options: LifecycleOptions) -> Result<()> {
        self.dispatch(HookPoint::ExecuteBefore, engine, &mut options)?;
        engine.execute(&options)
    }

    /// Resume the engine from `state` with hooks applied.
    pub fn resume(
        &self,
        engine: &EngineRef,
        state: StateObject,
        mut options: LifecycleOptions,
    ) -> Result<()> {
        self.dispatch(HookPoint::ResumeBefore, engine, &mut options)?;
        engine.resume(state, &options)?;
        self.dispatch(HookPoint::ResumeAfter, engine, &mut options)
    }

    /// Stop the engine with hooks applied.
    ///
    /// `options.actor` is recorded on any snapshot the stop hooks take.
    pub fn stop(&self, engine: &EngineRef, mut options: LifecycleOptions) -> Result<()> {
        self.dispatch(HookPoint::StopBefore, engine, &mut options)?;
        engine.stop()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("names", &self.names())
            .finish()
    }
}
