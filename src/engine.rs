//! The process engine as seen by the persistence layer.
//!
//! The engine's state machine lives elsewhere; this module only names the
//! surface persistence needs: lifecycle events, event handlers, the options
//! passed to execute/resume, and the [`Engine`] trait itself.

use crate::error::{PersistenceError, Result};
use crate::hooks::{EventFilter, ListenerSet};
use crate::types::StateObject;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Named occurrences raised by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Start,
    Enter,
    End,
    Wait,
    Leave,
    Taken,
    Cancel,
    Error,
    Discarded,
}

impl LifecycleEvent {
    /// Every recognized event.
    pub const ALL: [LifecycleEvent; 9] = [
        LifecycleEvent::Start,
        LifecycleEvent::Enter,
        LifecycleEvent::End,
        LifecycleEvent::Wait,
        LifecycleEvent::Leave,
        LifecycleEvent::Taken,
        LifecycleEvent::Cancel,
        LifecycleEvent::Error,
        LifecycleEvent::Discarded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Start => "start",
            LifecycleEvent::Enter => "enter",
            LifecycleEvent::End => "end",
            LifecycleEvent::Wait => "wait",
            LifecycleEvent::Leave => "leave",
            LifecycleEvent::Taken => "taken",
            LifecycleEvent::Cancel => "cancel",
            LifecycleEvent::Error => "error",
            LifecycleEvent::Discarded => "discarded",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self> {
        LifecycleEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| PersistenceError::Validation(format!("unknown lifecycle event: {s}")))
    }
}

/// What an event handler is told about the event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub event: LifecycleEvent,
    /// Process element (or process, for engine-level events) raising it.
    pub element_id: String,
}

impl EventContext {
    pub fn new(event: LifecycleEvent, element_id: impl Into<String>) -> Self {
        Self {
            event,
            element_id: element_id.into(),
        }
    }
}

/// Callback invoked by the engine when an event fires.
pub type EventHandler = Arc<dyn Fn(&EventContext) -> Result<()> + Send + Sync>;

/// Options accepted by execute and resume.
#[derive(Clone, Default)]
pub struct LifecycleOptions {
    /// Per-event enable/disable map; `None` allows every event.
    pub prevent: Option<EventFilter>,

    /// Caller-supplied element listeners.
    pub listener: Option<ListenerSet>,

    /// Instance id to resume under.
    pub instance_id: Option<String>,

    /// Actor recorded on snapshots taken during this call.
    pub actor: Option<String>,
}

impl LifecycleOptions {
    pub fn with_prevent(mut self, prevent: EventFilter) -> Self {
        self.prevent = Some(prevent);
        self
    }

    pub fn with_listener(mut self, listener: ListenerSet) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

impl fmt::Debug for LifecycleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleOptions")
            .field("prevent", &self.prevent)
            .field("listener", &self.listener.as_ref().map(ListenerSet::len))
            .field("instance_id", &self.instance_id)
            .field("actor", &self.actor)
            .finish()
    }
}

/// A process engine instance.
///
/// `execute` and `resume` dispatch element events to `options.listener`;
/// engine-level events (completion) go to handlers registered with `on`.
pub trait Engine: Send + Sync {
    /// Instance id, if the engine has one yet.
    fn instance_id(&self) -> Option<String>;

    fn set_instance_id(&self, instance_id: String);

    /// Whether `stop` has been called.
    fn is_stopped(&self) -> bool;

    /// Full current state.
    fn state(&self) -> StateObject;

    /// Register an engine-level event handler.
    fn on(&self, event: LifecycleEvent, handler: EventHandler);

    fn execute(&self, options: &LifecycleOptions) -> Result<()>;

    fn resume(&self, state: StateObject, options: &LifecycleOptions) -> Result<()>;

    fn stop(&self) -> Result<()>;
}

/// Shared handle to an engine.
pub type EngineRef = Arc<dyn Engine>;
