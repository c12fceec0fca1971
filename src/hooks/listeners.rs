//! Event listener sets and their composition.

use crate::engine::{EventContext, EventHandler, LifecycleEvent};
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-event enable/disable map.
///
/// Events without an entry are allowed; only an explicit `false` disables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    entries: BTreeMap<LifecycleEvent, bool>,
}

impl EventFilter {
    /// Allow every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable every event.
    pub fn none() -> Self {
        let mut filter = Self::new();
        for event in LifecycleEvent::ALL {
            filter.set(event, false);
        }
        filter
    }

    pub fn set(&mut self, event: LifecycleEvent, enabled: bool) -> &mut Self {
        self.entries.insert(event, enabled);
        self
    }

    pub fn disable(mut self, event: LifecycleEvent) -> Self {
        self.set(event, false);
        self
    }

    pub fn enable(mut self, event: LifecycleEvent) -> Self {
        self.set(event, true);
        self
    }

    /// Whether handlers should be installed for `event`.
    pub fn allows(&self, event: LifecycleEvent) -> bool {
        self.entries.get(&event).copied().unwrap_or(true)
    }
}

impl FromIterator<(LifecycleEvent, bool)> for EventFilter {
    fn from_iter<I: IntoIterator<Item = (LifecycleEvent, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Ordered handlers per lifecycle event.
#[derive(Clone, Default)]
pub struct ListenerSet {
    handlers: BTreeMap<LifecycleEvent, Vec<EventHandler>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `event`.
    pub fn on(&mut self, event: LifecycleEvent, handler: EventHandler) -> &mut Self {
        self.handlers.entry(event).or_default().push(handler);
        self
    }

    /// Append a closure for `event`.
    pub fn on_fn<F>(&mut self, event: LifecycleEvent, f: F) -> &mut Self
    where
        F: Fn(&EventContext) -> Result<()> + Send + Sync + 'static,
    {
        self.on(event, Arc::new(f))
    }

    pub fn handlers(&self, event: LifecycleEvent) -> &[EventHandler] {
        self.handlers.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn handler_count(&self, event: LifecycleEvent) -> usize {
        self.handlers(event).len()
    }

    /// Events with at least one handler.
    pub fn events(&self) -> impl Iterator<Item = LifecycleEvent> + '_ {
        self.handlers
            .iter()
            .filter(|(_, handlers)| !handlers.is_empty())
            .map(|(event, _)| *event)
    }

    /// Total number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every handler for the event, in order.
    ///
    /// A failing handler does not stop the rest; the first error is
    /// returned once all have run.
    pub fn emit(&self, ctx: &EventContext) -> Result<()> {
        let mut first_error = None;
        for handler in self.handlers(ctx.event) {
            if let Err(e) = handler(ctx) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Combine two listener sets into one.
///
/// For every event, the source's handlers run before the target's, so a
/// caller's listener is never displaced by one added later.
pub fn merge(source: Option<ListenerSet>, target: ListenerSet) -> ListenerSet {
    let Some(mut merged) = source else {
        return target;
    };

    for (event, handlers) in target.handlers {
        merged.handlers.entry(event).or_default().extend(handlers);
    }
    merged
}

/// Install `on_event` for every recognized event the filter allows.
pub fn create_listeners(on_event: EventHandler, prevent: Option<&EventFilter>) -> ListenerSet {
    let mut set = ListenerSet::new();
    for event in LifecycleEvent::ALL {
        if prevent.map_or(true, |filter| filter.allows(event)) {
            set.on(event, Arc::clone(&on_event));
        }
    }
    set
}
