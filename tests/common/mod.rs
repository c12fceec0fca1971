//! Simulated process engine for lifecycle tests.
//!
//! Runs a linear process of elements joined by sequence flows. Every raised
//! event advances a step counter recorded in the state, so no two events
//! produce the same snapshot. A user task waits until `signal` is called.

#![allow(dead_code)]

use parking_lot::Mutex;
use process_snapshots::{
    Engine, EngineRef, EventContext, EventHandler, HookRegistry, LifecycleEvent,
    LifecycleOptions, ListenerSet, MemoryDocumentStore, PersistenceError, PersistenceHooks,
    Result, SnapshotStore, StateObject,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const ENGINE_VERSION: &str = "sim-1.0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Plain,
    UserTask,
}

/// start -> task -> end, nothing waits.
pub fn simple_process() -> Vec<(String, ElementKind)> {
    vec![
        ("theStart".to_string(), ElementKind::Plain),
        ("simpleTask".to_string(), ElementKind::Plain),
        ("theEnd".to_string(), ElementKind::Plain),
    ]
}

/// start -> user task -> end; waits at the user task.
pub fn user_task_process() -> Vec<(String, ElementKind)> {
    vec![
        ("theStart".to_string(), ElementKind::Plain),
        ("userTask".to_string(), ElementKind::UserTask),
        ("theEnd".to_string(), ElementKind::Plain),
    ]
}

#[derive(Clone, Debug, Default)]
struct Progress {
    instance_id: Option<String>,
    status: String,
    position: usize,
    step: u64,
    waiting: Option<String>,
    last_event: Option<(String, String)>,
    stopped: bool,
}

pub struct SimEngine {
    process_id: String,
    elements: Vec<(String, ElementKind)>,
    progress: Mutex<Progress>,
    listener: Mutex<Option<ListenerSet>>,
    engine_handlers: Mutex<Vec<(LifecycleEvent, EventHandler)>>,
}

impl SimEngine {
    pub fn new(elements: Vec<(String, ElementKind)>, instance_id: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            process_id: "theProcess".to_string(),
            elements,
            progress: Mutex::new(Progress {
                instance_id: instance_id.map(str::to_string),
                status: "idle".to_string(),
                ..Default::default()
            }),
            listener: Mutex::new(None),
            engine_handlers: Mutex::new(Vec::new()),
        })
    }

    pub fn status(&self) -> String {
        self.progress.lock().status.clone()
    }

    pub fn is_waiting(&self) -> bool {
        self.progress.lock().waiting.is_some()
    }

    /// Complete the waiting user task and run on.
    pub fn signal(&self) -> Result<()> {
        let element = {
            let progress = self.progress.lock();
            if progress.stopped {
                return Ok(());
            }
            match progress.waiting.clone() {
                Some(element) => element,
                None => return Err(PersistenceError::Engine("nothing is waiting".into())),
            }
        };

        self.progress.lock().waiting = None;
        if !self.raise(LifecycleEvent::End, &element)?
            || !self.raise(LifecycleEvent::Leave, &element)?
        {
            return Ok(());
        }
        self.progress.lock().position += 1;
        self.run()
    }

    /// Record the event in the state, then dispatch it to the listener.
    /// Returns false once the engine has been stopped.
    fn raise(&self, event: LifecycleEvent, element: &str) -> Result<bool> {
        {
            let mut progress = self.progress.lock();
            if progress.stopped {
                return Ok(false);
            }
            progress.step += 1;
            progress.last_event = Some((event.to_string(), element.to_string()));
        }
        self.dispatch(event, element)?;
        Ok(!self.is_stopped())
    }

    fn dispatch(&self, event: LifecycleEvent, element: &str) -> Result<()> {
        let listener = self.listener.lock().clone();
        match listener {
            Some(listener) => listener.emit(&EventContext::new(event, element)),
            None => Ok(()),
        }
    }

    fn emit_engine(&self, event: LifecycleEvent) -> Result<()> {
        let handlers: Vec<EventHandler> = self
            .engine_handlers
            .lock()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, h)| Arc::clone(h))
            .collect();

        let ctx = EventContext::new(event, self.process_id.as_str());
        for handler in handlers {
            handler(&ctx)?;
        }
        Ok(())
    }

    fn run(&self) -> Result<()> {
        loop {
            let position = self.progress.lock().position;
            let Some((element, kind)) = self.elements.get(position).cloned() else {
                return self.complete();
            };

            if position > 0 && !self.raise(LifecycleEvent::Taken, &format!("flow{position}"))? {
                return Ok(());
            }
            if !self.raise(LifecycleEvent::Enter, &element)?
                || !self.raise(LifecycleEvent::Start, &element)?
            {
                return Ok(());
            }

            if kind == ElementKind::UserTask {
                self.progress.lock().waiting = Some(element.clone());
                self.raise(LifecycleEvent::Wait, &element)?;
                return Ok(());
            }

            if !self.raise(LifecycleEvent::End, &element)?
                || !self.raise(LifecycleEvent::Leave, &element)?
            {
                return Ok(());
            }
            self.progress.lock().position += 1;
        }
    }

    fn complete(&self) -> Result<()> {
        {
            let mut progress = self.progress.lock();
            progress.status = "completed".to_string();
            progress.step += 1;
        }
        self.emit_engine(LifecycleEvent::End)
    }
}

impl Engine for SimEngine {
    fn instance_id(&self) -> Option<String> {
        self.progress.lock().instance_id.clone()
    }

    fn set_instance_id(&self, instance_id: String) {
        self.progress.lock().instance_id = Some(instance_id);
    }

    fn is_stopped(&self) -> bool {
        self.progress.lock().stopped
    }

    fn state(&self) -> StateObject {
        let progress = self.progress.lock();
        let last_event = progress
            .last_event
            .as_ref()
            .map(|(event, element)| json!({"event": event, "element": element}))
            .unwrap_or(Value::Null);

        StateObject::new(json!({
            "name": self.process_id,
            "state": progress.status,
            "engineVersion": ENGINE_VERSION,
            "definitions": [{
                "id": "definitions",
                "state": progress.status,
                "processes": [{
                    "id": self.process_id,
                    "position": progress.position,
                    "step": progress.step,
                    "waiting": progress.waiting,
                    "lastEvent": last_event
                }]
            }]
        }))
    }

    fn on(&self, event: LifecycleEvent, handler: EventHandler) {
        self.engine_handlers.lock().push((event, handler));
    }

    fn execute(&self, options: &LifecycleOptions) -> Result<()> {
        *self.listener.lock() = options.listener.clone();
        self.progress.lock().status = "running".to_string();
        self.run()
    }

    fn resume(&self, state: StateObject, options: &LifecycleOptions) -> Result<()> {
        let process = &state.as_value()["definitions"][0]["processes"][0];
        {
            let mut progress = self.progress.lock();
            progress.status = state.field_str("state").unwrap_or("running").to_string();
            progress.position = process["position"].as_u64().unwrap_or(0) as usize;
            progress.step = process["step"].as_u64().unwrap_or(0);
            progress.waiting = process["waiting"].as_str().map(str::to_string);
            progress.last_event = process["lastEvent"]["event"].as_str().map(|event| {
                (
                    event.to_string(),
                    process["lastEvent"]["element"].as_str().unwrap_or("").to_string(),
                )
            });
            progress.stopped = false;
        }
        *self.listener.lock() = options.listener.clone();

        // A restored wait is announced again without advancing the state.
        let waiting = self.progress.lock().waiting.clone();
        match waiting {
            Some(element) => self.dispatch(LifecycleEvent::Wait, &element),
            None => self.run(),
        }
    }

    fn stop(&self) -> Result<()> {
        {
            let mut progress = self.progress.lock();
            progress.stopped = true;
            progress.status = "stopped".to_string();
        }
        self.emit_engine(LifecycleEvent::End)
    }
}

/// Snapshot store, registry and installed persistence hooks.
pub struct Harness {
    pub documents: Arc<MemoryDocumentStore>,
    pub store: Arc<SnapshotStore>,
    pub registry: Arc<HookRegistry>,
    pub hooks: Arc<PersistenceHooks>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();

        let documents = Arc::new(MemoryDocumentStore::new());
        let store = Arc::new(SnapshotStore::new(documents.clone()));
        let registry = Arc::new(HookRegistry::new());
        let hooks = Arc::new(PersistenceHooks::new(Arc::clone(&store)));
        hooks.install(&registry);

        Self {
            documents,
            store,
            registry,
            hooks,
        }
    }

    pub fn record_count(&self, instance_id: &str) -> usize {
        self.store.history(instance_id).unwrap().len()
    }
}

/// Route library logs through the test writer; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Upcast a simulated engine to the trait handle.
pub fn engine_ref(engine: &Arc<SimEngine>) -> EngineRef {
    engine.clone()
}

/// A state that passes validation.
pub fn default_state() -> StateObject {
    StateObject::new(json!({
        "name": "undefined",
        "state": "running",
        "engineVersion": "4.2.0",
        "definitions": [{
            "id": "anonymous",
            "state": "running",
            "moddleContext": [{}],
            "processes": [{}]
        }]
    }))
}

/// `default_state` with a different `state` field.
pub fn pending_state() -> StateObject {
    let mut state = default_state();
    state.as_value_mut()["state"] = json!("pending");
    state
}
