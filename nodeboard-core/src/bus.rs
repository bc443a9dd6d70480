//! Namespaced publish/subscribe event bus with cancellable events.
//!
//! Event names have the form `name` or `name.namespace`. Only the base name
//! selects listeners on dispatch; the namespace scopes removal.
//!
//! ```text
//! bus.on("node:add.toolbar", f)   // listens to node:add, tagged "toolbar"
//! bus.trigger("node:add", data)   // calls f
//! bus.off("node:add.toolbar")     // removes only "toolbar" listeners
//! ```
//!
//! [`EventBus`] is a cheap handle: clones share the same listeners, so a
//! listener may hold a clone and register, remove or trigger while a
//! dispatch is running. Each dispatch works on a snapshot of the listener
//! list taken before the first listener runs.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ListenerResult;

/// Identifier of a registered listener, unique per bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

impl ListenerId {
    /// The numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A listener callback with identity.
///
/// Clones are the same callback for [`EventBus::off_callback`].
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event) -> ListenerResult>);

impl Callback {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) -> ListenerResult + 'static,
    {
        Self(Rc::new(f))
    }

    /// Whether both handles wrap the same closure.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    fn call(&self, event: &Event) -> ListenerResult {
        (self.0)(event)
    }
}

impl<F> From<F> for Callback
where
    F: Fn(&Event) -> ListenerResult + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// Registration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenOptions {
    /// Remove the listener after its first invocation.
    pub once: bool,
}

/// Public description of a registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerInfo {
    /// Listener id.
    pub id: ListenerId,
    /// Namespace tag, if any.
    pub namespace: Option<String>,
    /// Whether the listener fires only once.
    pub once: bool,
}

#[derive(Debug, Clone)]
struct Listener {
    id: ListenerId,
    callback: Callback,
    namespace: Option<String>,
    once: bool,
}

/// The record handed to listeners.
///
/// Fields are the trigger data, then the bus context, then `name`; later
/// sources win on key clashes.
#[derive(Debug)]
pub struct Event {
    name: String,
    fields: Map<String, Value>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

impl Event {
    /// The full name the event was triggered with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// One field, deserialized.
    #[must_use]
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// All fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Signal that propagation should stop. On a "before" event this
    /// cancels the pending operation.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    /// Record that the default action was prevented.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Whether [`Event::stop_propagation`] was called.
    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    /// Whether [`Event::prevent_default`] was called.
    #[must_use]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

#[derive(Debug, Default)]
struct BusState {
    events: HashMap<String, Vec<Listener>>,
    context: Map<String, Value>,
    next_id: u64,
}

impl BusState {
    fn remove_matching(&mut self, base: &str, callback: Option<&Callback>, namespace: Option<&str>) {
        if callback.is_none() && namespace.is_none() {
            self.events.remove(base);
            return;
        }
        let Some(listeners) = self.events.get_mut(base) else {
            return;
        };
        listeners.retain(|listener| {
            if callback.is_some_and(|cb| !listener.callback.same(cb)) {
                return true;
            }
            if namespace.is_some_and(|ns| listener.namespace.as_deref() != Some(ns)) {
                return true;
            }
            false
        });
        if listeners.is_empty() {
            self.events.remove(base);
        }
    }
}

/// Split `name.namespace` into its base name and namespace tag.
///
/// Only the token right after the first `.` is the tag.
#[must_use]
pub fn parse_event_name(event_name: &str) -> (&str, Option<&str>) {
    let mut parts = event_name.split('.');
    let base = parts.next().unwrap_or_default();
    let namespace = parts.next().filter(|ns| !ns.is_empty());
    (base, namespace)
}

/// Publish/subscribe hub.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    state: Rc<RefCell<BusState>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the fields merged into every future event.
    pub fn set_context(&self, context: Map<String, Value>) {
        self.state.borrow_mut().context = context;
    }

    /// The current context fields.
    #[must_use]
    pub fn context(&self) -> Map<String, Value> {
        self.state.borrow().context.clone()
    }

    /// Register a listener.
    pub fn on(
        &self,
        event_name: &str,
        callback: impl Into<Callback>,
        options: ListenOptions,
    ) -> ListenerId {
        let (base, namespace) = parse_event_name(event_name);
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = ListenerId(state.next_id);
        state
            .events
            .entry(base.to_string())
            .or_default()
            .push(Listener {
                id,
                callback: callback.into(),
                namespace: namespace.map(str::to_string),
                once: options.once,
            });
        tracing::trace!(event = base, %id, "listener registered");
        id
    }

    /// Register a listener that fires once.
    pub fn once(&self, event_name: &str, callback: impl Into<Callback>) -> ListenerId {
        self.on(event_name, callback, ListenOptions { once: true })
    }

    /// Remove listeners by name.
    ///
    /// A bare name removes every listener of that name; `name.ns` removes
    /// only listeners tagged `ns`. An empty name clears the whole bus.
    pub fn off(&self, event_name: &str) {
        if event_name.is_empty() {
            self.clear();
            return;
        }
        let (base, namespace) = parse_event_name(event_name);
        self.state
            .borrow_mut()
            .remove_matching(base, None, namespace);
    }

    /// Remove listeners of `event_name` registered with `callback`,
    /// further restricted to the namespace when one is given.
    pub fn off_callback(&self, event_name: &str, callback: &Callback) {
        let (base, namespace) = parse_event_name(event_name);
        self.state
            .borrow_mut()
            .remove_matching(base, Some(callback), namespace);
    }

    /// Remove exactly the listener with `id`. Returns whether one was found.
    pub fn off_id(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some((base, index)) = state.events.iter().find_map(|(name, listeners)| {
            listeners
                .iter()
                .position(|listener| listener.id == id)
                .map(|index| (name.clone(), index))
        }) else {
            return false;
        };
        if let Some(listeners) = state.events.get_mut(&base) {
            listeners.remove(index);
            if listeners.is_empty() {
                state.events.remove(&base);
            }
        }
        true
    }

    /// Remove every listener of every event.
    pub fn clear(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Dispatch an event to every listener of its base name.
    ///
    /// `data` contributes its fields when it is a mapping. Listener errors
    /// are logged and dispatch continues. Returns whether any listener
    /// stopped propagation.
    pub fn trigger(&self, event_name: &str, data: Value) -> bool {
        let (base, namespace) = parse_event_name(event_name);
        let (snapshot, context) = {
            let state = self.state.borrow();
            (
                state.events.get(base).cloned().unwrap_or_default(),
                state.context.clone(),
            )
        };

        let mut fields = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        fields.extend(context);
        fields.insert("name".to_string(), Value::String(event_name.to_string()));
        let event = Event {
            name: event_name.to_string(),
            fields,
            propagation_stopped: Cell::new(false),
            default_prevented: Cell::new(false),
        };

        for listener in &snapshot {
            if let Err(e) = listener.callback.call(&event) {
                tracing::error!(listener = %listener.id, "Error in event listener for '{event_name}': {e}");
            }
            if listener.once {
                self.state
                    .borrow_mut()
                    .remove_matching(base, Some(&listener.callback), namespace);
            }
        }

        event.is_propagation_stopped()
    }

    /// Whether any listener is registered for the base name of `event_name`.
    #[must_use]
    pub fn has_listeners(&self, event_name: &str) -> bool {
        let (base, _) = parse_event_name(event_name);
        self.state
            .borrow()
            .events
            .get(base)
            .is_some_and(|listeners| !listeners.is_empty())
    }

    /// Every registered listener, by base name.
    #[must_use]
    pub fn get_all_listeners(&self) -> HashMap<String, Vec<ListenerInfo>> {
        self.state
            .borrow()
            .events
            .iter()
            .map(|(name, listeners)| {
                let infos = listeners
                    .iter()
                    .map(|listener| ListenerInfo {
                        id: listener.id,
                        namespace: listener.namespace.clone(),
                        once: listener.once,
                    })
                    .collect();
                (name.clone(), infos)
            })
            .collect()
    }
}
