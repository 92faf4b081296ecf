use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, trace};

use crate::error::{ObserveError, PropertyError};
use crate::listener::{Listener, ListenerId};
use crate::value::Value;

/// Identity of a [`State`]. Clones of a state share the same id.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StateId(usize);

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// A property's backing storage. A slot with no listeners is a plain value.
struct Slot {
    value: Value,
    readonly: bool,
    /// Registrations in the order they were made
    listeners: Vec<Arc<Listener>>,
}

impl Slot {
    fn new(value: Value, readonly: bool) -> Self { Self { value, readonly, listeners: Vec::new() } }
}

struct Inner {
    id: StateId,
    slots: RwLock<HashMap<String, Slot>>,
}

/// A mutable state object whose named properties may be observed.
///
/// Cloning a `State` creates a new handle to the **same** object: both handles see the same
/// values and the same registrations.
///
/// Writes go through [`State::set`], which is where observation happens. Reads are never
/// affected by observation.
#[derive(Clone)]
pub struct State(Arc<Inner>);

/// A non-owning reference to a [`State`], held by disposers
#[derive(Clone)]
pub(crate) struct WeakState(Weak<Inner>);

impl WeakState {
    pub(crate) fn upgrade(&self) -> Option<State> { self.0.upgrade().map(State) }
}

impl Default for State {
    fn default() -> Self { Self::new() }
}

impl State {
    /// Create an empty state object
    pub fn new() -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        let id = StateId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        Self(Arc::new(Inner { id, slots: RwLock::new(HashMap::new()) }))
    }

    /// Builder-style definition of a writable property. Replaces any previous definition of `key`.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.slots.write().expect("slots lock is poisoned").insert(key.into(), Slot::new(value.into(), false));
        self
    }

    /// Builder-style definition of a read-only property
    pub fn with_readonly(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.slots.write().expect("slots lock is poisoned").insert(key.into(), Slot::new(value.into(), true));
        self
    }

    /// Add a writable property after construction
    pub fn define(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<(), PropertyError> {
        let key = key.into();
        let mut slots = self.0.slots.write().expect("slots lock is poisoned");
        if slots.contains_key(&key) {
            return Err(PropertyError::AlreadyDefined(key));
        }
        slots.insert(key, Slot::new(value.into(), false));
        Ok(())
    }

    pub fn id(&self) -> StateId { self.0.id }

    /// Returns a clone of the current value of `key`
    pub fn get(&self, key: &str) -> Option<Value> { self.0.slots.read().expect("slots lock is poisoned").get(key).map(|slot| slot.value.clone()) }

    /// Calls a closure with a borrow of the current value of `key`
    pub fn with_value<R>(&self, key: &str, f: impl FnOnce(&Value) -> R) -> Result<R, PropertyError> {
        let slots = self.0.slots.read().expect("slots lock is poisoned");
        let slot = slots.get(key).ok_or_else(|| PropertyError::Unknown(key.to_string()))?;
        Ok(f(&slot.value))
    }

    pub fn contains(&self, key: &str) -> bool { self.0.slots.read().expect("slots lock is poisoned").contains_key(key) }

    /// Property names, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.0.slots.read().expect("slots lock is poisoned").keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Assign a new value to `key`.
    ///
    /// If the property is observed and the stored value changes (strict inequality), every enabled
    /// registration is called with `(new, old)` in registration order before this returns.
    /// Callbacks run without any lock held, so they may read or write this state again.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), PropertyError> {
        let new = value.into();
        let (old, listeners) = {
            let mut slots = self.0.slots.write().expect("slots lock is poisoned");
            let slot = slots.get_mut(key).ok_or_else(|| PropertyError::Unknown(key.to_string()))?;
            if slot.readonly {
                return Err(PropertyError::ReadOnly(key.to_string()));
            }
            // An equal write leaves the stored representation untouched (1 stays Integer after writing 1.0)
            if slot.value == new {
                return Ok(());
            }
            if slot.listeners.is_empty() {
                slot.value = new;
                return Ok(());
            }
            let old = std::mem::replace(&mut slot.value, new.clone());
            // The set of registrations for this change is fixed here
            (old, slot.listeners.clone())
        };

        trace!("State({}).set({key}): {old} -> {new}, {} listeners", self.0.id, listeners.len());
        for listener in listeners {
            listener.deliver(&new, &old);
        }
        Ok(())
    }

    /// Whether `key` currently has any registrations
    pub fn is_observed(&self, key: &str) -> bool { self.observer_count(key) > 0 }

    /// Number of live registrations on `key`
    pub fn observer_count(&self, key: &str) -> usize {
        self.0.slots.read().expect("slots lock is poisoned").get(key).map_or(0, |slot| slot.listeners.len())
    }

    pub(crate) fn downgrade(&self) -> WeakState { WeakState(Arc::downgrade(&self.0)) }

    /// Layer a registration onto `key`'s interception list
    pub(crate) fn attach(&self, key: &str, listener: Arc<Listener>) -> Result<(), ObserveError> {
        let mut slots = self.0.slots.write().expect("slots lock is poisoned");
        let slot = slots.get_mut(key).ok_or_else(|| ObserveError::UnknownProperty(key.to_string()))?;
        if slot.readonly {
            return Err(ObserveError::ReadOnly(key.to_string()));
        }
        if slot.listeners.is_empty() {
            debug!("State({}): instrumenting property {key}", self.0.id);
        }
        trace!("State({}): listener {} attached to {key}", self.0.id, listener.id());
        slot.listeners.push(listener);
        Ok(())
    }

    /// Remove one registration from `key`. The slot reverts to a plain value once the last one is gone.
    pub(crate) fn detach(&self, key: &str, id: ListenerId) {
        let mut slots = self.0.slots.write().expect("slots lock is poisoned");
        if let Some(slot) = slots.get_mut(key) {
            slot.listeners.retain(|listener| listener.id() != id);
            trace!("State({}): listener {id} detached from {key}", self.0.id);
            if slot.listeners.is_empty() {
                debug!("State({}): property {key} restored", self.0.id);
            }
        }
    }

    /// Set the enabled flag of every registration on this state accepted by `filter`
    pub(crate) fn set_enabled_where(&self, enabled: bool, filter: impl Fn(&Listener) -> bool) {
        let slots = self.0.slots.read().expect("slots lock is poisoned");
        for listener in slots.values().flat_map(|slot| slot.listeners.iter()) {
            if filter(listener) {
                listener.set_enabled(enabled);
            }
        }
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.0.slots.read().expect("slots lock is poisoned");
        let mut map = f.debug_map();
        let mut keys: Vec<&String> = slots.keys().collect();
        keys.sort();
        for key in keys {
            map.entry(key, &slots[key].value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_reads_and_writes() {
        let state = State::new().with("foo", "value").with("bar", 0);
        assert_eq!(state.get("foo").unwrap(), "value");
        state.set("bar", 5).unwrap();
        assert_eq!(state.get("bar").unwrap(), 5);
        assert_eq!(state.keys(), ["bar", "foo"]);
        assert!(!state.is_observed("foo"));
        assert_eq!(state.with_value("foo", |v| v.as_str().map(str::len)), Ok(Some(5)));
    }

    #[test]
    fn test_unknown_and_readonly_properties() {
        let state = State::new().with_readonly("id", 7);
        assert_eq!(state.set("missing", 1), Err(PropertyError::Unknown("missing".into())));
        assert_eq!(state.set("id", 8), Err(PropertyError::ReadOnly("id".into())));
        assert_eq!(state.get("id").unwrap(), 7);
        assert!(state.get("missing").is_none());
        assert!(state.contains("id"));
        assert!(!state.contains("missing"));
        assert!(state.with_value("missing", |_| ()).is_err());
    }

    #[test]
    fn test_define() {
        let state = State::new();
        state.define("foo", true).unwrap();
        assert_eq!(state.define("foo", false), Err(PropertyError::AlreadyDefined("foo".into())));
        assert_eq!(state.get("foo"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_clones_share_identity() {
        let state = State::new().with("foo", 1);
        let other = state.clone();
        other.set("foo", 2).unwrap();
        assert_eq!(state.get("foo").unwrap(), 2);
        assert_eq!(state.id(), other.id());
        assert_ne!(state.id(), State::new().id());
    }

    #[test]
    fn test_attach_and_detach_restore_plain_slot() {
        let state = State::new().with("foo", 1).with_readonly("id", 0);
        let listener = Arc::new(Listener::new(Arc::new(|_: &Value, _: &Value| {}), None));
        assert_eq!(state.attach("nope", listener.clone()), Err(ObserveError::UnknownProperty("nope".into())));
        assert_eq!(state.attach("id", listener.clone()), Err(ObserveError::ReadOnly("id".into())));

        state.attach("foo", listener.clone()).unwrap();
        assert_eq!(state.observer_count("foo"), 1);
        state.detach("foo", listener.id());
        assert!(!state.is_observed("foo"));
        // detaching twice is harmless
        state.detach("foo", listener.id());
        assert_eq!(state.get("foo").unwrap(), 1);
    }
}
