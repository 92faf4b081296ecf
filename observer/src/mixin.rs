use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, trace};

use crate::disposer::Disposer;
use crate::error::ObserveError;
use crate::listener::{Listener, OwnerId, PropertyCallback};
use crate::property::register;
use crate::state::{State, StateId};
use crate::value::Value;

/// The observe capability: register groups of property callbacks against state objects, remove
/// them all at once, and pause delivery per state object.
pub trait Observable {
    /// What callbacks receive as their first argument
    type Context;

    /// Observe each `(key, callback)` in `observers` on `state`.
    ///
    /// Returns a disposer for exactly the registrations made by this call. If any key cannot be
    /// observed, nothing from this call stays registered and the error is returned.
    fn observe(&self, state: &State, observers: Observers<Self::Context>) -> Result<Disposer, ObserveError>;

    /// Dispose every registration made through [`Observable::observe`]
    fn unobserve(&self);

    /// Enable or disable delivery for this instance's registrations on `state`
    fn set_observers_enabled(&self, state: &State, enabled: bool);
}

/// A callback which receives its owning instance along with `(new, old)`
pub type ContextCallback<C> = Arc<dyn Fn(&C, &Value, &Value) + Send + Sync + 'static>;

/// An ordered mapping from property name to callback, passed to [`Observable::observe`]
pub struct Observers<C> {
    entries: Vec<(String, ContextCallback<C>)>,
}

impl<C> Default for Observers<C> {
    fn default() -> Self { Self { entries: Vec::new() } }
}

impl<C> Observers<C> {
    pub fn new() -> Self { Self::default() }

    /// Add a callback for `key`
    pub fn on<F>(mut self, key: impl Into<String>, callback: F) -> Self
    where F: Fn(&C, &Value, &Value) + Send + Sync + 'static {
        self.entries.push((key.into(), Arc::new(callback)));
        self
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// One `observe` call's worth of registrations
struct RegistryEntry {
    id: u64,
    state: StateId,
    listeners: Vec<Arc<Listener>>,
    disposer: Disposer,
}

struct Inner<B> {
    base: B,
    registry: Mutex<Vec<RegistryEntry>>,
    next_entry: AtomicU64,
}

impl<B> Drop for Inner<B> {
    fn drop(&mut self) {
        let entries = std::mem::take(self.registry.get_mut().unwrap_or_else(PoisonError::into_inner));
        for entry in entries {
            entry.disposer.dispose();
        }
    }
}

/// Adds the [`Observable`] capability to a base value `B`.
///
/// The base stays reachable through `Deref`, so an `Observer<B>` can be used wherever a `&B` is
/// expected. Callbacks registered through [`Observable::observe`] receive the `Observer` itself as
/// their context. Cloning an `Observer` creates another handle to the same instance; when the last
/// handle is dropped, every registration it made is disposed.
///
/// ```rust
/// use mdc_observer::*;
///
/// struct Counter { label: &'static str }
///
/// let state = State::new().with("count", 0);
/// let counter = Observer::new(Counter { label: "clicks" });
/// counter
///     .observe(&state, Observers::new().on("count", |this: &Observer<Counter>, new, old| {
///         println!("{}: {old} -> {new}", this.label);
///     }))
///     .unwrap();
///
/// state.set("count", 1).unwrap();
/// counter.unobserve();
/// ```
pub struct Observer<B = ()>(Arc<Inner<B>>);

impl<B> Clone for Observer<B> {
    fn clone(&self) -> Self { Self(Arc::clone(&self.0)) }
}

impl<B: Default> Default for Observer<B> {
    fn default() -> Self { Self::new(B::default()) }
}

impl<B> Observer<B> {
    pub fn new(base: B) -> Self { Self(Arc::new(Inner { base, registry: Mutex::new(Vec::new()), next_entry: AtomicU64::new(0) })) }

    pub fn base(&self) -> &B { &self.0.base }

    /// Number of live registrations made by this instance, across all states
    pub fn registration_count(&self) -> usize {
        let registry = self.0.registry.lock().expect("registry lock is poisoned");
        registry.iter().flat_map(|entry| entry.listeners.iter()).filter(|listener| !listener.is_disposed()).count()
    }

    /// Whether two handles refer to the same instance
    pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }

    fn owner_id(&self) -> OwnerId { OwnerId(Arc::as_ptr(&self.0) as *const () as usize) }
}

impl<B> Deref for Observer<B> {
    type Target = B;
    fn deref(&self) -> &B { &self.0.base }
}

impl<B: Send + Sync + 'static> Observable for Observer<B> {
    type Context = Observer<B>;

    fn observe(&self, state: &State, observers: Observers<Self::Context>) -> Result<Disposer, ObserveError> {
        let owner = self.owner_id();
        let mut listeners = Vec::with_capacity(observers.len());
        let mut disposers = Vec::with_capacity(observers.len());

        for (key, callback) in observers.entries {
            // The registration holds the instance weakly so it never keeps it alive
            let weak: Weak<Inner<B>> = Arc::downgrade(&self.0);
            let bound: PropertyCallback = Arc::new(move |new: &Value, old: &Value| {
                if let Some(inner) = weak.upgrade() {
                    callback(&Observer(inner), new, old);
                }
            });
            match register(state, &key, bound, Some(owner)) {
                Ok((listener, disposer)) => {
                    listeners.push(listener);
                    disposers.push(disposer);
                }
                Err(e) => {
                    for disposer in disposers {
                        disposer.dispose();
                    }
                    return Err(e);
                }
            }
        }

        let id = self.0.next_entry.fetch_add(1, Ordering::Relaxed);
        let disposer = {
            let parts = Disposer::all(disposers);
            let weak = Arc::downgrade(&self.0);
            Disposer::new(move || {
                parts.dispose();
                if let Some(inner) = weak.upgrade() {
                    inner.registry.lock().expect("registry lock is poisoned").retain(|entry| entry.id != id);
                }
            })
        };

        trace!("Observer({:?}): observing {} properties on State({})", owner, listeners.len(), state.id());
        self.0.registry.lock().expect("registry lock is poisoned").push(RegistryEntry {
            id,
            state: state.id(),
            listeners,
            disposer: disposer.clone(),
        });
        Ok(disposer)
    }

    fn unobserve(&self) {
        // Release the lock before disposing; each disposer takes it again
        let entries = std::mem::take(&mut *self.0.registry.lock().expect("registry lock is poisoned"));
        debug!("Observer({:?}): unobserving {} registrations", self.owner_id(), entries.len());
        for entry in entries {
            entry.disposer.dispose();
        }
    }

    fn set_observers_enabled(&self, state: &State, enabled: bool) {
        let registry = self.0.registry.lock().expect("registry lock is poisoned");
        for entry in registry.iter().filter(|entry| entry.state == state.id()) {
            for listener in &entry.listeners {
                listener.set_enabled(enabled);
            }
        }
        debug!("Observer({:?}): observers on State({}) enabled = {enabled}", self.owner_id(), state.id());
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for Observer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer").field("base", &self.0.base).field("registrations", &self.registration_count()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_observe_rolls_back() {
        let state = State::new().with("foo", 1);
        let observer = Observer::<()>::default();
        let result = observer.observe(&state, Observers::new().on("foo", |_, _, _| {}).on("missing", |_, _, _| {}));
        assert_eq!(result.unwrap_err(), ObserveError::UnknownProperty("missing".into()));
        assert!(!state.is_observed("foo"));
        assert_eq!(observer.registration_count(), 0);
    }

    #[test]
    fn test_combined_disposer_leaves_registry() {
        let state = State::new().with("foo", 1).with("bar", 2);
        let observer = Observer::new(());
        let first = observer.observe(&state, Observers::new().on("foo", |_, _, _| {}).on("bar", |_, _, _| {})).unwrap();
        let _second = observer.observe(&state, Observers::new().on("foo", |_, _, _| {})).unwrap();
        assert_eq!(observer.0.registry.lock().unwrap().len(), 2);
        assert_eq!(observer.registration_count(), 3);

        first.dispose();
        assert_eq!(observer.0.registry.lock().unwrap().len(), 1);
        assert_eq!(observer.registration_count(), 1);
        assert_eq!(state.observer_count("foo"), 1);
        assert!(!state.is_observed("bar"));
    }

    #[test]
    fn test_dropping_last_handle_disposes() {
        let state = State::new().with("foo", 1);
        let observer = Observer::new(());
        let disposer = observer.observe(&state, Observers::new().on("foo", |_, _, _| {})).unwrap();
        let other = observer.clone();
        drop(observer);
        assert!(state.is_observed("foo"));
        drop(other);
        assert!(!state.is_observed("foo"));
        assert!(disposer.is_disposed());
    }
}
