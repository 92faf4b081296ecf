use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::value::Value;

/// Identifies one registration. Never reused within a process.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// Identifies the mixin instance that made a registration. Free-function registrations have no owner.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub(crate) struct OwnerId(pub(crate) usize);

/// A callback invoked with `(new, old)` when an observed property changes
pub type PropertyCallback = Arc<dyn Fn(&Value, &Value) + Send + Sync + 'static>;

/// One change event, as delivered to channel sinks
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key: String,
    pub new: Value,
    pub old: Value,
}

/// Trait for types that can be registered as a property callback.
pub trait IntoPropertyCallback {
    /// Convert into a callback for the property named `key`
    fn into_property_callback(self, key: &str) -> PropertyCallback;
}

/// A registration entry in the per-property callback list.
///
/// The entry is shared by the property's interception list, the disposer returned to the caller,
/// and (for mixin registrations) the owning instance's registry.
pub(crate) struct Listener {
    id: ListenerId,
    owner: Option<OwnerId>,
    enabled: AtomicBool,
    disposed: AtomicBool,
    callback: PropertyCallback,
}

impl Listener {
    pub(crate) fn new(callback: PropertyCallback, owner: Option<OwnerId>) -> Self {
        Self { id: ListenerId::next(), owner, enabled: AtomicBool::new(true), disposed: AtomicBool::new(false), callback }
    }

    pub(crate) fn id(&self) -> ListenerId { self.id }

    pub(crate) fn owner(&self) -> Option<OwnerId> { self.owner }

    pub(crate) fn set_enabled(&self, enabled: bool) { self.enabled.store(enabled, Ordering::SeqCst); }

    pub(crate) fn is_enabled(&self) -> bool { self.enabled.load(Ordering::SeqCst) }

    /// Marks the entry as disposed. Returns false if it already was.
    pub(crate) fn dispose(&self) -> bool { !self.disposed.swap(true, Ordering::SeqCst) }

    pub(crate) fn is_disposed(&self) -> bool { self.disposed.load(Ordering::SeqCst) }

    /// Invoke the callback unless the entry is disabled or has been disposed
    pub(crate) fn deliver(&self, new: &Value, old: &Value) {
        if self.is_disposed() || !self.is_enabled() {
            return;
        }
        (self.callback)(new, old)
    }
}

// Closures receiving (new, old)
impl<F> IntoPropertyCallback for F
where F: Fn(&Value, &Value) + Send + Sync + 'static
{
    fn into_property_callback(self, _key: &str) -> PropertyCallback { Arc::new(self) }
}

impl IntoPropertyCallback for std::sync::mpsc::Sender<Change> {
    fn into_property_callback(self, key: &str) -> PropertyCallback {
        let key = key.to_string();
        Arc::new(move |new: &Value, old: &Value| {
            let _ = self.send(Change { key: key.clone(), new: new.clone(), old: old.clone() }); // Ignore send errors
        })
    }
}

#[cfg(feature = "tokio")]
impl IntoPropertyCallback for tokio::sync::mpsc::UnboundedSender<Change> {
    fn into_property_callback(self, key: &str) -> PropertyCallback {
        let key = key.to_string();
        Arc::new(move |new: &Value, old: &Value| {
            let _ = self.send(Change { key: key.clone(), new: new.clone(), old: old.clone() }); // Ignore send errors
        })
    }
}
