use std::sync::{Arc, Mutex};

type DisposeFn = Box<dyn FnOnce() + Send + 'static>;

/// An idempotent handle which removes the registration(s) it was returned for.
///
/// Dropping a `Disposer` does nothing; registrations stay active until [`Disposer::dispose`] is
/// called (on any clone). Use [`Disposer::guard`] to tie a registration to a scope instead.
#[derive(Clone)]
pub struct Disposer(Arc<Mutex<Option<DisposeFn>>>);

impl Disposer {
    pub(crate) fn new<F: FnOnce() + Send + 'static>(f: F) -> Self { Self(Arc::new(Mutex::new(Some(Box::new(f))))) }

    /// A disposer which has nothing to remove
    pub fn noop() -> Self { Self(Arc::new(Mutex::new(None))) }

    /// Combine several disposers into one which disposes each of them in order
    pub fn all<I: IntoIterator<Item = Disposer>>(disposers: I) -> Self {
        let disposers: Vec<Disposer> = disposers.into_iter().collect();
        Self::new(move || {
            for disposer in disposers {
                disposer.dispose();
            }
        })
    }

    /// Remove the registration(s). Calls after the first have no effect.
    pub fn dispose(&self) {
        // take the closure first so the lock is not held while it runs
        let f = self.0.lock().expect("disposer lock is poisoned").take();
        if let Some(f) = f {
            f();
        }
    }

    pub fn is_disposed(&self) -> bool { self.0.lock().expect("disposer lock is poisoned").is_none() }

    /// Convert into a guard that disposes when dropped
    pub fn guard(self) -> DisposeGuard { DisposeGuard(self) }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer").field("disposed", &self.is_disposed()).finish()
    }
}

/// Disposes the wrapped [`Disposer`] when dropped.
#[must_use = "the registration is disposed as soon as the guard is dropped"]
pub struct DisposeGuard(Disposer);

impl DisposeGuard {
    /// The disposer this guard will invoke
    pub fn disposer(&self) -> &Disposer { &self.0 }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) { self.0.dispose(); }
}
