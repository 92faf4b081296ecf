use std::sync::Arc;

use tracing::debug;

use crate::disposer::Disposer;
use crate::error::ObserveError;
use crate::listener::{IntoPropertyCallback, Listener, OwnerId, PropertyCallback};
use crate::state::State;

/// Observe changes to `key` on `target`.
///
/// `callback` is called synchronously with `(new, old)` each time a write changes the stored
/// value. Several registrations may observe the same property; each one fires independently, in
/// registration order, and registering the same callback twice yields two registrations.
///
/// The returned [`Disposer`] removes exactly this registration.
pub fn observe_property<C>(target: &State, key: &str, callback: C) -> Result<Disposer, ObserveError>
where C: IntoPropertyCallback {
    let (_, disposer) = register(target, key, callback.into_property_callback(key), None)?;
    Ok(disposer)
}

/// Enable or disable delivery for every registration made through [`observe_property`] on
/// `target`. Registrations made through an [`Observer`](crate::Observer) are not affected.
///
/// Disabled registrations keep their place and resume with changes made after re-enabling; changes
/// made while disabled are never replayed.
pub fn set_observers_enabled(target: &State, enabled: bool) {
    debug!("State({}): free observers enabled = {enabled}", target.id());
    target.set_enabled_where(enabled, |listener| listener.owner().is_none());
}

pub(crate) fn register(
    target: &State,
    key: &str,
    callback: PropertyCallback,
    owner: Option<OwnerId>,
) -> Result<(Arc<Listener>, Disposer), ObserveError> {
    let listener = Arc::new(Listener::new(callback, owner));
    target.attach(key, listener.clone())?;

    let disposer = {
        let state = target.downgrade();
        let key = key.to_string();
        let listener = listener.clone();
        Disposer::new(move || {
            if listener.dispose() {
                if let Some(state) = state.upgrade() {
                    state.detach(&key, listener.id());
                }
            }
        })
    };
    Ok((listener, disposer))
}
