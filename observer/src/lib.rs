/*!
Synchronous property observation for plain state objects

# Design requirements:
- A write and every notification it causes complete before the write returns
- Reads are never affected by observation
- Each registration is independent: its own disposer, its own enabled flag, no de-duplication
- No lock is held while a callback runs, so callbacks may read, write, observe and dispose freely
- Observation is per state object (identity), never per type

# Nomenclature:
- registration - one callback observing one property of one state object
- disposer - an idempotent handle removing the registration(s) it was returned for
- delivery - calling a callback with `(new, old)` because a write changed a value

# Basic usage

```rust
use mdc_observer::*;

let state = State::new().with("foo", "value").with("bar", 0);
let unobserve = observe_property(&state, "foo", |new: &Value, old: &Value| println!("foo: {old} -> {new}")).unwrap();

state.set("foo", "newValue").unwrap(); // prints foo: value -> newValue
state.set("foo", "newValue").unwrap(); // unchanged, nothing printed

unobserve.dispose();
state.set("foo", "anotherValue").unwrap(); // no longer observed
assert!(!state.is_observed("foo"));
```

# Observer usage

```rust
use mdc_observer::*;

let state = State::new().with("open", false);
let dialog = Observer::new(String::from("dialog"));

dialog
    .observe(&state, Observers::new().on("open", |this: &Observer<String>, new, _old| {
        println!("{} open: {new}", this.as_str());
    }))
    .unwrap();

state.set("open", true).unwrap(); // prints dialog open: true

dialog.set_observers_enabled(&state, false);
state.set("open", false).unwrap(); // suppressed
dialog.set_observers_enabled(&state, true);

dialog.unobserve();
assert_eq!(dialog.registration_count(), 0);
```
*/

mod disposer;
mod error;
mod listener;
mod mixin;
mod property;
mod state;
mod value;

pub use disposer::*;
pub use error::*;
pub use listener::{Change, IntoPropertyCallback, PropertyCallback};
pub use mixin::*;
pub use property::{observe_property, set_observers_enabled};
pub use state::{State, StateId};
pub use value::*;
