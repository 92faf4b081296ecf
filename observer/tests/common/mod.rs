use mdc_observer::Value;
use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Records every `(new, old)` pair it is called with
#[allow(unused)]
#[derive(Clone, Default)]
pub struct Spy {
    calls: Arc<Mutex<Vec<(Value, Value)>>>,
}

#[allow(unused)]
impl Spy {
    pub fn new() -> Self { Self::default() }

    /// A callback for `observe_property`
    pub fn callback(&self) -> impl Fn(&Value, &Value) + Send + Sync + 'static {
        let calls = self.calls.clone();
        move |new: &Value, old: &Value| calls.lock().unwrap().push((new.clone(), old.clone()))
    }

    /// A callback for `Observers::on`, ignoring the context
    pub fn on<C: 'static>(&self) -> impl Fn(&C, &Value, &Value) + Send + Sync + 'static {
        let calls = self.calls.clone();
        move |_: &C, new: &Value, old: &Value| calls.lock().unwrap().push((new.clone(), old.clone()))
    }

    /// Calls recorded since the last `take`
    pub fn take(&self) -> Vec<(Value, Value)> { self.calls.lock().unwrap().drain(..).collect() }

    pub fn count(&self) -> usize { self.calls.lock().unwrap().len() }
}

/// Shorthand for an expected `(new, old)` pair
#[allow(unused)]
pub fn call(new: impl Into<Value>, old: impl Into<Value>) -> (Value, Value) { (new.into(), old.into()) }
