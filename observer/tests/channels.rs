mod common;
use mdc_observer::*;

#[test]
fn test_std_channel_receives_changes() {
    let state = State::new().with("foo", "value");
    let (tx, rx) = std::sync::mpsc::channel::<Change>();
    let unobserve = observe_property(&state, "foo", tx).unwrap();

    state.set("foo", "newValue").unwrap();
    state.set("foo", "newValue").unwrap();
    assert_eq!(rx.try_recv().unwrap(), Change { key: "foo".into(), new: "newValue".into(), old: "value".into() });
    assert!(rx.try_recv().is_err());

    unobserve.dispose();
    state.set("foo", "anotherValue").unwrap();
    // the sender was dropped along with the registration
    assert!(matches!(rx.try_recv(), Err(std::sync::mpsc::TryRecvError::Disconnected)));
}

#[cfg(feature = "tokio")]
#[tokio::test]
async fn test_tokio_channel_receives_changes() {
    let state = State::new().with("count", 0);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Change>();
    observe_property(&state, "count", tx).unwrap();

    state.set("count", 1).unwrap();
    state.set("count", 2).unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!((first.new, first.old), (Value::from(1), Value::from(0)));
    let second = rx.recv().await.unwrap();
    assert_eq!(second.key, "count");
    assert_eq!(second.new, 2);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_dropped_receiver_is_ignored() {
    let state = State::new().with("foo", 0);
    let (tx, rx) = std::sync::mpsc::channel::<Change>();
    observe_property(&state, "foo", tx).unwrap();
    drop(rx);
    state.set("foo", 1).unwrap();
    assert_eq!(state.get("foo").unwrap(), 1);
}
