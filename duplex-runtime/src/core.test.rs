use super::*;
use std::cell::Cell;
use std::rc::Rc;

fn connected() -> SharedConnectionStatus {
    Rc::new(Cell::new(ConnectionStatus::Connected))
}

#[test]
fn has_error_reflects_the_error_map_only() {
    let mut core: CommonCore<()> = CommonCore::new("h1", connected());
    assert!(!core.has_error());

    core.errors.insert(
        "e1".to_string(),
        ErrorEvent {
            error_id: "e1".to_string(),
            message: "bad".to_string(),
            code: None,
            details: None,
        },
    );
    assert!(core.has_error());

    core.errors.remove("e1");
    assert!(!core.has_error());
}

#[test]
fn set_properties_shallow_merges() {
    let mut core: CommonCore<()> = CommonCore::new("h1", connected());
    let mut first = Map::new();
    first.insert("a".to_string(), Value::from(1));
    first.insert("b".to_string(), Value::from(2));
    core.set_properties(first);

    let mut second = Map::new();
    second.insert("b".to_string(), Value::from(20));
    core.set_properties(second);

    assert_eq!(core.properties.get("a"), Some(&Value::from(1)));
    assert_eq!(core.properties.get("b"), Some(&Value::from(20)));
}

#[test]
fn ensure_sendable_rejects_once_ended_and_once_disconnected() {
    let status = connected();
    let mut core: CommonCore<()> = CommonCore::new("h1", status.clone());
    assert!(core.ensure_sendable("op", "thing").is_ok());

    status.set(ConnectionStatus::Disconnected);
    assert!(matches!(core.ensure_sendable("op", "thing"), Err(RuntimeError::InvalidOperation { .. })));

    status.set(ConnectionStatus::Connected);
    assert!(core.ensure_sendable("op", "thing").is_ok());

    core.ended = true;
    assert!(matches!(core.ensure_sendable("op", "thing"), Err(RuntimeError::InvalidOperation { .. })));
}
