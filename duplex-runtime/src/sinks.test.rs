use super::*;
use std::cell::RefCell;

#[test]
fn any_error_start_fires_regardless_of_unhandled_registration() {
    let sinks = ManagerSinks::new();
    let count = Rc::new(RefCell::new(0));
    let count_clone = count.clone();
    sinks.on_any_error_start(move |_| *count_clone.borrow_mut() += 1);

    sinks.fire_any_error_start(&ErrorEvent {
        error_id: "e1".to_string(),
        message: "bad".to_string(),
        code: None,
        details: None,
    });

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn unhandled_error_start_is_a_no_op_warning_with_no_sink() {
    let sinks = ManagerSinks::new();
    // Should not panic; exercised purely for the no-sink branch.
    sinks.fire_unhandled_error_start(&ErrorEvent {
        error_id: "e2".to_string(),
        message: "bad".to_string(),
        code: None,
        details: None,
    });
}

#[test]
fn unhandled_error_start_fires_the_registered_sink() {
    let sinks = ManagerSinks::new();
    let seen = Rc::new(RefCell::new(None));
    let seen_clone = seen.clone();
    sinks.on_unhandled_error_start(move |e| *seen_clone.borrow_mut() = Some(e.error_id.clone()));

    sinks.fire_unhandled_error_start(&ErrorEvent {
        error_id: "e3".to_string(),
        message: "bad".to_string(),
        code: None,
        details: None,
    });

    assert_eq!(seen.borrow().as_deref(), Some("e3"));
}
