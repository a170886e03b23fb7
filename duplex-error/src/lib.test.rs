use super::*;

#[test]
fn network_errors_are_retryable() {
    let err = RuntimeError::Network(NetworkError::ConnectTimeout { timeout_ms: 5000 });
    assert!(err.is_retryable());
}

#[test]
fn non_network_errors_are_not_retryable() {
    assert!(!RuntimeError::invalid_operation("send_end_exchange", "already ended").is_retryable());
    assert!(!RuntimeError::validation("start_event", "missing").is_retryable());
    assert!(!RuntimeError::replay("missing exchange id").is_retryable());
    assert!(
        !RuntimeError::Protocol {
            error_id: "e1".into(),
            message: "bad".into(),
            code: None,
            details: None,
        }
        .is_retryable()
    );
}

#[test]
fn invalid_operation_formats_with_both_fields() {
    let err = RuntimeError::invalid_operation("send_end_session", "session already ended");
    assert_eq!(
        err.to_string(),
        "invalid operation `send_end_session`: session already ended"
    );
}
