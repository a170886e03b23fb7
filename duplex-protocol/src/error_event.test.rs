use super::*;
use pretty_assertions::assert_eq;

#[test]
fn start_error_round_trips_through_json() {
    let event = ErrorEnvelope::StartError(ErrorEvent {
        error_id: "e1".to_string(),
        message: "bad".to_string(),
        code: Some("E_BAD".to_string()),
        details: None,
    });
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "startError": {
                "errorId": "e1",
                "message": "bad",
                "code": "E_BAD",
            }
        })
    );
    let back: ErrorEnvelope = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn end_error_round_trips_through_json() {
    let event = ErrorEnvelope::EndError(ErrorEndEvent {
        error_id: "e1".to_string(),
    });
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json, serde_json::json!({"endError": {"errorId": "e1"}}));
    let back: ErrorEnvelope = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn error_id_accessor_works_for_both_variants() {
    let start = ErrorEnvelope::StartError(ErrorEvent {
        error_id: "e9".to_string(),
        message: "x".to_string(),
        code: None,
        details: None,
    });
    let end = ErrorEnvelope::EndError(ErrorEndEvent {
        error_id: "e9".to_string(),
    });
    assert_eq!(start.error_id(), "e9");
    assert_eq!(end.error_id(), "e9");
}
