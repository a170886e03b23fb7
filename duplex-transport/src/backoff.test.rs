use super::*;

#[test]
fn doubles_until_the_ceiling_then_holds() {
    let mut backoff = Backoff::new(200, 1000);
    assert_eq!(backoff.next_delay(), Duration::from_millis(200));
    assert_eq!(backoff.next_delay(), Duration::from_millis(400));
    assert_eq!(backoff.next_delay(), Duration::from_millis(800));
    assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
}

#[test]
fn reset_returns_to_the_initial_delay() {
    let mut backoff = Backoff::new(200, 1000);
    backoff.next_delay();
    backoff.next_delay();
    backoff.reset();
    assert_eq!(backoff.next_delay(), Duration::from_millis(200));
}
