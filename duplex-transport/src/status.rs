use duplex_error::RuntimeError;

/// Connection status tracked by [`crate::Transport`] (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// A status transition, paired with the error that caused it when the
/// transition is a failure (e.g. `Connecting` after a socket error, with
/// `error` set so subscribers can distinguish "first attempt" from
/// "retrying after a failure").
#[derive(Debug, Clone)]
pub struct ConnectionStatusEvent {
    pub status: ConnectionStatus,
    pub error: Option<RuntimeError>,
}

impl ConnectionStatusEvent {
    pub fn ok(status: ConnectionStatus) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn err(status: ConnectionStatus, error: RuntimeError) -> Self {
        Self {
            status,
            error: Some(error),
        }
    }
}
