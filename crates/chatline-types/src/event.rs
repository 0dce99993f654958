use futures_util::stream::BoxStream;

use crate::ProviderResult;

/// Events decoded from the response stream, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A content chunk, escape sequences already decoded.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
    /// The `[ERROR: ...]` sentinel.
    Error { detail: String },
}

impl StreamEvent {
    /// Returns true for sentinels that end the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

/// Boxed stream of decoded events.
pub type EventStream = BoxStream<'static, ProviderResult<StreamEvent>>;

/// Lifecycle of one streaming session.
///
/// `Idle -> Streaming -> {Done | Failed}`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Streaming,
    Done,
    Failed,
}

impl SessionState {
    /// Returns the next state if `self -> next` is a legal transition.
    ///
    /// `Streaming -> Streaming` is the data self-loop. `Idle -> Failed` covers
    /// a transport that fails before the first byte.
    pub fn transition(self, next: SessionState) -> Option<SessionState> {
        use SessionState::{Done, Failed, Idle, Streaming};

        match (self, next) {
            (Idle, Streaming | Failed) | (Streaming, Streaming | Done | Failed) => Some(next),
            _ => None,
        }
    }
}
