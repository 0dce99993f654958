use chatline_types::SessionState;
use uuid::Uuid;

/// State of one streaming attempt: id, accumulated text, lifecycle.
///
/// Text is append-only and only grows while `Streaming`. Illegal
/// transitions are refused and logged; they never change the state.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    text: String,
    state: SessionState,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            text: String::new(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn begin(&mut self) -> bool {
        self.advance(SessionState::Streaming)
    }

    /// Appends a data chunk. Returns false if the session is not streaming.
    pub fn append(&mut self, chunk: &str) -> bool {
        if self.state != SessionState::Streaming {
            tracing::warn!(session = %self.id, state = ?self.state, "data outside streaming state dropped");
            return false;
        }
        self.text.push_str(chunk);
        true
    }

    pub fn finish(&mut self) -> bool {
        self.advance(SessionState::Done)
    }

    pub fn fail(&mut self) -> bool {
        self.advance(SessionState::Failed)
    }

    fn advance(&mut self, next: SessionState) -> bool {
        if let Some(state) = self.state.transition(next) {
            self.state = state;
            true
        } else {
            tracing::warn!(session = %self.id, from = ?self.state, to = ?next, "illegal session transition");
            false
        }
    }
}
