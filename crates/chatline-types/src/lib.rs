//! Shared types for chatline: wire payloads, stream events, and provider errors.

mod error;
mod event;
mod wire;

pub use error::{ProviderError, ProviderErrorKind, ProviderResult};
pub use event::{EventStream, SessionState, StreamEvent};
pub use wire::{ChatReply, ChatRequest};
