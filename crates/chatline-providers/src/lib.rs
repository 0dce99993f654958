//! Response acquisition: stream decoding, HTTP transport, and local canned replies.

pub mod canned;
pub mod http;
pub mod shared;
pub mod sse;

use std::future::Future;

use chatline_types::{ChatReply, ChatRequest, EventStream, ProviderResult};

pub use canned::CannedResponder;
pub use http::{HttpBackend, HttpBackendConfig};
pub use sse::{SseDecoder, SseParser};

/// A remote chat endpoint offering a streaming and a synchronous call.
///
/// The orchestrator only needs read-and-cancel on the stream: dropping the
/// returned [`EventStream`] closes the underlying connection.
pub trait ChatBackend {
    /// Opens the streaming endpoint and returns its decoded events.
    fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = ProviderResult<EventStream>> + Send;

    /// Performs one request/response round trip.
    fn send(&self, request: &ChatRequest) -> impl Future<Output = ProviderResult<ChatReply>> + Send;
}
