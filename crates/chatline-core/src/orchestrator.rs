//! Strategy chain for one turn: stream, then synchronous, then canned.
//!
//! Each strategy runs at most once per `respond` call, strictly in order.
//! A user cancel ends the chain; any other failure moves to the next
//! strategy. The canned strategy cannot fail, so every uncancelled turn
//! ends with a rendered reply.

use std::fmt;

use chatline_providers::{CannedResponder, ChatBackend};
use chatline_render::{DEFAULT_CURSOR, IncrementalRenderer, MarkdownEngine, Surface};
use chatline_types::{ChatRequest, ProviderError, StreamEvent};
use futures_util::StreamExt;

use crate::cancel::{CancelReason, RequestToken};
use crate::session::StreamSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Stream,
    Sync,
    Local,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Stream => "stream",
            Strategy::Sync => "sync",
            Strategy::Local => "local",
        })
    }
}

/// One strategy run and, if it failed, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub strategy: Strategy,
    pub error: Option<ProviderError>,
}

/// A completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub markup: String,
    /// Strategy that produced the reply.
    pub source: Strategy,
    pub conversation_id: Option<String>,
    /// Every strategy tried, in order, ending with the successful one.
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Replied(Reply),
    /// User cancelled; `partial` is whatever text had streamed so far.
    Cancelled { partial: String },
}

enum AttemptError {
    Cancelled { partial: String },
    Failed(ProviderError),
}

impl AttemptError {
    fn interrupted(reason: CancelReason, strategy: Strategy, partial: String) -> Self {
        match reason {
            CancelReason::User => AttemptError::Cancelled { partial },
            CancelReason::Deadline => AttemptError::Failed(ProviderError::timeout(format!(
                "{strategy} attempt exceeded its deadline"
            ))),
        }
    }
}

struct Produced {
    text: String,
    markup: String,
    conversation_id: Option<String>,
}

/// Owns the backend and renderer for a conversation; one turn at a time.
pub struct ResponseOrchestrator<B> {
    backend: B,
    engine: MarkdownEngine,
    responder: CannedResponder,
    cursor: String,
}

impl<B: ChatBackend> ResponseOrchestrator<B> {
    pub fn new(backend: B, engine: MarkdownEngine) -> Self {
        Self {
            backend,
            engine,
            responder: CannedResponder::new(),
            cursor: DEFAULT_CURSOR.to_string(),
        }
    }

    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Produces a reply for `request`, driving `surface` as it goes.
    ///
    /// Taking `&mut self` serializes turns: a second send cannot start while
    /// one is in flight.
    pub async fn respond(
        &mut self,
        request: &ChatRequest,
        surface: &mut dyn Surface,
        token: &RequestToken,
    ) -> Outcome {
        let mut attempts = Vec::new();

        tracing::debug!(strategy = %Strategy::Stream, "trying strategy");
        let streamed = self.try_stream(request, surface, &token.arm()).await;
        if let Some(outcome) = settle(Strategy::Stream, streamed, &mut attempts) {
            return outcome;
        }

        tracing::debug!(strategy = %Strategy::Sync, "trying strategy");
        let synced = self.try_sync(request, surface, &token.arm()).await;
        if let Some(outcome) = settle(Strategy::Sync, synced, &mut attempts) {
            return outcome;
        }

        let produced = self.local_reply(request, surface);
        tracing::info!(strategy = %Strategy::Local, "reply complete");
        attempts.push(Attempt {
            strategy: Strategy::Local,
            error: None,
        });
        Outcome::Replied(Reply {
            text: produced.text,
            markup: produced.markup,
            source: Strategy::Local,
            conversation_id: None,
            attempts,
        })
    }

    async fn try_stream(
        &self,
        request: &ChatRequest,
        surface: &mut dyn Surface,
        token: &RequestToken,
    ) -> Result<Produced, AttemptError> {
        let mut session = StreamSession::new();
        tracing::debug!(session = %session.id(), "opening stream");

        let opened = tokio::select! {
            biased;
            reason = token.cancelled() => {
                session.fail();
                return Err(AttemptError::interrupted(reason, Strategy::Stream, String::new()));
            }
            result = self.backend.open_stream(request) => result,
        };
        let mut events = match opened {
            Ok(events) => events,
            Err(err) => {
                session.fail();
                return Err(AttemptError::Failed(err));
            }
        };

        session.begin();
        let mut renderer = IncrementalRenderer::new(surface, &self.engine, &self.cursor);
        renderer.on_start();

        loop {
            let next = tokio::select! {
                biased;
                reason = token.cancelled() => {
                    session.fail();
                    return Err(AttemptError::interrupted(
                        reason,
                        Strategy::Stream,
                        session.into_text(),
                    ));
                }
                next = events.next() => next,
            };

            match next {
                Some(Ok(StreamEvent::Data(chunk))) => {
                    tracing::debug!(session = %session.id(), bytes = chunk.len(), "data");
                    if session.append(&chunk) {
                        renderer.on_delta(&chunk);
                    }
                }
                Some(Ok(StreamEvent::Done)) => {
                    session.finish();
                    let text = session.into_text();
                    let markup = renderer.finalize(&text);
                    return Ok(Produced {
                        text,
                        markup,
                        conversation_id: None,
                    });
                }
                Some(Ok(StreamEvent::Error { detail })) => {
                    session.fail();
                    return Err(AttemptError::Failed(ProviderError::protocol(format!(
                        "Server reported an error: {detail}"
                    ))));
                }
                Some(Err(err)) => {
                    session.fail();
                    return Err(AttemptError::Failed(err));
                }
                None => {
                    session.fail();
                    return Err(AttemptError::Failed(ProviderError::protocol(
                        "Stream ended without a completion sentinel",
                    )));
                }
            }
        }
    }

    async fn try_sync(
        &self,
        request: &ChatRequest,
        surface: &mut dyn Surface,
        token: &RequestToken,
    ) -> Result<Produced, AttemptError> {
        let reply = tokio::select! {
            biased;
            reason = token.cancelled() => {
                return Err(AttemptError::interrupted(reason, Strategy::Sync, String::new()));
            }
            result = self.backend.send(request) => result.map_err(AttemptError::Failed)?,
        };

        let markup = self.engine.render(&reply.response);
        surface.commit(&markup);
        Ok(Produced {
            text: reply.response,
            markup,
            conversation_id: reply.conversation_id,
        })
    }

    fn local_reply(&self, request: &ChatRequest, surface: &mut dyn Surface) -> Produced {
        let text = self.responder.reply(&request.message);
        let mut renderer = IncrementalRenderer::new(surface, &self.engine, &self.cursor);
        renderer.on_start();
        for chunk in CannedResponder::chunks(&text) {
            renderer.on_delta(&chunk);
        }
        let markup = renderer.finalize(&text);
        Produced {
            text,
            markup,
            conversation_id: None,
        }
    }
}

/// Records one remote attempt. Returns the outcome if it ends the turn.
fn settle(
    strategy: Strategy,
    result: Result<Produced, AttemptError>,
    attempts: &mut Vec<Attempt>,
) -> Option<Outcome> {
    match result {
        Ok(produced) => {
            tracing::info!(%strategy, bytes = produced.text.len(), "reply complete");
            attempts.push(Attempt {
                strategy,
                error: None,
            });
            Some(Outcome::Replied(Reply {
                text: produced.text,
                markup: produced.markup,
                source: strategy,
                conversation_id: produced.conversation_id,
                attempts: std::mem::take(attempts),
            }))
        }
        Err(AttemptError::Cancelled { partial }) => {
            tracing::info!(%strategy, "cancelled by user");
            Some(Outcome::Cancelled { partial })
        }
        Err(AttemptError::Failed(error)) => {
            tracing::warn!(%strategy, kind = %error.kind, error = %error.message, "strategy failed");
            attempts.push(Attempt {
                strategy,
                error: Some(error),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;
    use chatline_providers::SseParser;
    use chatline_render::{RecordingSurface, SurfaceUpdate};
    use chatline_types::{ChatReply, EventStream, ProviderErrorKind, ProviderResult};
    use futures_util::stream;

    use super::*;

    enum StreamScript {
        Chunks(Vec<&'static str>),
        ChunksThenHang(Vec<&'static str>),
        OpenFails(ProviderError),
    }

    enum SyncScript {
        Reply(&'static str),
        Fails(ProviderError),
        Hang,
    }

    struct MockBackend {
        stream: StreamScript,
        sync: SyncScript,
        stream_calls: AtomicUsize,
        sync_calls: AtomicUsize,
    }

    impl MockBackend {
        fn new(stream: StreamScript, sync: SyncScript) -> Self {
            Self {
                stream,
                sync,
                stream_calls: AtomicUsize::new(0),
                sync_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> (usize, usize) {
            (
                self.stream_calls.load(Ordering::SeqCst),
                self.sync_calls.load(Ordering::SeqCst),
            )
        }
    }

    fn byte_items(chunks: &[&'static str]) -> Vec<Result<Bytes, Infallible>> {
        chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect()
    }

    impl ChatBackend for MockBackend {
        async fn open_stream(&self, _request: &ChatRequest) -> ProviderResult<EventStream> {
            self.stream_calls.fetch_add(1, Ordering::SeqCst);
            match &self.stream {
                StreamScript::Chunks(chunks) => {
                    Ok(SseParser::new(stream::iter(byte_items(chunks))).boxed())
                }
                StreamScript::ChunksThenHang(chunks) => Ok(SseParser::new(
                    stream::iter(byte_items(chunks)).chain(stream::pending()),
                )
                .boxed()),
                StreamScript::OpenFails(err) => Err(err.clone()),
            }
        }

        async fn send(&self, _request: &ChatRequest) -> ProviderResult<ChatReply> {
            self.sync_calls.fetch_add(1, Ordering::SeqCst);
            match &self.sync {
                SyncScript::Reply(text) => Ok(ChatReply {
                    response: (*text).to_string(),
                    conversation_id: Some("conv-1".to_string()),
                    timestamp: None,
                }),
                SyncScript::Fails(err) => Err(err.clone()),
                SyncScript::Hang => std::future::pending().await,
            }
        }
    }

    fn orchestrator(backend: MockBackend) -> ResponseOrchestrator<MockBackend> {
        ResponseOrchestrator::new(backend, MarkdownEngine::fallback_only())
    }

    fn request() -> ChatRequest {
        ChatRequest::new("u1", "hello there")
    }

    fn replied(outcome: Outcome) -> Reply {
        match outcome {
            Outcome::Replied(reply) => reply,
            Outcome::Cancelled { partial } => panic!("unexpected cancel, partial {partial:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_success() {
        let backend = MockBackend::new(
            StreamScript::Chunks(vec!["data: Hel", "lo\n", "data: World\n", "data: [DONE]\n"]),
            SyncScript::Reply("unused"),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();

        let reply = replied(
            orch.respond(&request(), &mut surface, &RequestToken::new())
                .await,
        );

        assert_eq!(reply.text, "HelloWorld");
        assert_eq!(reply.markup, "HelloWorld");
        assert_eq!(reply.source, Strategy::Stream);
        assert_eq!(reply.attempts.len(), 1);
        assert_eq!(orch.backend().calls(), (1, 0));
        assert_eq!(surface.committed(), Some("HelloWorld"));
        // start + two deltas, then the commit
        assert_eq!(surface.partial_count(), 3);
    }

    #[tokio::test]
    async fn test_escaped_newline_renders_as_break() {
        let backend = MockBackend::new(
            StreamScript::Chunks(vec!["data: **one**\\ntwo\n\n", "data: [DONE]\n\n"]),
            SyncScript::Reply("unused"),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();

        let reply = replied(
            orch.respond(&request(), &mut surface, &RequestToken::new())
                .await,
        );
        assert_eq!(reply.text, "**one**\ntwo");
        assert_eq!(reply.markup, "<strong>one</strong><br>two");
        assert!(!reply.markup.contains("\\n"));
    }

    #[tokio::test]
    async fn test_error_sentinel_falls_back_to_sync_once() {
        let backend = MockBackend::new(
            StreamScript::Chunks(vec!["data: partial\n\n", "data: [ERROR: rate_limited]\n\n"]),
            SyncScript::Reply("**Recovered**"),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();

        let reply = replied(
            orch.respond(&request(), &mut surface, &RequestToken::new())
                .await,
        );

        assert_eq!(orch.backend().calls(), (1, 1));
        assert_eq!(reply.source, Strategy::Sync);
        assert_eq!(reply.markup, "<strong>Recovered</strong>");
        assert_eq!(reply.conversation_id.as_deref(), Some("conv-1"));
        let failure = reply.attempts[0].error.as_ref().unwrap();
        assert_eq!(failure.kind, ProviderErrorKind::Protocol);
        assert!(failure.message.contains("rate_limited"));
        assert_eq!(surface.committed(), Some("<strong>Recovered</strong>"));
    }

    #[tokio::test]
    async fn test_eof_without_sentinel_is_failure() {
        let backend = MockBackend::new(
            StreamScript::Chunks(vec!["data: cut off\n\n"]),
            SyncScript::Reply("sync"),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();

        let reply = replied(
            orch.respond(&request(), &mut surface, &RequestToken::new())
                .await,
        );
        assert_eq!(reply.source, Strategy::Sync);
        assert_eq!(
            reply.attempts[0].error.as_ref().unwrap().kind,
            ProviderErrorKind::Protocol
        );
    }

    #[tokio::test]
    async fn test_all_remote_failures_use_canned_reply() {
        let backend = MockBackend::new(
            StreamScript::OpenFails(ProviderError::transport("Connection failed")),
            SyncScript::Fails(ProviderError::http_status(503, "")),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();
        let req = ChatRequest::new("u1", "Tell me about Kafka");

        let reply = replied(orch.respond(&req, &mut surface, &RequestToken::new()).await);

        assert_eq!(orch.backend().calls(), (1, 1));
        assert_eq!(reply.source, Strategy::Local);
        assert_eq!(reply.text, CannedResponder::new().reply("Tell me about Kafka"));
        assert_eq!(
            reply
                .attempts
                .iter()
                .map(|a| a.strategy)
                .collect::<Vec<_>>(),
            vec![Strategy::Stream, Strategy::Sync, Strategy::Local]
        );
        assert!(surface.partial_count() > 1);
        assert_eq!(surface.committed(), Some(reply.markup.as_str()));
    }

    #[tokio::test]
    async fn test_user_cancel_mid_stream() {
        let backend = MockBackend::new(
            StreamScript::ChunksThenHang(vec!["data: Hel", "lo\n\n"]),
            SyncScript::Reply("unused"),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();
        let token = RequestToken::new();

        let canceller = token.clone();
        let cancel_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = orch.respond(&request(), &mut surface, &token).await;
        cancel_task.await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Cancelled {
                partial: "Hello".to_string()
            }
        );
        assert_eq!(orch.backend().calls(), (1, 0));
        assert_eq!(surface.committed(), None);
        assert!(matches!(
            surface.updates().last(),
            Some(SurfaceUpdate::Partial { text, .. }) if text == "Hello"
        ));
    }

    #[tokio::test]
    async fn test_sync_reply_records_both_attempts() {
        let backend = MockBackend::new(
            StreamScript::OpenFails(ProviderError::transport("Connection failed")),
            SyncScript::Reply("fine"),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();

        let reply = replied(
            orch.respond(&request(), &mut surface, &RequestToken::new())
                .await,
        );

        assert_eq!(reply.source, Strategy::Sync);
        assert_eq!(reply.attempts.len(), 2);
        assert_eq!(reply.attempts[0].strategy, Strategy::Stream);
        assert!(reply.attempts[0].error.is_some());
        assert_eq!(
            reply.attempts[1],
            Attempt {
                strategy: Strategy::Sync,
                error: None
            }
        );
    }

    #[tokio::test]
    async fn test_user_cancel_during_sync_skips_canned_reply() {
        let backend = MockBackend::new(
            StreamScript::OpenFails(ProviderError::transport("Connection failed")),
            SyncScript::Hang,
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();
        let token = RequestToken::new();

        let canceller = token.clone();
        let cancel_task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = orch.respond(&request(), &mut surface, &token).await;
        cancel_task.await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Cancelled {
                partial: String::new()
            }
        );
        assert_eq!(orch.backend().calls(), (1, 1));
        assert_eq!(surface.committed(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_moves_to_next_strategy() {
        let backend = MockBackend::new(
            StreamScript::ChunksThenHang(vec!["data: slow\n\n"]),
            SyncScript::Hang,
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();
        let token = RequestToken::new().with_timeout(Some(Duration::from_secs(5)));

        let reply = replied(orch.respond(&request(), &mut surface, &token).await);

        assert_eq!(reply.source, Strategy::Local);
        assert_eq!(orch.backend().calls(), (1, 1));
        for attempt in &reply.attempts[..2] {
            assert_eq!(
                attempt.error.as_ref().unwrap().kind,
                ProviderErrorKind::Timeout
            );
        }
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let backend = MockBackend::new(
            StreamScript::Chunks(vec!["data: [DONE]\n\n"]),
            SyncScript::Reply("unused"),
        );
        let mut orch = orchestrator(backend);
        let mut surface = RecordingSurface::new();
        let token = RequestToken::new();
        token.cancel();

        let outcome = orch.respond(&request(), &mut surface, &token).await;
        assert_eq!(
            outcome,
            Outcome::Cancelled {
                partial: String::new()
            }
        );
        assert_eq!(orch.backend().calls(), (0, 0));
        assert!(surface.updates().is_empty());
    }
}
