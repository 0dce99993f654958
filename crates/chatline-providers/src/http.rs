//! HTTP transport for the chat endpoints.

use std::time::Duration;

use chatline_types::{ChatReply, ChatRequest, EventStream, ProviderError, ProviderResult};
use futures_util::StreamExt;
use url::Url;

use crate::ChatBackend;
use crate::shared::{USER_AGENT, classify_reqwest_error};
use crate::sse::SseParser;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_STREAM_PATH: &str = "/api/chat/stream";
pub const DEFAULT_CHAT_PATH: &str = "/api/chat";
const CONVERSATION_PATH: &str = "/api/conversation";

/// Endpoint settings for [`HttpBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub stream_path: String,
    pub chat_path: String,
    pub connect_timeout: Option<Duration>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            connect_timeout: None,
        }
    }
}

/// Chat backend speaking JSON + event-stream over HTTP.
pub struct HttpBackend {
    config: HttpBackendConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Creates a backend for the given endpoint.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: HttpBackendConfig) -> ProviderResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().map_err(|e| classify_reqwest_error(&e))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `user_id` is a single path segment, percent-encoded.
    fn conversation_url(&self, user_id: &str) -> ProviderResult<Url> {
        let mut url = Url::parse(&self.url(CONVERSATION_PATH))
            .map_err(|e| ProviderError::transport(format!("Invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::transport("Base URL cannot carry a path"))?
            .push(user_id);
        Ok(url)
    }

    /// Clears the server-side conversation history for `user_id`.
    ///
    /// # Errors
    /// Returns a `ProviderError` on transport failure or non-2xx status.
    pub async fn clear_conversation(&self, user_id: &str) -> ProviderResult<()> {
        let url = self.conversation_url(user_id)?;
        tracing::debug!(%url, "clearing conversation");
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::http_status(status.as_u16(), &body))
}

impl ChatBackend for HttpBackend {
    async fn open_stream(&self, request: &ChatRequest) -> ProviderResult<EventStream> {
        let url = self.url(&self.config.stream_path);
        tracing::debug!(%url, "opening stream");
        let response = self
            .http
            .post(&url)
            .header("accept", "text/event-stream")
            .header("cache-control", "no-cache")
            .json(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let response = ensure_success(response).await?;

        Ok(SseParser::new(response.bytes_stream().boxed()).boxed())
    }

    async fn send(&self, request: &ChatRequest) -> ProviderResult<ChatReply> {
        let url = self.url(&self.config.chat_path);
        tracing::debug!(%url, "sending synchronous request");
        let response = self
            .http
            .post(&url)
            .header("accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let response = ensure_success(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        serde_json::from_str::<ChatReply>(&body).map_err(|e| {
            ProviderError::protocol(format!("Failed to parse chat reply: {e}")).with_details(body)
        })
    }
}
