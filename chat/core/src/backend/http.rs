//! HTTP Chat Backend
//!
//! Talks to the maumfit trainer service.
//!
//! # Endpoints
//!
//! - `POST /api/chat` - send a message; the reply streams back as
//!   `text/event-stream` with one `data:` record per event
//! - `DELETE /api/chat/{sessionId}` - forget the server-side conversation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::forward::spawn_event_forwarder;
use super::traits::{ChatBackend, ChatRequest, StreamUpdate};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::messages::SessionId;

/// Default channel capacity between the forwarding task and the session
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// HTTP backend client
#[derive(Clone)]
pub struct HttpChatBackend {
    /// Service root, without trailing slash
    base_url: String,
    /// Capacity of the per-exchange update channel
    channel_capacity: usize,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpChatBackend {
    /// Create a backend for a service root
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            http_client,
        })
    }

    /// Create from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let mut backend = Self::new(config.base_url.clone(), config.request_timeout)?;
        backend.channel_capacity = config.channel_capacity;
        Ok(backend)
    }

    /// Service root
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat endpoint URL
    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Session reset endpoint URL
    fn reset_url(&self, session_id: &SessionId) -> String {
        format!("{}/api/chat/{}", self.base_url, session_id)
    }
}

/// Turn a non-success response into [`ChatError::Status`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ChatError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn send_streaming(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamUpdate>, ChatError> {
        let url = self.chat_url();
        info!(
            session = %request.session_id,
            has_location = request.lat.is_some(),
            "Sending chat message"
        );

        let response = self
            .http_client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;
        debug!(status = %response.status(), "Chat stream opened");

        Ok(spawn_event_forwarder(
            response.bytes_stream(),
            self.channel_capacity,
        ))
    }

    async fn reset_session(&self, session_id: &SessionId) -> Result<(), ChatError> {
        let response = self
            .http_client
            .delete(self.reset_url(session_id))
            .send()
            .await?;

        check_status(response).await?;
        info!(session = %session_id, "Server session reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let backend =
            HttpChatBackend::new("https://api.maumfit.co.kr/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "https://api.maumfit.co.kr");
        assert_eq!(backend.chat_url(), "https://api.maumfit.co.kr/api/chat");
        assert_eq!(
            backend.reset_url(&SessionId("abc".to_string())),
            "https://api.maumfit.co.kr/api/chat/abc"
        );
    }

    #[test]
    fn test_from_config() {
        let config = ChatConfig {
            base_url: "http://localhost:8080".to_string(),
            channel_capacity: 8,
            ..ChatConfig::default()
        };
        let backend = HttpChatBackend::from_config(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(backend.channel_capacity, 8);
        assert_eq!(backend.name(), "http");
    }
}
