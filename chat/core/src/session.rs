//! Chat Session
//!
//! Owns one conversation as seen by a chat surface: the server-side session
//! key, the rendered message list and the exchange currently in flight.
//!
//! # Design Philosophy
//!
//! The session is the single owner of the message list. All mutations go
//! through the [`assembler`](crate::assembler) reducer, in the order updates
//! arrive, so a surface can render any snapshot it is handed without
//! coordinating with the stream.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::assembler::{ChatAction, MessageAssembler, Transcript};
use crate::backend::{ChatBackend, ChatRequest, GeoPoint, StreamUpdate};
use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::messages::{DisplayMessage, MessageId, SessionId};

/// Session state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Ready for input
    #[default]
    Idle,
    /// An exchange is in flight
    Streaming,
}

/// How a driven exchange ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The stream ended normally
    Completed,
    /// The exchange failed; the error message was appended
    Failed(String),
}

/// A chat conversation
#[derive(Clone, Debug)]
pub struct ChatSession {
    session_id: SessionId,
    member_id: Option<i64>,
    location: Option<GeoPoint>,
    transcript: Transcript,
    /// Assistant message of the in-flight exchange
    active: Option<MessageId>,
    state: SessionState,
    reset_greeting: String,
    error_message: String,
    exchanges: u32,
}

impl ChatSession {
    /// Open a session showing the configured greeting
    #[must_use]
    pub fn new(config: &ChatConfig) -> Self {
        let mut transcript = Transcript::new(MessageAssembler::new(config.terminal_placement));
        transcript.apply(&ChatAction::Reset {
            greeting: config.greeting.clone(),
        });

        Self {
            session_id: SessionId::new(),
            member_id: config.member_id,
            location: config.location(),
            transcript,
            active: None,
            state: SessionState::Idle,
            reset_greeting: config.reset_greeting.clone(),
            error_message: config.error_message.clone(),
            exchanges: 0,
        }
    }

    /// Server-side session key
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Logged-in member, if any
    #[must_use]
    pub fn member_id(&self) -> Option<i64> {
        self.member_id
    }

    /// Set the logged-in member
    pub fn set_member_id(&mut self, member_id: Option<i64>) {
        self.member_id = member_id;
    }

    /// User location sent with requests
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        self.location
    }

    /// Update the user location
    pub fn set_location(&mut self, location: Option<GeoPoint>) {
        self.location = location;
    }

    /// Current message snapshot
    #[must_use]
    pub fn messages(&self) -> &[DisplayMessage] {
        self.transcript.messages()
    }

    /// Assistant message of the in-flight exchange
    #[must_use]
    pub fn active_id(&self) -> Option<&MessageId> {
        self.active.as_ref()
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether an exchange is in flight
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Exchanges started since the session opened
    #[must_use]
    pub fn exchange_count(&self) -> u32 {
        self.exchanges
    }

    /// Start an exchange for user input
    ///
    /// Appends the user message and an open assistant placeholder, and
    /// returns the request to send.
    ///
    /// # Errors
    ///
    /// [`ChatError::EmptyInput`] for whitespace-only input and
    /// [`ChatError::Busy`] while another exchange is in flight. The message
    /// list is unchanged in both cases.
    pub fn submit(&mut self, text: &str) -> Result<ChatRequest, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        if self.is_streaming() {
            return Err(ChatError::Busy);
        }

        let assistant_id = MessageId::new();
        self.transcript.apply(&ChatAction::SubmitUser {
            user_id: MessageId::new(),
            assistant_id: assistant_id.clone(),
            text: text.to_string(),
        });
        debug!(session = %self.session_id, active = %assistant_id, "Exchange started");

        self.active = Some(assistant_id);
        self.state = SessionState::Streaming;
        self.exchanges += 1;

        Ok(ChatRequest::new(self.session_id.clone(), text)
            .with_location(self.location)
            .with_member_id(self.member_id))
    }

    /// Apply a decoded event to the in-flight exchange
    ///
    /// Returns false if no exchange is in flight (the event is dropped).
    pub fn apply_event(&mut self, event: ChatEvent) -> bool {
        let Some(active_id) = self.active.clone() else {
            debug!("Dropping chat event with no exchange in flight");
            return false;
        };

        self.transcript.apply(&ChatAction::Apply { active_id, event });
        true
    }

    /// Apply one update from a backend channel
    ///
    /// Returns true while the exchange continues.
    pub fn apply_update(&mut self, update: StreamUpdate) -> bool {
        match update {
            StreamUpdate::Event(event) => self.apply_event(event) && self.is_streaming(),
            StreamUpdate::Complete => {
                self.complete();
                false
            }
            StreamUpdate::Error(reason) => {
                self.fail(&reason);
                false
            }
        }
    }

    /// Close the in-flight exchange after a normal end of stream
    pub fn complete(&mut self) {
        if let Some(active_id) = self.active.take() {
            self.transcript.apply(&ChatAction::Complete {
                active_id: active_id.clone(),
            });
            info!(session = %self.session_id, active = %active_id, "Exchange complete");
        }
        self.state = SessionState::Idle;
    }

    /// Close the in-flight exchange and append the error message
    pub fn fail(&mut self, reason: &str) {
        warn!(session = %self.session_id, reason, "Exchange failed");

        if let Some(active_id) = self.active.take() {
            self.transcript.apply(&ChatAction::Complete { active_id });
        }
        self.transcript.apply(&ChatAction::Fail {
            id: MessageId::new(),
            text: self.error_message.clone(),
        });
        self.state = SessionState::Idle;
    }

    /// Abandon the in-flight exchange
    ///
    /// The active message is closed but keeps whatever text it already has.
    pub fn cancel(&mut self) {
        if let Some(active_id) = self.active.take() {
            info!(session = %self.session_id, active = %active_id, "Exchange cancelled");
            self.transcript.apply(&ChatAction::Complete { active_id });
        }
        self.state = SessionState::Idle;
    }

    /// Start over with a fresh session id and the reset greeting
    ///
    /// Returns the new session id.
    pub fn reset(&mut self) -> SessionId {
        self.cancel();
        let previous = std::mem::take(&mut self.session_id);
        self.transcript.apply(&ChatAction::Reset {
            greeting: self.reset_greeting.clone(),
        });
        info!(previous = %previous, session = %self.session_id, "Session reset");
        self.session_id.clone()
    }

    /// Reset locally, then ask the backend to forget the old conversation
    ///
    /// A backend failure is logged and does not undo the local reset.
    pub async fn reset_with<B>(&mut self, backend: &B) -> SessionId
    where
        B: ChatBackend + ?Sized,
    {
        let previous = self.session_id.clone();
        let session_id = self.reset();

        if let Err(e) = backend.reset_session(&previous).await {
            warn!(
                backend = backend.name(),
                session = %previous,
                error = %e,
                "Failed to reset server session"
            );
        }

        session_id
    }

    /// Drive one exchange end to end
    ///
    /// `observer` is called with the message list after the user message is
    /// added and after every applied update. Dropping the returned future
    /// cancels the exchange; call [`cancel`](Self::cancel) afterwards.
    ///
    /// # Errors
    ///
    /// Only the input guard errors of [`submit`](Self::submit). Transport
    /// failures are reported as [`ExchangeOutcome::Failed`].
    pub async fn run_exchange<B, F>(
        &mut self,
        backend: &B,
        text: &str,
        mut observer: F,
    ) -> Result<ExchangeOutcome, ChatError>
    where
        B: ChatBackend + ?Sized,
        F: FnMut(&[DisplayMessage]),
    {
        let request = self.submit(text)?;
        observer(self.messages());

        let mut rx = match backend.send_streaming(&request).await {
            Ok(rx) => rx,
            Err(e) => {
                let reason = e.to_string();
                self.fail(&reason);
                observer(self.messages());
                return Ok(ExchangeOutcome::Failed(reason));
            }
        };

        while let Some(update) = rx.recv().await {
            let failure = match &update {
                StreamUpdate::Error(reason) => Some(reason.clone()),
                _ => None,
            };
            let more = self.apply_update(update);
            observer(self.messages());

            if let Some(reason) = failure {
                return Ok(ExchangeOutcome::Failed(reason));
            }
            if !more && !self.is_streaming() {
                return Ok(ExchangeOutcome::Completed);
            }
        }

        let reason = "chat stream closed without completion".to_string();
        self.fail(&reason);
        observer(self.messages());
        Ok(ExchangeOutcome::Failed(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::spawn_event_forwarder;
    use crate::config::{DEFAULT_ERROR_MESSAGE, DEFAULT_GREETING, DEFAULT_RESET_GREETING};
    use crate::messages::{MessageKind, MessageRole};
    use async_trait::async_trait;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Replies with canned byte chunks, optionally failing after them
    struct ScriptedBackend {
        chunks: Vec<&'static str>,
        fail_with: Option<&'static str>,
        requests: Mutex<Vec<ChatRequest>>,
        resets: Mutex<Vec<SessionId>>,
        reset_fails: bool,
    }

    impl ScriptedBackend {
        fn new(chunks: Vec<&'static str>) -> Self {
            Self {
                chunks,
                fail_with: None,
                requests: Mutex::new(Vec::new()),
                resets: Mutex::new(Vec::new()),
                reset_fails: false,
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send_streaming(
            &self,
            request: &ChatRequest,
        ) -> Result<mpsc::Receiver<StreamUpdate>, ChatError> {
            self.requests.lock().unwrap().push(request.clone());

            let mut items: Vec<Result<Vec<u8>, String>> = self
                .chunks
                .iter()
                .map(|c| Ok(c.as_bytes().to_vec()))
                .collect();
            if let Some(reason) = self.fail_with {
                items.push(Err(reason.to_string()));
            }
            Ok(spawn_event_forwarder(stream::iter(items), 8))
        }

        async fn reset_session(&self, session_id: &SessionId) -> Result<(), ChatError> {
            self.resets.lock().unwrap().push(session_id.clone());
            if self.reset_fails {
                return Err(ChatError::Status {
                    status: 500,
                    body: "down".to_string(),
                });
            }
            Ok(())
        }
    }

    fn session() -> ChatSession {
        ChatSession::new(&ChatConfig::default())
    }

    #[test]
    fn test_new_session_shows_greeting() {
        let session = session();
        assert_eq!(session.messages(), &[DisplayMessage::greeting(DEFAULT_GREETING)]);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.active_id().is_none());
    }

    #[test]
    fn test_submit_builds_request() {
        let config = ChatConfig {
            member_id: Some(42),
            lat: Some(37.5),
            lng: Some(127.0),
            ..ChatConfig::default()
        };
        let mut session = ChatSession::new(&config);

        let request = session.submit("  하체 운동 추천해줘  ").unwrap();
        assert_eq!(&request.session_id, session.session_id());
        assert_eq!(request.user_message, "하체 운동 추천해줘");
        assert_eq!(request.member_id, Some(42));
        assert_eq!(request.lat, Some(37.5));
        assert_eq!(request.lng, Some(127.0));

        assert!(session.is_streaming());
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].role, MessageRole::User);
        assert_eq!(session.active_id(), Some(&session.messages()[2].id));
    }

    #[test]
    fn test_input_guard() {
        let mut session = session();
        assert!(matches!(session.submit("   "), Err(ChatError::EmptyInput)));
        assert_eq!(session.messages().len(), 1);

        session.submit("first").unwrap();
        let before = session.messages().to_vec();
        assert!(matches!(session.submit("second"), Err(ChatError::Busy)));
        assert_eq!(session.messages(), before.as_slice());
    }

    #[test]
    fn test_updates_drive_exchange() {
        let mut session = session();
        session.submit("hi").unwrap();

        assert!(session.apply_update(StreamUpdate::Event(ChatEvent::talk("Hel"))));
        assert!(session.apply_update(StreamUpdate::Event(ChatEvent::talk("lo"))));
        assert!(!session.apply_update(StreamUpdate::Complete));

        let last = session.messages().last().unwrap();
        assert_eq!(last.text, "Hello");
        assert!(!last.streaming);
        assert!(!session.is_streaming());

        // Nothing in flight: events are dropped
        assert!(!session.apply_event(ChatEvent::talk("late")));
        assert_eq!(session.messages().last().unwrap().text, "Hello");
    }

    #[test]
    fn test_error_closes_active_and_appends_message() {
        let mut session = session();
        session.submit("hi").unwrap();
        session.apply_update(StreamUpdate::Event(ChatEvent::talk("partial")));
        session.apply_update(StreamUpdate::Error("reset by peer".to_string()));

        let messages = session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].text, "partial");
        assert!(!messages[2].streaming);
        assert_eq!(messages[3].text, DEFAULT_ERROR_MESSAGE);
        assert!(!messages[3].streaming);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_cancel_closes_active_message() {
        let mut session = session();
        session.submit("hi").unwrap();
        session.apply_event(ChatEvent::talk("half"));
        let before = session.messages().to_vec();

        session.cancel();
        let after = session.messages();
        assert_eq!(after.len(), before.len());
        assert_eq!(&after[..after.len() - 1], &before[..before.len() - 1]);

        let last = after.last().unwrap();
        assert_eq!(last.text, "half");
        assert!(!last.streaming);
        assert!(after.iter().all(|m| !m.streaming));
        assert!(!session.is_streaming());

        session.submit("again").unwrap();
        assert_eq!(session.messages().iter().filter(|m| m.streaming).count(), 1);
    }

    #[test]
    fn test_cancel_before_any_event_closes_placeholder() {
        let mut session = session();
        session.submit("hi").unwrap();

        session.cancel();
        let last = session.messages().last().unwrap();
        assert!(last.text.is_empty());
        assert!(!last.streaming);
    }

    #[test]
    fn test_reset_twice() {
        let mut session = session();
        session.submit("hi").unwrap();
        let original = session.session_id().clone();

        let first = session.reset();
        let after_first = session.messages().to_vec();
        let second = session.reset();

        assert_ne!(first, original);
        assert_ne!(first, second);
        assert_eq!(after_first, session.messages());
        assert_eq!(
            session.messages(),
            &[DisplayMessage::greeting(DEFAULT_RESET_GREETING)]
        );
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_run_exchange_with_recommend() {
        let backend = ScriptedBackend::new(vec![
            "data: {\"type\":\"talk\",\"chunk\":\"Hi\"}\n",
            "data: {\"type\":\"talk\",\"chunk\":\" there\"}\n",
            "data:{\"type\":\"recommend\",\"message\":\"Try this\",\"vouchers\":[{\"id\":1}]}\n",
        ]);
        let mut session = session();
        let mut snapshots = 0;

        let outcome = session
            .run_exchange(&backend, "recommend", |_| snapshots += 1)
            .await
            .unwrap();

        assert_eq!(outcome, ExchangeOutcome::Completed);
        assert!(snapshots >= 4);

        let messages = session.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].text, "Hi there");
        assert!(!messages[2].streaming);
        assert_eq!(messages[3].kind, MessageKind::Recommend);
        assert_eq!(messages[3].attachments.as_ref().map(|a| a.len()), Some(1));

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_message, "recommend");
    }

    #[tokio::test]
    async fn test_run_exchange_transport_error() {
        let mut backend = ScriptedBackend::new(vec!["data: {\"type\":\"talk\",\"chunk\":\"partial\"}\n"]);
        backend.fail_with = Some("connection reset");
        let mut session = session();

        let outcome = session.run_exchange(&backend, "hi", |_| {}).await.unwrap();
        assert!(matches!(outcome, ExchangeOutcome::Failed(ref r) if r.contains("connection reset")));

        let messages = session.messages();
        assert_eq!(messages[2].text, "partial");
        assert!(!messages[2].streaming);
        assert_eq!(messages[3].text, DEFAULT_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_run_exchange_rejects_empty_input() {
        let backend = ScriptedBackend::new(vec![]);
        let mut session = session();
        let result = session.run_exchange(&backend, "\n", |_| {}).await;
        assert!(matches!(result, Err(ChatError::EmptyInput)));
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_with_backend_failure_still_resets() {
        let mut backend = ScriptedBackend::new(vec![]);
        backend.reset_fails = true;
        let mut session = session();
        let old = session.session_id().clone();

        let new = session.reset_with(&backend).await;
        assert_ne!(new, old);
        assert_eq!(backend.resets.lock().unwrap().as_slice(), &[old]);
        assert_eq!(session.messages().len(), 1);
    }
}
