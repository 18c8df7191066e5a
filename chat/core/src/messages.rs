//! Display Messages
//!
//! The units a chat surface renders. Every snapshot produced by the
//! [`assembler`](crate::assembler) is a `Vec<DisplayMessage>`; surfaces should
//! not hold any chat logic of their own, only render what they are handed.
//!
//! # Lifecycle
//!
//! A user message is created closed the instant input is submitted. The
//! assistant reply starts as an open (`streaming = true`) talk placeholder and
//! is mutated in place by each event of the exchange until the stream ends or
//! a terminal event closes it.

use serde::{Deserialize, Deserializer, Serialize};

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Id shared by every greeting message
    #[must_use]
    pub fn welcome() -> Self {
        Self("welcome".to_string())
    }

    /// Id for a message split off from this one (`{id}-{suffix}`)
    #[must_use]
    pub fn derived(&self, suffix: &str) -> Self {
        Self(format!("{}-{suffix}", self.0))
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Session identifier
///
/// Sent as `sessionId` with every chat request. Not cryptographically
/// significant, only collision resistant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unique session ID (UUID v4)
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The person chatting
    User,
    /// The AI trainer
    Assistant,
}

/// How a message should be rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Free-form text, possibly still growing
    #[default]
    Talk,
    /// Voucher recommendation card
    Recommend,
    /// Home workout video list
    HomeWorkout,
}

impl MessageKind {
    /// Whether this kind closes talk accumulation for its exchange
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Recommend | Self::HomeWorkout)
    }

    /// Wire name of the kind
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Talk => "talk",
            Self::Recommend => "recommend",
            Self::HomeWorkout => "home_workout",
        }
    }
}

/// Deserialize an explicit `null` as the type's default
///
/// `#[serde(default)]` alone only covers a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A sports voucher attached to a recommendation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    /// Voucher id
    pub id: i64,
    /// Program name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Sport category
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    /// Distance from the user, as reported by the backend
    #[serde(default, deserialize_with = "null_as_default")]
    pub distance: f64,
    /// Price in won; the backend sends integers or floats
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    /// Facility running the program
    #[serde(default, deserialize_with = "null_as_default")]
    pub facility_name: String,
    /// Free-form description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Contact number
    #[serde(default, deserialize_with = "null_as_default")]
    pub telephone: String,
}

/// A workout video attached to a home workout reply
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Video title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// YouTube video code
    #[serde(default, deserialize_with = "null_as_default")]
    pub youtube_code: String,
}

impl Video {
    /// Watch URL for the video
    #[must_use]
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.youtube_code)
    }
}

/// Items attached to a terminal message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attachments {
    /// Recommended vouchers
    Vouchers(Vec<Voucher>),
    /// Workout videos
    Videos(Vec<Video>),
}

impl Attachments {
    /// Number of attached items
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Vouchers(v) => v.len(),
            Self::Videos(v) => v.len(),
        }
    }

    /// Whether nothing is attached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A message as rendered by a chat surface
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayMessage {
    /// Stable unique id, assigned at creation
    pub id: MessageId,
    /// Author
    pub role: MessageRole,
    /// Render kind
    pub kind: MessageKind,
    /// Accumulated display text
    pub text: String,
    /// Vouchers or videos (terminal kinds only)
    pub attachments: Option<Attachments>,
    /// True while more fragments are expected
    pub streaming: bool,
}

impl DisplayMessage {
    /// Closed user message
    #[must_use]
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            kind: MessageKind::Talk,
            text: text.into(),
            attachments: None,
            streaming: false,
        }
    }

    /// Closed assistant talk message
    #[must_use]
    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            kind: MessageKind::Talk,
            text: text.into(),
            attachments: None,
            streaming: false,
        }
    }

    /// Empty open assistant placeholder
    #[must_use]
    pub fn placeholder(id: MessageId) -> Self {
        Self {
            streaming: true,
            ..Self::assistant(id, String::new())
        }
    }

    /// Greeting shown at the top of a fresh session
    #[must_use]
    pub fn greeting(text: impl Into<String>) -> Self {
        Self::assistant(MessageId::welcome(), text)
    }

    /// Whether the message has reached a terminal kind
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Whether talk fragments may still be appended
    #[must_use]
    pub fn accepts_fragments(&self) -> bool {
        self.kind == MessageKind::Talk && self.streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::new().as_str().len(), 36);
    }

    #[test]
    fn test_derived_id() {
        let id = MessageId::from("abc");
        assert_eq!(id.derived("recommend").as_str(), "abc-recommend");
    }

    #[test]
    fn test_placeholder_accepts_fragments() {
        let msg = DisplayMessage::placeholder(MessageId::new());
        assert!(msg.streaming);
        assert!(msg.accepts_fragments());
        assert!(msg.text.is_empty());
        assert_eq!(msg.role, MessageRole::Assistant);

        let closed = DisplayMessage::assistant(MessageId::new(), "done");
        assert!(!closed.accepts_fragments());
    }

    #[test]
    fn test_voucher_partial_fields_default() {
        let voucher: Voucher = serde_json::from_str(r#"{"id":1,"facilityName":"Gym"}"#).unwrap();
        assert_eq!(voucher.id, 1);
        assert_eq!(voucher.facility_name, "Gym");
        assert!(voucher.name.is_empty());
        assert!(voucher.price.abs() < f64::EPSILON);
    }

    #[test]
    fn test_voucher_tolerates_null_and_float_fields() {
        let voucher: Voucher = serde_json::from_str(
            r#"{"id":3,"name":null,"category":"수영","distance":null,"price":30000.0,"facilityName":"Pool","description":null,"telephone":null}"#,
        )
        .unwrap();
        assert_eq!(voucher.id, 3);
        assert!(voucher.name.is_empty());
        assert_eq!(voucher.category, "수영");
        assert!(voucher.distance.abs() < f64::EPSILON);
        assert!((voucher.price - 30000.0).abs() < f64::EPSILON);
        assert!(voucher.telephone.is_empty());

        let integer: Voucher = serde_json::from_str(r#"{"id":4,"price":15000}"#).unwrap();
        assert!((integer.price - 15000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_voucher_requires_id() {
        assert!(serde_json::from_str::<Voucher>(r#"{"name":"Swim"}"#).is_err());
        assert!(serde_json::from_str::<Voucher>(r#"{"id":null}"#).is_err());
    }

    #[test]
    fn test_video_watch_url() {
        let video: Video =
            serde_json::from_str(r#"{"title":"Stretch","youtubeCode":"abc123"}"#).unwrap();
        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_kind_terminality() {
        assert!(!MessageKind::Talk.is_terminal());
        assert!(MessageKind::Recommend.is_terminal());
        assert!(MessageKind::HomeWorkout.is_terminal());
        assert_eq!(MessageKind::HomeWorkout.as_str(), "home_workout");
    }
}
