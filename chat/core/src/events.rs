//! Chat Events
//!
//! Typed records decoded from the chat response stream. Each `data:` line of
//! the stream carries one JSON object discriminated by `type`:
//!
//! ```text
//! data: {"type":"talk","chunk":"Hel"}
//! data: {"type":"recommend","message":"Try this","vouchers":[...]}
//! data: {"type":"home_workout","message":"At home","videos":[...]}
//! ```

use serde::{Deserialize, Serialize};

use crate::messages::{null_as_default, MessageKind, Video, Voucher};

/// One event of a streamed assistant reply
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Incremental text belonging to a free-form reply
    Talk {
        /// Text to append
        #[serde(rename = "chunk")]
        text_fragment: String,
    },

    /// Completed voucher recommendation (terminal)
    Recommend {
        /// Summary text shown above the cards
        #[serde(rename = "message", default, deserialize_with = "null_as_default")]
        summary: String,
        /// Recommended vouchers
        #[serde(rename = "vouchers", default, deserialize_with = "null_as_default")]
        items: Vec<Voucher>,
    },

    /// Completed home workout suggestion (terminal)
    HomeWorkout {
        /// Summary text shown above the videos
        #[serde(rename = "message", default, deserialize_with = "null_as_default")]
        summary: String,
        /// Workout videos
        #[serde(default, deserialize_with = "null_as_default")]
        videos: Vec<Video>,
    },

    /// Discriminator outside the known kinds; ignored by the assembler
    #[serde(other)]
    Unknown,
}

impl ChatEvent {
    /// Talk event from a fragment
    pub fn talk(fragment: impl Into<String>) -> Self {
        Self::Talk {
            text_fragment: fragment.into(),
        }
    }

    /// Message kind this event produces, `None` for unknown events
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::Talk { .. } => Some(MessageKind::Talk),
            Self::Recommend { .. } => Some(MessageKind::Recommend),
            Self::HomeWorkout { .. } => Some(MessageKind::HomeWorkout),
            Self::Unknown => None,
        }
    }

    /// Whether this event closes talk accumulation
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind().is_some_and(MessageKind::is_terminal)
    }
}
