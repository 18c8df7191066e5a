//! Message Assembler
//!
//! A pure reducer folding chat actions into the next message list snapshot:
//!
//! ```text
//! (Vec<DisplayMessage>, &ChatAction) -> Vec<DisplayMessage>
//! ```
//!
//! No hidden state: ids are generated by the caller and carried inside the
//! actions, so every transition is reproducible in a test.
//!
//! # Rules
//!
//! - Talk fragments are appended only while the target is an open talk
//!   message. Once the exchange is closed or the target turned terminal,
//!   trailing fragments are dropped.
//! - A terminal event (`Recommend` / `HomeWorkout`) closes the active message.
//!   With partial talk text present it becomes a separate message placed right
//!   after the closed talk message; otherwise it fills the placeholder.
//! - An event whose target id is missing is appended as a new message under
//!   that id. Data is never dropped for lack of a target.
//! - Unknown events are no-ops.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::ChatEvent;
use crate::messages::{Attachments, DisplayMessage, MessageId, MessageKind, MessageRole};

/// Where a terminal payload goes when partial talk text already streamed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalPlacement {
    /// Close the talk message and append the payload as its own message
    #[default]
    AppendSeparate,
    /// Overwrite the talk message with the payload, losing the partial text
    ReplaceInPlace,
}

impl std::str::FromStr for TerminalPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "append_separate" | "append" => Ok(Self::AppendSeparate),
            "replace_in_place" | "replace" => Ok(Self::ReplaceInPlace),
            other => Err(format!("unknown terminal placement: {other}")),
        }
    }
}

/// Inputs to the reducer
#[derive(Clone, Debug, PartialEq)]
pub enum ChatAction {
    /// User submitted input; opens a new exchange
    SubmitUser {
        /// Id for the user message
        user_id: MessageId,
        /// Id for the assistant placeholder (the new active message)
        assistant_id: MessageId,
        /// The submitted text
        text: String,
    },

    /// A decoded server event for the active message
    Apply {
        /// Active message of the exchange
        active_id: MessageId,
        /// The event
        event: ChatEvent,
    },

    /// Stream ended without a terminal event
    Complete {
        /// Active message of the exchange
        active_id: MessageId,
    },

    /// Exchange failed; show an error message
    Fail {
        /// Id for the error message
        id: MessageId,
        /// Error text shown to the user
        text: String,
    },

    /// Start over with a single greeting
    Reset {
        /// Greeting text
        greeting: String,
    },
}

/// The reducer, parameterized by terminal placement
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageAssembler {
    placement: TerminalPlacement,
}

impl MessageAssembler {
    /// Create an assembler
    #[must_use]
    pub fn new(placement: TerminalPlacement) -> Self {
        Self { placement }
    }

    /// Configured placement
    #[must_use]
    pub fn placement(&self) -> TerminalPlacement {
        self.placement
    }

    /// Apply one action and return the next snapshot
    #[must_use]
    pub fn reduce(
        &self,
        mut messages: Vec<DisplayMessage>,
        action: &ChatAction,
    ) -> Vec<DisplayMessage> {
        match action {
            ChatAction::SubmitUser {
                user_id,
                assistant_id,
                text,
            } => {
                messages.push(DisplayMessage::user(user_id.clone(), text.clone()));
                messages.push(DisplayMessage::placeholder(assistant_id.clone()));
                messages
            }
            ChatAction::Apply { active_id, event } => self.apply_event(messages, active_id, event),
            ChatAction::Complete { active_id } => {
                match messages.iter_mut().find(|m| &m.id == active_id) {
                    Some(msg) => msg.streaming = false,
                    None => debug!(id = %active_id, "Completed exchange has no message"),
                }
                messages
            }
            ChatAction::Fail { id, text } => {
                messages.push(DisplayMessage::assistant(id.clone(), text.clone()));
                messages
            }
            ChatAction::Reset { greeting } => vec![DisplayMessage::greeting(greeting.clone())],
        }
    }

    fn apply_event(
        &self,
        mut messages: Vec<DisplayMessage>,
        active_id: &MessageId,
        event: &ChatEvent,
    ) -> Vec<DisplayMessage> {
        if event.kind().is_none() {
            debug!(id = %active_id, "Ignoring chat event of unknown kind");
            return messages;
        }

        let Some(idx) = messages.iter().position(|m| &m.id == active_id) else {
            warn!(id = %active_id, "Event target missing, appending as new message");
            messages.push(message_from_event(active_id.clone(), event));
            return messages;
        };

        match event {
            ChatEvent::Talk { text_fragment } => {
                let target = &mut messages[idx];
                if target.accepts_fragments() {
                    target.text.push_str(text_fragment);
                } else {
                    debug!(
                        id = %active_id,
                        kind = target.kind.as_str(),
                        "Dropping talk fragment for closed message"
                    );
                }
            }
            ChatEvent::Recommend { .. } | ChatEvent::HomeWorkout { .. } => {
                self.apply_terminal(&mut messages, idx, event);
            }
            ChatEvent::Unknown => {}
        }

        messages
    }

    fn apply_terminal(&self, messages: &mut Vec<DisplayMessage>, idx: usize, event: &ChatEvent) {
        let Some((kind, summary, attachments)) = terminal_parts(event) else {
            return;
        };

        let target = &messages[idx];
        let in_place = target.accepts_fragments()
            && (target.text.is_empty() || self.placement == TerminalPlacement::ReplaceInPlace);

        if in_place {
            let target = &mut messages[idx];
            target.kind = kind;
            target.text = summary;
            target.attachments = Some(attachments);
            target.streaming = false;
            return;
        }

        let active_id = messages[idx].id.clone();
        messages[idx].streaming = false;

        let id = unique_derived_id(messages, &active_id, kind.as_str());
        let prefix = format!("{}-", active_id.as_str());
        let mut at = idx + 1;
        while at < messages.len() && messages[at].id.as_str().starts_with(&prefix) {
            at += 1;
        }

        messages.insert(
            at,
            DisplayMessage {
                id,
                role: MessageRole::Assistant,
                kind,
                text: summary,
                attachments: Some(attachments),
                streaming: false,
            },
        );
    }
}

/// Apply one action with the default (append-separate) placement
#[must_use]
pub fn reduce(messages: Vec<DisplayMessage>, action: &ChatAction) -> Vec<DisplayMessage> {
    MessageAssembler::default().reduce(messages, action)
}

/// Owned message list driven through a [`MessageAssembler`]
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<DisplayMessage>,
    assembler: MessageAssembler,
}

impl Transcript {
    /// Empty transcript
    #[must_use]
    pub fn new(assembler: MessageAssembler) -> Self {
        Self {
            messages: Vec::new(),
            assembler,
        }
    }

    /// Apply an action in place
    pub fn apply(&mut self, action: &ChatAction) {
        let messages = std::mem::take(&mut self.messages);
        self.messages = self.assembler.reduce(messages, action);
    }

    /// Current snapshot
    #[must_use]
    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    /// Look up a message
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&DisplayMessage> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Last message, if any
    #[must_use]
    pub fn last(&self) -> Option<&DisplayMessage> {
        self.messages.last()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn terminal_parts(event: &ChatEvent) -> Option<(MessageKind, String, Attachments)> {
    match event {
        ChatEvent::Recommend { summary, items } => Some((
            MessageKind::Recommend,
            summary.clone(),
            Attachments::Vouchers(items.clone()),
        )),
        ChatEvent::HomeWorkout { summary, videos } => Some((
            MessageKind::HomeWorkout,
            summary.clone(),
            Attachments::Videos(videos.clone()),
        )),
        ChatEvent::Talk { .. } | ChatEvent::Unknown => None,
    }
}

fn message_from_event(id: MessageId, event: &ChatEvent) -> DisplayMessage {
    match terminal_parts(event) {
        Some((kind, text, attachments)) => DisplayMessage {
            id,
            role: MessageRole::Assistant,
            kind,
            text,
            attachments: Some(attachments),
            streaming: false,
        },
        None => {
            let mut msg = DisplayMessage::placeholder(id);
            if let ChatEvent::Talk { text_fragment } = event {
                msg.text.push_str(text_fragment);
            }
            msg
        }
    }
}

fn unique_derived_id(messages: &[DisplayMessage], base: &MessageId, suffix: &str) -> MessageId {
    let taken = |id: &MessageId| messages.iter().any(|m| &m.id == id);

    let candidate = base.derived(suffix);
    if !taken(&candidate) {
        return candidate;
    }

    (2..)
        .map(|n| base.derived(&format!("{suffix}-{n}")))
        .find(|id| !taken(id))
        .unwrap_or_else(MessageId::new)
}
