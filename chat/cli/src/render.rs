//! Terminal rendering of message snapshots
//!
//! The terminal is append-only, so the printer remembers how much of each
//! message it already wrote and emits only what changed since the last
//! snapshot: new messages in full, growing talk replies as their new suffix.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use maumfit_chat::{Attachments, DisplayMessage, MessageId, MessageKind, MessageRole};

const ASSISTANT_PREFIX: &str = "trainer> ";

/// Incremental printer for one session
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    /// Bytes of talk text already written, per open message
    written: HashMap<MessageId, usize>,
    /// Messages fully written
    done: HashSet<MessageId>,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything written, e.g. after a session reset
    pub fn clear(&mut self) {
        self.written.clear();
        self.done.clear();
    }

    /// Text to append to the terminal for this snapshot
    pub fn update(&mut self, messages: &[DisplayMessage]) -> String {
        let mut out = String::new();

        for msg in messages {
            if self.done.contains(&msg.id) {
                continue;
            }

            // The user's own line is already on screen
            if msg.role == MessageRole::User {
                self.done.insert(msg.id.clone());
                continue;
            }

            match msg.kind {
                MessageKind::Talk => self.write_talk(&mut out, msg),
                MessageKind::Recommend | MessageKind::HomeWorkout => {
                    if self.written.remove(&msg.id).is_some() {
                        out.push('\n');
                    }
                    out.push_str(&render_message(msg));
                    out.push('\n');
                    self.done.insert(msg.id.clone());
                }
            }
        }

        out
    }

    fn write_talk(&mut self, out: &mut String, msg: &DisplayMessage) {
        let written = match self.written.get(&msg.id) {
            Some(&n) => n,
            None => {
                if msg.text.is_empty() && msg.streaming {
                    return;
                }
                out.push_str(ASSISTANT_PREFIX);
                0
            }
        };

        out.push_str(msg.text.get(written..).unwrap_or_default());

        if msg.streaming {
            self.written.insert(msg.id.clone(), msg.text.len());
        } else {
            out.push('\n');
            self.written.remove(&msg.id);
            self.done.insert(msg.id.clone());
        }
    }
}

/// Full rendering of one message
pub fn render_message(msg: &DisplayMessage) -> String {
    let mut out = String::new();
    match msg.role {
        MessageRole::User => out.push_str("you> "),
        MessageRole::Assistant => out.push_str(ASSISTANT_PREFIX),
    }
    out.push_str(&msg.text);

    match &msg.attachments {
        Some(Attachments::Vouchers(vouchers)) => {
            for v in vouchers {
                let _ = write!(out, "\n  • {}", v.name);
                if !v.category.is_empty() {
                    let _ = write!(out, " [{}]", v.category);
                }
                if !v.facility_name.is_empty() {
                    let _ = write!(out, " @ {}", v.facility_name);
                }
                let _ = write!(out, " · {:.1}km · {}원", v.distance, v.price);
                if !v.telephone.is_empty() {
                    let _ = write!(out, " · ☎ {}", v.telephone);
                }
            }
        }
        Some(Attachments::Videos(videos)) => {
            for video in videos {
                let _ = write!(out, "\n  ▶ {} {}", video.title, video.watch_url());
            }
        }
        None => {}
    }

    out
}
