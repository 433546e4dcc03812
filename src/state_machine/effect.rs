//! Effects produced by state transitions

use super::state::{CallPhase, Subtitle};
use crate::backend::ChatMessage;
use crate::session::{HistoryEntry, Session, SessionSummary, Turn};
use std::time::Duration;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the one-second elapsed clock
    StartClock,
    StopClock,

    /// Register the session with the backend (best-effort)
    OpenSession,

    /// Ask the backend for the next tutor line
    RequestReply { history: Vec<ChatMessage> },

    /// Log a turn to the backend (fire-and-forget)
    PersistTurn { turn: Turn },

    ShowSubtitle { subtitle: Subtitle },

    /// Voice a tutor line; completion comes back as `SpeechFinished`
    Speak { text: String },

    /// Cancel whatever is being voiced
    CancelSpeech,

    StartCapture,
    /// Stop capture at the utterance boundary
    StopCapture,
    AbortCapture,

    /// Re-enter listening after `delay`
    ScheduleRelisten { delay: Duration, attempt: u32 },

    /// Close the remote session with final counters (fire-and-forget)
    CloseSession { summary: SessionSummary },

    /// Write the call record and its history entry locally
    RecordCall { session: Session, tutor_name: String },

    NotifyTargetReached { elapsed_secs: u64 },
}

impl Effect {
    pub fn request_reply(session: &Session) -> Self {
        Effect::RequestReply {
            history: session.turns.iter().map(ChatMessage::from).collect(),
        }
    }

    pub fn show_subtitle(text: impl Into<String>, translation: Option<String>) -> Self {
        Effect::ShowSubtitle {
            subtitle: Subtitle {
                text: text.into(),
                translation,
            },
        }
    }
}

/// Notifications broadcast to whoever is presenting the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallUpdate {
    Phase(CallPhase),
    Muted(bool),
    Subtitle(Subtitle),
    Elapsed { secs: u64, target_secs: u64 },
    TargetReached { elapsed_secs: u64 },
    /// A reply failed; listening resumes after `delay`
    ReplyDelayed { attempt: u32, delay: Duration },
    Ended {
        summary: SessionSummary,
        entry: Option<HistoryEntry>,
    },
}
