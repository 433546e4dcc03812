//! Call state types

use crate::persona::Persona;
use crate::session::Session;
use crate::settings::TutorSettings;
use std::time::Duration;

/// Where the call is in its turn-taking loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallPhase {
    /// Clock started, waiting for the backend to open the session
    Initializing,
    /// Waiting for the opening line
    Greeting,
    /// Tutor line being voiced
    Speaking,
    /// Capturing (unless muted), nothing heard yet
    Listening,
    /// Capturing, with partial recognizer text
    Transcribing { interim: String },
    /// User turn sent, waiting for the tutor's reply
    AwaitingReply,
    /// Reply failed; waiting before listening again
    Backoff { attempt: u32 },
    /// Capture lost to a non-transient error
    Paused { reason: String },
    /// Teardown in progress, the call record is being written
    Ending,
    Ended,
}

impl CallPhase {
    pub fn name(&self) -> &'static str {
        match self {
            CallPhase::Initializing => "initializing",
            CallPhase::Greeting => "greeting",
            CallPhase::Speaking => "speaking",
            CallPhase::Listening => "listening",
            CallPhase::Transcribing { .. } => "transcribing",
            CallPhase::AwaitingReply => "awaiting_reply",
            CallPhase::Backoff { .. } => "backoff",
            CallPhase::Paused { .. } => "paused",
            CallPhase::Ending => "ending",
            CallPhase::Ended => "ended",
        }
    }

    /// Anything before teardown
    pub fn is_live(&self) -> bool {
        !matches!(self, CallPhase::Ending | CallPhase::Ended)
    }

    /// Phases in which capture should be running (when not muted)
    pub fn is_listening(&self) -> bool {
        matches!(self, CallPhase::Listening | CallPhase::Transcribing { .. })
    }
}

/// Text currently shown under the tutor's avatar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub text: String,
    pub translation: Option<String>,
}

/// Complete state of one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallState {
    pub phase: CallPhase,
    /// Orthogonal to the phase: a muted call never captures
    pub muted: bool,
    pub session: Session,
    pub subtitle: Option<Subtitle>,
    /// Consecutive failed replies, reset by any successful one
    pub reply_failures: u32,
    pub target_secs: u64,
    /// Whether the "target reached" notice went out for the current target
    pub target_notified: bool,
}

impl CallState {
    pub fn new(session: Session, target: Duration) -> Self {
        Self {
            phase: CallPhase::Initializing,
            muted: false,
            session,
            subtitle: None,
            reply_failures: 0,
            target_secs: target.as_secs(),
            target_notified: false,
        }
    }

    /// Same call, different phase
    #[must_use]
    pub fn with_phase(&self, phase: CallPhase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }
}

/// Default wait before re-listening after the first failed reply
pub const DEFAULT_RELISTEN_BASE: Duration = Duration::from_secs(1);

/// Call configuration, fixed for the lifetime of the call
#[derive(Debug, Clone)]
pub struct CallContext {
    pub settings: TutorSettings,
    /// First back-off step after a failed reply
    pub relisten_base: Duration,
    /// Wall time per elapsed-clock tick
    pub tick_interval: Duration,
}

impl CallContext {
    pub fn new(settings: TutorSettings) -> Self {
        Self {
            settings,
            relisten_base: DEFAULT_RELISTEN_BASE,
            tick_interval: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_relisten_base(mut self, base: Duration) -> Self {
        self.relisten_base = base;
        self
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn persona(&self) -> &'static Persona {
        self.settings.persona()
    }

    /// Opening line used when the backend can't produce one
    pub fn fallback_greeting(&self) -> Subtitle {
        let name = self.persona().name;
        Subtitle {
            text: format!("Hello! This is {name}. How are you doing today?"),
            translation: Some(format!("안녕하세요! {name}입니다. 오늘 어떻게 지내세요?")),
        }
    }
}
