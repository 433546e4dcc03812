//! Events that can occur during a call

use crate::speech::{CaptureErrorKind, CaptureEvent, SpeechOutcome};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    Start,
    SessionOpened {
        /// Whether the backend accepted the session
        acknowledged: bool,
    },
    EndCall,
    CallRecorded,

    // Backend
    ReplyReceived {
        message: String,
        translation: Option<String>,
    },
    ReplyFailed {
        message: String,
    },

    // Speech output
    SpeechFinished {
        outcome: SpeechOutcome,
    },

    // Speech capture
    InterimTranscript {
        text: String,
    },
    FinalTranscript {
        text: String,
    },
    CaptureFailed {
        kind: CaptureErrorKind,
    },

    // User controls
    ToggleMute,
    ResumeListening,
    ExtendDuration,

    // Timers
    Tick,
    RelistenTimeout {
        attempt: u32,
    },
}

impl From<CaptureEvent> for Event {
    fn from(event: CaptureEvent) -> Self {
        match event {
            CaptureEvent::Interim(text) => Event::InterimTranscript { text },
            CaptureEvent::Final(text) => Event::FinalTranscript { text },
            CaptureEvent::Error(kind) => Event::CaptureFailed { kind },
        }
    }
}
