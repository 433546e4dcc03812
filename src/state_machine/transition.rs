//! Pure state transition function

use super::state::{CallContext, CallPhase, CallState, Subtitle};
use super::{Effect, Event};
use crate::settings::EXTENSION_MINUTES;
use std::time::Duration;
use thiserror::Error;

/// Back-off never grows past this multiple of the base delay
const MAX_BACKOFF_FACTOR: u32 = 8;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: CallState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: CallState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Call has ended")]
    CallEnded,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Wait before re-listening after the `failures`-th consecutive failed reply:
/// `base * 2^(failures - 1)`, capped at eight times the base.
pub fn relisten_delay(base: Duration, failures: u32) -> Duration {
    let factor = 1u32
        .checked_shl(failures.saturating_sub(1))
        .unwrap_or(MAX_BACKOFF_FACTOR)
        .min(MAX_BACKOFF_FACTOR);
    base.saturating_mul(factor)
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. All I/O is
/// described by the returned effects.
#[allow(clippy::too_many_lines)]
pub fn transition(
    state: &CallState,
    context: &CallContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    if !state.phase.is_live() {
        return match (&state.phase, event) {
            (CallPhase::Ending, Event::CallRecorded) => {
                Ok(TransitionResult::new(state.with_phase(CallPhase::Ended)))
            }
            _ => Err(TransitionError::CallEnded),
        };
    }

    match (&state.phase, event) {
        // ============================================================
        // Session start and greeting
        // ============================================================
        (CallPhase::Initializing, Event::Start) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::StartClock)
            .with_effect(Effect::OpenSession)),

        // No remote session means no remote greeting either
        (CallPhase::Initializing, Event::SessionOpened { acknowledged: false }) => {
            Ok(fallback_greeting(state, context))
        }

        (CallPhase::Initializing, Event::SessionOpened { acknowledged: true }) => {
            let mut next = state.with_phase(CallPhase::Greeting);
            next.session.remote_open = true;
            Ok(TransitionResult::new(next).with_effect(Effect::RequestReply { history: vec![] }))
        }

        // Reply from either the greeting or a user turn -> Speaking
        (CallPhase::Greeting | CallPhase::AwaitingReply, Event::ReplyReceived { message, translation }) => {
            let mut next = state.with_phase(CallPhase::Speaking);
            next.reply_failures = 0;
            let turn = next
                .session
                .push_assistant_turn(message.clone(), translation.clone());
            let subtitle = Subtitle {
                text: message.clone(),
                translation,
            };
            next.subtitle = Some(subtitle.clone());
            Ok(TransitionResult::new(next)
                .with_effect(Effect::PersistTurn { turn })
                .with_effect(Effect::ShowSubtitle { subtitle })
                .with_effect(Effect::Speak { text: message }))
        }

        // Greeting failed -> canned greeting, kept locally only
        (CallPhase::Greeting, Event::ReplyFailed { .. }) => Ok(fallback_greeting(state, context)),

        // ============================================================
        // Speaking -> Listening
        // ============================================================
        (CallPhase::Speaking, Event::SpeechFinished { .. }) => Ok(listen(state, CallPhase::Listening)),

        // ============================================================
        // Capture
        // ============================================================
        (CallPhase::Listening | CallPhase::Transcribing { .. }, Event::InterimTranscript { text }) => {
            Ok(TransitionResult::new(
                state.with_phase(CallPhase::Transcribing { interim: text }),
            ))
        }

        (CallPhase::Listening | CallPhase::Transcribing { .. }, Event::FinalTranscript { text }) => {
            if text.trim().is_empty() {
                return Ok(TransitionResult::new(state.with_phase(CallPhase::Listening)));
            }

            let mut next = state.with_phase(CallPhase::AwaitingReply);
            let turn = next.session.push_user_turn(text.clone());
            next.subtitle = Some(Subtitle {
                text: text.clone(),
                translation: None,
            });
            let request = Effect::request_reply(&next.session);
            Ok(TransitionResult::new(next)
                .with_effect(Effect::StopCapture)
                .with_effect(Effect::PersistTurn { turn })
                .with_effect(Effect::show_subtitle(text, None))
                .with_effect(request))
        }

        (_, Event::CaptureFailed { kind }) if kind.is_transient() => {
            Ok(TransitionResult::new(state.clone()))
        }

        (CallPhase::Listening | CallPhase::Transcribing { .. }, Event::CaptureFailed { kind }) => {
            let reason = match kind {
                crate::speech::CaptureErrorKind::Other(reason) => reason,
                crate::speech::CaptureErrorKind::NoSpeech => String::new(),
            };
            Ok(TransitionResult::new(state.with_phase(CallPhase::Paused { reason }))
                .with_effect(Effect::AbortCapture))
        }

        // Late capture errors after capture was stopped on purpose
        (_, Event::CaptureFailed { .. }) => Ok(TransitionResult::new(state.clone())),

        (CallPhase::Paused { .. }, Event::ResumeListening) => {
            Ok(listen(state, CallPhase::Listening))
        }

        // ============================================================
        // Reply failure and back-off
        // ============================================================
        (CallPhase::AwaitingReply, Event::ReplyFailed { .. }) => {
            let attempt = state.reply_failures.saturating_add(1);
            let mut next = state.with_phase(CallPhase::Backoff { attempt });
            next.reply_failures = attempt;
            Ok(TransitionResult::new(next).with_effect(Effect::ScheduleRelisten {
                delay: relisten_delay(context.relisten_base, attempt),
                attempt,
            }))
        }

        (CallPhase::Backoff { attempt }, Event::RelistenTimeout { attempt: fired })
            if *attempt == fired =>
        {
            Ok(listen(state, CallPhase::Listening))
        }

        // ============================================================
        // Controls
        // ============================================================
        (phase, Event::ToggleMute) => {
            let muted = !state.muted;
            let mut next = state.clone();
            next.muted = muted;
            let mut result = TransitionResult::new(next);
            match phase {
                _ if phase.is_listening() && muted => {
                    result.new_state.phase = CallPhase::Listening;
                    result = result.with_effect(Effect::StopCapture);
                }
                _ if phase.is_listening() => {
                    result = result.with_effect(Effect::StartCapture);
                }
                CallPhase::Paused { .. } if !muted => {
                    result.new_state.phase = CallPhase::Listening;
                    result = result.with_effect(Effect::StartCapture);
                }
                _ => {}
            }
            Ok(result)
        }

        (_, Event::Tick) => {
            let mut next = state.clone();
            next.session.duration_secs += 1;
            let elapsed = next.session.duration_secs;
            let mut result = TransitionResult::new(next);
            if !state.target_notified && elapsed >= state.target_secs {
                result.new_state.target_notified = true;
                result = result.with_effect(Effect::NotifyTargetReached {
                    elapsed_secs: elapsed,
                });
            }
            Ok(result)
        }

        (_, Event::ExtendDuration) => {
            let mut next = state.clone();
            next.target_secs += u64::from(EXTENSION_MINUTES) * 60;
            next.target_notified = next.session.duration_secs >= next.target_secs;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Ending
        // ============================================================
        (_, Event::EndCall) => {
            let next = state.with_phase(CallPhase::Ending);
            let mut effects = vec![Effect::StopClock, Effect::AbortCapture, Effect::CancelSpeech];
            if state.session.remote_open {
                effects.push(Effect::CloseSession {
                    summary: state.session.summary(),
                });
            }
            effects.push(Effect::RecordCall {
                session: state.session.clone(),
                tutor_name: context.persona().name.to_string(),
            });
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {event:?}",
            phase.name()
        ))),
    }
}

/// Speak the canned greeting as turn 1. It stays local: no `PersistTurn`.
fn fallback_greeting(state: &CallState, context: &CallContext) -> TransitionResult {
    let subtitle = context.fallback_greeting();
    let mut next = state.with_phase(CallPhase::Speaking);
    next.session
        .push_assistant_turn(subtitle.text.clone(), subtitle.translation.clone());
    next.subtitle = Some(subtitle.clone());
    let text = subtitle.text.clone();
    TransitionResult::new(next)
        .with_effect(Effect::ShowSubtitle { subtitle })
        .with_effect(Effect::Speak { text })
}

/// Enter a listening phase, starting capture unless muted
fn listen(state: &CallState, phase: CallPhase) -> TransitionResult {
    let result = TransitionResult::new(state.with_phase(phase));
    if state.muted {
        result
    } else {
        result.with_effect(Effect::StartCapture)
    }
}
