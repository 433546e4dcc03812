//! Call runtime executor

use super::traits::{ConversationService, HistoryStore, SpeechCapture, SpeechOutput};
use super::{CallHandle, CallReport};

use crate::backend::ChatMessage;
use crate::session::{CallRecord, HistoryEntry, Session};
use crate::speech::{CaptureErrorKind, CaptureEvent};
use crate::state_machine::{
    transition, CallContext, CallPhase, CallState, CallUpdate, Effect, Event, TransitionError,
};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Runs one call: owns the state, executes effects, feeds results back in
pub struct CallRuntime<C, Cap, O, H>
where
    C: ConversationService + 'static,
    Cap: SpeechCapture + 'static,
    O: SpeechOutput + 'static,
    H: HistoryStore + 'static,
{
    context: CallContext,
    state: CallState,
    backend: Arc<C>,
    capture: Arc<Cap>,
    output: Arc<O>,
    history: Arc<H>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    capture_rx: mpsc::Receiver<CaptureEvent>,
    capture_tx: mpsc::Sender<CaptureEvent>,
    updates: broadcast::Sender<CallUpdate>,
    /// Token to cancel the utterance being voiced
    speech_cancel: Option<CancellationToken>,
    /// Token to stop the elapsed clock
    clock_cancel: Option<CancellationToken>,
    /// Fire-and-forget persistence, drained by the caller after the call
    tracker: TaskTracker,
    record: Option<CallRecord>,
    entry: Option<HistoryEntry>,
}

impl<C, Cap, O, H> CallRuntime<C, Cap, O, H>
where
    C: ConversationService + 'static,
    Cap: SpeechCapture + 'static,
    O: SpeechOutput + 'static,
    H: HistoryStore + 'static,
{
    pub fn new(
        context: CallContext,
        session: Session,
        backend: Arc<C>,
        capture: Arc<Cap>,
        output: Arc<O>,
        history: Arc<H>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (capture_tx, capture_rx) = mpsc::channel(64);
        let (updates, _) = broadcast::channel(128);
        let state = CallState::new(session, context.settings.target_duration());
        Self {
            context,
            state,
            backend,
            capture,
            output,
            history,
            event_rx,
            event_tx,
            capture_rx,
            capture_tx,
            updates,
            speech_cancel: None,
            clock_cancel: None,
            tracker: TaskTracker::new(),
            record: None,
            entry: None,
        }
    }

    /// Controls and updates for this call. Subscribe before `run`.
    pub fn handle(&self) -> CallHandle {
        CallHandle {
            event_tx: self.event_tx.clone(),
            updates: self.updates.clone(),
        }
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    /// Drive the call until it has ended and its record is written
    pub async fn run(mut self) -> CallReport {
        let session_id = self.state.session.id.clone();
        tracing::info!(
            session_id = %session_id,
            tutor = %self.context.settings.tutor_id,
            "Starting call"
        );

        self.process_event(Event::Start).await;

        while self.state.phase != CallPhase::Ended {
            let event = tokio::select! {
                Some(event) = self.event_rx.recv() => event,
                Some(captured) = self.capture_rx.recv() => Event::from(captured),
                else => break,
            };
            self.process_event(event).await;
        }

        self.tracker.close();
        tracing::info!(
            session_id = %session_id,
            duration_secs = self.state.session.duration_secs,
            turns = self.state.session.turn_count,
            words = self.state.session.word_count,
            "Call ended"
        );

        CallReport {
            record: self.record,
            entry: self.entry,
            pending: self.tracker,
        }
    }

    async fn process_event(&mut self, event: Event) {
        // Effects may generate follow-up events; handle them in order
        let mut queue = VecDeque::from([event]);

        while let Some(current) = queue.pop_front() {
            let result = match transition(&self.state, &self.context, current) {
                Ok(r) => r,
                Err(TransitionError::CallEnded) => {
                    tracing::debug!("Discarding event after call end");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring event");
                    continue;
                }
            };

            let old_state = std::mem::replace(&mut self.state, result.new_state);
            self.broadcast_changes(&old_state);

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    queue.push_back(generated);
                }
            }
        }
    }

    fn broadcast_changes(&self, old: &CallState) {
        let new = &self.state;
        if new.phase != old.phase {
            tracing::debug!(from = old.phase.name(), to = new.phase.name(), "Phase changed");
            self.notify(CallUpdate::Phase(new.phase.clone()));
        }
        if new.muted != old.muted {
            self.notify(CallUpdate::Muted(new.muted));
        }
        if new.session.duration_secs != old.session.duration_secs
            || new.target_secs != old.target_secs
        {
            self.notify(CallUpdate::Elapsed {
                secs: new.session.duration_secs,
                target_secs: new.target_secs,
            });
        }
    }

    fn notify(&self, update: CallUpdate) {
        // No subscribers is fine
        let _ = self.updates.send(update);
    }

    /// Execute an effect and optionally return a generated event
    #[allow(clippy::too_many_lines)]
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::StartClock => {
                let token = CancellationToken::new();
                self.clock_cancel = Some(token.clone());
                let event_tx = self.event_tx.clone();
                let period = self.context.tick_interval;
                tokio::spawn(run_clock(period, token, event_tx));
                None
            }

            Effect::StopClock => {
                if let Some(token) = self.clock_cancel.take() {
                    token.cancel();
                }
                None
            }

            Effect::OpenSession => {
                let backend = self.backend.clone();
                let event_tx = self.event_tx.clone();
                let device_id = self.state.session.device_id.clone();
                let session_id = self.state.session.id.clone();
                let settings = self.context.settings.to_stored();
                let tutor_name = self.context.persona().name;

                tokio::spawn(async move {
                    let acknowledged = match backend
                        .start_session(&device_id, &session_id, &settings, tutor_name)
                        .await
                    {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to open remote session");
                            false
                        }
                    };
                    let _ = event_tx.send(Event::SessionOpened { acknowledged }).await;
                });
                None
            }

            Effect::RequestReply { history } => {
                self.spawn_reply_request(history);
                None
            }

            Effect::PersistTurn { turn } => {
                let backend = self.backend.clone();
                let device_id = self.state.session.device_id.clone();
                let session_id = self.state.session.id.clone();
                self.tracker.spawn(async move {
                    if let Err(e) = backend.save_message(&device_id, &session_id, &turn).await {
                        tracing::warn!(
                            error = %e,
                            turn_number = turn.turn_number,
                            "Failed to save message"
                        );
                    }
                });
                None
            }

            Effect::ShowSubtitle { subtitle } => {
                self.notify(CallUpdate::Subtitle(subtitle));
                None
            }

            Effect::Speak { text } => {
                let token = CancellationToken::new();
                self.speech_cancel = Some(token.clone());
                let output = self.output.clone();
                let event_tx = self.event_tx.clone();
                let settings = self.context.settings.clone();

                tokio::spawn(async move {
                    let outcome = output.speak(&text, &settings, token).await;
                    tracing::debug!(?outcome, "Speech finished");
                    let _ = event_tx.send(Event::SpeechFinished { outcome }).await;
                });
                None
            }

            Effect::CancelSpeech => {
                if let Some(token) = self.speech_cancel.take() {
                    token.cancel();
                }
                None
            }

            Effect::StartCapture => match self.capture.start(self.capture_tx.clone()).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to start speech capture");
                    Some(Event::CaptureFailed {
                        kind: CaptureErrorKind::Other(e.to_string()),
                    })
                }
            },

            Effect::StopCapture => {
                self.capture.stop().await;
                None
            }

            Effect::AbortCapture => {
                self.capture.abort().await;
                None
            }

            Effect::ScheduleRelisten { delay, attempt } => {
                tracing::info!(
                    attempt,
                    delay_ms = %delay.as_millis(),
                    "Re-listening after back-off"
                );
                self.notify(CallUpdate::ReplyDelayed { attempt, delay });
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = event_tx.send(Event::RelistenTimeout { attempt }).await;
                });
                None
            }

            Effect::CloseSession { summary } => {
                let backend = self.backend.clone();
                let device_id = self.state.session.device_id.clone();
                let session_id = self.state.session.id.clone();
                self.tracker.spawn(async move {
                    if let Err(e) = backend.end_session(&device_id, &session_id, summary).await {
                        tracing::warn!(error = %e, "Failed to close remote session");
                    }
                });
                None
            }

            Effect::RecordCall {
                session,
                tutor_name,
            } => {
                let record = CallRecord::from_session(&session, &tutor_name, Utc::now());
                let entry = match self.history.record_call(&record).await {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to record call locally");
                        None
                    }
                };
                self.notify(CallUpdate::Ended {
                    summary: session.summary(),
                    entry: entry.clone(),
                });
                self.record = Some(record);
                self.entry = entry;
                Some(Event::CallRecorded)
            }

            Effect::NotifyTargetReached { elapsed_secs } => {
                tracing::info!(elapsed_secs, "Target duration reached");
                self.notify(CallUpdate::TargetReached { elapsed_secs });
                None
            }
        }
    }

    fn spawn_reply_request(&self, history: Vec<ChatMessage>) {
        let backend = self.backend.clone();
        let event_tx = self.event_tx.clone();
        let settings = self.context.settings.to_stored();

        tokio::spawn(async move {
            tracing::debug!(history_len = history.len(), "Requesting tutor reply");
            let event = match backend.send_message(&history, &settings).await {
                Ok(reply) => Event::ReplyReceived {
                    message: reply.message,
                    translation: reply.translation,
                },
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        kind = ?e.kind,
                        retryable = e.kind.is_retryable(),
                        "Tutor reply failed"
                    );
                    Event::ReplyFailed { message: e.message }
                }
            };
            // Runtime gone means the call ended; the reply is discarded
            let _ = event_tx.send(event).await;
        });
    }
}

/// Send `Tick` every `period` until cancelled
async fn run_clock(period: Duration, cancel: CancellationToken, event_tx: mpsc::Sender<Event>) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if event_tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        }
    }
}
