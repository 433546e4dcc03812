//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{CallHandle, CallReport, CallRuntime, CallUpdate};
use crate::backend::{
    BackendError, ChatMessage, ChatReply, SettingsService, SpeechSynthesisService,
};
use crate::session::{CallRecord, HistoryEntry, Session, SessionSummary, Turn};
use crate::settings::{StoredSettings, TutorSettings};
use crate::speech::{AudioPlayer, CaptureEvent, LocalSynthesizer, SpeechError, SpeechOutcome};
use crate::state_machine::{CallContext, CallPhase};
use crate::store::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Backend
// ============================================================================

/// Mock tutor backend with queued replies and recorded requests
#[allow(dead_code)]
#[derive(Default)]
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<ChatReply, BackendError>>>,
    tts: Mutex<VecDeque<Result<Option<Vec<u8>>, BackendError>>>,
    start_error: Mutex<Option<BackendError>>,
    remote_settings: Mutex<Option<Result<Option<StoredSettings>, BackendError>>>,
    settings_save_error: Mutex<Option<BackendError>>,
    reply_delay: Mutex<Duration>,
    pub chat_requests: Mutex<Vec<Vec<ChatMessage>>>,
    pub saved_messages: Mutex<Vec<Turn>>,
    pub started_sessions: Mutex<Vec<String>>,
    pub ended_sessions: Mutex<Vec<SessionSummary>>,
    tts_requests: Mutex<Vec<String>>,
    saved_settings: Mutex<Vec<(String, StoredSettings)>>,
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful chat reply
    pub fn queue_reply(&self, message: &str, translation: Option<&str>) {
        self.replies.lock().unwrap().push_back(Ok(ChatReply {
            message: message.to_string(),
            translation: translation.map(ToString::to_string),
        }));
    }

    pub fn queue_reply_error(&self, error: BackendError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Hold every chat reply for `delay` before answering
    pub fn set_reply_delay(&self, delay: Duration) {
        *self.reply_delay.lock().unwrap() = delay;
    }

    pub fn queue_tts(&self, result: Result<Option<Vec<u8>>, BackendError>) {
        self.tts.lock().unwrap().push_back(result);
    }

    pub fn fail_start_session(&self, error: BackendError) {
        *self.start_error.lock().unwrap() = Some(error);
    }

    pub fn set_remote_settings(&self, result: Result<Option<StoredSettings>, BackendError>) {
        *self.remote_settings.lock().unwrap() = Some(result);
    }

    pub fn fail_settings_save(&self, error: BackendError) {
        *self.settings_save_error.lock().unwrap() = Some(error);
    }

    pub fn recorded_chats(&self) -> Vec<Vec<ChatMessage>> {
        self.chat_requests.lock().unwrap().clone()
    }

    pub fn recorded_messages(&self) -> Vec<Turn> {
        self.saved_messages.lock().unwrap().clone()
    }

    pub fn recorded_ends(&self) -> Vec<SessionSummary> {
        self.ended_sessions.lock().unwrap().clone()
    }

    pub fn tts_requests(&self) -> Vec<String> {
        self.tts_requests.lock().unwrap().clone()
    }

    pub fn saved_settings(&self) -> Vec<(String, StoredSettings)> {
        self.saved_settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationService for MockBackend {
    async fn start_session(
        &self,
        _device_id: &str,
        session_id: &str,
        _settings: &StoredSettings,
        _tutor_name: &str,
    ) -> Result<(), BackendError> {
        self.started_sessions
            .lock()
            .unwrap()
            .push(session_id.to_string());
        match self.start_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn send_message(
        &self,
        history: &[ChatMessage],
        _settings: &StoredSettings,
    ) -> Result<ChatReply, BackendError> {
        self.chat_requests.lock().unwrap().push(history.to_vec());
        let delay = *self.reply_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::network("No mock reply queued")))
    }

    async fn save_message(
        &self,
        _device_id: &str,
        _session_id: &str,
        turn: &Turn,
    ) -> Result<(), BackendError> {
        self.saved_messages.lock().unwrap().push(turn.clone());
        Ok(())
    }

    async fn end_session(
        &self,
        _device_id: &str,
        _session_id: &str,
        summary: SessionSummary,
    ) -> Result<(), BackendError> {
        self.ended_sessions.lock().unwrap().push(summary);
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesisService for MockBackend {
    async fn text_to_speech(
        &self,
        text: &str,
        _settings: &StoredSettings,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        self.tts_requests.lock().unwrap().push(text.to_string());
        self.tts.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

#[async_trait]
impl SettingsService for MockBackend {
    async fn get_settings(&self, _device_id: &str) -> Result<Option<StoredSettings>, BackendError> {
        self.remote_settings
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Ok(None))
    }

    async fn save_settings(
        &self,
        device_id: &str,
        settings: &StoredSettings,
    ) -> Result<(), BackendError> {
        if let Some(e) = self.settings_save_error.lock().unwrap().clone() {
            return Err(e);
        }
        self.saved_settings
            .lock()
            .unwrap()
            .push((device_id.to_string(), settings.clone()));
        Ok(())
    }
}

// ============================================================================
// Mock Speech Capture
// ============================================================================

/// Capture driven by the test; utterances only get through while running
#[allow(dead_code)]
#[derive(Default)]
pub struct MockCapture {
    sink: Mutex<Option<mpsc::Sender<CaptureEvent>>>,
    running: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub aborts: AtomicUsize,
}

#[allow(dead_code)]
impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until capture is running, up to `timeout`
    pub async fn wait_running(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.is_running() {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    /// Emit an event if capture is running
    pub async fn emit(&self, event: CaptureEvent) -> bool {
        if !self.is_running() {
            return false;
        }
        let sink = self.sink.lock().unwrap().clone();
        match sink {
            Some(sink) => sink.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Wait for capture to start, then deliver a final transcript
    pub async fn say(&self, text: &str) -> bool {
        self.wait_running(Duration::from_secs(2)).await
            && self.emit(CaptureEvent::Final(text.to_string())).await
    }
}

#[async_trait]
impl SpeechCapture for MockCapture {
    async fn start(&self, sink: mpsc::Sender<CaptureEvent>) -> Result<(), SpeechError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    async fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Mock Speech Output
// ============================================================================

/// Speech output that records lines and completes immediately, or blocks
/// until cancelled when `hold` is set
#[allow(dead_code)]
#[derive(Default)]
pub struct MockSpeechOutput {
    pub spoken: Mutex<Vec<String>>,
    hold: bool,
    pub cancelled: AtomicUsize,
}

#[allow(dead_code)]
impl MockSpeechOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding() -> Self {
        Self {
            hold: true,
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechOutput for MockSpeechOutput {
    async fn speak(
        &self,
        text: &str,
        _settings: &TutorSettings,
        cancel: CancellationToken,
    ) -> SpeechOutcome {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.hold {
            cancel.cancelled().await;
            self.cancelled.fetch_add(1, Ordering::SeqCst);
            return SpeechOutcome::Cancelled;
        }
        SpeechOutcome::Remote
    }
}

/// Audio player that records payloads and finishes at once
#[allow(dead_code)]
#[derive(Default)]
pub struct MockPlayer {
    pub played: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl AudioPlayer for MockPlayer {
    async fn play(&self, audio: &[u8], _cancel: CancellationToken) -> Result<(), SpeechError> {
        self.played.lock().unwrap().push(audio.to_vec());
        Ok(())
    }
}

/// Local synthesizer that records what it was asked to say
#[allow(dead_code)]
#[derive(Default)]
pub struct MockSynthesizer {
    pub spoken: Mutex<Vec<(String, f32)>>,
}

#[async_trait]
impl LocalSynthesizer for MockSynthesizer {
    async fn speak(
        &self,
        text: &str,
        rate: f32,
        _cancel: CancellationToken,
    ) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push((text.to_string(), rate));
        Ok(())
    }
}

// ============================================================================
// In-Memory History
// ============================================================================

#[allow(dead_code)]
#[derive(Default)]
pub struct InMemoryHistory {
    pub records: Mutex<Vec<CallRecord>>,
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn record_call(&self, record: &CallRecord) -> Result<HistoryEntry, StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(record.history_entry())
    }
}

// ============================================================================
// Test Call Harness
// ============================================================================

/// A running call wired to mocks
#[allow(dead_code)]
pub struct TestCall {
    pub handle: CallHandle,
    pub updates: broadcast::Receiver<CallUpdate>,
    pub history: Arc<InMemoryHistory>,
    join: tokio::task::JoinHandle<CallReport>,
}

#[allow(dead_code)]
impl TestCall {
    pub fn start<O: SpeechOutput + 'static>(
        backend: Arc<MockBackend>,
        capture: Arc<MockCapture>,
        output: Arc<O>,
        context: CallContext,
    ) -> Self {
        let history = Arc::new(InMemoryHistory::default());
        let persona = context.persona().id;
        let session = Session::new(
            uuid::Uuid::new_v4().to_string(),
            "test-device",
            persona,
            Utc::now(),
        );
        let runtime = CallRuntime::new(context, session, backend, capture, output, history.clone());
        let handle = runtime.handle();
        let updates = handle.subscribe();
        let join = tokio::spawn(runtime.run());
        Self {
            handle,
            updates,
            history,
            join,
        }
    }

    /// Wait for an update matching `pred`
    pub async fn wait_for(
        &mut self,
        pred: impl Fn(&CallUpdate) -> bool,
        timeout: Duration,
    ) -> Option<CallUpdate> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, self.updates.recv()).await {
                Ok(Ok(update)) if pred(&update) => return Some(update),
                Ok(Ok(_) | Err(broadcast::error::RecvError::Lagged(_))) => {}
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
            }
        }
    }

    pub async fn wait_for_phase(&mut self, expected: &CallPhase, timeout: Duration) -> bool {
        self.wait_for(|u| matches!(u, CallUpdate::Phase(p) if p == expected), timeout)
            .await
            .is_some()
    }

    /// End the call and wait for the runtime to finish
    pub async fn hang_up(self) -> CallReport {
        self.handle.end_call().await;
        let report = tokio::time::timeout(Duration::from_secs(2), self.join)
            .await
            .expect("runtime did not stop")
            .expect("runtime panicked");
        tokio::time::timeout(Duration::from_secs(2), report.pending.wait())
            .await
            .expect("pending persistence did not drain");
        report
    }
}

pub fn fast_context() -> CallContext {
    CallContext::new(TutorSettings::default()).with_relisten_base(Duration::from_millis(10))
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{CaptureErrorKind, FallbackSpeechOutput};
    use crate::state_machine::Subtitle;

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn full_turn_records_words_and_subtitles() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("Hi, I'm Gwen. How are you?", Some("안녕하세요, 저는 Gwen이에요."));
        backend.queue_reply("I'm great, thanks!", Some("저는 아주 좋아요, 고마워요!"));
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockSpeechOutput::new());

        let mut call = TestCall::start(backend.clone(), capture.clone(), output.clone(), fast_context());

        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);
        assert!(capture.say("How are you").await);

        let subtitle = call
            .wait_for(
                |u| matches!(u, CallUpdate::Subtitle(s) if s.text == "I'm great, thanks!"),
                WAIT,
            )
            .await;
        assert_eq!(
            subtitle,
            Some(CallUpdate::Subtitle(Subtitle {
                text: "I'm great, thanks!".to_string(),
                translation: Some("저는 아주 좋아요, 고마워요!".to_string()),
            }))
        );
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);

        let report = call.hang_up().await;
        let record = report.record.unwrap();
        assert_eq!(record.turn_count, 3);
        assert_eq!(record.word_count, 3);
        assert_eq!(record.tutor_name, "Gwen");
        assert!(report.entry.is_some());

        // Greeting request carries no history, the second carries both turns
        let chats = backend.recorded_chats();
        assert!(chats[0].is_empty());
        assert_eq!(chats[1].len(), 2);

        let numbers: Vec<u32> = backend
            .recorded_messages()
            .iter()
            .map(|t| t.turn_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(backend.recorded_ends().len(), 1);
        assert_eq!(backend.recorded_ends()[0].word_count, 3);
        assert_eq!(output.recorded().len(), 2);
    }

    #[tokio::test]
    async fn greeting_failure_falls_back_and_keeps_going() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply_error(BackendError::server("bedrock down"));
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockSpeechOutput::new());

        let mut call = TestCall::start(backend.clone(), capture.clone(), output.clone(), fast_context());

        let subtitle = call
            .wait_for(|u| matches!(u, CallUpdate::Subtitle(_)), WAIT)
            .await;
        let Some(CallUpdate::Subtitle(subtitle)) = subtitle else {
            panic!("no subtitle shown");
        };
        assert_eq!(subtitle.text, "Hello! This is Gwen. How are you doing today?");
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);
        assert!(capture.wait_running(WAIT).await);

        let report = call.hang_up().await;
        assert_eq!(report.record.unwrap().turn_count, 1);
        // The fallback line is never logged remotely
        assert!(backend.recorded_messages().is_empty());
        assert_eq!(output.recorded(), vec![subtitle.text]);
    }

    #[tokio::test]
    async fn reply_failure_backs_off_and_relistens() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("Hello!", None);
        backend.queue_reply_error(BackendError::network("timeout"));
        backend.queue_reply("Sorry, say again?", None);
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockSpeechOutput::new());

        let mut call = TestCall::start(backend.clone(), capture.clone(), output, fast_context());
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);
        assert!(capture.say("first try").await);

        let delayed = call
            .wait_for(|u| matches!(u, CallUpdate::ReplyDelayed { .. }), WAIT)
            .await;
        assert_eq!(
            delayed,
            Some(CallUpdate::ReplyDelayed {
                attempt: 1,
                delay: Duration::from_millis(10)
            })
        );
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);

        assert!(capture.say("second try").await);
        assert!(
            call.wait_for(
                |u| matches!(u, CallUpdate::Subtitle(s) if s.text == "Sorry, say again?"),
                WAIT
            )
            .await
            .is_some()
        );

        let report = call.hang_up().await;
        let record = report.record.unwrap();
        // greeting, first try, second try, reply: no turn for the failure
        assert_eq!(record.turn_count, 4);
        assert_eq!(record.word_count, 4);
    }

    #[tokio::test]
    async fn missing_tts_audio_uses_local_synthesis_then_listens() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("Hello there!", None);
        backend.queue_tts(Ok(None));
        let player = Arc::new(MockPlayer::default());
        let synth = Arc::new(MockSynthesizer::default());
        let output = Arc::new(
            FallbackSpeechOutput::new(backend.clone())
                .with_player(player.clone())
                .with_local(synth.clone()),
        );
        let capture = Arc::new(MockCapture::new());

        let mut call = TestCall::start(backend.clone(), capture.clone(), output, fast_context());
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);
        assert!(capture.wait_running(WAIT).await);

        assert_eq!(
            synth.spoken.lock().unwrap().first().map(|(t, _)| t.clone()),
            Some("Hello there!".to_string())
        );
        assert_eq!(backend.tts_requests(), vec!["Hello there!".to_string()]);
        assert!(player.played.lock().unwrap().is_empty());
        call.hang_up().await;
    }

    #[tokio::test]
    async fn mute_suspends_capture() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("Hello!", None);
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockSpeechOutput::new());

        let mut call = TestCall::start(backend, capture.clone(), output, fast_context());
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);
        assert!(capture.wait_running(WAIT).await);

        call.handle.toggle_mute().await;
        assert_eq!(
            call.wait_for(|u| matches!(u, CallUpdate::Muted(_)), WAIT).await,
            Some(CallUpdate::Muted(true))
        );
        assert!(!capture.is_running());
        assert!(!capture.emit(CaptureEvent::Final("ignored".to_string())).await);

        call.handle.toggle_mute().await;
        assert_eq!(
            call.wait_for(|u| matches!(u, CallUpdate::Muted(_)), WAIT).await,
            Some(CallUpdate::Muted(false))
        );
        assert!(capture.wait_running(WAIT).await);

        let report = call.hang_up().await;
        assert_eq!(report.record.unwrap().turn_count, 1);
    }

    #[tokio::test]
    async fn ending_mid_speech_cancels_and_records_once() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("A very long greeting", None);
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockSpeechOutput::holding());

        let mut call = TestCall::start(backend.clone(), capture.clone(), output.clone(), fast_context());
        assert!(call.wait_for_phase(&CallPhase::Speaking, WAIT).await);

        let history = call.history.clone();
        let report = call.hang_up().await;

        assert!(report.record.is_some());
        assert_eq!(history.records.lock().unwrap().len(), 1);
        assert_eq!(capture.aborts.load(Ordering::SeqCst), 1);
        assert_eq!(capture.starts.load(Ordering::SeqCst), 0);
        // Give the cancelled speech task a moment to observe the token
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(output.cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ending_while_awaiting_reply_discards_it() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("Hello!", None);
        backend.queue_reply("Too late", None);
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockSpeechOutput::new());

        let mut call = TestCall::start(backend.clone(), capture.clone(), output.clone(), fast_context());
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);
        backend.set_reply_delay(Duration::from_millis(100));
        assert!(capture.say("Are you there").await);
        assert!(call.wait_for_phase(&CallPhase::AwaitingReply, WAIT).await);

        let report = call.hang_up().await;
        assert_eq!(report.record.unwrap().turn_count, 2);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(output.recorded(), vec!["Hello!".to_string()]);
    }

    #[tokio::test]
    async fn unacknowledged_session_greets_locally_and_is_not_closed() {
        let backend = Arc::new(MockBackend::new());
        backend.fail_start_session(BackendError::network("offline"));
        backend.queue_reply("Hello!", None);
        let capture = Arc::new(MockCapture::new());
        let output = Arc::new(MockSpeechOutput::new());

        let mut call = TestCall::start(backend.clone(), capture, output.clone(), fast_context());
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);

        let report = call.hang_up().await;
        let record = report.record.unwrap();
        assert_eq!(record.turn_count, 1);
        assert_eq!(backend.started_sessions.lock().unwrap().len(), 1);
        // The queued remote greeting is never asked for
        assert!(backend.recorded_chats().is_empty());
        assert!(backend.recorded_messages().is_empty());
        assert!(backend.recorded_ends().is_empty());
        assert_eq!(
            output.recorded(),
            vec!["Hello! This is Gwen. How are you doing today?".to_string()]
        );
    }

    #[tokio::test]
    async fn capture_error_pauses_until_resumed() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("Hello!", None);
        let capture = Arc::new(MockCapture::new());

        let mut call = TestCall::start(
            backend,
            capture.clone(),
            Arc::new(MockSpeechOutput::new()),
            fast_context(),
        );
        assert!(capture.wait_running(WAIT).await);

        // Transient errors are ignored
        assert!(capture.emit(CaptureEvent::Error(CaptureErrorKind::NoSpeech)).await);
        assert!(
            capture
                .emit(CaptureEvent::Error(CaptureErrorKind::Other("audio-capture".to_string())))
                .await
        );
        assert!(
            call.wait_for_phase(
                &CallPhase::Paused {
                    reason: "audio-capture".to_string()
                },
                WAIT
            )
            .await
        );

        call.handle.resume_listening().await;
        assert!(call.wait_for_phase(&CallPhase::Listening, WAIT).await);
        assert!(capture.wait_running(WAIT).await);
        call.hang_up().await;
    }

    #[tokio::test]
    async fn clock_reports_target_reached() {
        let backend = Arc::new(MockBackend::new());
        backend.queue_reply("Hello!", None);
        let context = fast_context().with_tick_interval(Duration::from_millis(1));

        let mut call = TestCall::start(
            backend,
            Arc::new(MockCapture::new()),
            Arc::new(MockSpeechOutput::new()),
            context,
        );
        let reached = call
            .wait_for(
                |u| matches!(u, CallUpdate::TargetReached { .. }),
                Duration::from_secs(5),
            )
            .await;
        assert_eq!(reached, Some(CallUpdate::TargetReached { elapsed_secs: 300 }));

        let report = call.hang_up().await;
        assert!(report.record.unwrap().duration >= 300);
    }
}
