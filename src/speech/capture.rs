//! Speech capture adapter

use super::SpeechError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Output of a running capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Partial text of an utterance still in progress
    Interim(String),
    /// Text of a finished utterance
    Final(String),
    Error(CaptureErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// Nothing was heard before the recognizer gave up. Not fatal.
    NoSpeech,
    Other(String),
}

impl CaptureErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NoSpeech)
    }
}

/// Continuous speech-to-text source.
///
/// `stop` and `abort` must release the underlying input entirely; a stopped
/// capture consumes nothing.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Begin capturing into `sink`. No-op while already running.
    async fn start(&self, sink: mpsc::Sender<CaptureEvent>) -> Result<(), SpeechError>;

    /// Stop after the current utterance boundary
    async fn stop(&self);

    /// Stop immediately, dropping anything in progress
    async fn abort(&self);

    fn is_running(&self) -> bool;
}

#[async_trait]
impl<T: SpeechCapture + ?Sized> SpeechCapture for Arc<T> {
    async fn start(&self, sink: mpsc::Sender<CaptureEvent>) -> Result<(), SpeechError> {
        (**self).start(sink).await
    }

    async fn stop(&self) {
        (**self).stop().await;
    }

    async fn abort(&self) {
        (**self).abort().await;
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }
}

/// Capture fed by already-transcribed lines, one utterance per line.
///
/// Used by the terminal front-end, where typed lines stand in for finalized
/// recognizer output. Blank lines are reported as "no speech".
pub struct LineCapture {
    lines: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    active: Mutex<Option<CancellationToken>>,
}

impl LineCapture {
    pub fn new(lines: mpsc::Receiver<String>) -> Self {
        Self {
            lines: Arc::new(tokio::sync::Mutex::new(lines)),
            active: Mutex::new(None),
        }
    }

    fn cancel_active(&self) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.take() {
            token.cancel();
        }
    }
}

#[async_trait]
impl SpeechCapture for LineCapture {
    async fn start(&self, sink: mpsc::Sender<CaptureEvent>) -> Result<(), SpeechError> {
        let token = {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.as_ref().is_some_and(|t| !t.is_cancelled()) {
                return Ok(());
            }
            let token = CancellationToken::new();
            *active = Some(token.clone());
            token
        };

        let lines = self.lines.clone();
        tokio::spawn(async move {
            let mut lines = tokio::select! {
                biased;
                () = token.cancelled() => return,
                guard = lines.lock() => guard,
            };
            loop {
                let line = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    line = lines.recv() => line,
                };
                let event = match line {
                    Some(line) if line.trim().is_empty() => {
                        CaptureEvent::Error(CaptureErrorKind::NoSpeech)
                    }
                    Some(line) => CaptureEvent::Final(line),
                    None => {
                        let _ = sink
                            .send(CaptureEvent::Error(CaptureErrorKind::Other(
                                "input closed".to_string(),
                            )))
                            .await;
                        break;
                    }
                };
                if sink.send(event).await.is_err() {
                    break;
                }
            }
            token.cancel();
        });

        Ok(())
    }

    async fn stop(&self) {
        self.cancel_active();
    }

    async fn abort(&self) {
        self.cancel_active();
    }

    fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }
}
