//! Speech output with remote synthesis and a local fallback

use super::SpeechError;
use crate::backend::SpeechSynthesisService;
use crate::settings::TutorSettings;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How an utterance was (or wasn't) voiced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Played from remotely synthesized audio
    Remote,
    /// Voiced by the local synthesizer
    Local,
    /// Nothing could voice it; completed immediately
    Skipped,
    Cancelled,
}

/// Voices tutor lines. Always completes, whatever fails underneath.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn speak(
        &self,
        text: &str,
        settings: &TutorSettings,
        cancel: CancellationToken,
    ) -> SpeechOutcome;
}

/// Plays an encoded audio payload to completion
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Returns once playback finishes or `cancel` fires
    async fn play(&self, audio: &[u8], cancel: CancellationToken) -> Result<(), SpeechError>;
}

/// On-device text-to-speech
#[async_trait]
pub trait LocalSynthesizer: Send + Sync {
    /// `rate` is a multiplier on the synthesizer's normal speaking rate
    async fn speak(&self, text: &str, rate: f32, cancel: CancellationToken)
        -> Result<(), SpeechError>;
}

#[async_trait]
impl<T: SpeechOutput + ?Sized> SpeechOutput for Arc<T> {
    async fn speak(
        &self,
        text: &str,
        settings: &TutorSettings,
        cancel: CancellationToken,
    ) -> SpeechOutcome {
        (**self).speak(text, settings, cancel).await
    }
}

/// Remote synthesis played through an [`AudioPlayer`], falling back to a
/// [`LocalSynthesizer`], falling back to silence.
pub struct FallbackSpeechOutput<S> {
    remote: S,
    player: Option<Arc<dyn AudioPlayer>>,
    local: Option<Arc<dyn LocalSynthesizer>>,
}

impl<S: SpeechSynthesisService> FallbackSpeechOutput<S> {
    pub fn new(remote: S) -> Self {
        Self {
            remote,
            player: None,
            local: None,
        }
    }

    #[must_use]
    pub fn with_player(mut self, player: Arc<dyn AudioPlayer>) -> Self {
        self.player = Some(player);
        self
    }

    #[must_use]
    pub fn with_local(mut self, local: Arc<dyn LocalSynthesizer>) -> Self {
        self.local = Some(local);
        self
    }

    /// `true` when remote audio was played to the end
    async fn try_remote(
        &self,
        text: &str,
        settings: &TutorSettings,
        cancel: &CancellationToken,
    ) -> bool {
        let Some(player) = &self.player else {
            tracing::debug!("No audio player configured, skipping remote synthesis");
            return false;
        };

        let stored = settings.to_stored();
        let audio = tokio::select! {
            biased;
            () = cancel.cancelled() => return false,
            result = self.remote.text_to_speech(text, &stored) => result,
        };

        let audio = match audio {
            Ok(Some(audio)) => audio,
            Ok(None) => {
                tracing::info!("Remote synthesis returned no audio");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote synthesis failed");
                return false;
            }
        };

        match player.play(&audio, cancel.clone()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Audio playback failed");
                false
            }
        }
    }
}

#[async_trait]
impl<S: SpeechSynthesisService> SpeechOutput for FallbackSpeechOutput<S> {
    async fn speak(
        &self,
        text: &str,
        settings: &TutorSettings,
        cancel: CancellationToken,
    ) -> SpeechOutcome {
        if self.try_remote(text, settings, &cancel).await {
            return if cancel.is_cancelled() {
                SpeechOutcome::Cancelled
            } else {
                SpeechOutcome::Remote
            };
        }
        if cancel.is_cancelled() {
            return SpeechOutcome::Cancelled;
        }

        let Some(local) = &self.local else {
            tracing::info!("No local synthesizer available, skipping speech");
            return SpeechOutcome::Skipped;
        };
        match local.speak(text, settings.speed.rate(), cancel.clone()).await {
            Ok(()) if cancel.is_cancelled() => SpeechOutcome::Cancelled,
            Ok(()) => SpeechOutcome::Local,
            Err(e) => {
                tracing::warn!(error = %e, "Local synthesis failed");
                if cancel.is_cancelled() {
                    SpeechOutcome::Cancelled
                } else {
                    SpeechOutcome::Skipped
                }
            }
        }
    }
}
