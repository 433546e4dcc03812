//! Remote tutor service
//!
//! Chat, translation, speech synthesis, message logging and settings sync
//! all live behind one action-routed HTTP endpoint. The traits split it along
//! the seams its callers use so each can be mocked on its own.

mod error;
mod http;
mod types;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpBackend;
pub use types::{ChatMessage, ChatReply};

use crate::session::{SessionSummary, Turn};
use crate::settings::StoredSettings;
use async_trait::async_trait;
use std::sync::Arc;

/// Session lifecycle and the conversational exchange
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Register a new session. Best-effort from the caller's point of view.
    async fn start_session(
        &self,
        device_id: &str,
        session_id: &str,
        settings: &StoredSettings,
        tutor_name: &str,
    ) -> Result<(), BackendError>;

    /// Send the role-tagged history and get the next assistant line
    async fn send_message(
        &self,
        history: &[ChatMessage],
        settings: &StoredSettings,
    ) -> Result<ChatReply, BackendError>;

    async fn save_message(
        &self,
        device_id: &str,
        session_id: &str,
        turn: &Turn,
    ) -> Result<(), BackendError>;

    async fn end_session(
        &self,
        device_id: &str,
        session_id: &str,
        summary: SessionSummary,
    ) -> Result<(), BackendError>;
}

/// Remote text-to-speech
#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Encoded audio for `text`, or `None` when the service produced no payload
    async fn text_to_speech(
        &self,
        text: &str,
        settings: &StoredSettings,
    ) -> Result<Option<Vec<u8>>, BackendError>;
}

/// Per-device settings kept on the server
#[async_trait]
pub trait SettingsService: Send + Sync {
    /// `None` when the server has nothing stored for this device
    async fn get_settings(&self, device_id: &str) -> Result<Option<StoredSettings>, BackendError>;

    async fn save_settings(
        &self,
        device_id: &str,
        settings: &StoredSettings,
    ) -> Result<(), BackendError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ConversationService + ?Sized> ConversationService for Arc<T> {
    async fn start_session(
        &self,
        device_id: &str,
        session_id: &str,
        settings: &StoredSettings,
        tutor_name: &str,
    ) -> Result<(), BackendError> {
        (**self)
            .start_session(device_id, session_id, settings, tutor_name)
            .await
    }

    async fn send_message(
        &self,
        history: &[ChatMessage],
        settings: &StoredSettings,
    ) -> Result<ChatReply, BackendError> {
        (**self).send_message(history, settings).await
    }

    async fn save_message(
        &self,
        device_id: &str,
        session_id: &str,
        turn: &Turn,
    ) -> Result<(), BackendError> {
        (**self).save_message(device_id, session_id, turn).await
    }

    async fn end_session(
        &self,
        device_id: &str,
        session_id: &str,
        summary: SessionSummary,
    ) -> Result<(), BackendError> {
        (**self).end_session(device_id, session_id, summary).await
    }
}

#[async_trait]
impl<T: SpeechSynthesisService + ?Sized> SpeechSynthesisService for Arc<T> {
    async fn text_to_speech(
        &self,
        text: &str,
        settings: &StoredSettings,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        (**self).text_to_speech(text, settings).await
    }
}

#[async_trait]
impl<T: SettingsService + ?Sized> SettingsService for Arc<T> {
    async fn get_settings(&self, device_id: &str) -> Result<Option<StoredSettings>, BackendError> {
        (**self).get_settings(device_id).await
    }

    async fn save_settings(
        &self,
        device_id: &str,
        settings: &StoredSettings,
    ) -> Result<(), BackendError> {
        (**self).save_settings(device_id, settings).await
    }
}
