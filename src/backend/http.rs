//! HTTP implementation of the backend traits

use super::types::{ErrorBody, Request, SettingsResponse, TtsResponse};
use super::{
    BackendError, ChatMessage, ChatReply, ConversationService, SettingsService,
    SpeechSynthesisService,
};
use crate::session::{SessionSummary, Turn};
use crate::settings::StoredSettings;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::time::{Duration, Instant};

/// Client for the action-routed tutor endpoint
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: DeserializeOwned>(&self, request: &Request<'_>) -> Result<T, BackendError> {
        let action = request.action();
        let start = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    BackendError::network(format!("Connection failed: {e}"))
                } else {
                    BackendError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::network(format!("Failed to read response: {e}")))?;

        tracing::debug!(
            action,
            status = status.as_u16(),
            duration_ms = %start.elapsed().as_millis(),
            "Backend request completed"
        );

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| BackendError::decode(format!("Failed to parse {action} response: {e}")))
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.to_string(), |b| b.error);
    match status.as_u16() {
        400..=499 => BackendError::invalid_request(format!("HTTP {status}: {message}")),
        _ => BackendError::server(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl ConversationService for HttpBackend {
    async fn start_session(
        &self,
        device_id: &str,
        session_id: &str,
        settings: &StoredSettings,
        tutor_name: &str,
    ) -> Result<(), BackendError> {
        self.post::<IgnoredAny>(&Request::StartSession {
            device_id,
            session_id,
            settings,
            tutor_name,
        })
        .await?;
        Ok(())
    }

    async fn send_message(
        &self,
        history: &[ChatMessage],
        settings: &StoredSettings,
    ) -> Result<ChatReply, BackendError> {
        let reply: ChatReply = self
            .post(&Request::Chat {
                messages: history,
                settings,
            })
            .await?;
        if reply.message.trim().is_empty() {
            return Err(BackendError::decode("Empty chat reply"));
        }
        Ok(reply)
    }

    async fn save_message(
        &self,
        device_id: &str,
        session_id: &str,
        turn: &Turn,
    ) -> Result<(), BackendError> {
        self.post::<IgnoredAny>(&Request::SaveMessage {
            device_id,
            session_id,
            message: turn,
        })
        .await?;
        Ok(())
    }

    async fn end_session(
        &self,
        device_id: &str,
        session_id: &str,
        summary: SessionSummary,
    ) -> Result<(), BackendError> {
        self.post::<IgnoredAny>(&Request::EndSession {
            device_id,
            session_id,
            summary,
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesisService for HttpBackend {
    async fn text_to_speech(
        &self,
        text: &str,
        settings: &StoredSettings,
    ) -> Result<Option<Vec<u8>>, BackendError> {
        let response: TtsResponse = self.post(&Request::Tts { text, settings }).await?;
        match response.audio {
            Some(encoded) if !encoded.is_empty() => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(|e| BackendError::decode(format!("Invalid audio payload: {e}"))),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl SettingsService for HttpBackend {
    async fn get_settings(&self, device_id: &str) -> Result<Option<StoredSettings>, BackendError> {
        let response: SettingsResponse = self.post(&Request::GetSettings { device_id }).await?;
        Ok(response.into_stored())
    }

    async fn save_settings(
        &self,
        device_id: &str,
        settings: &StoredSettings,
    ) -> Result<(), BackendError> {
        self.post::<IgnoredAny>(&Request::SaveSettings {
            device_id,
            settings,
        })
        .await?;
        Ok(())
    }
}
