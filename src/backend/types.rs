//! Wire types for the tutor backend
//!
//! Every call is a POST of a JSON object whose `action` field selects the
//! handler on the server side.

use crate::session::{SessionSummary, Speaker, Turn};
use crate::settings::StoredSettings;
use serde::{Deserialize, Serialize};

/// History entry sent with a chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Speaker,
    pub content: String,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Assistant reply, optionally with a translation for the subtitle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub translation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub(super) enum Request<'a> {
    Chat {
        messages: &'a [ChatMessage],
        settings: &'a StoredSettings,
    },
    Tts {
        text: &'a str,
        settings: &'a StoredSettings,
    },
    StartSession {
        device_id: &'a str,
        session_id: &'a str,
        settings: &'a StoredSettings,
        tutor_name: &'a str,
    },
    EndSession {
        device_id: &'a str,
        session_id: &'a str,
        #[serde(flatten)]
        summary: SessionSummary,
    },
    SaveMessage {
        device_id: &'a str,
        session_id: &'a str,
        message: &'a Turn,
    },
    GetSettings {
        device_id: &'a str,
    },
    SaveSettings {
        device_id: &'a str,
        settings: &'a StoredSettings,
    },
}

impl Request<'_> {
    pub(super) fn action(&self) -> &'static str {
        match self {
            Request::Chat { .. } => "chat",
            Request::Tts { .. } => "tts",
            Request::StartSession { .. } => "start_session",
            Request::EndSession { .. } => "end_session",
            Request::SaveMessage { .. } => "save_message",
            Request::GetSettings { .. } => "get_settings",
            Request::SaveSettings { .. } => "save_settings",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TtsResponse {
    #[serde(default)]
    pub audio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SettingsResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub settings: Option<StoredSettings>,
    #[serde(default)]
    pub is_default: bool,
}

impl SettingsResponse {
    /// Stored settings, only when the server reports success and actually
    /// holds some for this device
    pub(super) fn into_stored(self) -> Option<StoredSettings> {
        if self.success != Some(true) || self.is_default {
            return None;
        }
        self.settings
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub error: String,
}
