//! Call session data: turns, counters and the records written at teardown

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn. Doubles as the chat role on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One utterance within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub role: Speaker,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    pub turn_number: u32,
}

/// Number of whitespace-delimited words in an utterance
pub fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// One call from greeting to hang-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub device_id: String,
    pub persona_id: String,
    pub started_at: DateTime<Utc>,
    /// Elapsed call time in whole seconds
    pub duration_secs: u64,
    pub turn_count: u32,
    pub word_count: u32,
    pub turns: Vec<Turn>,
    /// Whether the backend acknowledged opening this session
    pub remote_open: bool,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        device_id: impl Into<String>,
        persona_id: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            persona_id: persona_id.into(),
            started_at,
            duration_secs: 0,
            turn_count: 0,
            word_count: 0,
            turns: Vec::new(),
            remote_open: false,
        }
    }

    /// Append a user turn, bumping the turn and word counters
    pub fn push_user_turn(&mut self, content: impl Into<String>) -> Turn {
        let content = content.into();
        self.word_count = self.word_count.saturating_add(word_count(&content));
        self.push(Speaker::User, content, None)
    }

    pub fn push_assistant_turn(
        &mut self,
        content: impl Into<String>,
        translation: Option<String>,
    ) -> Turn {
        self.push(Speaker::Assistant, content.into(), translation)
    }

    fn push(&mut self, role: Speaker, content: String, translation: Option<String>) -> Turn {
        self.turn_count += 1;
        let turn = Turn {
            role,
            content,
            translation,
            turn_number: self.turn_count,
        };
        self.turns.push(turn.clone());
        turn
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            duration: self.duration_secs,
            turn_count: self.turn_count,
            word_count: self.word_count,
        }
    }
}

/// Final counters sent when closing the remote session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Seconds
    pub duration: u64,
    pub turn_count: u32,
    pub word_count: u32,
}

/// Finalized call kept locally as the last call result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub duration: u64,
    pub messages: Vec<Turn>,
    pub date: DateTime<Utc>,
    pub turn_count: u32,
    pub word_count: u32,
    pub tutor_name: String,
    pub device_id: String,
    pub session_id: String,
}

impl CallRecord {
    pub fn from_session(session: &Session, tutor_name: &str, ended_at: DateTime<Utc>) -> Self {
        Self {
            duration: session.duration_secs,
            messages: session.turns.clone(),
            date: ended_at,
            turn_count: session.turn_count,
            word_count: session.word_count,
            tutor_name: tutor_name.to_string(),
            device_id: session.device_id.clone(),
            session_id: session.id.clone(),
        }
    }

    pub fn history_entry(&self) -> HistoryEntry {
        let local = self.date.with_timezone(&Local);
        HistoryEntry {
            date: local.format("%Y-%m-%d").to_string(),
            full_date: local.format("%Y-%m-%d %H:%M:%S").to_string(),
            duration: format_clock(self.duration),
            words: self.word_count,
            tutor_name: self.tutor_name.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

/// Row in the rolling call history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub date: String,
    pub full_date: String,
    /// `MM:SS`
    pub duration: String,
    pub words: u32,
    pub tutor_name: String,
    pub session_id: String,
}

/// Format seconds as `MM:SS`. Minutes are not wrapped at 60.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
