//! Session configuration chosen in the settings editor
//!
//! `TutorSettings` is the fully-resolved configuration handed to a call.
//! `StoredSettings` is the loose wire/cache shape: every field optional,
//! unknown values tolerated and replaced by defaults on resolution.

mod editor;
mod picker;

pub use editor::{SaveReport, SettingsCache, SettingsEditor, SettingsSource};
pub use picker::PersonaPicker;

use crate::persona::{
    default_persona, find_persona, find_persona_by_voice, Persona, DEFAULT_PERSONA_ID,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Selectable session lengths in minutes
pub const DURATION_OPTIONS: [u32; 2] = [5, 10];
pub const DEFAULT_DURATION_MINUTES: u32 = 5;
/// Minutes added per extension during a call
pub const EXTENSION_MINUTES: u32 = 5;

macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal, $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), ": {}"), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Proficiency level the tutor pitches the conversation at
    Level {
        Beginner => "beginner", "Beginner",
        Intermediate => "intermediate", "Intermediate",
        Advanced => "advanced", "Advanced",
    }
);

str_enum!(
    /// Speaking speed preference
    Speed {
        Slow => "slow", "Slow",
        Normal => "normal", "Normal",
        Fast => "fast", "Fast",
    }
);

str_enum!(
    /// Conversation topic
    Topic {
        Business => "business", "Business",
        Daily => "daily", "Daily life",
        Travel => "travel", "Travel",
        Interview => "interview", "Job interview",
    }
);

impl Speed {
    /// Playback rate multiplier for local synthesis
    pub fn rate(self) -> f32 {
        match self {
            Speed::Slow => 0.8,
            Speed::Normal => 1.0,
            Speed::Fast => 1.2,
        }
    }
}

/// Resolved session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorSettings {
    pub tutor_id: String,
    pub level: Level,
    pub speed: Speed,
    /// Target call length in minutes
    pub duration: u32,
    pub topic: Topic,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            tutor_id: DEFAULT_PERSONA_ID.to_string(),
            level: Level::Intermediate,
            speed: Speed::Normal,
            duration: DEFAULT_DURATION_MINUTES,
            topic: Topic::Business,
        }
    }
}

impl TutorSettings {
    /// Resolve a partial stored configuration onto the defaults, field by field.
    ///
    /// The persona is looked up by id first, then by accent and gender (the
    /// backend only keeps the voice fields), then falls back to the default.
    pub fn from_stored(stored: &StoredSettings) -> Self {
        let mut settings = Self::default();

        let persona = stored
            .tutor_id
            .as_deref()
            .and_then(find_persona)
            .or_else(|| {
                let accent = stored.accent.as_deref()?.parse().ok()?;
                let gender = stored.gender.as_deref()?.parse().ok()?;
                find_persona_by_voice(accent, gender)
            });
        if let Some(persona) = persona {
            settings.tutor_id = persona.id.to_string();
        }

        if let Some(level) = parse_field(stored.level.as_deref()) {
            settings.level = level;
        }
        if let Some(speed) = parse_field(stored.speed.as_deref()) {
            settings.speed = speed;
        }
        if let Some(topic) = parse_field(stored.topic.as_deref()) {
            settings.topic = topic;
        }
        match stored.duration {
            Some(minutes) if DURATION_OPTIONS.contains(&minutes) => settings.duration = minutes,
            Some(minutes) => tracing::warn!(minutes, "Ignoring unsupported session duration"),
            None => {}
        }

        settings
    }

    /// Full stored form, including the persona's display and voice fields
    pub fn to_stored(&self) -> StoredSettings {
        let persona = self.persona();
        StoredSettings {
            tutor_id: Some(persona.id.to_string()),
            tutor_name: Some(persona.name.to_string()),
            accent: Some(persona.accent.as_str().to_string()),
            gender: Some(persona.gender.as_str().to_string()),
            level: Some(self.level.as_str().to_string()),
            speed: Some(self.speed.as_str().to_string()),
            duration: Some(self.duration),
            topic: Some(self.topic.as_str().to_string()),
        }
    }

    pub fn persona(&self) -> &'static Persona {
        find_persona(&self.tutor_id).unwrap_or_else(default_persona)
    }

    pub fn target_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration) * 60)
    }
}

fn parse_field<T: FromStr<Err = String>>(raw: Option<&str>) -> Option<T> {
    match raw?.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid stored setting");
            None
        }
    }
}

/// Settings as cached locally and exchanged with the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}
