//! Tutor persona catalog
//!
//! Personas are static reference data. The catalog order is also the page
//! order of the persona picker in the settings editor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persona used when nothing else resolves
pub const DEFAULT_PERSONA_ID: &str = "gwen";

/// English accent a tutor speaks with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    #[default]
    Us,
    Uk,
    Au,
    In,
}

impl Accent {
    pub fn as_str(self) -> &'static str {
        match self {
            Accent::Us => "us",
            Accent::Uk => "uk",
            Accent::Au => "au",
            Accent::In => "in",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Accent::Us => "American",
            Accent::Uk => "British",
            Accent::Au => "Australian",
            Accent::In => "Indian",
        }
    }
}

impl FromStr for Accent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "us" => Ok(Accent::Us),
            "uk" => Ok(Accent::Uk),
            "au" => Ok(Accent::Au),
            "in" => Ok(Accent::In),
            other => Err(format!("unknown accent: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Female,
    Male,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            other => Err(format!("unknown gender: {other}")),
        }
    }
}

/// A selectable tutor identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub id: &'static str,
    pub name: &'static str,
    pub accent: Accent,
    pub gender: Gender,
    pub tags: &'static [&'static str],
}

impl Persona {
    /// Initial shown on the call screen avatar
    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('?')
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gender = match self.gender {
            Gender::Female => "female",
            Gender::Male => "male",
        };
        write!(
            f,
            "{} ({} {}) [{}]",
            self.name,
            self.accent.label(),
            gender,
            self.tags.join(", ")
        )
    }
}

static PERSONAS: [Persona; 6] = [
    Persona {
        id: "gwen",
        name: "Gwen",
        accent: Accent::Us,
        gender: Gender::Female,
        tags: &["friendly", "patient", "business"],
    },
    Persona {
        id: "chris",
        name: "Chris",
        accent: Accent::Us,
        gender: Gender::Male,
        tags: &["energetic", "casual"],
    },
    Persona {
        id: "emma",
        name: "Emma",
        accent: Accent::Uk,
        gender: Gender::Female,
        tags: &["calm", "detailed feedback"],
    },
    Persona {
        id: "james",
        name: "James",
        accent: Accent::Uk,
        gender: Gender::Male,
        tags: &["witty", "interview prep"],
    },
    Persona {
        id: "olivia",
        name: "Olivia",
        accent: Accent::Au,
        gender: Gender::Female,
        tags: &["cheerful", "travel"],
    },
    Persona {
        id: "arjun",
        name: "Arjun",
        accent: Accent::In,
        gender: Gender::Male,
        tags: &["encouraging", "daily life"],
    },
];

/// All personas in picker order
pub fn all_personas() -> &'static [Persona] {
    &PERSONAS
}

pub fn find_persona(id: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.id == id)
}

pub fn persona_index(id: &str) -> Option<usize> {
    PERSONAS.iter().position(|p| p.id == id)
}

/// First persona speaking with the given accent and gender
pub fn find_persona_by_voice(accent: Accent, gender: Gender) -> Option<&'static Persona> {
    PERSONAS
        .iter()
        .find(|p| p.accent == accent && p.gender == gender)
}

pub fn default_persona() -> &'static Persona {
    &PERSONAS[0]
}
