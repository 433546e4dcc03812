//! Terminal input during a call
//!
//! Typed lines stand in for recognized speech; lines starting with `/` are
//! call controls.

use crate::runtime::CallHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// What a typed line means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    End,
    ToggleMute,
    Listen,
    Extend,
    ToggleTranslations,
    Unknown(String),
    Speech(String),
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/end" | "/quit" => Self::End,
            "/mute" => Self::ToggleMute,
            "/listen" => Self::Listen,
            "/extend" => Self::Extend,
            "/subs" => Self::ToggleTranslations,
            command if command.starts_with('/') => Self::Unknown(command.to_string()),
            _ => Self::Speech(line.to_string()),
        }
    }
}

/// Display state shared between the input router and the update printer
#[derive(Debug)]
pub struct ConsoleView {
    muted: AtomicBool,
    show_translation: AtomicBool,
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self {
            muted: AtomicBool::new(false),
            show_translation: AtomicBool::new(true),
        }
    }
}

impl ConsoleView {
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    pub fn shows_translation(&self) -> bool {
        self.show_translation.load(Ordering::Relaxed)
    }

    /// Returns the new setting
    pub fn toggle_translation(&self) -> bool {
        !self.show_translation.fetch_xor(true, Ordering::Relaxed)
    }
}

/// Route typed lines until input closes or the call is gone.
///
/// Closed input ends the call, so it is still recorded.
pub async fn route_input(
    mut input: mpsc::Receiver<String>,
    handle: CallHandle,
    speech: mpsc::Sender<String>,
    view: &ConsoleView,
) {
    while let Some(line) = input.recv().await {
        let alive = match ConsoleInput::parse(&line) {
            ConsoleInput::End => handle.end_call().await,
            ConsoleInput::ToggleMute => handle.toggle_mute().await,
            ConsoleInput::Listen => handle.resume_listening().await,
            ConsoleInput::Extend => handle.extend().await,
            ConsoleInput::ToggleTranslations => {
                let on = view.toggle_translation();
                println!("[translations {}]", if on { "on" } else { "off" });
                true
            }
            ConsoleInput::Unknown(command) => {
                println!("unknown command: {command}");
                true
            }
            ConsoleInput::Speech(_) if view.is_muted() => {
                println!("[muted] /mute to talk");
                true
            }
            // Queued until the capture is listening
            ConsoleInput::Speech(text) => speech.send(text).await.is_ok(),
        };
        if !alive {
            return;
        }
    }

    tracing::info!("Input closed, ending call");
    handle.end_call().await;
}
