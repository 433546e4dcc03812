//! Speech capture and speech output adapters

mod capture;
mod output;
mod process;

pub use capture::{CaptureErrorKind, CaptureEvent, LineCapture, SpeechCapture};
pub use output::{
    AudioPlayer, FallbackSpeechOutput, LocalSynthesizer, SpeechOutcome, SpeechOutput,
};
pub use process::{CommandPlayer, CommandSynthesizer};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Exit { program: String, status: String },
    #[error("Audio I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
