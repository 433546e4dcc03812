//! Speech output backed by external programs

use super::{AudioPlayer, LocalSynthesizer, SpeechError};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// espeak's default speaking rate in words per minute
const ESPEAK_BASE_WPM: f32 = 175.0;

/// Players tried in order, each reading the payload from stdin
const PLAYER_CANDIDATES: &[(&str, &[&str])] = &[
    ("mpv", &["--no-video", "--really-quiet", "-"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet", "-"]),
];

const SYNTH_CANDIDATES: &[&str] = &["espeak-ng", "espeak"];

/// Plays audio by piping it into an external player
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// First known player found on `PATH`
    pub fn detect() -> Option<Self> {
        PLAYER_CANDIDATES.iter().find_map(|(program, args)| {
            which::which(program).ok().map(|path| {
                tracing::debug!(player = %path.display(), "Detected audio player");
                Self::new(
                    path.to_string_lossy(),
                    args.iter().map(ToString::to_string).collect(),
                )
            })
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl AudioPlayer for CommandPlayer {
    async fn play(&self, audio: &[u8], cancel: CancellationToken) -> Result<(), SpeechError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let stdin = child.stdin.take();

        let run = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(audio).await?;
                stdin.shutdown().await?;
            }
            child.wait().await
        };

        run_to_completion(&self.program, run, &cancel).await
    }
}

/// Speaks text with espeak-ng (or a compatible command)
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn detect() -> Option<Self> {
        SYNTH_CANDIDATES.iter().find_map(|program| {
            which::which(program).ok().map(|path| {
                tracing::debug!(synthesizer = %path.display(), "Detected local synthesizer");
                Self::new(path.to_string_lossy())
            })
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn spawn(&self, text: &str, rate: f32) -> Result<Child, SpeechError> {
        Command::new(&self.program)
            .arg("-s")
            .arg(words_per_minute(rate).to_string())
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

#[async_trait]
impl LocalSynthesizer for CommandSynthesizer {
    async fn speak(
        &self,
        text: &str,
        rate: f32,
        cancel: CancellationToken,
    ) -> Result<(), SpeechError> {
        let mut child = self.spawn(text, rate)?;
        let run = async move { child.wait().await };
        run_to_completion(&self.program, run, &cancel).await
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn words_per_minute(rate: f32) -> u32 {
    (ESPEAK_BASE_WPM * rate.clamp(0.25, 4.0)).round() as u32
}

/// Wait for a child-owning future, or drop it (killing the child) on cancel
async fn run_to_completion<F>(
    program: &str,
    run: F,
    cancel: &CancellationToken,
) -> Result<(), SpeechError>
where
    F: std::future::Future<Output = std::io::Result<ExitStatus>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(program, "Speech process cancelled");
            Ok(())
        }
        status = run => {
            let status = status?;
            if status.success() {
                Ok(())
            } else {
                Err(SpeechError::Exit {
                    program: program.to_string(),
                    status: status.to_string(),
                })
            }
        }
    }
}
