//! Tutor Call - terminal front-end
//!
//! Typed lines stand in for recognized speech. Lines starting with `/` are
//! call controls.

use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor_call::backend::HttpBackend;
use tutor_call::console::{route_input, ConsoleView};
use tutor_call::config::{AppConfig, LocalTts};
use tutor_call::persona::all_personas;
use tutor_call::runtime::{CallRuntime, CallUpdate, ProductionRuntime};
use tutor_call::session::{format_clock, Session};
use tutor_call::settings::{Level, SettingsEditor, Speed, Topic};
use tutor_call::speech::{CommandPlayer, CommandSynthesizer, FallbackSpeechOutput, LineCapture};
use tutor_call::state_machine::{CallContext, CallPhase};
use tutor_call::store::LocalStore;

/// How long to wait for detached persistence after hanging up
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a call with the configured tutor
    Call,
    /// Show or change tutor settings
    Settings {
        /// Persona id, e.g. `gwen`
        #[arg(short, long)]
        tutor: Option<String>,
        #[arg(short, long)]
        level: Option<Level>,
        #[arg(short, long)]
        speed: Option<Speed>,
        /// Target length in minutes (5 or 10)
        #[arg(short, long)]
        duration: Option<u32>,
        #[arg(long)]
        topic: Option<Topic>,
    },
    /// List recent calls
    History,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; the call itself is printed on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_call=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let store = LocalStore::open(&config.db_path)?;
    let device_id = store.device_id()?;
    let backend = HttpBackend::new(&config.api_url, config.http_timeout)?;
    tracing::debug!(endpoint = %backend.endpoint(), "Using tutor service");

    match cli.command {
        Commands::Call => run_call(&config, store, backend, device_id).await,
        Commands::Settings {
            tutor,
            level,
            speed,
            duration,
            topic,
        } => {
            let mut editor = SettingsEditor::load(backend, store, device_id).await;
            let mut changed = false;
            if let Some(id) = tutor {
                if !editor.select_persona_id(&id) {
                    return Err(format!("unknown tutor: {id}").into());
                }
                changed = true;
            }
            if let Some(minutes) = duration {
                if !editor.set_duration(minutes) {
                    return Err(format!("unsupported duration: {minutes} minutes").into());
                }
                changed = true;
            }
            if let Some(level) = level {
                editor.set_level(level);
                changed = true;
            }
            if let Some(speed) = speed {
                editor.set_speed(speed);
                changed = true;
            }
            if let Some(topic) = topic {
                editor.set_topic(topic);
                changed = true;
            }

            let current = editor.persona();
            for (i, persona) in all_personas().iter().enumerate() {
                let marker = if persona.id == current.id { '*' } else { ' ' };
                println!("{marker} [{}] {persona}", i + 1);
            }
            let s = editor.settings();
            println!(
                "level: {}  speed: {}  duration: {} min  topic: {}",
                s.level.label(),
                s.speed.label(),
                s.duration,
                s.topic.label()
            );

            if changed {
                let report = editor.save().await;
                if !report.synced_remotely {
                    println!("Saved on this device only (server unreachable)");
                }
            }
            Ok(())
        }
        Commands::History => {
            let entries = store.history()?;
            if entries.is_empty() {
                println!("No calls yet");
            }
            for entry in entries {
                println!(
                    "{}  {}  {:>4} words  {}",
                    entry.full_date, entry.duration, entry.words, entry.tutor_name
                );
            }
            Ok(())
        }
    }
}

async fn run_call(
    config: &AppConfig,
    store: LocalStore,
    backend: HttpBackend,
    device_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let editor = SettingsEditor::load(backend.clone(), store.clone(), device_id.clone()).await;
    let settings = editor.settings().clone();
    let persona = editor.persona();

    let mut output = FallbackSpeechOutput::new(backend.clone());
    if let Some(player) = audio_player(config.audio_player.as_deref()) {
        tracing::info!(player = %player.program(), "Remote speech enabled");
        output = output.with_player(Arc::new(player));
    }
    if let Some(synth) = local_synthesizer(&config.local_tts) {
        tracing::info!(synthesizer = %synth.program(), "Local speech fallback enabled");
        output = output.with_local(Arc::new(synth));
    }

    let (line_tx, line_rx) = mpsc::channel(16);
    let context = CallContext::new(settings).with_relisten_base(config.relisten_delay);
    let session = Session::new(
        uuid::Uuid::new_v4().to_string(),
        device_id,
        persona.id,
        chrono::Utc::now(),
    );
    let runtime: ProductionRuntime = CallRuntime::new(
        context,
        session,
        Arc::new(backend),
        Arc::new(LineCapture::new(line_rx)),
        Arc::new(output),
        Arc::new(store),
    );

    let handle = runtime.handle();
    let view = Arc::new(ConsoleView::default());
    tokio::spawn(print_updates(handle.subscribe(), view.clone()));
    tokio::spawn({
        let handle = handle.clone();
        async move { route_input(stdin_lines(), handle, line_tx, &view).await }
    });
    // An interrupted call is still ended and recorded
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, ending call");
            handle.end_call().await;
        }
    });

    println!(
        "[{}] Calling {} ({})...",
        persona.initial(),
        persona.name,
        persona.accent.label()
    );
    println!("Type to talk. /mute /listen /extend /subs /end");

    let report = runtime.run().await;
    if tokio::time::timeout(DRAIN_TIMEOUT, report.pending.wait())
        .await
        .is_err()
    {
        tracing::warn!("Gave up waiting for pending saves");
    }

    if report.entry.is_none() && report.record.is_some() {
        println!("(The call could not be saved to history)");
    }
    Ok(())
}

fn audio_player(configured: Option<&str>) -> Option<CommandPlayer> {
    match configured {
        Some(command) => {
            let mut parts = command.split_whitespace().map(str::to_string);
            let program = parts.next()?;
            Some(CommandPlayer::new(program, parts.collect()))
        }
        None => {
            let detected = CommandPlayer::detect();
            if detected.is_none() {
                tracing::warn!("No audio player found, remote speech disabled");
            }
            detected
        }
    }
}

fn local_synthesizer(configured: &LocalTts) -> Option<CommandSynthesizer> {
    match configured {
        LocalTts::Disabled => None,
        LocalTts::Program(program) => Some(CommandSynthesizer::new(program.as_str())),
        LocalTts::Detect => CommandSynthesizer::detect(),
    }
}

async fn print_updates(mut updates: broadcast::Receiver<CallUpdate>, view: Arc<ConsoleView>) {
    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Update printer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        match update {
            CallUpdate::Phase(phase) => match phase {
                CallPhase::Listening => println!("[listening]"),
                CallPhase::AwaitingReply => println!("[thinking...]"),
                CallPhase::Paused { reason } => {
                    println!("[paused: {reason}] type /listen to resume");
                }
                _ => {}
            },
            CallUpdate::Muted(now_muted) => {
                view.set_muted(now_muted);
                println!("{}", if now_muted { "[muted]" } else { "[unmuted]" });
            }
            CallUpdate::Subtitle(subtitle) => {
                println!("tutor: {}", subtitle.text);
                if let Some(translation) = subtitle
                    .translation
                    .filter(|_| view.shows_translation())
                {
                    println!("       {translation}");
                }
            }
            CallUpdate::Elapsed { .. } => {}
            CallUpdate::TargetReached { elapsed_secs } => {
                println!(
                    "[{} reached] /extend for 5 more minutes or /end",
                    format_clock(elapsed_secs)
                );
            }
            CallUpdate::ReplyDelayed { delay, .. } => {
                println!(
                    "[the tutor didn't answer, listening again in {}s]",
                    delay.as_secs_f32()
                );
            }
            CallUpdate::Ended { summary, .. } => {
                println!(
                    "Call ended: {} - {} turns, {} words",
                    format_clock(summary.duration),
                    summary.turn_count,
                    summary.word_count
                );
                break;
            }
        }
    }
}

/// Read stdin on a plain thread; a blocked read must not hold up runtime
/// shutdown. The channel closes at end of input.
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}
