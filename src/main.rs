use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mock_interview::config::TranscriptionProvider;
use mock_interview::http::default_questions;
use mock_interview::session::DisplayState;
use mock_interview::{
    create_router, AppState, Config, FileRecorder, Intent, InterviewBackend, InterviewError, InterviewMachine,
    NatsClient, NatsTranscriber, SessionClient, SessionStatus, Transcriber, UnsupportedTranscriber, ViewModel,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mock-interview", version, about = "Record answers to mock interview questions")]
struct Cli {
    /// Config file, extension optional
    #[arg(long, default_value = "config/mock-interview")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the reference interview backend
    Serve {
        #[arg(long)]
        bind: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        /// Keep uploaded answers in this directory
        #[arg(long)]
        upload_dir: Option<PathBuf>,
    },

    /// Take an interview from the terminal.
    ///
    /// Reads one intent per line from stdin: start, stop, skip, next, retry,
    /// cancel, or quit.
    Interview {
        #[arg(long)]
        name: String,

        /// WAV file replayed as the microphone
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Print every view-model update as a JSON line
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the interview itself
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { bind, port, upload_dir } => serve(&cfg, bind, port, upload_dir).await,
        Command::Interview { name, audio, json } => interview(&cfg, &name, audio, json).await,
    }
}

async fn serve(cfg: &Config, bind: Option<String>, port: Option<u16>, upload_dir: Option<PathBuf>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
    let port = port.unwrap_or(cfg.server.port);
    let upload_dir = upload_dir.or_else(|| cfg.server.upload_dir.as_ref().map(PathBuf::from));

    if let Some(dir) = &upload_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        info!("Saving answers to {}", dir.display());
    }

    let state = AppState::new(default_questions(), upload_dir).with_max_upload_bytes(cfg.server.max_upload_bytes);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", bind, port))?;

    info!("Interview backend listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

async fn interview(cfg: &Config, name: &str, audio: Option<PathBuf>, json: bool) -> Result<()> {
    let client = SessionClient::new(&cfg.client_config())?;
    let session = client.login(name).await.map_err(InterviewError::from)?;

    let audio = audio
        .or_else(|| cfg.audio.replay_file.as_ref().map(PathBuf::from))
        .context("No audio source: pass --audio or set audio.replay_file")?;
    let recorder = Arc::new(FileRecorder::new(audio, cfg.recorder_config()));

    let transcriber = connect_transcriber(cfg, &session.session_id).await;
    let backend: Arc<dyn InterviewBackend> = Arc::new(client);

    let machine = InterviewMachine::new(session, cfg.machine_config(), backend, recorder, transcriber);
    let mut view_rx = machine.subscribe();

    let (intent_tx, intent_rx) = mpsc::channel(16);
    let runner = tokio::spawn(machine.run(intent_rx));

    print_view(&view_rx.borrow_and_update().clone(), json)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("quit") {
                    break;
                }
                match line.parse::<Intent>() {
                    Ok(intent) => {
                        if intent_tx.send(intent).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                print_view(&view, json)?;
                if view.status == SessionStatus::Completed {
                    break;
                }
            }
        }
    }

    // Closing the intent channel stops the machine
    drop(intent_tx);
    runner.await.context("Interview task failed")?;

    Ok(())
}

async fn connect_transcriber(cfg: &Config, session_id: &str) -> Arc<dyn Transcriber> {
    if cfg.transcription.provider == TranscriptionProvider::None {
        info!("Live transcription disabled");
        return Arc::new(UnsupportedTranscriber);
    }

    let connect = NatsClient::connect(&cfg.transcription.nats_url, session_id.to_string());
    match tokio::time::timeout(Duration::from_secs(5), connect).await {
        Ok(Ok(client)) => Arc::new(NatsTranscriber::new(Arc::new(client), 64)),
        Ok(Err(e)) => {
            warn!("Live transcription unavailable: {:#}", e);
            Arc::new(UnsupportedTranscriber)
        }
        Err(_) => {
            warn!("Live transcription unavailable: NATS connect timed out");
            Arc::new(UnsupportedTranscriber)
        }
    }
}

fn print_view(view: &ViewModel, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(view)?);
    } else {
        println!("{}", describe(view));
    }
    Ok(())
}

fn describe(view: &ViewModel) -> String {
    let mut out = format!("[{}]", view.status.as_str());

    match &view.display {
        DisplayState::Loading => out.push_str(" Loading..."),
        DisplayState::Question { question } => {
            out.push_str(&format!(" Q{}: {}", question.id, question.text));
        }
        DisplayState::Feedback { feedback, .. } => {
            out.push_str(&format!(" {}", feedback.message));
            if !feedback.transcript.is_empty() {
                out.push_str(&format!(" | \"{}\"", feedback.transcript));
            }
            for (metric, score) in &feedback.scores {
                out.push_str(&format!(" | {}: {}/10", metric, score));
            }
        }
        DisplayState::Completed => out.push_str(" Interview completed. Thank you!"),
    }

    let recording = &view.recording;
    if recording.elapsed_seconds > 0 || recording.chunk_count > 0 {
        out.push_str(&format!(
            " | rec {} ({} fragments)",
            recording.elapsed_label, recording.chunk_count
        ));
    }
    if !recording.live_transcript.is_empty() || !recording.interim_transcript.is_empty() {
        out.push_str(&format!(
            " | {} {}",
            recording.live_transcript, recording.interim_transcript
        ));
    }

    if let Some(error) = &view.error {
        out.push_str(&format!(" | error: {}", error));
    }

    let actions = view.actions;
    let available: Vec<&str> = [
        (actions.start, "start"),
        (actions.stop, "stop"),
        (actions.skip, "skip"),
        (actions.next, "next"),
        (actions.retry, "retry"),
        (actions.cancel, "cancel"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect();
    if !available.is_empty() {
        out.push_str(&format!(" > {}", available.join("/")));
    }

    out
}
