use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interview_live::{
    create_router, AppState, ClockedOutputProvider, Config, ConnectionState, FileDevices,
    GeminiLiveTransport, SessionConfig, SessionController,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "interview-live", version, about = "Real-time mock HR interview sessions")]
struct Cli {
    /// Configuration file (TOML, optional)
    #[arg(long, default_value = "config/interview-live")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve {
        /// WAV file used as the microphone
        #[arg(long)]
        wav: PathBuf,
        /// Image used as the camera
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Run a single interview from the terminal
    Call {
        /// Role being interviewed for
        #[arg(long)]
        role: String,
        /// WAV file used as the microphone
        #[arg(long)]
        wav: PathBuf,
        /// Image used as the camera
        #[arg(long)]
        image: Option<PathBuf>,
        /// Record the interviewer's audio to this WAV file
        #[arg(long)]
        record: Option<PathBuf>,
        /// End the interview after this many seconds
        #[arg(long, default_value_t = 300)]
        duration_secs: u64,
    },
}

fn build_controller(
    session_config: SessionConfig,
    wav: PathBuf,
    image: Option<PathBuf>,
) -> SessionController {
    let transport = GeminiLiveTransport::new(
        session_config.endpoint.clone(),
        session_config.connect_timeout,
    );
    let devices = FileDevices::new(wav, image, session_config.capture.sample_rate);
    let outputs = ClockedOutputProvider::new(session_config.record_path.clone());

    SessionController::new(
        session_config,
        Arc::new(transport),
        Arc::new(devices),
        Arc::new(outputs),
    )
}

async fn serve(cfg: Config, wav: PathBuf, image: Option<PathBuf>) -> Result<()> {
    let controller = build_controller(SessionConfig::from_config(&cfg), wav, image);
    let state = AppState::new(controller.spawn());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on http://{}", cfg.service.name, addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn call(
    cfg: Config,
    role: String,
    wav: PathBuf,
    image: Option<PathBuf>,
    record: Option<PathBuf>,
    duration_secs: u64,
) -> Result<()> {
    let mut session_config = SessionConfig::from_config(&cfg);
    if record.is_some() {
        session_config.record_path = record;
    }

    let handle = build_controller(session_config, wav, image).spawn();
    let mut view = handle.subscribe();

    handle
        .connect(role)
        .await
        .context("Failed to start interview")?;

    let deadline = tokio::time::sleep(Duration::from_secs(duration_secs));
    tokio::pin!(deadline);

    let mut printed = 0;
    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = view.borrow_and_update().clone();
                for line in snapshot.logs.iter().skip(printed) {
                    println!("{}", line);
                }
                printed = snapshot.logs.len();

                if snapshot.state == ConnectionState::Idle {
                    if let Some(error) = snapshot.error {
                        warn!("Interview ended with error: {}", error);
                    }
                    break;
                }
            }
            _ = &mut deadline => {
                info!("Interview time limit reached");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    handle.disconnect().await;

    let summary = handle.view();
    for line in summary.logs.iter().skip(printed) {
        println!("{}", line);
    }
    info!(
        "Sent {} audio chunks and {} video frames, played {} segments",
        summary.stats.audio_chunks_sent,
        summary.stats.video_frames_sent,
        summary.stats.segments_scheduled
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve { wav, image } => serve(cfg, wav, image).await,
        Command::Call {
            role,
            wav,
            image,
            record,
            duration_secs,
        } => call(cfg, role, wav, image, record, duration_secs).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_requires_wav() {
        assert!(Cli::try_parse_from(["interview-live", "serve"]).is_err());

        let cli = Cli::try_parse_from([
            "interview-live",
            "--config",
            "local",
            "serve",
            "--wav",
            "mic.wav",
            "--image",
            "face.png",
        ])
        .unwrap();
        assert_eq!(cli.config, "local");
        match cli.command {
            Command::Serve { wav, image } => {
                assert_eq!(wav, PathBuf::from("mic.wav"));
                assert_eq!(image, Some(PathBuf::from("face.png")));
            }
            Command::Call { .. } => panic!("expected serve"),
        }
    }
}
