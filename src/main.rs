use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use gesture_capture::config::Configuration;
use gesture_capture::coordinator::CoordinatorBuilder;
use gesture_capture::error::{AppError, ConfigError};
use gesture_capture::sensing::{ReplayLandmarkSource, StillFrameSource};
use gesture_capture::sink::SinkKind;
use tracing::{info, Level};

/// Watches a hand and fires a capture on an open-then-closed gesture.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file; GESTURE_CAPTURE__* variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Recorded landmark script to replay.
    #[arg(long)]
    landmarks: Option<PathBuf>,
    /// Still image used as every frame.
    #[arg(long)]
    frame: Option<PathBuf>,
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    let mut configuration = Configuration::load(args.config.as_deref())?;
    if let Some(landmarks) = args.landmarks {
        configuration.source.landmarks = Some(landmarks);
    }
    if let Some(frame) = args.frame {
        configuration.source.frame = Some(frame);
    }
    if let Some(sink) = args.sink {
        configuration.sink.kind = sink;
    }
    init_logging(configuration.log_level()?);

    let landmarks_path = configuration
        .source
        .landmarks
        .clone()
        .ok_or(ConfigError::Invalid {
            field: "source.landmarks",
            reason: "a landmark script is required (--landmarks)".to_string(),
        })?;
    let landmarks = ReplayLandmarkSource::from_path(&landmarks_path)?;
    info!(path = %landmarks_path.display(), entries = landmarks.len(), "Loaded landmark script");

    let frames = match &configuration.source.frame {
        Some(path) => StillFrameSource::open(path)?,
        None => StillFrameSource::blank(configuration.source.width, configuration.source.height),
    };

    let coordinator = CoordinatorBuilder::new(configuration)
        .frame_source(Box::new(frames))
        .landmark_source(Arc::new(landmarks))
        .build()?;

    let mut status_rx = coordinator.subscribe();
    let mut captures_seen = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                if status.last_capture.is_some() && status.captures_fired != captures_seen && !status.capture_in_flight {
                    captures_seen = status.captures_fired;
                    info!(outcome = ?status.last_capture, "Capture {} finished", captures_seen);
                }
            }
        }
    }

    let stats = coordinator.shutdown().await;
    info!(
        scheduled = stats.scheduled,
        evaluated = stats.evaluated,
        skipped = stats.skipped,
        "Poll loop summary"
    );
    Ok(())
}
