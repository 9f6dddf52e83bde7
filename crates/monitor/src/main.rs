//! Drowsiness Monitor - Main Entry Point

use anyhow::Result;
use clap::Parser;
use monitor::{init_logging, run_session, MonitorConfig};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Directory of frames to monitor
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// SeetaFace face detection model
    #[arg(long)]
    face_model: Option<String>,

    /// 68-point landmark model (ONNX)
    #[arg(short = 'p', long)]
    landmark_model: Option<String>,

    /// Alarm sound file (WAV/MP3); omit for visual-only alerts
    #[arg(short, long)]
    alarm: Option<PathBuf>,

    /// Write annotated frames to this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Eye aspect ratio threshold
    #[arg(long)]
    ear_threshold: Option<f32>,

    /// Consecutive closed-eye frames before the alarm
    #[arg(long)]
    consec_frames: Option<u32>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Command-line flags win over file and environment settings
    fn apply(self, config: &mut MonitorConfig) {
        if let Some(frames) = self.frames {
            config.capture.source = frames;
        }
        if let Some(path) = self.face_model {
            config.dms.face_model_path = Some(path);
        }
        if let Some(path) = self.landmark_model {
            config.dms.landmark_model_path = Some(path);
        }
        if let Some(path) = self.alarm {
            config.alarm.sound_path = Some(path);
        }
        if let Some(dir) = self.output {
            config.output_dir = Some(dir);
        }
        if let Some(threshold) = self.ear_threshold {
            config.dms.ear_threshold = threshold;
        }
        if let Some(frames) = self.consec_frames {
            config.dms.consec_frames = frames;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let runtime = Handle::current();
    let stats = tokio::task::spawn_blocking(move || run_session(config, runtime, &stop)).await??;

    info!("Monitored {} frames, {} alarm episodes", stats.frames, stats.alarm_episodes);
    Ok(())
}
