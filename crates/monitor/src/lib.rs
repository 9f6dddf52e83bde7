//! Drowsiness Monitor
//!
//! Wires frame acquisition, drowsiness detection, alarm dispatch, and
//! annotated output into one sequential monitoring loop.

pub mod display;
pub mod overlay;
pub mod session;
pub mod settings;

pub use display::{DirectorySink, FrameSink, NullSink};
pub use session::{MonitorSession, SessionStats};
pub use settings::MonitorConfig;

use alerting::{AlarmDispatcher, AlarmPlayer, SoundFilePlayer};
use camera_capture::{CameraError, ImageSequenceSource};
use dms::{DmsError, DmsModule};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Video source error: {0}")]
    Camera(#[from] CameraError),

    #[error("Detection error: {0}")]
    Dms(#[from] DmsError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize logging
pub fn init_logging(debug: bool) -> Result<(), MonitorError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if debug { Level::DEBUG } else { Level::INFO })
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Build every collaborator from the config and run one session.
///
/// Models and the video source are opened before the loop starts, so a
/// missing camera or model ends here with an error. Alarm playback is
/// spawned on `runtime`.
pub fn run_session(
    config: MonitorConfig,
    runtime: Handle,
    stop: &AtomicBool,
) -> Result<SessionStats, MonitorError> {
    let dms = DmsModule::from_models(config.dms.clone())?;
    info!(
        "Detector ready (EAR threshold {}, {} consecutive frames)",
        config.dms.ear_threshold, config.dms.consec_frames
    );

    let source = ImageSequenceSource::open(&config.capture)?;

    let player = config.alarm.sound_path.map(|path| {
        if !path.exists() {
            warn!("Alarm sound {} not found, playback will fail", path.display());
        }
        Arc::new(SoundFilePlayer::new(path)) as Arc<dyn AlarmPlayer>
    });
    let dispatcher = AlarmDispatcher::new(player, runtime);

    let sink: Box<dyn FrameSink> = match &config.output_dir {
        Some(dir) => Box::new(DirectorySink::create(dir)?),
        None => Box::new(NullSink),
    };

    MonitorSession::new(source, dms, dispatcher, sink).run(stop)
}
