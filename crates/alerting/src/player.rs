//! Alarm sound playback

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::debug;

use crate::AlertError;

/// Alarm configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Sound file to play; `None` means visual-only alerting
    pub sound_path: Option<PathBuf>,
}

/// Something that can sound the alarm once, blocking until done
pub trait AlarmPlayer: Send + Sync + 'static {
    fn play(&self) -> Result<(), AlertError>;
}

/// Plays a sound file on the default output device
#[derive(Debug, Clone)]
pub struct SoundFilePlayer {
    path: PathBuf,
}

impl SoundFilePlayer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlarmPlayer for SoundFilePlayer {
    fn play(&self) -> Result<(), AlertError> {
        let file = File::open(&self.path)?;
        let source = rodio::Decoder::new(BufReader::new(file))
            .map_err(|e| AlertError::Decode(e.to_string()))?;

        let (_stream, handle) = rodio::OutputStream::try_default()
            .map_err(|e| AlertError::Output(e.to_string()))?;
        let sink = rodio::Sink::try_new(&handle).map_err(|e| AlertError::Output(e.to_string()))?;

        debug!("Playing alarm sound {}", self.path.display());
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}
