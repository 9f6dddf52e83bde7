//! Alerting System
//!
//! Sounds the drowsiness alarm without blocking the frame loop. At most one
//! playback runs per alarm episode.

mod dispatcher;
mod player;

pub use dispatcher::AlarmDispatcher;
pub use player::{AlarmConfig, AlarmPlayer, SoundFilePlayer};

use thiserror::Error;

/// Alarm playback errors
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Failed to open alarm sound: {0}")]
    Open(#[from] std::io::Error),

    #[error("Failed to decode alarm sound: {0}")]
    Decode(String),

    #[error("Audio output unavailable: {0}")]
    Output(String),
}
