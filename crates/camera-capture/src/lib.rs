//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides frame acquisition behind the [`FrameSource`] trait plus the
//! preprocessing the detector expects:
//! - Width-bounded resize that keeps the aspect ratio
//! - Grayscale conversion
//! - Region cropping for landmark models

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequenceSource};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open video source: {0}")]
    Open(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Directory holding the frame sequence
    pub source: PathBuf,
    /// Frames are resized to this width (height follows aspect ratio)
    pub resize_width: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("frames"),
            resize_width: 450,
        }
    }
}
