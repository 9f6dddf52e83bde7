//! Frame sources

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::{CameraError, CaptureConfig, VideoFrame};

/// Anything that yields frames in arrival order.
pub trait FrameSource {
    /// Read the next frame.
    ///
    /// `Ok(None)` marks the end of the stream. An `Err` is an acquisition
    /// failure and ends the session.
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Reads still frames from a directory in file-name order.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    resize_width: u32,
}

impl ImageSequenceSource {
    /// Open the frame directory named in the capture config
    pub fn open(config: &CaptureConfig) -> Result<Self, CameraError> {
        let paths = list_frames(&config.source)?;
        if paths.is_empty() {
            return Err(CameraError::Open(format!(
                "no frames found in {}",
                config.source.display()
            )));
        }

        info!(
            "Opened frame sequence {} ({} frames)",
            config.source.display(),
            paths.len()
        );

        Ok(Self {
            paths,
            next: 0,
            resize_width: config.resize_width,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };

        let image = image::open(path)
            .map_err(|e| CameraError::Stream(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        let sequence = self.next as u32;
        self.next += 1;

        debug!("Read frame {} from {}", sequence, path.display());

        let frame = VideoFrame::new(image, now_ns(), sequence);
        Ok(Some(frame.resize_to_width(self.resize_width)))
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?
            .path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_frame && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
