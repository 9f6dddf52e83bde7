//! Annotated frame output

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::MonitorError;

/// Receives each annotated frame
pub trait FrameSink {
    fn show(&mut self, image: &RgbImage, sequence: u32) -> Result<(), MonitorError>;
}

/// Discards frames
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn show(&mut self, _image: &RgbImage, _sequence: u32) -> Result<(), MonitorError> {
        Ok(())
    }
}

/// Writes frames as numbered PNG files
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn create(dir: &Path) -> Result<Self, MonitorError> {
        std::fs::create_dir_all(dir)?;
        info!("Writing annotated frames to {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn frame_path(&self, sequence: u32) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", sequence))
    }
}

impl FrameSink for DirectorySink {
    fn show(&mut self, image: &RgbImage, sequence: u32) -> Result<(), MonitorError> {
        image.save(self.frame_path(sequence))?;
        Ok(())
    }
}
