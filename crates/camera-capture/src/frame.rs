//! Video frame types and processing

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data
    pub image: RgbImage,
    /// Capture timestamp (nanoseconds since the Unix epoch)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from an RGB image
    pub fn new(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            image,
            timestamp_ns,
            sequence,
        }
    }

    /// Frame width
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width(), self.height());
        for (dst, src) in gray.pixels_mut().zip(self.image.pixels()) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            dst.0[0] = (src.0[0] as f32 * 0.299
                + src.0[1] as f32 * 0.587
                + src.0[2] as f32 * 0.114) as u8;
        }
        gray
    }

    /// Resize to `new_width`, scaling the height to keep the aspect ratio.
    ///
    /// Frames already at the target width are returned unchanged.
    pub fn resize_to_width(self, new_width: u32) -> VideoFrame {
        if new_width == 0 || new_width == self.width() || self.width() == 0 {
            return self;
        }

        let ratio = new_width as f64 / self.width() as f64;
        let new_height = ((self.height() as f64 * ratio).round() as u32).max(1);

        VideoFrame {
            image: imageops::resize(&self.image, new_width, new_height, FilterType::Triangle),
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        }
    }
}
