//! Facial landmark layout and the detection seams

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::geometry::{EyeContour, Point2D};
use crate::DmsError;

/// Face bounding box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Index range into a landmark set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Which landmark indices hold each eye contour.
///
/// Defaults to the 68-point scheme, where the subject's right eye is
/// 36..42 and the left eye is 42..48.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkScheme {
    pub left_eye: IndexRange,
    pub right_eye: IndexRange,
}

impl Default for LandmarkScheme {
    fn default() -> Self {
        Self::IBUG_68
    }
}

impl LandmarkScheme {
    pub const IBUG_68: LandmarkScheme = LandmarkScheme {
        left_eye: IndexRange::new(42, 48),
        right_eye: IndexRange::new(36, 42),
    };

    /// Both eye ranges must select exactly six points
    pub fn validate(&self) -> Result<(), DmsError> {
        for (name, range) in [("left_eye", self.left_eye), ("right_eye", self.right_eye)] {
            if range.len() != 6 {
                return Err(DmsError::Config(format!(
                    "{} range {}..{} must select 6 points",
                    name, range.start, range.end
                )));
            }
        }
        Ok(())
    }

    /// Smallest landmark count that covers both eyes
    pub fn required_points(&self) -> usize {
        self.left_eye.end.max(self.right_eye.end)
    }
}

/// Ordered landmark points for one face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub points: Vec<Point2D>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    /// Slice out (left, right) eye contours
    pub fn eyes(&self, scheme: &LandmarkScheme) -> Result<(EyeContour, EyeContour), DmsError> {
        let left = self
            .points
            .get(scheme.left_eye.as_range())
            .ok_or(DmsError::KeypointsMissing)?;
        let right = self
            .points
            .get(scheme.right_eye.as_range())
            .ok_or(DmsError::KeypointsMissing)?;
        Ok((EyeContour::try_from(left)?, EyeContour::try_from(right)?))
    }
}

/// Locates faces in a grayscale frame
pub trait FaceDetector {
    fn detect_faces(&mut self, gray: &GrayImage) -> Result<Vec<FaceBbox>, DmsError>;
}

/// Locates ordered landmarks inside a detected face
pub trait LandmarkPredictor {
    fn locate_landmarks(
        &mut self,
        gray: &GrayImage,
        face: &FaceBbox,
    ) -> Result<FaceLandmarks, DmsError>;
}
