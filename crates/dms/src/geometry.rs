//! Eye geometry and the eye aspect ratio (EAR)

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Point in frame pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2D) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Six ordered eye-contour points.
///
/// Indices 0 and 3 are the horizontal corners; 1/5 and 2/4 are the
/// upper/lower lid pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeContour(pub [Point2D; 6]);

impl EyeContour {
    pub fn points(&self) -> &[Point2D; 6] {
        &self.0
    }

    /// Eye aspect ratio: `(|p1-p5| + |p2-p4|) / (2 * |p0-p3|)`
    ///
    /// Fails with [`DmsError::DegenerateEye`] on a zero-width contour or any
    /// non-finite result.
    pub fn aspect_ratio(&self) -> Result<f32, DmsError> {
        let p = &self.0;
        let vertical_a = p[1].distance(&p[5]);
        let vertical_b = p[2].distance(&p[4]);
        let horizontal = p[0].distance(&p[3]);

        if !horizontal.is_finite() || horizontal <= f32::EPSILON {
            return Err(DmsError::DegenerateEye(horizontal));
        }

        let ear = (vertical_a + vertical_b) / (2.0 * horizontal);
        if !ear.is_finite() {
            return Err(DmsError::DegenerateEye(ear));
        }
        Ok(ear)
    }
}

impl TryFrom<&[Point2D]> for EyeContour {
    type Error = DmsError;

    fn try_from(points: &[Point2D]) -> Result<Self, Self::Error> {
        let points: [Point2D; 6] = points
            .try_into()
            .map_err(|_| DmsError::ContourLength(points.len()))?;
        Ok(Self(points))
    }
}

/// EAR for both eyes of one face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarReading {
    pub left: f32,
    pub right: f32,
    /// Mean of both eyes, the value the state machine consumes
    pub combined: f32,
}

impl EarReading {
    /// Compute the reading for a pair of eye contours
    pub fn from_eyes(left: &EyeContour, right: &EyeContour) -> Result<Self, DmsError> {
        let left = left.aspect_ratio()?;
        let right = right.aspect_ratio()?;
        Ok(Self {
            left,
            right,
            combined: (left + right) / 2.0,
        })
    }
}
