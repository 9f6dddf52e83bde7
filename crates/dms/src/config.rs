//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::landmarks::LandmarkScheme;
use crate::DmsError;

/// DMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Combined EAR below this counts as a closed-eye frame
    pub ear_threshold: f32,

    /// Consecutive closed-eye frames before the alarm is raised
    pub consec_frames: u32,

    /// Landmark index layout
    pub scheme: LandmarkScheme,

    /// Smallest face (pixels) the detector searches for
    pub min_face_size: u32,

    /// Face detection score threshold
    pub face_score_threshold: f64,

    /// Side length of the square landmark model input
    pub landmark_input_size: u32,

    /// Model paths
    pub face_model_path: Option<String>,
    pub landmark_model_path: Option<String>,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            consec_frames: 30,
            scheme: LandmarkScheme::default(),
            min_face_size: 40,
            face_score_threshold: 2.0,
            landmark_input_size: 112,
            face_model_path: None,
            landmark_model_path: None,
        }
    }
}

impl DmsConfig {
    /// Create strict config (alarm after fewer closed frames)
    pub fn strict() -> Self {
        Self {
            consec_frames: 20,
            ..Default::default()
        }
    }

    /// Create lenient config (alarm after more closed frames)
    pub fn lenient() -> Self {
        Self {
            consec_frames: 45,
            ..Default::default()
        }
    }

    /// Reject settings the state machine cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(DmsError::Config(format!(
                "ear_threshold must be a positive number, got {}",
                self.ear_threshold
            )));
        }
        if self.consec_frames == 0 {
            return Err(DmsError::Config("consec_frames must be at least 1".into()));
        }
        if self.landmark_input_size == 0 {
            return Err(DmsError::Config("landmark_input_size must be at least 1".into()));
        }
        self.scheme.validate()
    }
}
