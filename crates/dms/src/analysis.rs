//! DMS analysis results

use serde::{Deserialize, Serialize};

use crate::geometry::{EarReading, EyeContour};
use crate::landmarks::FaceBbox;
use crate::state::{DetectionState, StateEvent};

/// Why a detected face did not reach the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Landmark set too short for the configured scheme
    KeypointsMissing,
    /// Zero-width eye contour or non-finite EAR
    DegenerateEye,
    /// Landmark model failed on this face
    LandmarkFailed,
}

/// Result for one detected face, in detection order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceAnalysis {
    pub bbox: FaceBbox,

    /// Left and right eye contours, when landmarks were usable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eyes: Option<(EyeContour, EyeContour)>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<EarReading>,

    /// State right after this face was evaluated
    pub state: DetectionState,

    /// Transition caused by this face
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<StateEvent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
}

/// Complete per-frame analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DmsAnalysis {
    /// Frame sequence number
    pub sequence: u32,

    /// Faces in detection order
    pub faces: Vec<FaceAnalysis>,

    /// State after the whole frame
    pub state: DetectionState,

    /// Consecutive low-EAR frames after the whole frame
    pub low_frames: u32,
}

impl DmsAnalysis {
    /// Whether a face was detected
    pub fn face_detected(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Whether the drowsiness alert should be shown
    pub fn is_alarmed(&self) -> bool {
        self.state == DetectionState::AlarmActive
    }

    /// Transition events in the order they happened
    pub fn events(&self) -> impl Iterator<Item = StateEvent> + '_ {
        self.faces.iter().filter_map(|face| face.event)
    }

    /// EAR of the last face that reached the state machine
    pub fn last_ear(&self) -> Option<f32> {
        self.faces.iter().rev().find_map(|face| face.ear).map(|r| r.combined)
    }
}
