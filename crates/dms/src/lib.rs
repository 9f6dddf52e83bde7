//! Driver Monitoring System (DMS)
//!
//! Real-time drowsiness detection from facial landmarks:
//! - Face detection and 68-point landmark localization
//! - Eye aspect ratio (EAR) per eye and per face
//! - Debounced alarm state over consecutive closed-eye frames

pub mod analysis;
pub mod config;
pub mod detector;
pub mod geometry;
pub mod landmarks;
pub mod state;

pub use analysis::{DmsAnalysis, FaceAnalysis, SkipReason};
pub use config::DmsConfig;
pub use detector::{OnnxLandmarkPredictor, SeetaFaceDetector};
pub use geometry::{EarReading, EyeContour, Point2D};
pub use landmarks::{FaceBbox, FaceDetector, FaceLandmarks, LandmarkPredictor, LandmarkScheme};
pub use state::{DetectionState, DrowsinessMonitor, StateEvent, StateUpdate};

use camera_capture::frame::VideoFrame;
use thiserror::Error;
use tracing::{debug, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Keypoints missing for feature calculation")]
    KeypointsMissing,

    #[error("Eye contour needs 6 points, got {0}")]
    ContourLength(usize),

    #[error("Degenerate eye contour ({0})")]
    DegenerateEye(f32),
}

/// Driver monitoring module
pub struct DmsModule<D, L> {
    config: DmsConfig,
    face_detector: D,
    landmark_predictor: L,
    monitor: DrowsinessMonitor,
}

impl DmsModule<SeetaFaceDetector, OnnxLandmarkPredictor> {
    /// Create a module backed by the configured model files
    pub fn from_models(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        let face_detector = SeetaFaceDetector::new(&config)?;
        let landmark_predictor = OnnxLandmarkPredictor::new(&config)?;
        Self::new(config, face_detector, landmark_predictor)
    }
}

impl<D: FaceDetector, L: LandmarkPredictor> DmsModule<D, L> {
    /// Create a new DMS module with configuration
    pub fn new(config: DmsConfig, face_detector: D, landmark_predictor: L) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            monitor: DrowsinessMonitor::new(config.ear_threshold, config.consec_frames),
            face_detector,
            landmark_predictor,
            config,
        })
    }

    /// Analyze a single frame for driver state
    ///
    /// Faces are evaluated in detection order against the shared monitor.
    /// A frame with no usable face leaves the monitor untouched. A landmark
    /// failure skips only that face, so transitions from the other faces
    /// are still reported.
    pub fn analyze(&mut self, frame: &VideoFrame) -> Result<DmsAnalysis, DmsError> {
        let gray = frame.to_grayscale();
        let bboxes = self.face_detector.detect_faces(&gray)?;

        let mut faces = Vec::with_capacity(bboxes.len());
        for bbox in bboxes {
            let face = match self.landmark_predictor.locate_landmarks(&gray, &bbox) {
                Ok(landmarks) => self.evaluate_face(bbox, &landmarks),
                Err(e) => {
                    warn!("Frame {}: landmark prediction failed: {}", frame.sequence, e);
                    self.skipped_face(bbox, SkipReason::LandmarkFailed)
                }
            };
            faces.push(face);
        }

        if faces.is_empty() {
            debug!("Frame {}: no face, state held", frame.sequence);
        }

        let current = self.monitor.hold();
        Ok(DmsAnalysis {
            sequence: frame.sequence,
            faces,
            state: current.state,
            low_frames: current.low_frames,
        })
    }

    fn skipped_face(&self, bbox: FaceBbox, reason: SkipReason) -> FaceAnalysis {
        FaceAnalysis {
            bbox,
            eyes: None,
            ear: None,
            state: self.monitor.state(),
            event: None,
            skipped: Some(reason),
        }
    }

    fn evaluate_face(&mut self, bbox: FaceBbox, landmarks: &FaceLandmarks) -> FaceAnalysis {
        let (left, right) = match landmarks.eyes(&self.config.scheme) {
            Ok(eyes) => eyes,
            Err(e) => {
                warn!("Skipping face: {}", e);
                return self.skipped_face(bbox, SkipReason::KeypointsMissing);
            }
        };

        let ear = match EarReading::from_eyes(&left, &right) {
            Ok(ear) => ear,
            Err(e) => {
                debug!("Skipping face: {}", e);
                return FaceAnalysis {
                    eyes: Some((left, right)),
                    ..self.skipped_face(bbox, SkipReason::DegenerateEye)
                };
            }
        };

        let update = self.monitor.update(ear.combined);
        FaceAnalysis {
            bbox,
            eyes: Some((left, right)),
            ear: Some(ear),
            state: update.state,
            event: update.event,
            skipped: None,
        }
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn state(&self) -> DetectionState {
        self.monitor.state()
    }

    pub fn low_frames(&self) -> u32 {
        self.monitor.low_frames()
    }
}
