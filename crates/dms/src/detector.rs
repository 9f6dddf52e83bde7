//! Face and landmark detection models

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use rustface::{Detector, ImageData};
use tracing::{debug, error, info};

use crate::geometry::Point2D;
use crate::landmarks::{FaceBbox, FaceDetector, FaceLandmarks, LandmarkPredictor};
use crate::{DmsConfig, DmsError};

/// Face crops are widened by this factor before landmarking
const CROP_SCALE: f32 = 1.2;

/// Face detector using the SeetaFace cascade
pub struct SeetaFaceDetector {
    detector: Box<dyn Detector>,
}

impl SeetaFaceDetector {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        let path = config
            .face_model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("face_model_path is required".into()))?;

        info!("Loading face detection model from {}", path);
        let mut detector = rustface::create_detector(path).map_err(|e| {
            error!("Failed to load face model: {}", e);
            DmsError::ModelLoad(format!("{}: {}", path, e))
        })?;

        detector.set_min_face_size(config.min_face_size);
        detector.set_score_thresh(config.face_score_threshold);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        Ok(Self { detector })
    }
}

impl FaceDetector for SeetaFaceDetector {
    fn detect_faces(&mut self, gray: &GrayImage) -> Result<Vec<FaceBbox>, DmsError> {
        let image = ImageData::new(gray.as_raw(), gray.width(), gray.height());
        let faces = self.detector.detect(&image);

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBbox {
                    x: bbox.x() as f32,
                    y: bbox.y() as f32,
                    width: bbox.width() as f32,
                    height: bbox.height() as f32,
                    confidence: face.score() as f32,
                }
            })
            .collect())
    }
}

/// 68-point landmark regressor running an ONNX model
pub struct OnnxLandmarkPredictor {
    session: Session,
    input_size: u32,
    required_points: usize,
}

impl OnnxLandmarkPredictor {
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        let path = config
            .landmark_model_path
            .as_deref()
            .ok_or_else(|| DmsError::Config("landmark_model_path is required".into()))?;

        info!("Loading landmark model from {}", path);
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| {
                error!("Failed to load landmark model: {}", e);
                DmsError::ModelLoad(format!("{}: {}", path, e))
            })?;

        Ok(Self {
            session,
            input_size: config.landmark_input_size,
            required_points: config.scheme.required_points(),
        })
    }
}

impl LandmarkPredictor for OnnxLandmarkPredictor {
    fn locate_landmarks(
        &mut self,
        gray: &GrayImage,
        face: &FaceBbox,
    ) -> Result<FaceLandmarks, DmsError> {
        let crop = square_crop(face, gray.width(), gray.height())
            .ok_or_else(|| DmsError::ImageProcessing("face region outside frame".into()))?;

        // 1. Crop and resize to the model input
        let size = self.input_size;
        let patch = imageops::crop_imm(gray, crop.x, crop.y, crop.width, crop.height).to_image();
        let resized = imageops::resize(&patch, size, size, FilterType::Triangle);

        // 2. Normalize to 0..1 and replicate gray into 3 channels (1x3xSxS)
        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let value = pixel.0[0] as f32 / 255.0;
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] = value;
            }
        }
        let input = Tensor::from_array(input).map_err(|e| DmsError::Inference(e.to_string()))?;

        // 3. Inference
        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| DmsError::Inference(e.to_string()))?)
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        let coords: Vec<f32> = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        // 4. Crop-normalized (x, y) pairs back to frame pixels
        if coords.len() < self.required_points * 2 {
            debug!(
                "Landmark model returned {} values, need {}",
                coords.len(),
                self.required_points * 2
            );
            return Err(DmsError::KeypointsMissing);
        }

        let points = coords
            .chunks_exact(2)
            .map(|pair| {
                Point2D::new(
                    crop.x as f32 + pair[0] * crop.width as f32,
                    crop.y as f32 + pair[1] * crop.height as f32,
                )
            })
            .collect();

        Ok(FaceLandmarks::new(points))
    }
}

/// Pixel-aligned crop rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CropRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Square around the face, widened by [`CROP_SCALE`] and clamped to the frame
fn square_crop(face: &FaceBbox, frame_width: u32, frame_height: u32) -> Option<CropRect> {
    let half = (face.width.max(face.height) * CROP_SCALE / 2.0).round();
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;

    let x0 = (cx - half).max(0.0).floor() as u32;
    let y0 = (cy - half).max(0.0).floor() as u32;
    let x1 = ((cx + half).ceil().max(0.0) as u32).min(frame_width);
    let y1 = ((cy + half).ceil().max(0.0) as u32).min(frame_height);

    if x1 <= x0 + 1 || y1 <= y0 + 1 {
        return None;
    }

    Some(CropRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}
