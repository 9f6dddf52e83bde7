//! Frame loop orchestration

use alerting::AlarmDispatcher;
use camera_capture::{FrameSource, VideoFrame};
use dms::{DmsAnalysis, DmsModule, FaceDetector, LandmarkPredictor, StateEvent};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

use crate::display::FrameSink;
use crate::overlay;
use crate::MonitorError;

/// Counters for one monitoring session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Frames analyzed
    pub frames: u64,
    /// Analyzed frames without any detected face
    pub frames_without_face: u64,
    /// Frames dropped after a face detection failure
    pub frames_failed: u64,
    /// Faces whose EAR reached the state machine
    pub faces: u64,
    /// Faces skipped for failed or unusable landmarks
    pub faces_skipped: u64,
    /// Alarm episodes raised
    pub alarm_episodes: u64,
    /// Alarm playback tasks started
    pub playbacks_started: u64,
}

/// One monitoring session: source → detection → state machine → alarm/overlay
pub struct MonitorSession<S, D, L> {
    source: S,
    dms: DmsModule<D, L>,
    dispatcher: AlarmDispatcher,
    sink: Box<dyn FrameSink>,
    stats: SessionStats,
}

impl<S, D, L> MonitorSession<S, D, L>
where
    S: FrameSource,
    D: FaceDetector,
    L: LandmarkPredictor,
{
    pub fn new(
        source: S,
        dms: DmsModule<D, L>,
        dispatcher: AlarmDispatcher,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            source,
            dms,
            dispatcher,
            sink,
            stats: SessionStats::default(),
        }
    }

    /// Run until the stop flag is set or the source ends.
    ///
    /// Acquisition failure ends the session with an error.
    pub fn run(mut self, stop: &AtomicBool) -> Result<SessionStats, MonitorError> {
        info!("Monitoring started");

        loop {
            if stop.load(Ordering::SeqCst) {
                info!("Stop requested, ending session");
                break;
            }

            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Video source exhausted, ending session");
                    break;
                }
                Err(e) => {
                    error!("Frame acquisition failed: {}", e);
                    return Err(e.into());
                }
            };

            match self.process_frame(&frame) {
                Ok(_) => {}
                Err(MonitorError::Dms(e)) => {
                    warn!("Skipping frame {}: {}", frame.sequence, e);
                    self.stats.frames_failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let stats = self.stats();
        info!(
            "Session summary: {} frames ({} without face, {} failed), {} faces ({} skipped), \
             {} alarm episodes, {} playbacks",
            stats.frames,
            stats.frames_without_face,
            stats.frames_failed,
            stats.faces,
            stats.faces_skipped,
            stats.alarm_episodes,
            stats.playbacks_started
        );
        Ok(stats)
    }

    /// Analyze one frame, dispatch alarm events, and emit the annotated frame
    pub fn process_frame(&mut self, frame: &VideoFrame) -> Result<DmsAnalysis, MonitorError> {
        let analysis = self.dms.analyze(frame)?;

        self.stats.frames += 1;
        if !analysis.face_detected() {
            self.stats.frames_without_face += 1;
        }

        for face in &analysis.faces {
            match (face.ear, face.skipped) {
                (Some(ear), _) => {
                    self.stats.faces += 1;
                    debug!(
                        "Frame {}: EAR {:.2} (L {:.2}, R {:.2})",
                        frame.sequence, ear.combined, ear.left, ear.right
                    );
                }
                (None, Some(reason)) => {
                    self.stats.faces_skipped += 1;
                    debug!("Frame {}: face skipped ({:?})", frame.sequence, reason);
                }
                (None, None) => {}
            }

            match face.event {
                Some(StateEvent::AlarmTriggered) => {
                    self.stats.alarm_episodes += 1;
                    warn!("DROWSINESS ALERT at frame {}", frame.sequence);
                    self.dispatcher.trigger();
                }
                Some(StateEvent::AlarmCleared) => self.dispatcher.disarm(),
                None => {}
            }
        }

        let annotated = overlay::annotate(frame, &analysis, self.dms.config().ear_threshold);
        if let Err(e) = self.sink.show(&annotated, frame.sequence) {
            warn!("Failed to display frame {}: {}", frame.sequence, e);
        }

        Ok(analysis)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            playbacks_started: self.dispatcher.playbacks_started(),
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlarmPlayer, AlertError};
    use camera_capture::CameraError;
    use dms::{DetectionState, DmsConfig, DmsError, FaceBbox, FaceLandmarks, Point2D};
    use image::{GrayImage, RgbImage};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    /// Scripted per-frame input: the EAR of each face, or a failure
    #[derive(Clone)]
    enum Step {
        Faces(Vec<f32>),
        /// `None` makes the landmark model fail on that face
        MixedFaces(Vec<Option<f32>>),
        DetectorFails,
        SourceFails,
    }

    struct ScriptedSource {
        steps: VecDeque<Step>,
        sequence: u32,
        /// Shared with the detector so it knows what the current frame holds
        current: Rc<RefCell<Option<Step>>>,
    }

    impl FrameSource for ScriptedSource {
        fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
            let Some(step) = self.steps.pop_front() else {
                return Ok(None);
            };
            if let Step::SourceFails = step {
                return Err(CameraError::Stream("camera unplugged".into()));
            }
            *self.current.borrow_mut() = Some(step);
            let frame = VideoFrame::new(RgbImage::new(450, 300), 0, self.sequence);
            self.sequence += 1;
            Ok(Some(frame))
        }
    }

    struct ScriptedDetector {
        current: Rc<RefCell<Option<Step>>>,
        pending_ears: Rc<RefCell<VecDeque<Option<f32>>>>,
    }

    impl FaceDetector for ScriptedDetector {
        fn detect_faces(&mut self, _gray: &GrayImage) -> Result<Vec<FaceBbox>, DmsError> {
            let ears: Vec<Option<f32>> = match self.current.borrow().clone() {
                Some(Step::Faces(ears)) => ears.into_iter().map(Some).collect(),
                Some(Step::MixedFaces(ears)) => ears,
                Some(Step::DetectorFails) => {
                    return Err(DmsError::Inference("model crashed".into()))
                }
                _ => Vec::new(),
            };

            let faces = (0..ears.len())
                .map(|i| FaceBbox {
                    x: 10.0 + 120.0 * i as f32,
                    y: 20.0,
                    width: 100.0,
                    height: 100.0,
                    confidence: 1.0,
                })
                .collect();
            *self.pending_ears.borrow_mut() = ears.into();
            Ok(faces)
        }
    }

    struct ScriptedLandmarks {
        pending_ears: Rc<RefCell<VecDeque<Option<f32>>>>,
    }

    impl LandmarkPredictor for ScriptedLandmarks {
        fn locate_landmarks(
            &mut self,
            _gray: &GrayImage,
            face: &FaceBbox,
        ) -> Result<FaceLandmarks, DmsError> {
            let Some(ear) = self.pending_ears.borrow_mut().pop_front().unwrap_or(Some(0.3)) else {
                return Err(DmsError::Inference("landmark model crashed".into()));
            };
            let mut points = vec![Point2D::default(); 68];
            points.splice(36..42, lens(face.x + 25.0, ear));
            points.splice(42..48, lens(face.x + 75.0, ear));
            Ok(FaceLandmarks::new(points))
        }
    }

    fn lens(cx: f32, ear: f32) -> Vec<Point2D> {
        let v = ear * 30.0;
        vec![
            Point2D::new(cx - 15.0, 60.0),
            Point2D::new(cx - 5.0, 60.0 - v / 2.0),
            Point2D::new(cx + 5.0, 60.0 - v / 2.0),
            Point2D::new(cx + 15.0, 60.0),
            Point2D::new(cx + 5.0, 60.0 + v / 2.0),
            Point2D::new(cx - 5.0, 60.0 + v / 2.0),
        ]
    }

    struct SilentPlayer;

    impl AlarmPlayer for SilentPlayer {
        fn play(&self) -> Result<(), AlertError> {
            Ok(())
        }
    }

    /// Collects the sequence numbers it was shown
    struct RecordingSink(Rc<RefCell<Vec<u32>>>);

    impl FrameSink for RecordingSink {
        fn show(&mut self, _image: &RgbImage, sequence: u32) -> Result<(), MonitorError> {
            self.0.borrow_mut().push(sequence);
            Ok(())
        }
    }

    struct Harness {
        session: MonitorSession<ScriptedSource, ScriptedDetector, ScriptedLandmarks>,
        shown: Rc<RefCell<Vec<u32>>>,
    }

    fn harness(steps: Vec<Step>, with_sound: bool) -> Harness {
        let current = Rc::new(RefCell::new(None));
        let pending_ears = Rc::new(RefCell::new(VecDeque::new()));
        let shown = Rc::new(RefCell::new(Vec::new()));

        let source = ScriptedSource {
            steps: steps.into(),
            sequence: 0,
            current: current.clone(),
        };
        let dms = DmsModule::new(
            DmsConfig::default(),
            ScriptedDetector {
                current,
                pending_ears: pending_ears.clone(),
            },
            ScriptedLandmarks { pending_ears },
        )
        .unwrap();

        let player: Option<Arc<dyn AlarmPlayer>> = if with_sound {
            Some(Arc::new(SilentPlayer))
        } else {
            None
        };
        let dispatcher = AlarmDispatcher::new(player, Handle::current());

        Harness {
            session: MonitorSession::new(source, dms, dispatcher, Box::new(RecordingSink(shown.clone()))),
            shown,
        }
    }

    fn single_face(ears: &[f32]) -> Vec<Step> {
        ears.iter().map(|&ear| Step::Faces(vec![ear])).collect()
    }

    fn drowsy_sequence() -> Vec<f32> {
        std::iter::repeat(0.30)
            .take(5)
            .chain(std::iter::repeat(0.10).take(30))
            .chain(std::iter::repeat(0.30).take(5))
            .collect()
    }

    #[tokio::test]
    async fn test_drowsy_sequence_plays_once() {
        let Harness { session, shown } = harness(single_face(&drowsy_sequence()), true);

        let stats = session.run(&AtomicBool::new(false)).unwrap();

        assert_eq!(stats.frames, 40);
        assert_eq!(stats.faces, 40);
        assert_eq!(stats.alarm_episodes, 1);
        assert_eq!(stats.playbacks_started, 1);
        assert_eq!(shown.borrow().len(), 40);
    }

    #[tokio::test]
    async fn test_states_per_frame() {
        let Harness { mut session, .. } = harness(Vec::new(), true);
        let ears = drowsy_sequence();

        for (i, &ear) in ears.iter().enumerate() {
            *session.source.current.borrow_mut() = Some(Step::Faces(vec![ear]));
            let frame = VideoFrame::new(RgbImage::new(450, 300), 0, i as u32);
            let analysis = session.process_frame(&frame).unwrap();

            let expected = if i == 34 {
                DetectionState::AlarmActive
            } else {
                DetectionState::Awake
            };
            assert_eq!(analysis.state, expected, "frame {}", i);
        }
        assert_eq!(session.stats().playbacks_started, 1);
    }

    #[tokio::test]
    async fn test_two_episodes_two_playbacks() {
        let mut ears = vec![0.1; 30];
        ears.push(0.3);
        ears.extend(vec![0.1; 30]);
        let Harness { session, .. } = harness(single_face(&ears), true);

        let stats = session.run(&AtomicBool::new(false)).unwrap();
        assert_eq!(stats.alarm_episodes, 2);
        assert_eq!(stats.playbacks_started, 2);
    }

    #[tokio::test]
    async fn test_missing_faces_carry_over() {
        let mut steps = single_face(&[0.1; 20]);
        steps.extend(vec![Step::Faces(Vec::new()); 15]);
        steps.extend(single_face(&[0.1; 10]));
        let Harness { session, .. } = harness(steps, true);

        let stats = session.run(&AtomicBool::new(false)).unwrap();
        assert_eq!(stats.frames_without_face, 15);
        assert_eq!(stats.alarm_episodes, 1);
    }

    #[tokio::test]
    async fn test_visual_only_alarm() {
        let Harness { session, .. } = harness(single_face(&drowsy_sequence()), false);

        let stats = session.run(&AtomicBool::new(false)).unwrap();
        assert_eq!(stats.alarm_episodes, 1);
        assert_eq!(stats.playbacks_started, 0);
    }

    #[tokio::test]
    async fn test_detector_failure_skips_frame() {
        let steps = vec![
            Step::Faces(vec![0.3]),
            Step::DetectorFails,
            Step::Faces(vec![0.3]),
        ];
        let Harness { session, shown } = harness(steps, true);

        let stats = session.run(&AtomicBool::new(false)).unwrap();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.frames_failed, 1);
        assert_eq!(*shown.borrow(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_landmark_failure_keeps_trigger() {
        let mut steps = single_face(&[0.1; 29]);
        steps.push(Step::MixedFaces(vec![Some(0.1), None]));
        steps.extend(single_face(&[0.1; 10]));
        let Harness { session, shown } = harness(steps, true);

        let stats = session.run(&AtomicBool::new(false)).unwrap();
        assert_eq!(stats.frames, 40);
        assert_eq!(stats.frames_failed, 0);
        assert_eq!(stats.faces_skipped, 1);
        assert_eq!(stats.alarm_episodes, 1);
        assert_eq!(stats.playbacks_started, 1);
        assert_eq!(shown.borrow().len(), 40);
    }

    #[tokio::test]
    async fn test_landmark_failure_keeps_clear() {
        let mut steps = single_face(&[0.1; 30]);
        steps.push(Step::MixedFaces(vec![Some(0.3), None]));
        steps.extend(single_face(&[0.1; 30]));
        let Harness { session, .. } = harness(steps, true);

        let stats = session.run(&AtomicBool::new(false)).unwrap();
        assert_eq!(stats.alarm_episodes, 2);
        assert_eq!(stats.playbacks_started, 2);
    }

    #[tokio::test]
    async fn test_trigger_and_clear_in_one_frame() {
        let Harness { mut session, .. } = harness(Vec::new(), true);
        let mut frames = vec![vec![0.1]; 29];
        // Closed-eye face reaches the limit, the open-eye face after it clears
        frames.push(vec![0.1, 0.3]);

        for (i, ears) in frames.into_iter().enumerate() {
            *session.source.current.borrow_mut() = Some(Step::Faces(ears));
            let frame = VideoFrame::new(RgbImage::new(450, 300), 0, i as u32);
            session.process_frame(&frame).unwrap();
        }

        let stats = session.stats();
        assert_eq!(stats.alarm_episodes, 1);
        assert_eq!(stats.playbacks_started, 1);
        assert!(!session.dispatcher.is_armed());
        assert_eq!(session.dms.state(), DetectionState::Awake);

        for i in 30..60 {
            *session.source.current.borrow_mut() = Some(Step::Faces(vec![0.1]));
            let frame = VideoFrame::new(RgbImage::new(450, 300), 0, i);
            session.process_frame(&frame).unwrap();
        }
        assert_eq!(session.stats().playbacks_started, 2);
        assert!(session.dispatcher.is_armed());
    }

    #[tokio::test]
    async fn test_acquisition_failure_ends_session() {
        let steps = vec![Step::Faces(vec![0.3]), Step::SourceFails, Step::Faces(vec![0.3])];
        let Harness { session, shown } = harness(steps, true);

        let result = session.run(&AtomicBool::new(false));
        assert!(matches!(result, Err(MonitorError::Camera(_))));
        assert_eq!(shown.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_flag_ends_before_next_frame() {
        let Harness { session, shown } = harness(single_face(&[0.3; 10]), true);

        let stats = session.run(&AtomicBool::new(true)).unwrap();
        assert_eq!(stats.frames, 0);
        assert!(shown.borrow().is_empty());
    }
}
