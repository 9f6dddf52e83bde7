//! Drowsiness state tracking

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Detection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionState {
    #[default]
    Awake,
    AlarmActive,
}

/// Edge events emitted on state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateEvent {
    /// Entered `AlarmActive`; sound the alarm for this episode
    AlarmTriggered,
    /// Returned to `Awake`; the episode is over
    AlarmCleared,
}

/// Snapshot after one update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub state: DetectionState,
    pub low_frames: u32,
    pub event: Option<StateEvent>,
}

/// Debounces the combined EAR into a drowsiness alarm.
///
/// One instance owns the low-EAR counter and the detection state for the
/// whole session. Every face evaluated in a frame updates the same counter.
#[derive(Debug, Clone)]
pub struct DrowsinessMonitor {
    ear_threshold: f32,
    consec_frames: u32,
    low_frames: u32,
    state: DetectionState,
    episodes: u64,
}

impl DrowsinessMonitor {
    pub fn new(ear_threshold: f32, consec_frames: u32) -> Self {
        Self {
            ear_threshold,
            consec_frames,
            low_frames: 0,
            state: DetectionState::Awake,
            episodes: 0,
        }
    }

    /// Feed one face's combined EAR
    pub fn update(&mut self, ear: f32) -> StateUpdate {
        let mut event = None;

        if ear < self.ear_threshold {
            self.low_frames = self.low_frames.saturating_add(1);

            if self.low_frames >= self.consec_frames && self.state == DetectionState::Awake {
                self.state = DetectionState::AlarmActive;
                self.episodes += 1;
                event = Some(StateEvent::AlarmTriggered);
                info!(
                    "Drowsiness alarm raised after {} low-EAR frames (episode {})",
                    self.low_frames, self.episodes
                );
            }
        } else {
            if self.state == DetectionState::AlarmActive {
                event = Some(StateEvent::AlarmCleared);
                info!("Drowsiness alarm cleared (EAR {:.3})", ear);
            }
            self.low_frames = 0;
            self.state = DetectionState::Awake;
        }

        debug!(
            "EAR {:.3} -> {:?}, low frames {}",
            ear, self.state, self.low_frames
        );

        self.snapshot(event)
    }

    /// Frame without a usable face: carry the counter and state over
    pub fn hold(&self) -> StateUpdate {
        self.snapshot(None)
    }

    fn snapshot(&self, event: Option<StateEvent>) -> StateUpdate {
        StateUpdate {
            state: self.state,
            low_frames: self.low_frames,
            event,
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn low_frames(&self) -> u32 {
        self.low_frames
    }

    /// Alarm episodes raised so far
    pub fn episodes(&self) -> u64 {
        self.episodes
    }
}
