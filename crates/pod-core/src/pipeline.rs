//! Per-frame gesture and follow pipeline.
//!
//! One [`Pipeline`] is one session: it owns every stateful component and is
//! driven synchronously, one frame at a time, by a single consumer.

use crate::config::{ConfigError, PipelineConfig};
use crate::control::ControlLoop;
use crate::distance::DistanceEstimator;
use crate::filter::ScalarFilter;
use crate::gesture::{GestureInput, GestureRecognizer, GestureState, HandSignals};
use crate::mapper::{CoordinateMapper, OrientationBias};
use crate::types::{FlightCommand, FrameInput, GestureEvent, Hand, ScreenPoint, INDEX_TIP};
use serde::Serialize;

/// Landmarks slightly outside [0, 1] are normal near the image border.
const MAX_OVERSHOOT: f32 = 0.5;

/// What one frame produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    /// Smoothed cursor position, if a hand was tracked.
    pub cursor: Option<ScreenPoint>,
    pub event: Option<GestureEvent>,
    /// Smoothed subject distance, if a usable pose was seen.
    pub distance: Option<f32>,
    pub command: FlightCommand,
}

/// Snapshot of pipeline state for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatus {
    pub frames: u64,
    pub gesture_state: GestureState,
    pub cursor: Option<ScreenPoint>,
    pub distance: Option<f32>,
    pub last_command: FlightCommand,
}

pub struct Pipeline {
    cursor_x: ScalarFilter,
    cursor_y: ScalarFilter,
    distance: ScalarFilter,
    mapper: CoordinateMapper,
    recognizer: GestureRecognizer,
    estimator: DistanceEstimator,
    control: ControlLoop,
    frames: u64,
    last_cursor: Option<ScreenPoint>,
    last_distance: Option<f32>,
    last_command: FlightCommand,
}

impl Pipeline {
    /// Build a fresh session. Fails on invalid configuration.
    pub fn new(config: &PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let f = &config.filter;
        let control = ControlLoop::new(config.control.clone())?;
        let last_command = FlightCommand::hold(config.control.target_height);
        Ok(Self {
            cursor_x: ScalarFilter::new(f.cursor_process_noise, f.cursor_measurement_noise)?,
            cursor_y: ScalarFilter::new(f.cursor_process_noise, f.cursor_measurement_noise)?,
            distance: ScalarFilter::new(f.distance_process_noise, f.distance_measurement_noise)?,
            mapper: CoordinateMapper::new(config.screen.width, config.screen.height),
            recognizer: GestureRecognizer::new(config.gesture.clone()),
            estimator: DistanceEstimator::new(config.distance.clone()),
            control,
            frames: 0,
            last_cursor: None,
            last_distance: None,
            last_command,
        })
    }

    /// Process one frame of landmarks.
    pub fn process(&mut self, frame: &FrameInput) -> FrameOutput {
        self.frames += 1;
        let bias = OrientationBias::from_gravity_x(frame.gravity_x);

        let (cursor, event) = match &frame.hand {
            Some(hand) => self.track_hand(hand, bias),
            None => (None, None),
        };

        let measurement = frame.pose.as_ref().and_then(|pose| {
            self.estimator
                .measure(pose, bias, frame.image_width, frame.image_height)
        });
        let (distance, offset) = match measurement {
            Some(m) => (Some(self.distance.filter(m.distance)), m.horizontal_offset),
            None => (None, 0.5),
        };
        let command = self.control.step(distance, offset, frame.smiling);

        if cursor.is_some() {
            self.last_cursor = cursor;
        }
        self.last_distance = distance;
        self.last_command = command;

        tracing::trace!(
            frame = self.frames,
            cursor = ?cursor,
            distance = ?distance,
            vx = command.vx,
            vyaw = command.vyaw,
            "frame processed"
        );

        FrameOutput {
            cursor,
            event,
            distance,
            command,
        }
    }

    fn track_hand(
        &mut self,
        hand: &Hand,
        bias: OrientationBias,
    ) -> (Option<ScreenPoint>, Option<GestureEvent>) {
        let Some(tip) = hand.landmark(INDEX_TIP) else {
            tracing::debug!(landmarks = hand.landmarks.len(), "hand has too few landmarks");
            return (None, None);
        };
        // one corrupt coordinate would poison the cursor filters for the session
        if !in_frame(tip.x) || !in_frame(tip.y) {
            tracing::debug!(x = tip.x, y = tip.y, "index tip outside the image; hand skipped");
            return (None, None);
        }
        let fx = self.cursor_x.filter(tip.x);
        let fy = self.cursor_y.filter(tip.y);
        let cursor = self.mapper.map(fx, fy, bias);

        let signals = hand.gesture_points().and_then(|pts| HandSignals::from_points(&pts));
        let Some(signals) = signals else {
            tracing::debug!("degenerate thumb geometry; gesture step skipped");
            return (Some(cursor), None);
        };
        let fingertip = self.mapper.map(tip.x, tip.y, bias);
        let event = self
            .recognizer
            .step(&GestureInput::new(signals, cursor, fingertip));
        (Some(cursor), event)
    }

    /// Start a new session: gesture back to `Wait`, filters forgotten.
    pub fn reset(&mut self) {
        self.cursor_x.reset();
        self.cursor_y.reset();
        self.distance.reset();
        self.recognizer.reset();
        self.frames = 0;
        self.last_cursor = None;
        self.last_distance = None;
        self.last_command = FlightCommand::hold(self.control.config().target_height);
        tracing::info!("pipeline reset");
    }

    pub fn gesture_state(&self) -> GestureState {
        self.recognizer.state()
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            frames: self.frames,
            gesture_state: self.recognizer.state(),
            cursor: self.last_cursor,
            distance: self.last_distance,
            last_command: self.last_command,
        }
    }
}

/// Normalized coordinate that is finite and near the image.
fn in_frame(v: f32) -> bool {
    v.is_finite() && (-MAX_OVERSHOOT..=1.0 + MAX_OVERSHOOT).contains(&v)
}
