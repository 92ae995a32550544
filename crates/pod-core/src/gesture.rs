//! Thumb-bend and pinch gesture recognizer.
//!
//! Turns the per-frame thumb joint angle and thumb/index pinch distance into
//! press, back and swipe events. Debouncing counts processed frames rather
//! than wall-clock time, so a fixed frame sequence always yields the same
//! events.
//!
//! ```text
//!            bend          release        bend          release
//!   Default ─────▶ FirstBend ───▶ FirstRelease ───▶ SecondBend ───▶ SecondRelease ──▶ Wait (Back)
//!      │                               │ timeout
//!      │ pinch                         └──────▶ Wait (Press)
//!      └──────▶ SwipeBegin ── moved ──▶ Wait (Swipe)
//! ```

use crate::types::{GestureEvent, NormalizedLandmark, ScreenPoint};
use serde::{Deserialize, Serialize};

/// Recognizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    /// Waiting for a neutral, open hand before arming.
    #[default]
    Wait,
    /// Armed: thumb straight, fingers apart.
    Default,
    FirstBend,
    FirstRelease,
    SecondBend,
    SecondRelease,
    /// Pinch held; tracking drag distance from the recorded origin.
    SwipeBegin,
}

impl GestureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::Default => "default",
            Self::FirstBend => "first_bend",
            Self::FirstRelease => "first_release",
            Self::SecondBend => "second_bend",
            Self::SecondRelease => "second_release",
            Self::SwipeBegin => "swipe_begin",
        }
    }
}

/// Thresholds and frame-count timeouts for the recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Joint angle (radians) above which the thumb counts as bent.
    pub bend_threshold: f32,
    /// Joint angle (radians) below which the thumb counts as straight.
    pub release_threshold: f32,
    /// Squared normalized thumb/index distance below which fingers are pinched.
    pub pinch_threshold: f32,
    /// Frames allowed in `FirstBend` before giving up.
    pub first_bend_timeout: u32,
    /// Frames in `FirstRelease` after which a single tap becomes a press.
    pub first_release_timeout: u32,
    /// Frames allowed in `SecondBend` before giving up.
    pub second_bend_timeout: u32,
    /// Frames of sustained drag after which a swipe completes.
    pub swipe_timeout: u32,
    /// Squared pixel drag that must be exceeded before a swipe can complete.
    pub swipe_min_distance: f32,
    /// Squared pixel drag that completes a swipe immediately.
    pub swipe_long_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            bend_threshold: 0.7,
            release_threshold: 0.25,
            pinch_threshold: 3e-3,
            first_bend_timeout: 20,
            first_release_timeout: 15,
            second_bend_timeout: 20,
            swipe_timeout: 20,
            swipe_min_distance: 1e4,
            swipe_long_distance: 8e4,
        }
    }
}

/// Continuous signals derived from four hand landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSignals {
    /// Angle (radians) between the two thumb segments.
    pub angle: f32,
    /// Squared distance between thumb tip and index tip.
    pub pinch: f32,
}

impl HandSignals {
    /// Derive signals from `[thumb_mcp, thumb_ip, thumb_tip, index_tip]`.
    ///
    /// Returns `None` when either thumb segment has zero length.
    pub fn from_points(points: &[NormalizedLandmark; 4]) -> Option<Self> {
        let angle = joint_angle(&points[0], &points[1], &points[2])?;
        let pinch = points[3].squared_distance(&points[2]);
        Some(Self { angle, pinch })
    }
}

/// Angle at `b` between segments a→b and b→c.
pub fn joint_angle(a: &NormalizedLandmark, b: &NormalizedLandmark, c: &NormalizedLandmark) -> Option<f32> {
    let (v1x, v1y) = (b.x - a.x, b.y - a.y);
    let (v2x, v2y) = (c.x - b.x, c.y - b.y);
    let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
    if !(denom > 0.0) || !denom.is_finite() {
        return None;
    }
    let cos = ((v1x * v2x + v1y * v2y) / denom).clamp(-1.0, 1.0);
    Some(cos.acos())
}

/// One frame of recognizer input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureInput {
    pub angle: f32,
    pub pinch: f32,
    /// Smoothed cursor position.
    pub cursor: ScreenPoint,
    /// Unsmoothed index fingertip position.
    pub fingertip: ScreenPoint,
}

impl GestureInput {
    pub fn new(signals: HandSignals, cursor: ScreenPoint, fingertip: ScreenPoint) -> Self {
        Self {
            angle: signals.angle,
            pinch: signals.pinch,
            cursor,
            fingertip,
        }
    }
}

/// Frame-debounced gesture state machine.
///
/// Every instance carries its own counter and swipe origin, so one
/// recognizer per hand is fine.
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    state: GestureState,
    counter: u32,
    swipe_origin: ScreenPoint,
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::Wait,
            counter: 0,
            swipe_origin: ScreenPoint::default(),
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Return to `Wait` and drop any partially recognised gesture.
    pub fn reset(&mut self) {
        self.state = GestureState::Wait;
        self.counter = 0;
        self.swipe_origin = ScreenPoint::default();
    }

    /// Advance one frame. Returns an event when a gesture completes.
    pub fn step(&mut self, input: &GestureInput) -> Option<GestureEvent> {
        let (next, event) = match self.state {
            GestureState::Wait => (self.on_wait(input), None),
            GestureState::Default => (self.on_default(input), None),
            GestureState::FirstBend => (self.on_first_bend(input), None),
            GestureState::FirstRelease => self.on_first_release(input),
            GestureState::SecondBend => (self.on_second_bend(input), None),
            GestureState::SecondRelease => (GestureState::Wait, Some(GestureEvent::Back)),
            GestureState::SwipeBegin => self.on_swipe(input),
        };

        if next != self.state {
            tracing::debug!(
                from = self.state.as_str(),
                to = next.as_str(),
                angle = input.angle,
                pinch = input.pinch,
                "gesture transition"
            );
        }
        if let Some(ev) = &event {
            tracing::debug!(event = ?ev, "gesture recognised");
        }
        self.state = next;
        event
    }

    fn is_bent(&self, input: &GestureInput) -> bool {
        input.angle > self.config.bend_threshold
    }

    fn is_released(&self, input: &GestureInput) -> bool {
        input.angle < self.config.release_threshold
    }

    fn is_pinched(&self, input: &GestureInput) -> bool {
        input.pinch < self.config.pinch_threshold
    }

    /// Count this frame; true once the count exceeds `limit`.
    fn tick(&mut self, limit: u32) -> bool {
        self.counter = self.counter.saturating_add(1);
        self.counter > limit
    }

    fn on_wait(&self, input: &GestureInput) -> GestureState {
        if self.is_released(input) && input.pinch > self.config.pinch_threshold {
            GestureState::Default
        } else {
            GestureState::Wait
        }
    }

    fn on_default(&mut self, input: &GestureInput) -> GestureState {
        let mut next = GestureState::Default;
        if self.is_bent(input) {
            self.counter = 0;
            next = GestureState::FirstBend;
        }
        // pinch wins over a simultaneous bend
        if self.is_pinched(input) {
            self.counter = 0;
            self.swipe_origin = input.fingertip;
            next = GestureState::SwipeBegin;
        }
        next
    }

    fn on_first_bend(&mut self, input: &GestureInput) -> GestureState {
        if self.is_released(input) {
            self.counter = 0;
            GestureState::FirstRelease
        } else if self.tick(self.config.first_bend_timeout) {
            GestureState::Wait
        } else {
            GestureState::FirstBend
        }
    }

    fn on_first_release(&mut self, input: &GestureInput) -> (GestureState, Option<GestureEvent>) {
        if self.is_bent(input) {
            self.counter = 0;
            (GestureState::SecondBend, None)
        } else if self.tick(self.config.first_release_timeout) {
            (
                GestureState::Wait,
                Some(GestureEvent::Press {
                    point: input.cursor,
                }),
            )
        } else {
            (GestureState::FirstRelease, None)
        }
    }

    fn on_second_bend(&mut self, input: &GestureInput) -> GestureState {
        if self.is_released(input) {
            self.counter = 0;
            GestureState::SecondRelease
        } else if self.tick(self.config.second_bend_timeout) {
            GestureState::Wait
        } else {
            GestureState::SecondBend
        }
    }

    fn on_swipe(&mut self, input: &GestureInput) -> (GestureState, Option<GestureEvent>) {
        if !self.is_pinched(input) {
            return (GestureState::Wait, None);
        }
        let moved = input.cursor.squared_distance(&self.swipe_origin) as f32;
        if moved > self.config.swipe_min_distance
            && (self.tick(self.config.swipe_timeout) || moved > self.config.swipe_long_distance)
        {
            let event = GestureEvent::Swipe {
                origin: self.swipe_origin,
                destination: input.fingertip,
            };
            return (GestureState::Wait, Some(event));
        }
        (GestureState::SwipeBegin, None)
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
