use serde::{Deserialize, Serialize};

/// Number of landmarks in a tracked hand.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Hand landmark indices used by the pipeline.
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;

/// Pose keypoint indices (COCO ordering).
pub const NOSE: usize = 0;
pub const LEFT_EYE: usize = 1;
pub const RIGHT_EYE: usize = 2;
pub const LEFT_SHOULDER: usize = 5;
pub const RIGHT_SHOULDER: usize = 6;

/// Image-relative landmark, both axes in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn squared_distance(&self, other: &NormalizedLandmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Which hand the landmark model reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

/// One tracked hand: 21 ordered landmarks plus its left/right label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hand {
    pub landmarks: Vec<NormalizedLandmark>,
    #[serde(default)]
    pub handedness: Handedness,
}

impl Hand {
    /// Landmark at `index`, or `None` if the model returned a short list.
    pub fn landmark(&self, index: usize) -> Option<NormalizedLandmark> {
        self.landmarks.get(index).copied()
    }

    /// The four landmarks that drive the gesture recognizer:
    /// thumb MCP, thumb IP, thumb tip and index tip.
    pub fn gesture_points(&self) -> Option<[NormalizedLandmark; 4]> {
        Some([
            self.landmark(THUMB_MCP)?,
            self.landmark(THUMB_IP)?,
            self.landmark(THUMB_TIP)?,
            self.landmark(INDEX_TIP)?,
        ])
    }
}

/// Body keypoint in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// A detected person: ordered keypoints plus an overall confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    pub score: f32,
}

/// Everything the landmark producer delivers for one processed frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameInput {
    #[serde(default)]
    pub pose: Option<Pose>,
    #[serde(default)]
    pub hand: Option<Hand>,
    /// X component of the gravity sensor (m/s²), used for the orientation bias.
    #[serde(default)]
    pub gravity_x: f32,
    /// Source image width in pixels (pose keypoints are in this space).
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    /// Face expression classifier reports a smile; pulls the follow band closer.
    #[serde(default)]
    pub smiling: bool,
}

/// Absolute screen-space point in integer pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared pixel distance in i64, saturating at `i64::MAX`.
    pub fn squared_distance(&self, other: &ScreenPoint) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }
}

/// Velocity/height setpoint for the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlightCommand {
    pub vx: f32,
    pub vy: f32,
    pub vyaw: f32,
    pub target_height: f32,
}

impl FlightCommand {
    /// Zero velocity at the given height.
    pub fn hold(target_height: f32) -> Self {
        Self {
            vx: 0.0,
            vy: 0.0,
            vyaw: 0.0,
            target_height,
        }
    }
}

/// Discrete event recognised from hand motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GestureEvent {
    /// Single bend-release: tap at the cursor.
    Press { point: ScreenPoint },
    /// Double bend-release.
    Back,
    /// Pinch-and-drag from `origin` to `destination`.
    Swipe {
        origin: ScreenPoint,
        destination: ScreenPoint,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_with(n: usize) -> Hand {
        Hand {
            landmarks: (0..n)
                .map(|i| NormalizedLandmark::new(i as f32 * 0.01, 0.5))
                .collect(),
            handedness: Handedness::Left,
        }
    }

    #[test]
    fn test_gesture_points_order() {
        let hand = hand_with(HAND_LANDMARK_COUNT);
        let pts = hand.gesture_points().unwrap();
        assert!((pts[0].x - 0.02).abs() < 1e-6);
        assert!((pts[1].x - 0.03).abs() < 1e-6);
        assert!((pts[2].x - 0.04).abs() < 1e-6);
        assert!((pts[3].x - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_gesture_points_short_hand() {
        assert!(hand_with(5).gesture_points().is_none());
    }

    #[test]
    fn test_screen_point_squared_distance() {
        let a = ScreenPoint::new(0, 0);
        let b = ScreenPoint::new(300, 400);
        assert_eq!(a.squared_distance(&b), 250_000);
    }

    #[test]
    fn test_squared_distance_extreme_points() {
        let origin = ScreenPoint::new(0, 0);
        let far = ScreenPoint::new(i32::MAX, 0);
        assert_eq!(origin.squared_distance(&far), (i32::MAX as i64).pow(2));
        let a = ScreenPoint::new(i32::MIN, i32::MIN);
        let b = ScreenPoint::new(i32::MAX, i32::MAX);
        assert_eq!(a.squared_distance(&b), i64::MAX);
    }

    #[test]
    fn test_frame_input_defaults_from_json() {
        let frame: FrameInput = serde_json::from_str("{}").unwrap();
        assert!(frame.pose.is_none());
        assert!(frame.hand.is_none());
        assert_eq!(frame.gravity_x, 0.0);
        assert!(!frame.smiling);
    }

    #[test]
    fn test_gesture_event_json_tag() {
        let json = serde_json::to_string(&GestureEvent::Back).unwrap();
        assert_eq!(json, r#"{"kind":"back"}"#);
    }
}
