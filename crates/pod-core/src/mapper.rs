//! Normalized landmark → absolute screen coordinate mapping.
//!
//! The camera sees a cropped, rotated field of view, so the usable hand
//! region is recentred and stretched by 1.5x before scaling to the screen.

use crate::types::ScreenPoint;
use serde::{Deserialize, Serialize};

const CENTER_X: f32 = 0.5;
const CENTER_Y: f32 = 0.35;
const STRETCH: f32 = 1.5;
const TILT_SHIFT: f32 = 0.15;
/// Gravity x component (m/s²) beyond which the phone counts as tilted.
const TILT_GRAVITY: f32 = 7.0;

/// Horizontal bias derived from phone tilt: -1, 0 or +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrientationBias {
    Negative,
    #[default]
    Neutral,
    Positive,
}

impl OrientationBias {
    /// Classify a gravity-sensor x reading.
    pub fn from_gravity_x(gx: f32) -> Self {
        if gx > TILT_GRAVITY {
            Self::Positive
        } else if gx < -TILT_GRAVITY {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Self::Negative => -1,
            Self::Neutral => 0,
            Self::Positive => 1,
        }
    }

    /// True when the device is held sideways.
    pub fn is_rotated(self) -> bool {
        self != Self::Neutral
    }
}

/// Screen size used to turn normalized coordinates into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    width: u32,
    height: u32,
}

impl CoordinateMapper {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Map a normalized (x, y) to a screen pixel, truncating toward zero.
    pub fn map(&self, x: f32, y: f32, bias: OrientationBias) -> ScreenPoint {
        let b = bias.as_i8() as f32;
        let sx = clamp01((x - CENTER_X - b * TILT_SHIFT) * STRETCH + 0.5);
        let sy = clamp01((y - CENTER_Y + b * TILT_SHIFT) * STRETCH + 0.5);
        ScreenPoint {
            x: (sx * self.width as f32) as i32,
            y: (sy * self.height as f32) as i32,
        }
    }
}

/// Clamp to [0, 1]; NaN maps to 0.
fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_maps_to_middle() {
        let m = CoordinateMapper::new(1000, 2000);
        let p = m.map(0.5, 0.35, OrientationBias::Neutral);
        assert_eq!(p, ScreenPoint::new(500, 1000));
    }

    #[test]
    fn test_clamps_to_screen_edges() {
        let m = CoordinateMapper::new(1080, 2340);
        assert_eq!(m.map(0.0, 0.0, OrientationBias::Neutral), ScreenPoint::new(0, 0));
        assert_eq!(m.map(1.0, 1.0, OrientationBias::Neutral), ScreenPoint::new(1080, 2340));
    }

    #[test]
    fn test_positive_bias_shifts_left_and_down() {
        let m = CoordinateMapper::new(1000, 1000);
        // x: (0.6 - 0.5 - 0.15) * 1.5 + 0.5 = 0.425
        // y: (0.3 - 0.35 + 0.15) * 1.5 + 0.5 = 0.65
        let p = m.map(0.6, 0.3, OrientationBias::Positive);
        assert_eq!(p, ScreenPoint::new(425, 650));
    }

    #[test]
    fn test_negative_bias() {
        let m = CoordinateMapper::new(1000, 1000);
        // x: (0.4 - 0.5 + 0.15) * 1.5 + 0.5 = 0.575
        // y: (0.5 - 0.35 - 0.15) * 1.5 + 0.5 = 0.5
        let p = m.map(0.4, 0.5, OrientationBias::Negative);
        assert_eq!(p, ScreenPoint::new(575, 500));
    }

    #[test]
    fn test_nan_coordinate_clamps_to_origin() {
        let m = CoordinateMapper::new(100, 100);
        assert_eq!(m.map(f32::NAN, f32::NAN, OrientationBias::Neutral), ScreenPoint::new(0, 0));
    }

    #[test]
    fn test_bias_from_gravity() {
        assert_eq!(OrientationBias::from_gravity_x(9.5), OrientationBias::Positive);
        assert_eq!(OrientationBias::from_gravity_x(-8.0), OrientationBias::Negative);
        assert_eq!(OrientationBias::from_gravity_x(7.0), OrientationBias::Neutral);
        assert_eq!(OrientationBias::from_gravity_x(0.3), OrientationBias::Neutral);
    }
}
