//! Subject distance and horizontal offset from a body pose.
//!
//! Distance uses the pixel gap between the eye line and the shoulder line,
//! which shrinks as the subject moves away. The power-law calibration was
//! fitted against a measured range on the reference device.

use crate::mapper::OrientationBias;
use crate::types::{Keypoint, Pose, LEFT_EYE, LEFT_SHOULDER, NOSE, RIGHT_EYE, RIGHT_SHOULDER};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Poses with an overall score at or below this are ignored.
    pub min_score: f32,
    pub calibration_gain: f32,
    pub calibration_exponent: f32,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            min_score: 0.3,
            calibration_gain: 21348.0,
            calibration_exponent: -1.223,
        }
    }
}

/// Raw (unsmoothed) measurement for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubjectMeasurement {
    pub distance: f32,
    /// Subject position across the image, 0 = left edge, 1 = right edge.
    pub horizontal_offset: f32,
}

#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    config: DistanceConfig,
}

impl DistanceEstimator {
    pub fn new(config: DistanceConfig) -> Self {
        Self { config }
    }

    /// Measure the subject, or `None` if the pose is missing, weak, or
    /// geometrically implausible.
    pub fn measure(
        &self,
        pose: &Pose,
        bias: OrientationBias,
        image_width: u32,
        image_height: u32,
    ) -> Option<SubjectMeasurement> {
        if !(pose.score > self.config.min_score) {
            return None;
        }
        let kp = |i: usize| pose.keypoints.get(i).copied();
        let (nose, le, re, ls, rs) = (
            kp(NOSE)?,
            kp(LEFT_EYE)?,
            kp(RIGHT_EYE)?,
            kp(LEFT_SHOULDER)?,
            kp(RIGHT_SHOULDER)?,
        );

        // Sideways phone: the body's vertical axis runs along image x.
        let rotated = bias.is_rotated();
        let along = |k: Keypoint| if rotated { k.x } else { k.y };
        let across = |k: Keypoint| if rotated { k.y } else { k.x };

        let gap = (along(ls) + along(rs)) / 2.0 - (along(le) + along(re)) / 2.0;
        if !(gap > 0.0) {
            return None;
        }
        let distance = self.config.calibration_gain * gap.powf(self.config.calibration_exponent);
        if !distance.is_finite() {
            return None;
        }

        let span = if rotated { image_height } else { image_width };
        let horizontal_offset = if span > 0 {
            (across(nose) / span as f32).clamp(0.0, 1.0)
        } else {
            0.5
        };

        Some(SubjectMeasurement {
            distance,
            horizontal_offset,
        })
    }
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::new(DistanceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Upright subject: eyes at `eye_y`, shoulders at `shoulder_y`, nose at `nose_x`.
    fn pose(score: f32, nose_x: f32, eye_y: f32, shoulder_y: f32) -> Pose {
        let mut keypoints = vec![Keypoint::default(); 17];
        keypoints[NOSE] = Keypoint { x: nose_x, y: eye_y + 10.0, score: 0.9 };
        keypoints[LEFT_EYE] = Keypoint { x: nose_x - 10.0, y: eye_y, score: 0.9 };
        keypoints[RIGHT_EYE] = Keypoint { x: nose_x + 10.0, y: eye_y, score: 0.9 };
        keypoints[LEFT_SHOULDER] = Keypoint { x: nose_x - 60.0, y: shoulder_y, score: 0.9 };
        keypoints[RIGHT_SHOULDER] = Keypoint { x: nose_x + 60.0, y: shoulder_y, score: 0.9 };
        Pose { keypoints, score }
    }

    #[test]
    fn test_low_score_rejected() {
        let est = DistanceEstimator::default();
        let p = pose(0.3, 240.0, 100.0, 200.0);
        assert!(est.measure(&p, OrientationBias::Neutral, 480, 640).is_none());
    }

    #[test]
    fn test_distance_follows_calibration() {
        let est = DistanceEstimator::default();
        let p = pose(0.8, 240.0, 100.0, 200.0);
        let m = est.measure(&p, OrientationBias::Neutral, 480, 640).unwrap();
        let expected = 21348.0 * 100.0f32.powf(-1.223);
        assert!((m.distance - expected).abs() < 1e-2);
        assert!((m.horizontal_offset - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_farther_subject_reads_larger() {
        let est = DistanceEstimator::default();
        let near = est
            .measure(&pose(0.8, 240.0, 100.0, 300.0), OrientationBias::Neutral, 480, 640)
            .unwrap();
        let far = est
            .measure(&pose(0.8, 240.0, 100.0, 150.0), OrientationBias::Neutral, 480, 640)
            .unwrap();
        assert!(far.distance > near.distance);
    }

    #[test]
    fn test_inverted_geometry_rejected() {
        let est = DistanceEstimator::default();
        let p = pose(0.8, 240.0, 200.0, 100.0);
        assert!(est.measure(&p, OrientationBias::Neutral, 480, 640).is_none());
    }

    #[test]
    fn test_missing_keypoints_rejected() {
        let est = DistanceEstimator::default();
        let p = Pose { keypoints: vec![Keypoint::default(); 3], score: 0.9 };
        assert!(est.measure(&p, OrientationBias::Neutral, 480, 640).is_none());
    }

    #[test]
    fn test_rotated_uses_x_axis() {
        let est = DistanceEstimator::default();
        let mut p = pose(0.8, 0.0, 0.0, 0.0);
        for k in p.keypoints.iter_mut() {
            std::mem::swap(&mut k.x, &mut k.y);
        }
        // after swapping, eyes sit at x=0 and shoulders at x=0: no gap
        assert!(est.measure(&p, OrientationBias::Positive, 640, 480).is_none());

        let mut p = pose(0.8, 320.0, 100.0, 200.0);
        for k in p.keypoints.iter_mut() {
            std::mem::swap(&mut k.x, &mut k.y);
        }
        let m = est.measure(&p, OrientationBias::Positive, 640, 640).unwrap();
        assert!((m.horizontal_offset - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_image_size_centres_offset() {
        let est = DistanceEstimator::default();
        let m = est
            .measure(&pose(0.8, 999.0, 100.0, 200.0), OrientationBias::Neutral, 0, 0)
            .unwrap();
        assert_eq!(m.horizontal_offset, 0.5);
    }
}
