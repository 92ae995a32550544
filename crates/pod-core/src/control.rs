//! Follow controller: bang-bang velocity commands with a deadband.
//!
//! The gap between `near_threshold` and `far_threshold` is the hysteresis
//! band; it must be wider than the noise floor of the smoothed distance.

use crate::config::ConfigError;
use crate::types::FlightCommand;
use serde::{Deserialize, Serialize};

/// Thresholds and output magnitudes for [`ControlLoop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Closer than this (distance units), back away.
    pub near_threshold: f32,
    /// Farther than this, approach.
    pub far_threshold: f32,
    /// Subject left of this normalized offset, yaw left (positive).
    pub left_threshold: f32,
    /// Subject right of this normalized offset, yaw right (negative).
    pub right_threshold: f32,
    /// Forward/backward speed magnitude (m/s).
    pub speed_step: f32,
    /// Yaw rate magnitude (deg/s).
    pub yaw_step: f32,
    /// Absolute hover height (m).
    pub target_height: f32,
    /// Amount both distance thresholds drop while the subject smiles.
    pub expression_offset: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            near_threshold: 90.0,
            far_threshold: 110.0,
            left_threshold: 0.35,
            right_threshold: 0.65,
            speed_step: 0.15,
            yaw_step: 10.0,
            target_height: 0.5,
            expression_offset: 25.0,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            self.near_threshold,
            self.far_threshold,
            self.left_threshold,
            self.right_threshold,
            self.speed_step,
            self.yaw_step,
            self.target_height,
            self.expression_offset,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(ConfigError::Invalid(
                "control thresholds must be finite".into(),
            ));
        }
        if self.near_threshold >= self.far_threshold {
            return Err(ConfigError::Invalid(format!(
                "near_threshold ({}) must be below far_threshold ({})",
                self.near_threshold, self.far_threshold
            )));
        }
        if self.left_threshold >= self.right_threshold {
            return Err(ConfigError::Invalid(format!(
                "left_threshold ({}) must be below right_threshold ({})",
                self.left_threshold, self.right_threshold
            )));
        }
        Ok(())
    }
}

/// Stateless per-frame policy mapping distance and offset to a command.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    config: ControlConfig,
}

impl ControlLoop {
    pub fn new(config: ControlConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Compute this frame's command. `None` means no subject: hold position.
    ///
    /// A smiling subject shifts the whole band down by `expression_offset`,
    /// so the vehicle follows closer.
    pub fn step(
        &self,
        distance: Option<f32>,
        horizontal_offset: f32,
        smiling: bool,
    ) -> FlightCommand {
        let c = &self.config;
        let Some(distance) = distance else {
            return FlightCommand::hold(c.target_height);
        };

        let shift = if smiling { c.expression_offset } else { 0.0 };
        let vx = if distance < c.near_threshold - shift {
            -c.speed_step
        } else if distance > c.far_threshold - shift {
            c.speed_step
        } else {
            0.0
        };

        let vyaw = if horizontal_offset > c.right_threshold {
            -c.yaw_step
        } else if horizontal_offset < c.left_threshold {
            c.yaw_step
        } else {
            0.0
        };

        FlightCommand {
            vx,
            vy: 0.0,
            vyaw,
            target_height: c.target_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loop_60_80() -> ControlLoop {
        ControlLoop::new(ControlConfig {
            near_threshold: 60.0,
            far_threshold: 80.0,
            ..ControlConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_hysteresis_band() {
        let c = loop_60_80();
        assert!(c.step(Some(50.0), 0.5, false).vx < 0.0);
        assert_eq!(c.step(Some(70.0), 0.5, false).vx, 0.0);
        assert!(c.step(Some(90.0), 0.5, false).vx > 0.0);
    }

    #[test]
    fn test_band_edges_are_inside() {
        let c = loop_60_80();
        assert_eq!(c.step(Some(60.0), 0.5, false).vx, 0.0);
        assert_eq!(c.step(Some(80.0), 0.5, false).vx, 0.0);
    }

    #[test]
    fn test_no_subject_holds() {
        let c = loop_60_80();
        for offset in [0.0, 0.5, 1.0] {
            let cmd = c.step(None, offset, false);
            assert_eq!(cmd.vx, 0.0);
            assert_eq!(cmd.vy, 0.0);
            assert_eq!(cmd.vyaw, 0.0);
            assert_eq!(cmd.target_height, 0.5);
        }
    }

    #[test]
    fn test_yaw_follows_offset() {
        let c = loop_60_80();
        assert_eq!(c.step(Some(70.0), 0.8, false).vyaw, -10.0);
        assert_eq!(c.step(Some(70.0), 0.2, false).vyaw, 10.0);
        assert_eq!(c.step(Some(70.0), 0.5, false).vyaw, 0.0);
    }

    #[test]
    fn test_no_lateral_velocity() {
        let c = loop_60_80();
        assert_eq!(c.step(Some(10.0), 0.0, false).vy, 0.0);
        assert_eq!(c.step(Some(500.0), 1.0, false).vy, 0.0);
    }

    #[test]
    fn test_smile_shifts_band_closer() {
        let c = loop_60_80();
        // 50 is near without a smile, inside the band 35..55 with one
        assert!(c.step(Some(50.0), 0.5, false).vx < 0.0);
        assert_eq!(c.step(Some(50.0), 0.5, true).vx, 0.0);
        // 70 is inside the band normally, beyond the shifted far edge
        assert_eq!(c.step(Some(70.0), 0.5, false).vx, 0.0);
        assert!(c.step(Some(70.0), 0.5, true).vx > 0.0);
        assert!(c.step(Some(30.0), 0.5, true).vx < 0.0);
    }

    #[test]
    fn test_rejects_non_finite_expression_offset() {
        let bad = ControlConfig {
            expression_offset: f32::NAN,
            ..ControlConfig::default()
        };
        assert!(ControlLoop::new(bad).is_err());
    }

    #[test]
    fn test_rejects_inverted_band() {
        let bad = ControlConfig {
            near_threshold: 80.0,
            far_threshold: 80.0,
            ..ControlConfig::default()
        };
        assert!(ControlLoop::new(bad).is_err());

        let bad = ControlConfig {
            left_threshold: 0.7,
            ..ControlConfig::default()
        };
        assert!(ControlLoop::new(bad).is_err());
    }
}
