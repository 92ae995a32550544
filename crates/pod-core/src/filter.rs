//! One-dimensional Kalman smoother for per-frame landmark and distance signals.

use thiserror::Error;

const INITIAL_COVARIANCE: f32 = 1.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidNoise { name: &'static str, value: f32 },
}

/// Constant-state Kalman filter over a single scalar channel.
///
/// Each filtered channel (cursor x, cursor y, distance) owns its own
/// instance; nothing is shared between them.
#[derive(Debug, Clone)]
pub struct ScalarFilter {
    value: f32,
    covariance: f32,
    process_noise: f32,
    measurement_noise: f32,
}

impl ScalarFilter {
    /// Create a filter with process noise `Q` and measurement noise `R`.
    pub fn new(process_noise: f32, measurement_noise: f32) -> Result<Self, FilterError> {
        check_noise("process noise", process_noise)?;
        check_noise("measurement noise", measurement_noise)?;
        Ok(Self {
            value: 0.0,
            covariance: INITIAL_COVARIANCE,
            process_noise,
            measurement_noise,
        })
    }

    /// Fold one measurement into the estimate and return the new estimate.
    pub fn filter(&mut self, measurement: f32) -> f32 {
        let predicted = self.covariance + self.process_noise;
        let gain = predicted / (predicted + self.measurement_noise);
        self.value += gain * (measurement - self.value);
        // (1 - K)P' rewritten as P'R/(P'+R); the subtraction rounds to 0
        // when R is tiny relative to P'
        self.covariance = (predicted * self.measurement_noise / (predicted + self.measurement_noise))
            .max(f32::MIN_POSITIVE);
        self.value
    }

    /// Current estimate.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Current estimate covariance. Always > 0.
    pub fn covariance(&self) -> f32 {
        self.covariance
    }

    /// Forget all history, as if freshly constructed.
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.covariance = INITIAL_COVARIANCE;
    }
}

fn check_noise(name: &'static str, value: f32) -> Result<(), FilterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FilterError::InvalidNoise { name, value })
    }
}
