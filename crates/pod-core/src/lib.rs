//! pod-core — Gesture-to-command pipeline.
//!
//! Smooths per-frame hand and pose landmarks, recognises thumb gestures,
//! and turns subject distance into follow commands for the vehicle.

pub mod config;
pub mod control;
pub mod distance;
pub mod filter;
pub mod gesture;
pub mod mapper;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use config::{ConfigError, PipelineConfig};
pub use control::{ControlConfig, ControlLoop};
pub use filter::{FilterError, ScalarFilter};
pub use gesture::{GestureConfig, GestureRecognizer, GestureState};
pub use mapper::{CoordinateMapper, OrientationBias};
pub use pipeline::{FrameOutput, Pipeline, PipelineStatus};
pub use types::{FlightCommand, FrameInput, GestureEvent, Hand, Pose, ScreenPoint};
