pub mod capture;
pub mod commands;
pub mod controller;
pub mod detector;
pub mod state;

pub use capture::{CameraDevice, CaptureError, CapturedPhoto};
pub use controller::{AnimationTimings, SessionController};
pub use detector::{Detection, DetectionRequest, MeasurementDetector, SimulatedDetector};
pub use state::SessionState;
