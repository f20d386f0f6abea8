use std::future::Future;

use thiserror::Error;

/// Recoverable capture failures. None of them change saved state.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("a measurement is already being processed")]
    AlreadyProcessing,

    #[error("no photo was captured")]
    MissingPhoto,

    #[error("camera failed: {0}")]
    Device(String),

    #[error("measurement detection failed: {0}")]
    Detection(String),

    #[error("capture was cancelled")]
    Cancelled,

    #[error("failed to save measurement: {0}")]
    Storage(String),
}

/// A photo handed over by the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    uri: String,
}

impl CapturedPhoto {
    pub fn new(uri: impl Into<String>) -> Result<Self, CaptureError> {
        let uri = uri.into();
        if uri.trim().is_empty() {
            return Err(CaptureError::MissingPhoto);
        }
        Ok(Self { uri })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn into_uri(self) -> String {
        self.uri
    }
}

/// Source of photos, e.g. the platform camera behind the viewfinder.
pub trait CameraDevice: Send + Sync {
    fn take_picture(&self) -> impl Future<Output = Result<CapturedPhoto, CaptureError>> + Send;
}
