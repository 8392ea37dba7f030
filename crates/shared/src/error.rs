use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CaptureError {
    #[error("capture acquisition denied: {0}")]
    AcquisitionDenied(String),
    #[error("capture acquisition failed: {0}")]
    AcquisitionFailed(String),
    #[error("capture device list unavailable: {0}")]
    DeviceListUnavailable(String),
}

impl CaptureError {
    pub fn denied(message: impl Into<String>) -> Self {
        Self::AcquisitionDenied(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::AcquisitionFailed(message.into())
    }

    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self,
            CaptureError::AcquisitionDenied(_) | CaptureError::AcquisitionFailed(_)
        )
    }
}
