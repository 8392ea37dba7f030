use serde::{Deserialize, Serialize};

use crate::domain::{CaptureDeviceId, SlideId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum HostEvent {
    Ready,
    SlideChanged {
        previous_slide: Option<SlideId>,
        current_slide: SlideId,
    },
    KeyPressed {
        key_code: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key_code: u32,
    pub key: String,
    pub description: String,
}

/// Constraints passed to the platform when opening a capture stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureConstraints {
    /// `None` lets the platform pick any video input.
    pub video_device: Option<CaptureDeviceId>,
    pub audio: bool,
}

impl CaptureConstraints {
    pub fn video_only(video_device: Option<CaptureDeviceId>) -> Self {
        Self {
            video_device,
            audio: false,
        }
    }
}
