use std::fmt;

use serde::{Deserialize, Serialize};

/// Annotation values that mean "no overlay" when found on a slide.
pub const STYLE_SENTINELS: [&str; 2] = ["false", "blank"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureDeviceId(pub String);

impl CaptureDeviceId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlideId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    #[default]
    Disabled,
    Pending,
    Active,
    Error,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CaptureStatus::Disabled => "disabled",
            CaptureStatus::Pending => "pending",
            CaptureStatus::Active => "active",
            CaptureStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Resolved overlay style for a slide.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleTag {
    #[default]
    None,
    Tagged(String),
}

impl StyleTag {
    /// Interprets a raw annotation value; empty and sentinel values collapse to `None`.
    pub fn from_annotation(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || STYLE_SENTINELS
                .iter()
                .any(|sentinel| trimmed.eq_ignore_ascii_case(sentinel))
        {
            StyleTag::None
        } else {
            StyleTag::Tagged(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    pub device_id: CaptureDeviceId,
    pub kind: MediaDeviceKind,
    pub label: String,
}
