//! Platform seams for the camera overlay: capture devices, the display
//! surface a stream is rendered into, and the presentation host.

use std::{fmt, sync::Arc};

use anyhow::anyhow;
use async_trait::async_trait;
use shared::{
    domain::{CaptureDeviceId, MediaDeviceInfo, SlideId},
    error::CaptureError,
    protocol::{CaptureConstraints, KeyBinding},
};

/// A live stream opened from a capture device.
pub trait CaptureHandle: Send + Sync + fmt::Debug {
    /// Device the platform actually granted, which may differ from the request
    /// when the constraints allowed any device.
    fn device_id(&self) -> Option<CaptureDeviceId>;
    /// Stops every underlying track. Must be safe to call more than once.
    fn stop_tracks(&self);
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn enumerate_devices(&self) -> anyhow::Result<Vec<MediaDeviceInfo>>;
    async fn get_user_media(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Arc<dyn CaptureHandle>, CaptureError>;
}

/// On-screen element a capture handle is rendered into.
pub trait DisplaySurface: Send + Sync {
    fn bind(&self, handle: Arc<dyn CaptureHandle>);
    fn unbind(&self);
    fn set_style_class(&self, class: &str);
    fn style_class(&self) -> String;
    fn load(&self);
    fn play(&self);
    fn pause(&self);
}

pub trait PresentationHost: Send + Sync {
    fn is_ready(&self) -> bool;
    fn current_slide(&self) -> Option<SlideId>;
    fn register_key_binding(&self, binding: KeyBinding) -> anyhow::Result<()>;
}

pub struct MissingMediaDevices;

#[async_trait]
impl MediaDevices for MissingMediaDevices {
    async fn enumerate_devices(&self) -> anyhow::Result<Vec<MediaDeviceInfo>> {
        Err(anyhow!("media device enumeration is unavailable"))
    }

    async fn get_user_media(
        &self,
        _constraints: CaptureConstraints,
    ) -> Result<Arc<dyn CaptureHandle>, CaptureError> {
        Err(CaptureError::failed("media capture backend is unavailable"))
    }
}
