use std::sync::Arc;

use capture_integration::MediaDevices;
use shared::{
    domain::{CaptureDeviceId, MediaDeviceKind},
    error::CaptureError,
};
use tracing::debug;

/// Lists the platform's video inputs, in platform order.
pub struct DeviceEnumerator {
    media: Arc<dyn MediaDevices>,
}

impl DeviceEnumerator {
    pub fn new(media: Arc<dyn MediaDevices>) -> Self {
        Self { media }
    }

    pub async fn list_video_input_devices(&self) -> Result<Vec<CaptureDeviceId>, CaptureError> {
        let devices = self
            .media
            .enumerate_devices()
            .await
            .map_err(|err| CaptureError::DeviceListUnavailable(err.to_string()))?;

        let video_inputs = devices
            .into_iter()
            .filter(|device| device.kind == MediaDeviceKind::VideoInput)
            .map(|device| {
                debug!(
                    "capture: video input id={} label={}",
                    device.device_id, device.label
                );
                device.device_id
            })
            .collect::<Vec<_>>();
        debug!("capture: enumerated video inputs count={}", video_inputs.len());
        Ok(video_inputs)
    }
}
