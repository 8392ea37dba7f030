//! In-process stand-ins for the browser side: a camera backend, a deck host
//! and a video element that records what it was asked to do.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use capture_integration::{CaptureHandle, DisplaySurface, MediaDevices, PresentationHost};
use serde::Serialize;
use shared::{
    domain::{CaptureDeviceId, MediaDeviceInfo, MediaDeviceKind, SlideId},
    error::CaptureError,
    protocol::{CaptureConstraints, HostEvent, KeyBinding},
};
use tracing::{debug, info};

#[derive(Debug)]
pub struct SimulatedStream {
    device: CaptureDeviceId,
    stopped: AtomicBool,
}

impl CaptureHandle for SimulatedStream {
    fn device_id(&self) -> Option<CaptureDeviceId> {
        Some(self.device.clone())
    }

    fn stop_tracks(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            info!("camera: tracks stopped device={}", self.device);
        }
    }
}

pub struct SimulatedMediaDevices {
    cameras: Vec<CaptureDeviceId>,
    acquire_delay: Duration,
    deny: bool,
}

impl SimulatedMediaDevices {
    pub fn new(cameras: Vec<CaptureDeviceId>, acquire_delay: Duration, deny: bool) -> Self {
        Self {
            cameras,
            acquire_delay,
            deny,
        }
    }
}

#[async_trait]
impl MediaDevices for SimulatedMediaDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        let mut devices = vec![MediaDeviceInfo {
            device_id: CaptureDeviceId::new("default-mic"),
            kind: MediaDeviceKind::AudioInput,
            label: "Built-in microphone".into(),
        }];
        devices.extend(self.cameras.iter().map(|camera| MediaDeviceInfo {
            device_id: camera.clone(),
            kind: MediaDeviceKind::VideoInput,
            label: format!("Camera {camera}"),
        }));
        Ok(devices)
    }

    async fn get_user_media(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Arc<dyn CaptureHandle>, CaptureError> {
        tokio::time::sleep(self.acquire_delay).await;

        if self.deny {
            return Err(CaptureError::denied("permission refused by user"));
        }

        let device = match constraints.video_device {
            Some(requested) if self.cameras.contains(&requested) => requested,
            Some(requested) => {
                return Err(CaptureError::denied(format!(
                    "no camera matches device {requested}"
                )))
            }
            None => self
                .cameras
                .first()
                .cloned()
                .ok_or_else(|| CaptureError::denied("no camera attached"))?,
        };

        info!("camera: stream opened device={device}");
        Ok(Arc::new(SimulatedStream {
            device,
            stopped: AtomicBool::new(false),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Prev,
    Goto(usize),
}

pub struct ScriptedHost {
    slide_count: usize,
    current: Mutex<usize>,
    bindings: Mutex<Vec<KeyBinding>>,
}

impl ScriptedHost {
    pub fn new(slide_count: usize) -> Self {
        Self {
            slide_count,
            current: Mutex::new(0),
            bindings: Mutex::new(Vec::new()),
        }
    }

    pub fn bindings(&self) -> Vec<KeyBinding> {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Moves the deck and returns the event the host would fire, or `None`
    /// when the move goes nowhere.
    pub fn navigate(&self, navigation: Navigation) -> Option<HostEvent> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = *current;
        let target = match navigation {
            Navigation::Next => previous + 1,
            Navigation::Prev => previous.checked_sub(1)?,
            Navigation::Goto(index) => index,
        };
        if target >= self.slide_count || target == previous {
            return None;
        }

        *current = target;
        Some(HostEvent::SlideChanged {
            previous_slide: Some(SlideId(previous)),
            current_slide: SlideId(target),
        })
    }
}

impl PresentationHost for ScriptedHost {
    fn is_ready(&self) -> bool {
        false
    }

    fn current_slide(&self) -> Option<SlideId> {
        if self.slide_count == 0 {
            return None;
        }
        Some(SlideId(
            *self.current.lock().unwrap_or_else(PoisonError::into_inner),
        ))
    }

    fn register_key_binding(&self, binding: KeyBinding) -> Result<()> {
        info!(
            "host: key binding registered key={} description={}",
            binding.key, binding.description
        );
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(binding);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurfaceRecord {
    pub op: &'static str,
    pub class: String,
    pub device: Option<String>,
}

#[derive(Default)]
pub struct RecordingSurface {
    class: Mutex<String>,
    bound: Mutex<Option<CaptureDeviceId>>,
    history: Mutex<Vec<SurfaceRecord>>,
}

impl RecordingSurface {
    pub fn history(&self) -> Vec<SurfaceRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, op: &'static str) {
        let record = SurfaceRecord {
            op,
            class: self.style_class(),
            device: self
                .bound
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
                .map(|device| device.to_string()),
        };
        debug!("surface: {op} class={:?} device={:?}", record.class, record.device);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl DisplaySurface for RecordingSurface {
    fn bind(&self, handle: Arc<dyn CaptureHandle>) {
        *self.bound.lock().unwrap_or_else(PoisonError::into_inner) = handle.device_id();
        self.record("bind");
    }

    fn unbind(&self) {
        *self.bound.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.record("unbind");
    }

    fn set_style_class(&self, class: &str) {
        *self.class.lock().unwrap_or_else(PoisonError::into_inner) = class.to_string();
        self.record("class");
    }

    fn style_class(&self) -> String {
        self.class
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn load(&self) {
        self.record("load");
    }

    fn play(&self) {
        self.record("play");
    }

    fn pause(&self) {
        self.record("pause");
    }
}
