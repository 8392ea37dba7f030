use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use capture_integration::{CaptureHandle, DisplaySurface, MediaDevices, PresentationHost};
use shared::{
    domain::{CaptureDeviceId, CaptureStatus, MediaDeviceInfo, MediaDeviceKind, SlideId},
    error::CaptureError,
    protocol::{CaptureConstraints, KeyBinding},
};
use tokio::sync::{broadcast, oneshot, Mutex};

use crate::controller::{CaptureEvent, CaptureStreamController};

#[derive(Debug)]
pub struct MockHandle {
    pub device: CaptureDeviceId,
    stop_calls: AtomicUsize,
}

impl MockHandle {
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl CaptureHandle for MockHandle {
    fn device_id(&self) -> Option<CaptureDeviceId> {
        Some(self.device.clone())
    }

    fn stop_tracks(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockMediaDevices {
    devices: Vec<MediaDeviceInfo>,
    enumerate_error: Option<String>,
    acquire_error: StdMutex<Option<CaptureError>>,
    enumerate_calls: AtomicUsize,
    requests: StdMutex<Vec<CaptureConstraints>>,
    handles: StdMutex<Vec<Arc<MockHandle>>>,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
}

impl MockMediaDevices {
    /// Video inputs in the given order plus one microphone that enumeration
    /// must filter out.
    pub fn with_video_inputs(ids: &[&str]) -> Self {
        let mut devices = ids
            .iter()
            .map(|id| MediaDeviceInfo {
                device_id: CaptureDeviceId::new(*id),
                kind: MediaDeviceKind::VideoInput,
                label: format!("camera {id}"),
            })
            .collect::<Vec<_>>();
        devices.insert(
            0,
            MediaDeviceInfo {
                device_id: CaptureDeviceId::new("mic"),
                kind: MediaDeviceKind::AudioInput,
                label: "microphone".to_string(),
            },
        );
        Self {
            devices,
            enumerate_error: None,
            acquire_error: StdMutex::new(None),
            enumerate_calls: AtomicUsize::new(0),
            requests: StdMutex::new(Vec::new()),
            handles: StdMutex::new(Vec::new()),
            gates: Mutex::new(VecDeque::new()),
        }
    }

    pub fn failing_enumeration(err: impl Into<String>) -> Self {
        let mut media = Self::with_video_inputs(&["cam-a", "cam-b"]);
        media.enumerate_error = Some(err.into());
        media
    }

    pub fn fail_acquisitions(&self, err: Option<CaptureError>) {
        *self.acquire_error.lock().expect("acquire error lock") = err;
    }

    /// The next acquisition blocks until the returned sender fires.
    pub async fn hold_next_acquisition(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().await.push_back(rx);
        tx
    }

    pub fn enumerate_calls(&self) -> usize {
        self.enumerate_calls.load(Ordering::SeqCst)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn request(&self, index: usize) -> CaptureConstraints {
        self.requests.lock().expect("requests lock")[index].clone()
    }

    pub fn handle(&self, index: usize) -> Arc<MockHandle> {
        Arc::clone(&self.handles.lock().expect("handles lock")[index])
    }

    fn first_video_input(&self) -> CaptureDeviceId {
        self.devices
            .iter()
            .find(|device| device.kind == MediaDeviceKind::VideoInput)
            .map(|device| device.device_id.clone())
            .unwrap_or_else(|| CaptureDeviceId::new("default"))
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>> {
        self.enumerate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.enumerate_error {
            return Err(anyhow!(err.clone()));
        }
        Ok(self.devices.clone())
    }

    async fn get_user_media(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Arc<dyn CaptureHandle>, CaptureError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(constraints.clone());

        let gate = self.gates.lock().await.pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let failure = self.acquire_error.lock().expect("acquire error lock").clone();
        if let Some(err) = failure {
            return Err(err);
        }

        let handle = Arc::new(MockHandle {
            device: constraints
                .video_device
                .unwrap_or_else(|| self.first_video_input()),
            stop_calls: AtomicUsize::new(0),
        });
        self.handles
            .lock()
            .expect("handles lock")
            .push(Arc::clone(&handle));
        Ok(handle)
    }
}

#[derive(Default)]
pub struct MockSurface {
    bound: StdMutex<Option<Arc<dyn CaptureHandle>>>,
    class: StdMutex<String>,
    calls: StdMutex<Vec<String>>,
}

impl MockSurface {
    pub fn bound_device(&self) -> Option<CaptureDeviceId> {
        self.bound
            .lock()
            .expect("bound lock")
            .as_ref()
            .and_then(|handle| handle.device_id())
    }

    pub fn is_bound(&self) -> bool {
        self.bound.lock().expect("bound lock").is_some()
    }

    pub fn class(&self) -> String {
        self.class.lock().expect("class lock").clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|recorded| recorded.as_str() == call)
            .count()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls lock").push(call.into());
    }
}

impl DisplaySurface for MockSurface {
    fn bind(&self, handle: Arc<dyn CaptureHandle>) {
        *self.bound.lock().expect("bound lock") = Some(handle);
        self.record("bind");
    }

    fn unbind(&self) {
        *self.bound.lock().expect("bound lock") = None;
        self.record("unbind");
    }

    fn set_style_class(&self, class: &str) {
        *self.class.lock().expect("class lock") = class.to_string();
        self.record(format!("class:{class}"));
    }

    fn style_class(&self) -> String {
        self.class()
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

pub struct MockHost {
    ready: bool,
    current: StdMutex<Option<SlideId>>,
    bindings: StdMutex<Vec<KeyBinding>>,
}

impl MockHost {
    pub fn new(ready: bool, current: Option<SlideId>) -> Self {
        Self {
            ready,
            current: StdMutex::new(current),
            bindings: StdMutex::new(Vec::new()),
        }
    }

    pub fn set_current(&self, slide: SlideId) {
        *self.current.lock().expect("current lock") = Some(slide);
    }

    pub fn bindings(&self) -> Vec<KeyBinding> {
        self.bindings.lock().expect("bindings lock").clone()
    }
}

impl PresentationHost for MockHost {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn current_slide(&self) -> Option<SlideId> {
        *self.current.lock().expect("current lock")
    }

    fn register_key_binding(&self, binding: KeyBinding) -> Result<()> {
        self.bindings.lock().expect("bindings lock").push(binding);
        Ok(())
    }
}

pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<CaptureEvent>,
    matches: F,
) -> CaptureEvent
where
    F: Fn(&CaptureEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) => continue,
                Err(err) => panic!("capture event stream failed: {err}"),
            }
        }
    })
    .await
    .expect("timed out waiting for capture event")
}

pub async fn wait_for_status(
    events: &mut broadcast::Receiver<CaptureEvent>,
    want: CaptureStatus,
) {
    wait_for_event(events, |event| {
        matches!(event, CaptureEvent::StatusChanged { status, .. } if *status == want)
    })
    .await;
}

/// Polls until the controller reports `want` and `check` holds.
pub async fn wait_until<F>(controller: &CaptureStreamController, want: CaptureStatus, check: F)
where
    F: Fn() -> bool,
{
    for _ in 0..200 {
        if controller.status().await == want && check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "controller never reached {want}; last status={}",
        controller.status().await
    );
}

pub fn drain_statuses(events: &mut broadcast::Receiver<CaptureEvent>) -> Vec<CaptureStatus> {
    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CaptureEvent::StatusChanged { status, .. } = event {
            statuses.push(status);
        }
    }
    statuses
}
