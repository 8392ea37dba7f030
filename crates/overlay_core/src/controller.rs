use std::sync::Arc;

use capture_integration::{CaptureHandle, DisplaySurface, MediaDevices};
use shared::{
    domain::{CaptureDeviceId, CaptureStatus},
    error::CaptureError,
    protocol::CaptureConstraints,
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::device_enumerator::DeviceEnumerator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    StatusChanged {
        status: CaptureStatus,
        generation: u64,
    },
    DeviceSwitched(CaptureDeviceId),
    /// A completed acquisition was dropped because a stop or switch overtook it.
    AcquisitionDiscarded {
        generation: u64,
    },
    AcquisitionFailed(CaptureError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub status: CaptureStatus,
    pub current_device_id: Option<CaptureDeviceId>,
    pub device_list: Vec<CaptureDeviceId>,
    pub generation: u64,
    pub has_handle: bool,
    pub persistent: bool,
    pub last_error: Option<CaptureError>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("reset is only allowed from the error state (status={status})")]
    ResetNotAllowed { status: CaptureStatus },
}

struct CaptureState {
    status: CaptureStatus,
    handle: Option<Arc<dyn CaptureHandle>>,
    device_list: Vec<CaptureDeviceId>,
    device_list_queried: bool,
    current_device_id: Option<CaptureDeviceId>,
    generation: u64,
    last_error: Option<CaptureError>,
}

struct PendingAcquisition {
    generation: u64,
    constraints: CaptureConstraints,
}

/// Owns the single capture handle and drives it through
/// `Disabled -> Pending -> Active` and back.
///
/// Acquisition runs in a spawned task. Its result is accepted only if the
/// generation it was issued under is still current; anything older is
/// released on arrival.
pub struct CaptureStreamController {
    media: Arc<dyn MediaDevices>,
    surface: Arc<dyn DisplaySurface>,
    enumerator: DeviceEnumerator,
    persistent: bool,
    inner: Mutex<CaptureState>,
    events: broadcast::Sender<CaptureEvent>,
}

impl CaptureStreamController {
    pub fn new(
        media: Arc<dyn MediaDevices>,
        surface: Arc<dyn DisplaySurface>,
        persistent: bool,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            enumerator: DeviceEnumerator::new(Arc::clone(&media)),
            media,
            surface,
            persistent,
            inner: Mutex::new(CaptureState {
                status: CaptureStatus::Disabled,
                handle: None,
                device_list: Vec::new(),
                device_list_queried: false,
                current_device_id: None,
                generation: 0,
                last_error: None,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> CaptureStatus {
        self.inner.lock().await.status
    }

    pub async fn snapshot(&self) -> CaptureSnapshot {
        let state = self.inner.lock().await;
        CaptureSnapshot {
            status: state.status,
            current_device_id: state.current_device_id.clone(),
            device_list: state.device_list.clone(),
            generation: state.generation,
            has_handle: state.handle.is_some(),
            persistent: self.persistent,
            last_error: state.last_error.clone(),
        }
    }

    pub async fn start(self: &Arc<Self>) {
        let acquisition = {
            let mut state = self.inner.lock().await;
            if state.status != CaptureStatus::Disabled {
                debug!("capture: start ignored status={}", state.status);
                return;
            }

            if let Some(handle) = state.handle.clone() {
                state.generation += 1;
                state.status = CaptureStatus::Active;
                self.bind_surface(handle);
                info!(
                    "capture: resumed warm standby device={:?}",
                    state.current_device_id
                );
                self.emit_status(&state);
                return;
            }

            self.begin_acquisition(&mut state)
        };

        self.spawn_acquisition(acquisition);
    }

    pub async fn stop(&self) {
        let mut state = self.inner.lock().await;
        match state.status {
            CaptureStatus::Active => {
                self.unbind_surface();
                if self.persistent {
                    info!("capture: stopped, handle retained for warm standby");
                } else if let Some(handle) = state.handle.take() {
                    handle.stop_tracks();
                    info!("capture: stopped and released device={:?}", handle.device_id());
                }
                state.status = CaptureStatus::Disabled;
                self.emit_status(&state);
            }
            CaptureStatus::Pending => {
                // The in-flight request keeps running; bumping the generation
                // makes its completion stale.
                state.generation += 1;
                info!(
                    "capture: cancelled in-flight acquisition generation={}",
                    state.generation
                );
            }
            status => debug!("capture: stop ignored status={status}"),
        }
    }

    /// Moves to the next known video input, wrapping around.
    pub async fn switch_device(self: &Arc<Self>) {
        self.ensure_device_list().await;

        let acquisition = {
            let mut state = self.inner.lock().await;
            if state.device_list.len() < 2 {
                debug!(
                    "capture: switch ignored known_devices={}",
                    state.device_list.len()
                );
                return;
            }

            let next = next_device(&state.device_list, state.current_device_id.as_ref());
            if state.current_device_id.as_ref() == Some(&next) {
                return;
            }

            let was_active = state.status == CaptureStatus::Active;
            state.generation += 1;
            if let Some(handle) = state.handle.take() {
                if was_active {
                    self.unbind_surface();
                }
                handle.stop_tracks();
            }
            info!(
                "capture: switching device from={:?} to={} status={}",
                state.current_device_id, next, state.status
            );
            state.current_device_id = Some(next.clone());
            let _ = self.events.send(CaptureEvent::DeviceSwitched(next));

            if was_active {
                Some(self.begin_acquisition(&mut state))
            } else {
                None
            }
        };

        if let Some(acquisition) = acquisition {
            self.spawn_acquisition(acquisition);
        }
    }

    pub async fn reset(&self) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        if state.status != CaptureStatus::Error {
            return Err(ControllerError::ResetNotAllowed {
                status: state.status,
            });
        }

        state.last_error = None;
        state.status = CaptureStatus::Disabled;
        info!("capture: error cleared, ready to retry");
        self.emit_status(&state);
        Ok(())
    }

    async fn ensure_device_list(&self) {
        {
            let mut state = self.inner.lock().await;
            if state.device_list_queried {
                return;
            }
            state.device_list_queried = true;
        }

        match self.enumerator.list_video_input_devices().await {
            Ok(devices) => {
                info!("capture: device list loaded count={}", devices.len());
                self.inner.lock().await.device_list = devices;
            }
            Err(err) => {
                warn!("capture: device cycling disabled error={err}");
            }
        }
    }

    fn begin_acquisition(&self, state: &mut CaptureState) -> PendingAcquisition {
        state.generation += 1;
        state.status = CaptureStatus::Pending;
        self.emit_status(state);
        debug!(
            "capture: acquiring device={:?} generation={}",
            state.current_device_id, state.generation
        );

        PendingAcquisition {
            generation: state.generation,
            constraints: CaptureConstraints::video_only(state.current_device_id.clone()),
        }
    }

    fn spawn_acquisition(self: &Arc<Self>, acquisition: PendingAcquisition) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let result = controller
                .media
                .get_user_media(acquisition.constraints)
                .await;
            controller
                .complete_acquisition(acquisition.generation, result)
                .await;
        });
    }

    async fn complete_acquisition(
        &self,
        generation: u64,
        result: Result<Arc<dyn CaptureHandle>, CaptureError>,
    ) {
        let mut state = self.inner.lock().await;
        let stale = generation != state.generation || state.status != CaptureStatus::Pending;

        if stale {
            match result {
                Ok(handle) => {
                    handle.stop_tracks();
                    info!(
                        "capture: acquisition discarded generation={generation} current={}",
                        state.generation
                    );
                }
                Err(err) => {
                    debug!(
                        "capture: stale acquisition failure ignored generation={generation} error={err}"
                    );
                }
            }
            let _ = self
                .events
                .send(CaptureEvent::AcquisitionDiscarded { generation });
            if state.status == CaptureStatus::Pending {
                state.status = CaptureStatus::Disabled;
                self.emit_status(&state);
            }
            return;
        }

        match result {
            Ok(handle) => {
                if let Some(granted) = handle.device_id() {
                    state.current_device_id = Some(granted);
                }
                state.handle = Some(Arc::clone(&handle));
                state.status = CaptureStatus::Active;
                self.bind_surface(handle);
                info!(
                    "capture: active device={:?} generation={generation}",
                    state.current_device_id
                );
                self.emit_status(&state);
            }
            Err(err) => {
                error!("capture: acquisition failed generation={generation} error={err}");
                state.last_error = Some(err.clone());
                state.status = CaptureStatus::Error;
                let _ = self.events.send(CaptureEvent::AcquisitionFailed(err));
                self.emit_status(&state);
            }
        }
    }

    fn bind_surface(&self, handle: Arc<dyn CaptureHandle>) {
        self.surface.bind(handle);
        self.surface.play();
    }

    fn unbind_surface(&self) {
        self.surface.unbind();
        self.surface.load();
    }

    fn emit_status(&self, state: &CaptureState) {
        let _ = self.events.send(CaptureEvent::StatusChanged {
            status: state.status,
            generation: state.generation,
        });
    }
}

fn next_device(devices: &[CaptureDeviceId], current: Option<&CaptureDeviceId>) -> CaptureDeviceId {
    let position = current.and_then(|current| devices.iter().position(|id| id == current));
    match position {
        Some(index) => devices[(index + 1) % devices.len()].clone(),
        None => devices[0].clone(),
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
