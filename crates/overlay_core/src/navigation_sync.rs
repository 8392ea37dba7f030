use std::sync::Arc;

use capture_integration::{DisplaySurface, PresentationHost};
use shared::{
    domain::{CaptureStatus, SlideId, StyleTag},
    protocol::{HostEvent, KeyBinding},
};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::{
    config::OverlayConfig,
    controller::{CaptureEvent, CaptureStreamController, ControllerError},
    slide_style::SlideStyleResolver,
};

/// Work for [`NavigationSync::run`]. Everything that touches the controller
/// goes through this so the loop stays the only caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    Host(HostEvent),
    /// Clear a capture error and re-apply the current slide.
    Retry,
}

impl From<HostEvent> for SyncCommand {
    fn from(event: HostEvent) -> Self {
        SyncCommand::Host(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Toggle,
    CycleDevice,
}

struct SyncState {
    enabled: bool,
    key_bindings_registered: bool,
    current_slide: Option<SlideId>,
    key_actions: Vec<(u32, KeyAction)>,
}

/// Recomputes overlay visibility from scratch on every host event and drives
/// the controller to match.
pub struct NavigationSync {
    controller: Arc<CaptureStreamController>,
    host: Arc<dyn PresentationHost>,
    resolver: Arc<dyn SlideStyleResolver>,
    surface: Arc<dyn DisplaySurface>,
    base_class: String,
    toggle_key_code: u32,
    cycle_key_code: u32,
    state: Mutex<SyncState>,
}

impl NavigationSync {
    pub fn new(
        controller: Arc<CaptureStreamController>,
        host: Arc<dyn PresentationHost>,
        resolver: Arc<dyn SlideStyleResolver>,
        surface: Arc<dyn DisplaySurface>,
        config: &OverlayConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            controller,
            host,
            resolver,
            surface,
            base_class: config.base_class.clone(),
            toggle_key_code: config.toggle_key_code,
            cycle_key_code: config.cycle_key_code,
            state: Mutex::new(SyncState {
                enabled: config.enabled,
                key_bindings_registered: false,
                current_slide: None,
                key_actions: Vec::new(),
            }),
        })
    }

    pub fn controller(&self) -> &Arc<CaptureStreamController> {
        &self.controller
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.enabled
    }

    /// Puts the surface in its idle state and runs the ready path right away
    /// if the host is already up.
    pub async fn attach(&self) {
        self.surface.set_style_class(&self.base_class);
        self.surface.load();
        if self.host.is_ready() {
            self.on_ready().await;
        } else {
            debug!("sync: host not ready, waiting for ready event");
        }
    }

    pub async fn on_ready(&self) {
        self.register_key_bindings().await;
        let slide = self.host.current_slide();
        self.sync_slide(slide).await;
    }

    pub async fn on_navigate(&self, previous: Option<SlideId>, current: SlideId) {
        debug!(
            "sync: slide changed previous={:?} current={}",
            previous.map(|slide| slide.0),
            current.0
        );
        self.sync_slide(Some(current)).await;
    }

    pub async fn toggle(&self) {
        let enabled = {
            let mut state = self.state.lock().await;
            state.enabled = !state.enabled;
            state.enabled
        };
        info!("sync: overlay toggled enabled={enabled}");
        self.resync_current().await;
    }

    pub async fn cycle_device(&self) {
        self.controller.switch_device().await;
    }

    /// Clears a capture error and re-applies the current slide, which starts a
    /// fresh acquisition if the slide still wants the overlay.
    pub async fn retry(&self) -> Result<(), ControllerError> {
        self.controller.reset().await?;
        self.resync_current().await;
        Ok(())
    }

    pub async fn handle_key(&self, key_code: u32) {
        let action = {
            let state = self.state.lock().await;
            state
                .key_actions
                .iter()
                .find(|(code, _)| *code == key_code)
                .map(|(_, action)| *action)
        };

        match action {
            Some(KeyAction::Toggle) => self.toggle().await,
            Some(KeyAction::CycleDevice) => self.cycle_device().await,
            None => debug!("sync: unbound key ignored key_code={key_code}"),
        }
    }

    pub async fn handle_host_event(&self, event: HostEvent) {
        match event {
            HostEvent::Ready => self.on_ready().await,
            HostEvent::SlideChanged {
                previous_slide,
                current_slide,
            } => self.on_navigate(previous_slide, current_slide).await,
            HostEvent::KeyPressed { key_code } => self.handle_key(key_code).await,
        }
    }

    pub async fn handle_command(&self, command: SyncCommand) {
        match command {
            SyncCommand::Host(event) => self.handle_host_event(event).await,
            SyncCommand::Retry => {
                if let Err(err) = self.retry().await {
                    warn!("sync: retry skipped error={err}");
                }
            }
        }
    }

    /// Event loop: commands in arrival order, plus a resync whenever the
    /// controller throws away an acquisition that a stop or switch overtook.
    /// Returns once the sending side of the channel closes.
    pub async fn run<C>(self: Arc<Self>, mut commands: mpsc::Receiver<C>)
    where
        C: Into<SyncCommand> + Send + 'static,
    {
        let mut capture_events = self.controller.subscribe_events();
        self.attach().await;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("sync: command channel closed");
                        break;
                    };
                    self.handle_command(command.into()).await;
                }
                event = capture_events.recv() => {
                    if !self.handle_capture_event(event).await {
                        break;
                    }
                }
            }
        }
    }

    /// Returns `false` once the controller's event channel is gone.
    async fn handle_capture_event(
        &self,
        event: Result<CaptureEvent, broadcast::error::RecvError>,
    ) -> bool {
        match event {
            Ok(CaptureEvent::AcquisitionDiscarded { generation }) => {
                debug!("sync: resyncing after discarded acquisition generation={generation}");
                self.resync_current().await;
            }
            Ok(CaptureEvent::AcquisitionFailed(err)) => {
                warn!("sync: overlay unavailable error={err}");
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // A skipped discard would leave the overlay off on a tagged slide.
                warn!("sync: capture events lagged skipped={skipped}");
                self.resync_current().await;
            }
            // Unreachable while `self` holds the controller.
            Err(broadcast::error::RecvError::Closed) => return false,
        }
        true
    }

    async fn register_key_bindings(&self) {
        let mut state = self.state.lock().await;
        if state.key_bindings_registered {
            return;
        }
        state.key_bindings_registered = true;

        let bindings = [
            (
                KeyAction::Toggle,
                KeyBinding {
                    key_code: self.toggle_key_code,
                    key: key_label(self.toggle_key_code),
                    description: "Toggle camera overlay".into(),
                },
            ),
            (
                KeyAction::CycleDevice,
                KeyBinding {
                    key_code: self.cycle_key_code,
                    key: key_label(self.cycle_key_code),
                    description: "Switch camera".into(),
                },
            ),
        ];

        for (action, binding) in bindings {
            let key_code = binding.key_code;
            match self.host.register_key_binding(binding) {
                Ok(()) => state.key_actions.push((key_code, action)),
                Err(err) => warn!("sync: key binding rejected key_code={key_code} error={err}"),
            }
        }
    }

    async fn resync_current(&self) {
        let slide = self.state.lock().await.current_slide;
        self.sync_slide(slide.or_else(|| self.host.current_slide()))
            .await;
    }

    async fn sync_slide(&self, slide: Option<SlideId>) {
        let enabled = {
            let mut state = self.state.lock().await;
            if slide.is_some() {
                state.current_slide = slide;
            }
            state.enabled
        };

        let style = slide
            .map(|slide| self.resolver.resolve_style(slide))
            .unwrap_or_default();

        match style {
            StyleTag::Tagged(tag) if enabled => {
                self.controller.start().await;
                self.surface
                    .set_style_class(&format!("{} {}", self.base_class, tag));
            }
            _ => {
                let status = self.controller.status().await;
                if matches!(status, CaptureStatus::Active | CaptureStatus::Pending) {
                    self.controller.stop().await;
                    self.surface.set_style_class(&self.base_class);
                }
            }
        }
    }
}

fn key_label(key_code: u32) -> String {
    char::from_u32(key_code)
        .filter(char::is_ascii_alphanumeric)
        .map(|key| key.to_string())
        .unwrap_or_else(|| format!("#{key_code}"))
}

#[cfg(test)]
#[path = "tests/navigation_sync_tests.rs"]
mod tests;
