//! Keeps a camera overlay in step with slide navigation.
//!
//! [`CaptureStreamController`] owns the capture lifecycle; [`NavigationSync`]
//! turns host navigation into start/stop calls on it.

pub mod config;
pub mod controller;
pub mod device_enumerator;
pub mod navigation_sync;
pub mod slide_style;

pub use config::{load_config, OverlayConfig};
pub use controller::{CaptureEvent, CaptureSnapshot, CaptureStreamController, ControllerError};
pub use device_enumerator::DeviceEnumerator;
pub use navigation_sync::{NavigationSync, SyncCommand};
pub use slide_style::{SlideStyleResolver, SlideTree};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
