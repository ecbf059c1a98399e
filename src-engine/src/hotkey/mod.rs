//! Global hotkeys for the volume controls.
//!
//! This module provides platform-specific global keyboard hooks:
//! - macOS: CGEventTap API (requires Accessibility permission)
//! - Windows: `WH_KEYBOARD_LL` low-level keyboard hook
//! - Linux: Stub (not yet implemented)
//!
//! Hook threads only translate native events and queue them. A dispatcher
//! thread owned by [`HotkeyService`] feeds them to the [`HotkeyEngine`].

mod backend;
pub mod capture;
mod dispatcher;
mod registry;
mod scancode;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

pub use backend::{forward_event, HotkeyBackend, ModifierTracker};
pub use capture::{accelerator_for_event, CaptureMode, CapturedHotkey};
pub use dispatcher::{CaptureSink, Dispatch, FiredBinding, HotkeyEngine, DEBOUNCE_WINDOW};
pub use registry::{Binding, BindingRegistry, HotkeyCallback};
pub use scancode::keycode_from_scan;

use fe2cm_common::KeyEvent;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Capacity of the queue between the hook thread and the dispatcher.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Create the keyboard hook backend for this platform.
pub fn create_backend() -> Box<dyn HotkeyBackend> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacOSHotkeyBackend::new())
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsHotkeyBackend::new())
    }

    #[cfg(target_os = "linux")]
    {
        Box::new(linux::LinuxHotkeyBackend::new())
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        Box::new(UnsupportedBackend)
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
struct UnsupportedBackend;

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
impl HotkeyBackend for UnsupportedBackend {
    fn start(&mut self, _sender: mpsc::SyncSender<KeyEvent>) -> Result<(), String> {
        Err("Unsupported platform for global hotkeys".to_string())
    }

    fn stop(&mut self) {}

    fn is_running(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }

    fn unavailable_reason(&self) -> Option<String> {
        Some("Unsupported platform for global hotkeys".to_string())
    }
}

/// Check if macOS Accessibility permission is available.
///
/// Returns true on non-macOS platforms (permission not applicable).
pub fn check_accessibility_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        macos::check_accessibility_permission()
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

/// Request macOS Accessibility permission for this process.
///
/// On macOS this shows the system dialog asking the user to grant access.
/// Returns the current trust state, or true on other platforms.
pub fn request_accessibility_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        macos::request_accessibility_permission()
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}

/// Owns a keyboard hook and the thread that dispatches its events.
///
/// Idle until [`start`](Self::start) succeeds, listening until
/// [`stop`](Self::stop) or drop.
pub struct HotkeyService {
    engine: Arc<HotkeyEngine>,
    backend: Box<dyn HotkeyBackend>,
    dispatcher: Option<JoinHandle<()>>,
    last_error: Option<String>,
}

impl HotkeyService {
    /// Service over the platform backend.
    pub fn new(engine: Arc<HotkeyEngine>) -> Self {
        Self::with_backend(engine, create_backend())
    }

    pub fn with_backend(engine: Arc<HotkeyEngine>, backend: Box<dyn HotkeyBackend>) -> Self {
        Self {
            engine,
            backend,
            dispatcher: None,
            last_error: None,
        }
    }

    pub fn engine(&self) -> &Arc<HotkeyEngine> {
        &self.engine
    }

    /// Install the hook and start dispatching.
    ///
    /// A second call while listening does nothing. On failure the service
    /// stays idle and the reason is kept in [`last_error`](Self::last_error).
    pub fn start(&mut self) -> Result<(), String> {
        if self.is_listening() {
            debug!("[Hotkey] Service already listening");
            return Ok(());
        }

        let (sender, receiver) = mpsc::sync_channel::<KeyEvent>(EVENT_QUEUE_CAPACITY);

        if let Err(e) = self.backend.start(sender) {
            warn!("[Hotkey] Global hotkeys unavailable: {}", e);
            self.last_error = Some(e.clone());
            return Err(e);
        }

        let engine = self.engine.clone();
        let spawned = thread::Builder::new()
            .name("fe2cm-hotkey-dispatch".to_string())
            .spawn(move || run_dispatch_loop(engine, receiver));

        match spawned {
            Ok(handle) => {
                self.dispatcher = Some(handle);
                self.last_error = None;
                info!("[Hotkey] Listening for global hotkeys");
                Ok(())
            }
            Err(e) => {
                self.backend.stop();
                let msg = format!("Failed to spawn dispatcher thread: {}", e);
                error!("[Hotkey] {}", msg);
                self.last_error = Some(msg.clone());
                Err(msg)
            }
        }
    }

    /// Remove the hook and wait for queued events to drain.
    ///
    /// No action fires after this returns.
    pub fn stop(&mut self) {
        let Some(handle) = self.dispatcher.take() else {
            return;
        };

        info!("[Hotkey] Stopping hotkey service");
        self.backend.stop();

        // The backend dropped its sender, so the loop ends once drained
        if handle.join().is_err() {
            error!("[Hotkey] Dispatcher thread panicked");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Why the last start failed, if it did.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    pub fn unavailable_reason(&self) -> Option<String> {
        self.backend.unavailable_reason()
    }
}

impl Drop for HotkeyService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_dispatch_loop(engine: Arc<HotkeyEngine>, receiver: Receiver<KeyEvent>) {
    debug!("[Hotkey] Dispatcher thread started");
    for event in receiver {
        engine.handle(&event);
    }
    debug!("[Hotkey] Dispatcher thread exiting");
}
