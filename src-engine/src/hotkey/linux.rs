//! Linux hotkey backend stub.
//!
//! Global keyboard capture on Linux needs X11 record or evdev access,
//! neither of which is wired up yet. The backend reports itself unavailable.

use super::backend::HotkeyBackend;
use fe2cm_common::KeyEvent;
use std::sync::mpsc::SyncSender;

const UNAVAILABLE: &str = "Global hotkeys are not yet available on Linux";

/// Linux hotkey backend (stub implementation)
#[derive(Debug, Default)]
pub struct LinuxHotkeyBackend;

impl LinuxHotkeyBackend {
    pub fn new() -> Self {
        Self
    }
}

impl HotkeyBackend for LinuxHotkeyBackend {
    fn start(&mut self, _sender: SyncSender<KeyEvent>) -> Result<(), String> {
        Err(UNAVAILABLE.to_string())
    }

    fn stop(&mut self) {
        // No-op for stub
    }

    fn is_running(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }

    fn unavailable_reason(&self) -> Option<String> {
        Some(UNAVAILABLE.to_string())
    }
}
