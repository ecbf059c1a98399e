//! Capture mode: recording a new hotkey from the live keyboard.
//!
//! While armed, the dispatcher stops matching bindings and instead turns each
//! non-modifier key press into an accelerator string for the UI to record.

use fe2cm_common::accelerator::format_chord;
use fe2cm_common::{keymap, KeyEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// On/off switch consulted by the dispatcher on every event.
///
/// Last call wins; arming twice is the same as arming once.
#[derive(Debug, Default)]
pub struct CaptureMode {
    armed: AtomicBool,
}

impl CaptureMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn start(&self) {
        if !self.armed.swap(true, Ordering::SeqCst) {
            debug!("[Hotkey] Capture mode armed");
        }
    }

    pub fn stop(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            debug!("[Hotkey] Capture mode disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

/// Accelerator string for a key press, as recorded in capture mode.
///
/// Returns `None` for modifier-only presses and keycodes with no key name.
/// NumLock-off keypad codes resolve to the same name as NumLock-on codes.
pub fn accelerator_for_event(event: &KeyEvent) -> Option<String> {
    let tables = keymap::tables();
    if tables.is_modifier(event.keycode) {
        return None;
    }
    let name = tables.resolve(event.keycode)?;
    Some(format_chord(event.modifiers, name))
}

/// What the UI should do with a captured accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedHotkey {
    /// Store this accelerator in the field being edited
    Set(String),
    /// Unbind the field
    Clear,
}

impl CapturedHotkey {
    /// A bare Backspace, Delete or Esc clears the binding.
    pub fn from_accelerator(accel: &str) -> Self {
        match accel {
            "Backspace" | "Delete" | "Esc" => CapturedHotkey::Clear,
            _ => CapturedHotkey::Set(accel.to_string()),
        }
    }

    /// The value to store, empty when clearing.
    pub fn value(&self) -> &str {
        match self {
            CapturedHotkey::Set(accel) => accel,
            CapturedHotkey::Clear => "",
        }
    }
}
