//! Platform-agnostic keyboard hook interface.

use fe2cm_common::keymap::modifier;
use fe2cm_common::{KeyEvent, Keycode, ModifierState};
use std::sync::mpsc::{SyncSender, TrySendError};
use tracing::debug;

/// Platform-agnostic keyboard hook interface.
///
/// Implementations install a global, listen-only keyboard hook on a thread of
/// their own and push every key transition, translated to [`KeyEvent`], into
/// the sender they were started with. The hook callback must never block:
/// use [`forward_event`] rather than `send`.
pub trait HotkeyBackend: Send {
    /// Install the hook and start delivering events.
    ///
    /// Returns an error if:
    /// - The platform doesn't support global keyboard hooks
    /// - Required permissions are not granted (e.g., Accessibility on macOS)
    /// - The hook could not be installed
    /// - The backend is already running
    fn start(&mut self, sender: SyncSender<KeyEvent>) -> Result<(), String>;

    /// Remove the hook and join its thread. The sender passed to `start` is
    /// dropped before this returns.
    fn stop(&mut self);

    /// Check if the hook is currently installed.
    fn is_running(&self) -> bool;

    /// Check if the platform supports global keyboard hooks.
    fn is_available(&self) -> bool;

    /// Get a description of why hooks are unavailable, if applicable.
    fn unavailable_reason(&self) -> Option<String>;
}

/// Queue an event for the dispatcher without blocking the hook thread.
///
/// Returns `false` if the event was dropped.
pub fn forward_event(sender: &SyncSender<KeyEvent>, event: KeyEvent) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            debug!("[Hotkey] Event queue full, dropping {:?}", event);
            false
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

/// Tracks which modifier keys are held, left and right separately, from the
/// raw key transitions a hook sees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierTracker {
    held: u8,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn bit(keycode: Keycode) -> Option<u8> {
        modifier::ALL
            .iter()
            .position(|&m| m == keycode)
            .map(|i| 1 << i)
    }

    /// Record a transition. Returns `true` if `keycode` is a modifier.
    pub fn update(&mut self, keycode: Keycode, is_down: bool) -> bool {
        let Some(bit) = Self::bit(keycode) else {
            return false;
        };
        if is_down {
            self.held |= bit;
        } else {
            self.held &= !bit;
        }
        true
    }

    fn held(&self, a: Keycode, b: Keycode) -> bool {
        let mask = Self::bit(a).unwrap_or(0) | Self::bit(b).unwrap_or(0);
        self.held & mask != 0
    }

    pub fn state(&self) -> ModifierState {
        ModifierState {
            ctrl: self.held(modifier::CONTROL_LEFT, modifier::CONTROL_RIGHT),
            alt: self.held(modifier::ALT_LEFT, modifier::ALT_RIGHT),
            shift: self.held(modifier::SHIFT_LEFT, modifier::SHIFT_RIGHT),
            meta: self.held(modifier::META_LEFT, modifier::META_RIGHT),
        }
    }

    /// Forget all held modifiers, e.g. after the hook was reinstalled.
    pub fn reset(&mut self) {
        self.held = 0;
    }

    /// Apply a transition and build the event to forward.
    ///
    /// The modifier state reflects the key itself for modifier presses, so
    /// pressing Ctrl reports `ctrl: true`.
    pub fn event(&mut self, keycode: Keycode, is_down: bool) -> KeyEvent {
        self.update(keycode, is_down);
        let modifiers = self.state();
        if is_down {
            KeyEvent::down(keycode, modifiers)
        } else {
            KeyEvent::up(keycode, modifiers)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_tracker_left_and_right_are_independent() {
        let mut tracker = ModifierTracker::new();
        assert!(tracker.update(modifier::CONTROL_LEFT, true));
        assert!(tracker.update(modifier::CONTROL_RIGHT, true));
        assert!(tracker.state().ctrl);

        tracker.update(modifier::CONTROL_LEFT, false);
        assert!(tracker.state().ctrl, "right ctrl still held");

        tracker.update(modifier::CONTROL_RIGHT, false);
        assert!(tracker.state().is_empty());
    }

    #[test]
    fn test_tracker_ignores_regular_keys() {
        let mut tracker = ModifierTracker::new();
        assert!(!tracker.update(Keycode(0x001E), true));
        assert_eq!(tracker.state(), ModifierState::NONE);
    }

    #[test]
    fn test_tracker_builds_events() {
        let mut tracker = ModifierTracker::new();
        tracker.event(modifier::SHIFT_RIGHT, true);
        tracker.event(modifier::META_LEFT, true);
        let event = tracker.event(Keycode(0x003F), true);
        assert!(event.is_down());
        assert_eq!(event.modifiers, ModifierState::new(false, false, true, true));

        tracker.reset();
        let event = tracker.event(Keycode(0x003F), false);
        assert!(!event.is_down());
        assert!(event.modifiers.is_empty());
    }

    #[test]
    fn test_forward_event_drops_when_full() {
        let (tx, rx) = mpsc::sync_channel(1);
        let event = KeyEvent::down(Keycode(0x001E), ModifierState::NONE);
        assert!(forward_event(&tx, event));
        assert!(!forward_event(&tx, event));
        assert_eq!(rx.try_recv().unwrap(), event);

        drop(rx);
        assert!(!forward_event(&tx, event));
    }
}
