//! Shared types for FE2CM hotkey handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime mode - determines logging destination and verbosity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Development mode - console logging at debug level
    Development,
    /// Production mode - rolling log files
    #[default]
    Production,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Production => "production",
        }
    }
}

/// Physical key code as reported by a keyboard hook.
///
/// Values live in the libuiohook virtual-code space: the set-1 scan code for
/// ordinary keys, `0x0E00 | scan` or `0xE000 | scan` for extended keys, and
/// `0xEE00 | scan` for keypad keys pressed while NumLock is off. Platform
/// backends translate native codes into this space before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keycode(pub u16);

impl Keycode {
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// State of the four modifier keys, either held during an event or required
/// by a binding. Left and right variants are not distinguished.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierState {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl ModifierState {
    pub const NONE: ModifierState = ModifierState {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub const fn new(ctrl: bool, alt: bool, shift: bool, meta: bool) -> Self {
        Self {
            ctrl,
            alt,
            shift,
            meta,
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.alt || self.shift || self.meta)
    }

    /// Modifier tokens in canonical accelerator order.
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.ctrl, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.meta, "Win"),
        ]
        .into_iter()
        .filter_map(|(held, name)| held.then_some(name))
    }
}

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEventKind {
    Down,
    Up,
}

/// A single key transition delivered by a platform hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: Keycode,
    /// Modifiers held at the time of the transition
    pub modifiers: ModifierState,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    pub fn down(keycode: Keycode, modifiers: ModifierState) -> Self {
        Self {
            keycode,
            modifiers,
            kind: KeyEventKind::Down,
        }
    }

    pub fn up(keycode: Keycode, modifiers: ModifierState) -> Self {
        Self {
            keycode,
            modifiers,
            kind: KeyEventKind::Up,
        }
    }

    pub fn is_down(&self) -> bool {
        self.kind == KeyEventKind::Down
    }
}

/// Named action a hotkey can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HotkeyAction {
    /// Toggle mute in the UI
    Mute,
    /// Raise volume by one step
    VolUp,
    /// Lower volume by one step
    VolDown,
}

impl HotkeyAction {
    pub const ALL: [HotkeyAction; 3] = [HotkeyAction::Mute, HotkeyAction::VolUp, HotkeyAction::VolDown];

    /// Key used for this action in the `settings.hotkeys` map.
    pub fn config_key(&self) -> &'static str {
        match self {
            HotkeyAction::Mute => "mute",
            HotkeyAction::VolUp => "volUp",
            HotkeyAction::VolDown => "volDown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            HotkeyAction::Mute => "Toggle Mute",
            HotkeyAction::VolUp => "Volume Up",
            HotkeyAction::VolDown => "Volume Down",
        }
    }

    /// Look up an action by its configuration key (case-insensitive).
    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.config_key().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_tokens_in_canonical_order() {
        let mods = ModifierState::new(true, true, true, true);
        let tokens: Vec<_> = mods.tokens().collect();
        assert_eq!(tokens, vec!["Ctrl", "Alt", "Shift", "Win"]);
        assert_eq!(ModifierState::NONE.tokens().count(), 0);
        assert!(ModifierState::NONE.is_empty());
        assert!(!ModifierState::ctrl().is_empty());
    }

    #[test]
    fn test_action_config_keys() {
        assert_eq!(HotkeyAction::from_config_key("volUp"), Some(HotkeyAction::VolUp));
        assert_eq!(HotkeyAction::from_config_key("VOLDOWN"), Some(HotkeyAction::VolDown));
        assert_eq!(HotkeyAction::from_config_key("pause"), None);
    }

    #[test]
    fn test_keycode_display_is_hex() {
        assert_eq!(Keycode(0xEE4F).to_string(), "0xEE4F");
        assert_eq!(Keycode(0x001E).to_string(), "0x001E");
    }
}
