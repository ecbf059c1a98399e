//! Accelerator string parsing.
//!
//! An accelerator is zero or more modifiers followed by exactly one key,
//! joined with `+`: `"Ctrl+Shift+F5"`, `"Numpad7"`, `"Alt+/"`. Empty or
//! whitespace-only input means the slot is unbound.

use crate::keymap;
use crate::types::{Keycode, ModifierState};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Why an accelerator string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceleratorError {
    #[error("accelerator \"{0}\" contains an empty token")]
    EmptyToken(String),
    #[error("accelerator \"{0}\" has no key, only modifiers")]
    MissingKey(String),
    #[error("accelerator \"{accelerator}\" names more than one key (\"{first}\" and \"{second}\")")]
    MultipleKeys {
        accelerator: String,
        first: String,
        second: String,
    },
    #[error("unknown key \"{key}\" in accelerator \"{accelerator}\"")]
    UnknownKey { accelerator: String, key: String },
}

/// A parsed hotkey: required modifiers plus one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accelerator {
    pub modifiers: ModifierState,
    /// Canonical key name
    pub key: &'static str,
    pub keycode: Keycode,
    /// Keycode reported for the same key with NumLock off (keypad digits only)
    pub alt_keycode: Option<Keycode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modifier {
    Ctrl,
    Alt,
    Shift,
    Meta,
}

fn modifier_for(token: &str) -> Option<Modifier> {
    const MODIFIERS: &[(&str, Modifier)] = &[
        ("ctrl", Modifier::Ctrl),
        ("control", Modifier::Ctrl),
        ("alt", Modifier::Alt),
        ("option", Modifier::Alt),
        ("shift", Modifier::Shift),
        ("win", Modifier::Meta),
        ("meta", Modifier::Meta),
        ("super", Modifier::Meta),
        ("cmd", Modifier::Meta),
        ("command", Modifier::Meta),
    ];
    MODIFIERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
        .map(|&(_, m)| m)
}

impl Accelerator {
    /// Parse an accelerator string.
    ///
    /// Returns `Ok(None)` for empty or whitespace-only input. Modifier names
    /// are case-insensitive and may repeat; key names are case-insensitive
    /// and accept the aliases known to [`keymap`].
    pub fn parse(accel: &str) -> Result<Option<Self>, AcceleratorError> {
        if accel.trim().is_empty() {
            return Ok(None);
        }

        let mut modifiers = ModifierState::NONE;
        let mut key_token: Option<&str> = None;

        for raw in accel.split('+') {
            let token = raw.trim();
            if token.is_empty() {
                return Err(AcceleratorError::EmptyToken(accel.to_string()));
            }
            match modifier_for(token) {
                Some(Modifier::Ctrl) => modifiers.ctrl = true,
                Some(Modifier::Alt) => modifiers.alt = true,
                Some(Modifier::Shift) => modifiers.shift = true,
                Some(Modifier::Meta) => modifiers.meta = true,
                None => {
                    if let Some(first) = key_token {
                        return Err(AcceleratorError::MultipleKeys {
                            accelerator: accel.to_string(),
                            first: first.to_string(),
                            second: token.to_string(),
                        });
                    }
                    key_token = Some(token);
                }
            }
        }

        let Some(token) = key_token else {
            return Err(AcceleratorError::MissingKey(accel.to_string()));
        };

        let tables = keymap::tables();
        let (key, keycode) = tables
            .canonical_name(token)
            .and_then(|name| tables.keycode(name).map(|code| (name, code)))
            .ok_or_else(|| AcceleratorError::UnknownKey {
                accelerator: accel.to_string(),
                key: token.to_string(),
            })?;

        Ok(Some(Self {
            modifiers,
            key,
            keycode,
            alt_keycode: tables.numpad_alt_keycode(key),
        }))
    }

    /// Parse, treating any failure as unbound. Failures are logged.
    pub fn parse_lenient(accel: &str) -> Option<Self> {
        match Self::parse(accel) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring invalid hotkey: {}", e);
                None
            }
        }
    }

    /// True if `keycode` is this accelerator's key, with NumLock on or off.
    pub fn matches_keycode(&self, keycode: Keycode) -> bool {
        self.keycode == keycode || self.alt_keycode == Some(keycode)
    }

    /// True if the event's keycode and modifier state select this accelerator.
    /// Modifiers must match exactly.
    pub fn matches(&self, keycode: Keycode, modifiers: ModifierState) -> bool {
        self.matches_keycode(keycode) && self.modifiers == modifiers
    }
}

/// Join modifier tokens and a key name in canonical order.
pub fn format_chord(modifiers: ModifierState, key: &str) -> String {
    let mut out = String::with_capacity(24);
    for token in modifiers.tokens() {
        out.push_str(token);
        out.push('+');
    }
    out.push_str(key);
    out
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_chord(self.modifiers, self.key))
    }
}
