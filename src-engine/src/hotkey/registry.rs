//! The active set of parsed hotkey bindings.

use fe2cm_common::{Accelerator, Keycode, ModifierState};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Action run when a binding fires.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync>;

/// One registered hotkey: the parsed accelerator, its action and the time it
/// last fired.
pub struct Binding {
    accelerator: Accelerator,
    action: HotkeyCallback,
    /// `None` until the first fire, so the first qualifying event always fires
    last_fired: Mutex<Option<Instant>>,
}

impl Binding {
    pub fn new(accelerator: Accelerator, action: HotkeyCallback) -> Self {
        Self {
            accelerator,
            action,
            last_fired: Mutex::new(None),
        }
    }

    pub fn accelerator(&self) -> &Accelerator {
        &self.accelerator
    }

    pub fn action(&self) -> &HotkeyCallback {
        &self.action
    }

    pub fn matches(&self, keycode: Keycode, modifiers: ModifierState) -> bool {
        self.accelerator.matches(keycode, modifiers)
    }

    /// Claim a fire at `now` unless the binding fired less than `window` ago.
    pub fn try_fire(&self, now: Instant, window: Duration) -> bool {
        let mut last = match self.last_fired.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *last {
            Some(prev) if now.saturating_duration_since(prev) < window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("accelerator", &self.accelerator.to_string())
            .finish_non_exhaustive()
    }
}

/// An immutable, ordered list of bindings.
///
/// Registries are never edited in place. Reconfiguration builds a new one and
/// swaps it in whole.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse each accelerator and keep the ones that parse, in order.
    ///
    /// Empty accelerators are unbound; invalid ones are logged and skipped.
    pub fn build<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, HotkeyCallback)>,
        S: AsRef<str>,
    {
        let bindings = entries
            .into_iter()
            .filter_map(|(accel, action)| {
                let parsed = Accelerator::parse_lenient(accel.as_ref())?;
                debug!("[Hotkey] Registered {}", parsed);
                Some(Binding::new(parsed, action))
            })
            .collect();
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Bindings selected by this keycode and modifier state, with their
    /// registration index, in registration order.
    pub fn matching(
        &self,
        keycode: Keycode,
        modifiers: ModifierState,
    ) -> impl Iterator<Item = (usize, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.matches(keycode, modifiers))
    }
}
