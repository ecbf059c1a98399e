//! Matching key events against the registry and firing actions.

use super::capture::{accelerator_for_event, CaptureMode};
use super::registry::{BindingRegistry, HotkeyCallback};
use fe2cm_common::{Accelerator, KeyEvent};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Minimum time between two fires of the same binding.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Receives accelerators recorded in capture mode.
pub type CaptureSink = Arc<dyn Fn(String) + Send + Sync>;

/// A binding selected to fire for one event.
#[derive(Clone)]
pub struct FiredBinding {
    /// Position in the registry
    pub index: usize,
    pub accelerator: Accelerator,
    action: HotkeyCallback,
}

impl FiredBinding {
    pub fn invoke(&self) {
        (self.action)();
    }
}

impl fmt::Debug for FiredBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiredBinding")
            .field("index", &self.index)
            .field("accelerator", &self.accelerator.to_string())
            .finish()
    }
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Key-up, unknown key, no match, debounced, or modifier-only in capture mode
    Ignored,
    /// Capture mode produced this accelerator
    Captured(String),
    /// These bindings fired, in registration order
    Fired(Vec<FiredBinding>),
}

impl Dispatch {
    /// Registry indices of fired bindings, empty unless `Fired`.
    pub fn fired_indices(&self) -> Vec<usize> {
        match self {
            Dispatch::Fired(fired) => fired.iter().map(|f| f.index).collect(),
            _ => Vec::new(),
        }
    }
}

/// Binding registry plus capture switch: everything needed to decide what a
/// key event means.
pub struct HotkeyEngine {
    registry: Mutex<Arc<BindingRegistry>>,
    capture: Arc<CaptureMode>,
    capture_sink: Mutex<Option<CaptureSink>>,
}

impl HotkeyEngine {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Arc::new(BindingRegistry::new())),
            capture: CaptureMode::shared(),
            capture_sink: Mutex::new(None),
        }
    }

    /// Set where capture-mode accelerators are delivered.
    pub fn set_capture_sink(&self, sink: CaptureSink) {
        let mut slot = match self.capture_sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(sink);
    }

    /// Replace every binding. Returns how many accelerators parsed.
    ///
    /// The new registry is built before the lock is taken; in-flight events
    /// see either the old registry or the new one, never a mix.
    pub fn register_all<I, S>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (S, HotkeyCallback)>,
        S: AsRef<str>,
    {
        let registry = Arc::new(BindingRegistry::build(entries));
        let count = registry.len();
        let mut slot = match self.registry.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = registry;
        info!("[Hotkey] Registered {} hotkey(s)", count);
        count
    }

    /// Remove every binding.
    pub fn clear(&self) {
        self.register_all(std::iter::empty::<(&str, HotkeyCallback)>());
    }

    /// Snapshot of the current registry.
    pub fn registry(&self) -> Arc<BindingRegistry> {
        match self.registry.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn start_capture(&self) {
        self.capture.start();
    }

    pub fn stop_capture(&self) {
        self.capture.stop();
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_armed()
    }

    /// Decide what `event` means at time `now`.
    ///
    /// Updates the last-fired time of bindings that fire, but runs nothing.
    pub fn dispatch(&self, event: &KeyEvent, now: Instant) -> Dispatch {
        if !event.is_down() {
            return Dispatch::Ignored;
        }

        if self.capture.is_armed() {
            return match accelerator_for_event(event) {
                Some(accel) => Dispatch::Captured(accel),
                None => Dispatch::Ignored,
            };
        }

        let registry = self.registry();
        let fired: Vec<FiredBinding> = registry
            .matching(event.keycode, event.modifiers)
            .filter_map(|(index, binding)| {
                if !binding.try_fire(now, DEBOUNCE_WINDOW) {
                    debug!("[Hotkey] {} debounced", binding.accelerator());
                    return None;
                }
                Some(FiredBinding {
                    index,
                    accelerator: *binding.accelerator(),
                    action: binding.action().clone(),
                })
            })
            .collect();

        if fired.is_empty() {
            Dispatch::Ignored
        } else {
            Dispatch::Fired(fired)
        }
    }

    /// Dispatch `event` now and carry out the result.
    ///
    /// Fired actions run in registration order. A panicking action is logged
    /// and does not stop the actions after it.
    pub fn handle(&self, event: &KeyEvent) -> Dispatch {
        let outcome = self.dispatch(event, Instant::now());
        match &outcome {
            Dispatch::Ignored => {}
            Dispatch::Captured(accel) => {
                debug!("[Hotkey] Captured {}", accel);
                let sink = match self.capture_sink.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                if let Some(sink) = sink {
                    let accel = accel.clone();
                    if panic::catch_unwind(AssertUnwindSafe(|| sink(accel))).is_err() {
                        error!("[Hotkey] Capture sink panicked");
                    }
                }
            }
            Dispatch::Fired(fired) => {
                for binding in fired {
                    debug!("[Hotkey] {} fired", binding.accelerator);
                    if panic::catch_unwind(AssertUnwindSafe(|| binding.invoke())).is_err() {
                        error!("[Hotkey] Action for {} panicked", binding.accelerator);
                    }
                }
            }
        }
        outcome
    }
}

impl Default for HotkeyEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe2cm_common::keymap::{self, modifier};
    use fe2cm_common::{Keycode, ModifierState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, HotkeyCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let action = count_action(&count);
        (count, action)
    }

    fn key(name: &str) -> Keycode {
        keymap::keycode_for(name).unwrap()
    }

    fn down(name: &str, modifiers: ModifierState) -> KeyEvent {
        KeyEvent::down(key(name), modifiers)
    }

    const CTRL_SHIFT: ModifierState = ModifierState::new(true, false, true, false);

    #[test]
    fn test_debounce_window() {
        let engine = HotkeyEngine::new();
        let (_, action) = counter();
        engine.register_all([("Ctrl+M", action)]);
        let event = down("M", ModifierState::ctrl());
        let t0 = Instant::now();

        assert_eq!(engine.dispatch(&event, t0).fired_indices(), vec![0]);
        assert!(engine
            .dispatch(&event, t0 + Duration::from_millis(50))
            .fired_indices()
            .is_empty());

        let engine = HotkeyEngine::new();
        let (_, action) = counter();
        engine.register_all([("Ctrl+M", action)]);
        assert_eq!(engine.dispatch(&event, t0).fired_indices(), vec![0]);
        assert_eq!(
            engine
                .dispatch(&event, t0 + Duration::from_millis(350))
                .fired_indices(),
            vec![0]
        );
    }

    fn count_action(count: &Arc<AtomicUsize>) -> HotkeyCallback {
        let c = count.clone();
        Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_handle_debounces_rapid_presses() {
        let engine = HotkeyEngine::new();
        let (count, action) = counter();
        engine.register_all([("F9", action)]);
        let event = down("F9", ModifierState::NONE);

        engine.handle(&event);
        engine.handle(&event);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exact_modifier_match() {
        let engine = HotkeyEngine::new();
        let (_, action) = counter();
        engine.register_all([("Ctrl+F5", action)]);
        let t0 = Instant::now();

        assert!(matches!(engine.dispatch(&down("F5", CTRL_SHIFT), t0), Dispatch::Ignored));
        assert!(matches!(engine.dispatch(&down("F5", ModifierState::NONE), t0), Dispatch::Ignored));
        assert_eq!(engine.dispatch(&down("F5", ModifierState::ctrl()), t0).fired_indices(), vec![0]);
    }

    #[test]
    fn test_ctrl_shift_f5_scenario() {
        let engine = HotkeyEngine::new();
        let (_, action) = counter();
        engine.register_all([("Ctrl+Shift+F5", action)]);
        let t0 = Instant::now();

        assert!(matches!(engine.dispatch(&down("F5", ModifierState::ctrl()), t0), Dispatch::Ignored));
        assert_eq!(engine.dispatch(&down("F5", CTRL_SHIFT), t0).fired_indices(), vec![0]);
    }

    #[test]
    fn test_key_up_is_ignored() {
        let engine = HotkeyEngine::new();
        let (_, action) = counter();
        engine.register_all([("F5", action)]);
        let event = KeyEvent::up(key("F5"), ModifierState::NONE);
        assert!(matches!(engine.dispatch(&event, Instant::now()), Dispatch::Ignored));
    }

    #[test]
    fn test_unknown_keycode_is_ignored() {
        let engine = HotkeyEngine::new();
        let (_, action) = counter();
        engine.register_all([("F5", action)]);
        let event = KeyEvent::down(Keycode(0x7FFF), ModifierState::NONE);
        assert!(matches!(engine.dispatch(&event, Instant::now()), Dispatch::Ignored));
    }

    #[test]
    fn test_numlock_off_keycode_fires_numpad_binding() {
        let engine = HotkeyEngine::new();
        let (count, action) = counter();
        engine.register_all([("Numpad4", action)]);
        let alt = keymap::numpad_alt_keycode("Numpad4").unwrap();

        engine.handle(&KeyEvent::down(alt, ModifierState::NONE));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_capture_suppresses_dispatch() {
        let engine = HotkeyEngine::new();
        let (count, action) = counter();
        engine.register_all([("Ctrl+M", action)]);
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        engine.set_capture_sink(Arc::new(move |accel: String| sink.lock().unwrap().push(accel)));

        engine.start_capture();
        let outcome = engine.handle(&down("M", ModifierState::ctrl()));
        assert!(matches!(outcome, Dispatch::Captured(ref s) if s == "Ctrl+M"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(*captured.lock().unwrap(), vec!["Ctrl+M".to_string()]);

        engine.stop_capture();
        engine.handle(&down("M", ModifierState::ctrl()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_capture_ignores_modifier_only_press() {
        let engine = HotkeyEngine::new();
        engine.start_capture();
        let event = KeyEvent::down(modifier::CONTROL_LEFT, ModifierState::ctrl());
        assert!(matches!(engine.dispatch(&event, Instant::now()), Dispatch::Ignored));
    }

    #[test]
    fn test_capture_resolves_numlock_off_keypad() {
        let engine = HotkeyEngine::new();
        engine.start_capture();
        let alt = keymap::numpad_alt_keycode("Numpad2").unwrap();
        let outcome = engine.dispatch(&KeyEvent::down(alt, ModifierState::NONE), Instant::now());
        assert!(matches!(outcome, Dispatch::Captured(ref s) if s == "Numpad2"));
    }

    #[test]
    fn test_reregistration_replaces_bindings() {
        let engine = HotkeyEngine::new();
        let (count, action) = counter();
        engine.register_all([("Ctrl+M", action.clone())]);
        engine.register_all([("Ctrl+M", action)]);
        assert_eq!(engine.registry().len(), 1);

        engine.handle(&down("M", ModifierState::ctrl()));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unbinding_stops_action() {
        let engine = HotkeyEngine::new();
        let (count, action) = counter();
        engine.register_all([("Ctrl+M", action.clone())]);
        engine.register_all([("", action)]);
        assert!(engine.registry().is_empty());

        engine.handle(&down("M", ModifierState::ctrl()));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_chords_fire_in_order_and_debounce_independently() {
        let engine = HotkeyEngine::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = order.clone();
        let second = order.clone();
        engine.register_all([
            ("Alt+V", Arc::new(move || first.lock().unwrap().push(1)) as HotkeyCallback),
            ("alt+v", Arc::new(move || second.lock().unwrap().push(2)) as HotkeyCallback),
        ]);
        let event = down("V", ModifierState::new(false, true, false, false));

        engine.handle(&event);
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);

        // Fire only the second binding once more: its window restarts on its own.
        let registry = engine.registry();
        let t0 = Instant::now() + Duration::from_secs(1);
        let second_binding = registry.iter().nth(1).unwrap();
        assert!(second_binding.try_fire(t0, DEBOUNCE_WINDOW));
        let outcome = engine.dispatch(&event, t0 + Duration::from_millis(100));
        assert_eq!(outcome.fired_indices(), vec![0]);
    }

    #[test]
    fn test_panicking_action_does_not_stop_others() {
        let engine = HotkeyEngine::new();
        let (count, action) = counter();
        engine.register_all([
            ("F7", Arc::new(|| panic!("boom")) as HotkeyCallback),
            ("F7", action),
            ("F8", count_action(&count)),
        ]);

        engine.handle(&down("F7", ModifierState::NONE));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        engine.handle(&down("F8", ModifierState::NONE));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
