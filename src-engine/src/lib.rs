//! FE2CM Engine
//!
//! Global hotkey engine for FE2CM. Installs a platform keyboard hook, matches
//! key presses against the configured accelerators, records new accelerators
//! in capture mode and drives the volume controls behind each hotkey.
//!
//! This is a library crate consumed by the GUI and the `fe2cm` CLI. Both
//! construct a [`HotkeyEngine`], wire it to [`AudioControls`] and run it
//! under a [`HotkeyService`].

pub mod config;
pub mod controls;
pub mod events;
pub mod hotkey;
pub mod logging;

pub use controls::AudioControls;
pub use events::{EventBroadcaster, UiEvent};
pub use hotkey::{HotkeyEngine, HotkeyService};

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A running engine: controls, hotkey dispatch and the keyboard hook.
pub struct Engine {
    pub controls: Arc<AudioControls>,
    pub service: HotkeyService,
}

impl Engine {
    pub fn hotkeys(&self) -> &Arc<HotkeyEngine> {
        self.service.engine()
    }

    /// Re-read the hotkey settings from the controls and rebind.
    pub fn reload_hotkeys(&self) -> usize {
        self.controls.register_hotkeys(self.hotkeys())
    }
}

/// Load preferences from `config_path`, bind the hotkeys and start listening.
///
/// A hook that cannot be installed is logged and leaves hotkeys unavailable;
/// the engine is still returned so the rest of the application can run.
pub fn init(config_path: &Path, events: EventBroadcaster) -> Engine {
    info!("FE2CM Engine starting (pid: {})...", std::process::id());
    info!("Runtime mode: {:?}", fe2cm_common::runtime_mode());

    let controls = AudioControls::load(config_path, events);
    let hotkeys = Arc::new(HotkeyEngine::new());
    hotkeys.set_capture_sink(controls.capture_sink());

    let mut engine = Engine {
        controls,
        service: HotkeyService::new(hotkeys),
    };
    engine.reload_hotkeys();

    if let Err(e) = engine.service.start() {
        warn!("Continuing without global hotkeys: {}", e);
    }

    info!("Engine initialization complete");
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe2cm_common::{keymap, Config, HotkeyAction, KeyEvent, ModifierState};

    #[test]
    fn test_reload_hotkeys_picks_up_new_binding() {
        let controls = AudioControls::new(Config::default(), None, EventBroadcaster::new());
        let engine = Engine {
            controls: controls.clone(),
            service: HotkeyService::new(Arc::new(HotkeyEngine::new())),
        };
        let mut rx = controls.events().subscribe();
        let f9 = keymap::keycode_for("F9").unwrap();

        engine.hotkeys().handle(&KeyEvent::down(f9, ModifierState::ctrl()));
        assert!(rx.try_recv().is_err());

        controls.set_hotkey(HotkeyAction::Mute, "Ctrl+F9");
        assert!(engine.reload_hotkeys() >= 1);
        engine.hotkeys().handle(&KeyEvent::down(f9, ModifierState::ctrl()));
        assert_eq!(rx.try_recv().unwrap(), UiEvent::ToggleMute);
    }
}
