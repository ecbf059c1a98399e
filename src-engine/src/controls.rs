//! Volume controls behind the hotkey actions.
//!
//! Holds the live preferences, applies volume changes, persists them and
//! tells the UI what changed.

use crate::config::{load_config_for_update, save_config_to};
use crate::events::{EventBroadcaster, UiEvent};
use crate::hotkey::{CaptureSink, HotkeyCallback, HotkeyEngine};
use fe2cm_common::config::MAX_VOLUME;
use fe2cm_common::{Config, DeathBehavior, HotkeyAction, LeaveBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Volume change per hotkey press.
pub const VOLUME_STEP: u8 = 10;

pub struct AudioControls {
    config: Mutex<Config>,
    /// Where changes are saved; `None` keeps them in memory
    path: Option<PathBuf>,
    events: EventBroadcaster,
}

impl AudioControls {
    pub fn new(config: Config, path: Option<PathBuf>, events: EventBroadcaster) -> Arc<Self> {
        Arc::new(Self {
            config: Mutex::new(config),
            path,
            events,
        })
    }

    /// Load preferences from `path` and announce them to the UI.
    ///
    /// If the file exists but cannot be read, defaults are used and changes
    /// stay in memory so the file is left as it was.
    pub fn load(path: &Path, events: EventBroadcaster) -> Arc<Self> {
        let (config, save_path) = match load_config_for_update(path) {
            Ok(config) => (config, Some(path.to_path_buf())),
            Err(_) => (Config::default(), None),
        };
        let controls = Self::new(config, save_path, events);
        controls.events.send(UiEvent::StateRestored);
        controls
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        match self.config.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Snapshot of the current preferences.
    pub fn config(&self) -> Config {
        self.lock().clone()
    }

    pub fn volume(&self) -> u8 {
        self.lock().volume
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    fn persist(&self, config: &Config) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = save_config_to(config, path) {
            warn!("Failed to save config to {:?}: {}", path, e);
        }
    }

    /// Set the volume, clamped to `0..=100`.
    ///
    /// A non-zero volume also becomes the volume restored on unmute.
    pub fn apply_volume(&self, volume: u8) {
        let volume = volume.min(MAX_VOLUME);
        {
            let mut config = self.lock();
            config.volume = volume;
            if volume > 0 {
                config.previous_volume = volume;
            }
            self.persist(&config);
        }
        debug!("Volume set to {}", volume);
        self.events.send(UiEvent::UpdateVolume(volume));
    }

    pub fn volume_up(&self) {
        let current = self.volume();
        self.apply_volume(current.saturating_add(VOLUME_STEP));
    }

    pub fn volume_down(&self) {
        let current = self.volume();
        self.apply_volume(current.saturating_sub(VOLUME_STEP));
    }

    pub fn toggle_mute(&self) {
        self.events.send(UiEvent::ToggleMute);
    }

    pub fn set_on_death(&self, behavior: DeathBehavior) {
        let mut config = self.lock();
        config.on_death = behavior;
        self.persist(&config);
    }

    pub fn set_on_leave(&self, behavior: LeaveBehavior) {
        let mut config = self.lock();
        config.on_leave = behavior;
        self.persist(&config);
    }

    /// Store a new accelerator for `action`. Call
    /// [`register_hotkeys`](Self::register_hotkeys) to apply it.
    pub fn set_hotkey(&self, action: HotkeyAction, accelerator: &str) {
        let mut config = self.lock();
        config.settings.hotkeys.set(action, accelerator);
        self.persist(&config);
    }

    /// Callback that performs `action` on these controls.
    pub fn action_for(self: &Arc<Self>, action: HotkeyAction) -> HotkeyCallback {
        let controls = Arc::clone(self);
        match action {
            HotkeyAction::Mute => Arc::new(move || controls.toggle_mute()),
            HotkeyAction::VolUp => Arc::new(move || controls.volume_up()),
            HotkeyAction::VolDown => Arc::new(move || controls.volume_down()),
        }
    }

    /// Register the configured hotkeys with `engine`, replacing any
    /// previous bindings. Returns how many are bound.
    pub fn register_hotkeys(self: &Arc<Self>, engine: &HotkeyEngine) -> usize {
        let hotkeys = self.lock().settings.hotkeys.clone();
        let entries: Vec<(String, HotkeyCallback)> = hotkeys
            .bindings()
            .map(|(action, accel)| (accel.to_string(), self.action_for(action)))
            .collect();
        let count = engine.register_all(entries);
        info!("Bound {} of {} hotkey actions", count, HotkeyAction::ALL.len());
        count
    }

    /// Capture sink that forwards recorded accelerators to the UI.
    pub fn capture_sink(&self) -> CaptureSink {
        let events = self.events.clone();
        Arc::new(move |accel: String| events.send(UiEvent::HotkeyCaptured(accel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe2cm_common::{keymap, KeyEvent, ModifierState};

    fn in_memory(volume: u8) -> Arc<AudioControls> {
        let config = Config {
            volume,
            ..Config::default()
        };
        AudioControls::new(config, None, EventBroadcaster::new())
    }

    #[test]
    fn test_volume_steps_clamp() {
        let controls = in_memory(95);
        controls.volume_up();
        assert_eq!(controls.volume(), 100);
        controls.volume_up();
        assert_eq!(controls.volume(), 100);

        let controls = in_memory(5);
        controls.volume_down();
        assert_eq!(controls.volume(), 0);
        controls.volume_down();
        assert_eq!(controls.volume(), 0);
    }

    #[test]
    fn test_previous_volume_tracks_nonzero_only() {
        let controls = in_memory(40);
        controls.apply_volume(30);
        assert_eq!(controls.config().previous_volume, 30);
        controls.apply_volume(0);
        let config = controls.config();
        assert_eq!(config.volume, 0);
        assert_eq!(config.previous_volume, 30);
    }

    #[test]
    fn test_apply_volume_clamps_and_broadcasts() {
        let controls = in_memory(50);
        let mut rx = controls.events().subscribe();
        controls.apply_volume(150);
        assert_eq!(controls.volume(), 100);
        assert_eq!(rx.try_recv().unwrap(), UiEvent::UpdateVolume(100));
    }

    #[test]
    fn test_changes_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe2-config.json");
        let controls = AudioControls::new(Config::default(), Some(path.clone()), EventBroadcaster::new());

        controls.volume_down();
        controls.set_on_death(DeathBehavior::Disable);
        controls.set_on_leave(LeaveBehavior::Disable);

        let saved = Config::load_from(&path);
        assert_eq!(saved.volume, 60);
        assert_eq!(saved.on_death, DeathBehavior::Disable);
        assert_eq!(saved.on_leave, LeaveBehavior::Disable);
    }

    #[test]
    fn test_load_announces_state_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe2-config.json");
        std::fs::write(&path, r#"{ "volume": 20 }"#).unwrap();

        let events = EventBroadcaster::new();
        let mut rx = events.subscribe();
        let controls = AudioControls::load(&path, events);
        assert_eq!(controls.volume(), 20);
        assert_eq!(rx.try_recv().unwrap(), UiEvent::StateRestored);
    }

    #[test]
    fn test_unreadable_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe2-config.json");
        std::fs::write(&path, "{ broken").unwrap();

        let controls = AudioControls::load(&path, EventBroadcaster::new());
        controls.volume_up();
        assert_eq!(controls.volume(), 80);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[test]
    fn test_slider_string_volume_keeps_hotkeys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fe2-config.json");
        std::fs::write(
            &path,
            r#"{"volume": "55", "previousVolume": "55",
                "settings": {"hotkeys": {"mute": "Ctrl+M", "volUp": "", "volDown": ""}}}"#,
        )
        .unwrap();

        let controls = AudioControls::load(&path, EventBroadcaster::new());
        let engine = HotkeyEngine::new();
        assert_eq!(controls.register_hotkeys(&engine), 1);

        controls.volume_down();
        let saved = Config::load_from(&path);
        assert_eq!(saved.volume, 45);
        assert_eq!(saved.settings.hotkeys.mute, "Ctrl+M");
    }

    #[test]
    fn test_registered_hotkeys_drive_controls() {
        let mut config = Config::default();
        config.volume = 50;
        config.settings.hotkeys.vol_up = "Ctrl+Up".to_string();
        config.settings.hotkeys.mute = "Ctrl+M".to_string();
        let controls = AudioControls::new(config, None, EventBroadcaster::new());
        let mut rx = controls.events().subscribe();

        let engine = HotkeyEngine::new();
        assert_eq!(controls.register_hotkeys(&engine), 2);

        let up = keymap::keycode_for("Up").unwrap();
        engine.handle(&KeyEvent::down(up, ModifierState::ctrl()));
        assert_eq!(controls.volume(), 60);
        assert_eq!(rx.try_recv().unwrap(), UiEvent::UpdateVolume(60));

        let m = keymap::keycode_for("M").unwrap();
        engine.handle(&KeyEvent::down(m, ModifierState::ctrl()));
        assert_eq!(rx.try_recv().unwrap(), UiEvent::ToggleMute);
    }

    #[test]
    fn test_unbinding_mute_stops_it_firing() {
        let controls = in_memory(50);
        controls.set_hotkey(HotkeyAction::Mute, "Ctrl+M");
        let engine = HotkeyEngine::new();
        controls.register_hotkeys(&engine);

        controls.set_hotkey(HotkeyAction::Mute, "");
        assert_eq!(controls.register_hotkeys(&engine), 0);

        let mut rx = controls.events().subscribe();
        let m = keymap::keycode_for("M").unwrap();
        engine.handle(&KeyEvent::down(m, ModifierState::ctrl()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_capture_sink_broadcasts() {
        let controls = in_memory(50);
        let mut rx = controls.events().subscribe();
        let engine = HotkeyEngine::new();
        engine.set_capture_sink(controls.capture_sink());
        engine.start_capture();

        let f5 = keymap::keycode_for("F5").unwrap();
        engine.handle(&KeyEvent::down(f5, ModifierState::new(false, true, false, false)));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::HotkeyCaptured("Alt+F5".to_string())
        );
    }
}
