//! Preferences persistence for FE2CM.
//!
//! The preferences document is a camelCase JSON file in the user's
//! configuration directory. Missing fields take their defaults, so older or
//! hand-edited files load without migration. The hotkey engine only reads
//! `settings.hotkeys`; the rest is carried for the controls and front ends.

use directories::BaseDirs;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::accelerator::Accelerator;
use crate::types::HotkeyAction;

pub const DEFAULT_VOLUME: u8 = 70;
pub const MAX_VOLUME: u8 = 100;

/// What happens to the background music when the player dies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeathBehavior {
    #[default]
    QuietenBgm,
    StopBgm,
    Disable,
}

impl DeathBehavior {
    pub const ALL: [DeathBehavior; 3] = [
        DeathBehavior::QuietenBgm,
        DeathBehavior::StopBgm,
        DeathBehavior::Disable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeathBehavior::QuietenBgm => "Quieten BGM",
            DeathBehavior::StopBgm => "Stop BGM",
            DeathBehavior::Disable => "Disable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl From<String> for DeathBehavior {
    fn from(s: String) -> Self {
        Self::from_name(&s).unwrap_or_default()
    }
}

impl From<DeathBehavior> for String {
    fn from(b: DeathBehavior) -> Self {
        b.as_str().to_string()
    }
}

/// What happens to the background music when the player leaves a map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeaveBehavior {
    #[default]
    StopBgm,
    Disable,
}

impl LeaveBehavior {
    pub const ALL: [LeaveBehavior; 2] = [LeaveBehavior::StopBgm, LeaveBehavior::Disable];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveBehavior::StopBgm => "Stop BGM",
            LeaveBehavior::Disable => "Disable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl From<String> for LeaveBehavior {
    fn from(s: String) -> Self {
        Self::from_name(&s).unwrap_or_default()
    }
}

impl From<LeaveBehavior> for String {
    fn from(b: LeaveBehavior) -> Self {
        b.as_str().to_string()
    }
}

/// Saved main-window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Accelerator strings for the global hotkeys. Empty means unbound.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HotkeySettings {
    pub mute: String,
    pub vol_up: String,
    pub vol_down: String,
}

impl HotkeySettings {
    /// Accelerator for each action, in registration order.
    pub fn bindings(&self) -> impl Iterator<Item = (HotkeyAction, &str)> {
        HotkeyAction::ALL
            .into_iter()
            .map(move |action| (action, self.get(action)))
    }

    pub fn get(&self, action: HotkeyAction) -> &str {
        match action {
            HotkeyAction::Mute => &self.mute,
            HotkeyAction::VolUp => &self.vol_up,
            HotkeyAction::VolDown => &self.vol_down,
        }
    }

    pub fn set(&mut self, action: HotkeyAction, accelerator: impl Into<String>) {
        let slot = match action {
            HotkeyAction::Mute => &mut self.mute,
            HotkeyAction::VolUp => &mut self.vol_up,
            HotkeyAction::VolDown => &mut self.vol_down,
        };
        *slot = accelerator.into();
    }
}

/// Window and startup preferences plus hotkeys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auto_connect: bool,
    pub always_on_top: bool,
    pub start_minimized: bool,
    pub minimize_on_close: bool,
    pub hotkeys: HotkeySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_connect: true,
            always_on_top: false,
            start_minimized: false,
            minimize_on_close: true,
            hotkeys: HotkeySettings::default(),
        }
    }
}

/// The whole preferences document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub username: String,
    #[serde(deserialize_with = "deserialize_volume")]
    pub volume: u8,
    /// Last non-zero volume, restored when unmuting
    #[serde(deserialize_with = "deserialize_volume")]
    pub previous_volume: u8,
    pub on_death: DeathBehavior,
    pub on_leave: LeaveBehavior,
    pub window_bounds: Option<WindowBounds>,
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            volume: DEFAULT_VOLUME,
            previous_volume: DEFAULT_VOLUME,
            on_death: DeathBehavior::default(),
            on_leave: LeaveBehavior::default(),
            window_bounds: None,
            settings: Settings::default(),
        }
    }
}

/// Volume as written to disk: a number, or the slider's string value.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVolume {
    Num(f64),
    Str(String),
}

/// Accept a JSON number or numeric string and clamp it into the volume range.
///
/// Strings are read like `parseInt`: leading digits after an optional sign,
/// anything after them ignored. A string with no leading digits gives the
/// default volume.
fn deserialize_volume<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let volume = match Option::<RawVolume>::deserialize(deserializer)? {
        None => 0,
        Some(RawVolume::Num(v)) => clamp_volume(v),
        Some(RawVolume::Str(s)) => parse_leading_int(&s).map_or(DEFAULT_VOLUME, clamp_volume),
    };
    Ok(volume)
}

/// Leading integer of `s`, ignoring surrounding text (`" 55px"` is 55).
fn parse_leading_int(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value: f64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Clamp a possibly out-of-range volume into `0..=100`.
pub fn clamp_volume(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, MAX_VOLUME as f64) as u8
}

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "volume",
    "onDeath",
    "onLeave",
    "hotkeys.mute",
    "hotkeys.volUp",
    "hotkeys.volDown",
];

impl Config {
    /// Get the path to the preferences file.
    ///
    /// Returns platform-specific path:
    /// - Linux: ~/.config/fe2cm/fe2-config.json
    /// - macOS: ~/Library/Application Support/fe2cm/fe2-config.json
    /// - Windows: %APPDATA%\fe2cm\fe2-config.json
    pub fn config_path() -> PathBuf {
        BaseDirs::new()
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fe2cm")
            .join("fe2-config.json")
    }

    /// Load preferences from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load preferences from `path`, falling back to defaults if the file is
    /// missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        Self::read_from(path).unwrap_or_default()
    }

    /// Read and parse preferences from `path`, reporting failures.
    pub fn read_from(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Parse a preferences document, merging it over the defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Config = serde_json::from_str(json)?;
        config.normalize();
        Ok(config)
    }

    fn normalize(&mut self) {
        self.volume = self.volume.min(MAX_VOLUME);
        if self.previous_volume == 0 {
            self.previous_volume = DEFAULT_VOLUME;
        }
    }

    /// Save preferences to the default location.
    pub fn save(&self) -> io::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save preferences to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Read a single value by its dotted key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "volume" => Some(self.volume.to_string()),
            "onDeath" => Some(self.on_death.as_str().to_string()),
            "onLeave" => Some(self.on_leave.as_str().to_string()),
            _ => {
                let action = hotkey_key(key)?;
                Some(self.settings.hotkeys.get(action).to_string())
            }
        }
    }

    /// Set a single value by its dotted key.
    ///
    /// Hotkey values are parsed and stored in canonical form; `none` or an
    /// empty value unbinds the hotkey.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "volume" => {
                let v: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("Invalid volume '{}': expected a number 0-100", value))?;
                self.volume = clamp_volume(v);
                if self.volume > 0 {
                    self.previous_volume = self.volume;
                }
            }
            "onDeath" => {
                self.on_death = DeathBehavior::from_name(value).ok_or_else(|| {
                    format!(
                        "Invalid onDeath '{}': expected one of {}",
                        value,
                        DeathBehavior::ALL.map(|b| b.as_str()).join(", ")
                    )
                })?;
            }
            "onLeave" => {
                self.on_leave = LeaveBehavior::from_name(value).ok_or_else(|| {
                    format!(
                        "Invalid onLeave '{}': expected one of {}",
                        value,
                        LeaveBehavior::ALL.map(|b| b.as_str()).join(", ")
                    )
                })?;
            }
            _ => {
                let action = hotkey_key(key).ok_or_else(|| {
                    format!(
                        "Unknown config key '{}'. Valid keys: {}",
                        key,
                        CONFIG_KEYS.join(", ")
                    )
                })?;
                let canonical = if value.trim().eq_ignore_ascii_case("none") {
                    String::new()
                } else {
                    match Accelerator::parse(value).map_err(|e| e.to_string())? {
                        Some(accel) => accel.to_string(),
                        None => String::new(),
                    }
                };
                self.settings.hotkeys.set(action, canonical);
            }
        }
        Ok(())
    }
}

fn hotkey_key(key: &str) -> Option<HotkeyAction> {
    key.strip_prefix("hotkeys.")
        .and_then(HotkeyAction::from_config_key)
}
