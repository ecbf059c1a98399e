//! Static key tables mapping logical key names to hook keycodes.
//!
//! Keycodes use the libuiohook virtual-code space (see [`Keycode`]). Every
//! logical key has exactly one primary keycode. The ten keypad digits also
//! have a NumLock-off alternate (`0xEE00 | scan`) that resolves back to the
//! same logical name, so `Numpad5` means keypad-5 regardless of NumLock.
//!
//! The lookup maps are built once, on first use, and construction panics if
//! two logical keys claim the same keycode. Such a collision is a bug in the
//! tables below, never a runtime condition.

use crate::types::Keycode;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Logical key names and their primary keycodes, in display order.
const KEYS: &[(&str, u16)] = &[
    // Letters
    ("A", 0x001E),
    ("B", 0x0030),
    ("C", 0x002E),
    ("D", 0x0020),
    ("E", 0x0012),
    ("F", 0x0021),
    ("G", 0x0022),
    ("H", 0x0023),
    ("I", 0x0017),
    ("J", 0x0024),
    ("K", 0x0025),
    ("L", 0x0026),
    ("M", 0x0032),
    ("N", 0x0031),
    ("O", 0x0018),
    ("P", 0x0019),
    ("Q", 0x0010),
    ("R", 0x0013),
    ("S", 0x001F),
    ("T", 0x0014),
    ("U", 0x0016),
    ("V", 0x002F),
    ("W", 0x0011),
    ("X", 0x002D),
    ("Y", 0x0015),
    ("Z", 0x002C),
    // Digit row
    ("0", 0x000B),
    ("1", 0x0002),
    ("2", 0x0003),
    ("3", 0x0004),
    ("4", 0x0005),
    ("5", 0x0006),
    ("6", 0x0007),
    ("7", 0x0008),
    ("8", 0x0009),
    ("9", 0x000A),
    // Function keys
    ("F1", 0x003B),
    ("F2", 0x003C),
    ("F3", 0x003D),
    ("F4", 0x003E),
    ("F5", 0x003F),
    ("F6", 0x0040),
    ("F7", 0x0041),
    ("F8", 0x0042),
    ("F9", 0x0043),
    ("F10", 0x0044),
    ("F11", 0x0057),
    ("F12", 0x0058),
    ("F13", 0x005B),
    ("F14", 0x005C),
    ("F15", 0x005D),
    ("F16", 0x0063),
    ("F17", 0x0064),
    ("F18", 0x0065),
    ("F19", 0x0066),
    ("F20", 0x0067),
    ("F21", 0x0068),
    ("F22", 0x0069),
    ("F23", 0x006A),
    ("F24", 0x006B),
    // Editing and whitespace
    ("Esc", 0x0001),
    ("Tab", 0x000F),
    ("CapsLock", 0x003A),
    ("Space", 0x0039),
    ("Enter", 0x001C),
    ("Backspace", 0x000E),
    ("Insert", 0x0E52),
    ("Delete", 0x0E53),
    // Navigation
    ("Home", 0x0E47),
    ("End", 0x0E4F),
    ("PageUp", 0x0E49),
    ("PageDown", 0x0E51),
    ("Up", 0xE048),
    ("Down", 0xE050),
    ("Left", 0xE04B),
    ("Right", 0xE04D),
    // System
    ("PrintScreen", 0x0E37),
    ("ScrollLock", 0x0046),
    ("Pause", 0x0E45),
    ("NumLock", 0x0045),
    // Punctuation (US layout)
    ("`", 0x0029),
    ("-", 0x000C),
    ("=", 0x000D),
    ("[", 0x001A),
    ("]", 0x001B),
    ("\\", 0x002B),
    (";", 0x0027),
    ("'", 0x0028),
    (",", 0x0033),
    (".", 0x0034),
    ("/", 0x0035),
    // Keypad
    ("Numpad0", 0x0052),
    ("Numpad1", 0x004F),
    ("Numpad2", 0x0050),
    ("Numpad3", 0x0051),
    ("Numpad4", 0x004B),
    ("Numpad5", 0x004C),
    ("Numpad6", 0x004D),
    ("Numpad7", 0x0047),
    ("Numpad8", 0x0048),
    ("Numpad9", 0x0049),
    ("NumpadAdd", 0x004E),
    ("NumpadSubtract", 0x004A),
    ("NumpadMultiply", 0x0037),
    ("NumpadDivide", 0x0E35),
    ("NumpadDecimal", 0x0053),
    ("NumpadEnter", 0x0E1C),
];

/// Marker OR-ed into a keypad scan code when NumLock is off.
pub const NUMLOCK_OFF_PREFIX: u16 = 0xEE00;

/// Keypad digits and the keycode the hook reports for them with NumLock off.
const NUMPAD_ALTERNATES: &[(&str, u16)] = &[
    ("Numpad0", NUMLOCK_OFF_PREFIX | 0x52),
    ("Numpad1", NUMLOCK_OFF_PREFIX | 0x4F),
    ("Numpad2", NUMLOCK_OFF_PREFIX | 0x50),
    ("Numpad3", NUMLOCK_OFF_PREFIX | 0x51),
    ("Numpad4", NUMLOCK_OFF_PREFIX | 0x4B),
    ("Numpad5", NUMLOCK_OFF_PREFIX | 0x4C),
    ("Numpad6", NUMLOCK_OFF_PREFIX | 0x4D),
    ("Numpad7", NUMLOCK_OFF_PREFIX | 0x47),
    ("Numpad8", NUMLOCK_OFF_PREFIX | 0x48),
    ("Numpad9", NUMLOCK_OFF_PREFIX | 0x49),
];

/// Left/right Ctrl, Alt, Shift and Meta.
pub mod modifier {
    use crate::types::Keycode;

    pub const SHIFT_LEFT: Keycode = Keycode(0x002A);
    pub const SHIFT_RIGHT: Keycode = Keycode(0x0036);
    pub const CONTROL_LEFT: Keycode = Keycode(0x001D);
    pub const CONTROL_RIGHT: Keycode = Keycode(0x0E1D);
    pub const ALT_LEFT: Keycode = Keycode(0x0038);
    pub const ALT_RIGHT: Keycode = Keycode(0x0E38);
    pub const META_LEFT: Keycode = Keycode(0x0E5B);
    pub const META_RIGHT: Keycode = Keycode(0x0E5C);

    pub const ALL: [Keycode; 8] = [
        SHIFT_LEFT,
        SHIFT_RIGHT,
        CONTROL_LEFT,
        CONTROL_RIGHT,
        ALT_LEFT,
        ALT_RIGHT,
        META_LEFT,
        META_RIGHT,
    ];
}

/// Alternative spellings accepted when parsing, mapped to canonical names.
const ALIASES: &[(&str, &str)] = &[
    ("Escape", "Esc"),
    ("Return", "Enter"),
    ("Del", "Delete"),
    ("Ins", "Insert"),
    ("PgUp", "PageUp"),
    ("PgDn", "PageDown"),
    ("ArrowUp", "Up"),
    ("ArrowDown", "Down"),
    ("ArrowLeft", "Left"),
    ("ArrowRight", "Right"),
    ("PrtSc", "PrintScreen"),
    ("Capital", "CapsLock"),
    ("Backquote", "`"),
    ("Minus", "-"),
    ("Equal", "="),
    ("BracketLeft", "["),
    ("BracketRight", "]"),
    ("Backslash", "\\"),
    ("Semicolon", ";"),
    ("Quote", "'"),
    ("Comma", ","),
    ("Period", "."),
    ("Slash", "/"),
    ("Num0", "Numpad0"),
    ("Num1", "Numpad1"),
    ("Num2", "Numpad2"),
    ("Num3", "Numpad3"),
    ("Num4", "Numpad4"),
    ("Num5", "Numpad5"),
    ("Num6", "Numpad6"),
    ("Num7", "Numpad7"),
    ("Num8", "Numpad8"),
    ("Num9", "Numpad9"),
    ("NumAdd", "NumpadAdd"),
    ("NumSub", "NumpadSubtract"),
    ("NumMult", "NumpadMultiply"),
    ("NumDiv", "NumpadDivide"),
    ("NumDec", "NumpadDecimal"),
];

/// Bidirectional lookup maps built from the static tables.
#[derive(Debug)]
pub struct KeyTables {
    order: Vec<&'static str>,
    forward: HashMap<&'static str, Keycode>,
    reverse: HashMap<Keycode, &'static str>,
    numpad_alt: HashMap<&'static str, Keycode>,
    alt_to_name: HashMap<Keycode, &'static str>,
    modifiers: HashSet<Keycode>,
    /// Lowercased names and aliases -> canonical name
    lookup: HashMap<String, &'static str>,
}

impl KeyTables {
    /// Build and validate the maps.
    ///
    /// Fails if a name or primary keycode appears twice, if an alternate code
    /// collides with a primary code or another alternate, if an alternate or
    /// alias refers to an unknown name, or if a modifier keycode is also
    /// listed as a key.
    pub fn build(
        keys: &[(&'static str, u16)],
        alternates: &[(&'static str, u16)],
        modifiers: &[Keycode],
        aliases: &[(&'static str, &'static str)],
    ) -> Result<Self, String> {
        let mut order = Vec::with_capacity(keys.len());
        let mut forward = HashMap::with_capacity(keys.len());
        let mut reverse = HashMap::with_capacity(keys.len());
        let mut lookup = HashMap::with_capacity(keys.len() + aliases.len());

        for &(name, code) in keys {
            let code = Keycode(code);
            if forward.insert(name, code).is_some() {
                return Err(format!("key name {:?} listed twice", name));
            }
            if let Some(existing) = reverse.insert(code, name) {
                return Err(format!(
                    "keycode {} claimed by both {:?} and {:?}",
                    code, existing, name
                ));
            }
            if lookup.insert(name.to_ascii_lowercase(), name).is_some() {
                return Err(format!("key name {:?} differs from another only by case", name));
            }
            order.push(name);
        }

        let mut numpad_alt = HashMap::with_capacity(alternates.len());
        let mut alt_to_name = HashMap::with_capacity(alternates.len());
        for &(name, code) in alternates {
            let code = Keycode(code);
            let Some(&canonical) = forward.get_key_value(name).map(|(k, _)| k) else {
                return Err(format!("alternate keycode {} for unknown key {:?}", code, name));
            };
            if let Some(owner) = reverse.get(&code) {
                return Err(format!(
                    "alternate keycode {} for {:?} collides with primary of {:?}",
                    code, name, owner
                ));
            }
            if numpad_alt.insert(canonical, code).is_some() {
                return Err(format!("key {:?} has two alternate keycodes", name));
            }
            if let Some(existing) = alt_to_name.insert(code, canonical) {
                return Err(format!(
                    "alternate keycode {} claimed by both {:?} and {:?}",
                    code, existing, name
                ));
            }
        }

        let mut modifier_set = HashSet::with_capacity(modifiers.len());
        for &code in modifiers {
            if let Some(name) = reverse.get(&code).or_else(|| alt_to_name.get(&code)) {
                return Err(format!("modifier keycode {} is also key {:?}", code, name));
            }
            modifier_set.insert(code);
        }

        for &(alias, target) in aliases {
            let Some(&canonical) = forward.get_key_value(target).map(|(k, _)| k) else {
                return Err(format!("alias {:?} targets unknown key {:?}", alias, target));
            };
            if lookup.insert(alias.to_ascii_lowercase(), canonical).is_some() {
                return Err(format!("alias {:?} shadows another name", alias));
            }
        }

        Ok(Self {
            order,
            forward,
            reverse,
            numpad_alt,
            alt_to_name,
            modifiers: modifier_set,
            lookup,
        })
    }

    /// Primary keycode for a canonical key name.
    pub fn keycode(&self, name: &str) -> Option<Keycode> {
        self.forward.get(name).copied()
    }

    /// Canonical key name for a primary keycode.
    pub fn name(&self, code: Keycode) -> Option<&'static str> {
        self.reverse.get(&code).copied()
    }

    /// NumLock-off keycode for a keypad digit.
    pub fn numpad_alt_keycode(&self, name: &str) -> Option<Keycode> {
        self.numpad_alt.get(name).copied()
    }

    /// Canonical key name for a NumLock-off keypad keycode.
    pub fn alt_keycode_name(&self, code: Keycode) -> Option<&'static str> {
        self.alt_to_name.get(&code).copied()
    }

    /// Resolve any reported keycode, primary first, then NumLock-off alternate.
    pub fn resolve(&self, code: Keycode) -> Option<&'static str> {
        self.name(code).or_else(|| self.alt_keycode_name(code))
    }

    pub fn is_modifier(&self, code: Keycode) -> bool {
        self.modifiers.contains(&code)
    }

    /// Canonical name for a user-typed token, ignoring case and accepting aliases.
    pub fn canonical_name(&self, token: &str) -> Option<&'static str> {
        if let Some((&name, _)) = self.forward.get_key_value(token) {
            return Some(name);
        }
        self.lookup.get(&token.to_ascii_lowercase()).copied()
    }

    /// All canonical key names in table order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}

static TABLES: OnceLock<KeyTables> = OnceLock::new();

/// The process-wide key tables.
///
/// # Panics
///
/// Panics on first use if the static tables violate their uniqueness
/// invariants.
pub fn tables() -> &'static KeyTables {
    TABLES.get_or_init(|| {
        match KeyTables::build(KEYS, NUMPAD_ALTERNATES, &modifier::ALL, ALIASES) {
            Ok(tables) => tables,
            Err(e) => panic!("invalid key tables: {}", e),
        }
    })
}

pub fn keycode_for(name: &str) -> Option<Keycode> {
    tables().keycode(name)
}

pub fn name_for(code: Keycode) -> Option<&'static str> {
    tables().name(code)
}

pub fn numpad_alt_keycode(name: &str) -> Option<Keycode> {
    tables().numpad_alt_keycode(name)
}

pub fn alt_keycode_name(code: Keycode) -> Option<&'static str> {
    tables().alt_keycode_name(code)
}

pub fn resolve_name(code: Keycode) -> Option<&'static str> {
    tables().resolve(code)
}

pub fn is_modifier_keycode(code: Keycode) -> bool {
    tables().is_modifier(code)
}

pub fn canonical_name(token: &str) -> Option<&'static str> {
    tables().canonical_name(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_build() {
        let t = tables();
        assert_eq!(t.names().count(), KEYS.len());
        assert_eq!(t.keycode("F5"), Some(Keycode(0x003F)));
        assert_eq!(t.keycode("Numpad5"), Some(Keycode(0x004C)));
    }

    #[test]
    fn test_forward_reverse_roundtrip() {
        let t = tables();
        for name in t.names() {
            let code = t.keycode(name).unwrap();
            assert_eq!(t.name(code), Some(name), "roundtrip failed for {}", name);
        }
    }

    #[test]
    fn test_numlock_alternates_resolve_to_same_name() {
        let t = tables();
        let mut count = 0;
        for name in t.names() {
            if let Some(alt) = t.numpad_alt_keycode(name) {
                count += 1;
                let primary = t.keycode(name).unwrap();
                assert_ne!(alt, primary);
                assert_eq!(t.alt_keycode_name(alt), Some(name));
                assert_eq!(t.resolve(alt), t.resolve(primary));
                assert_eq!(alt.raw(), NUMLOCK_OFF_PREFIX | primary.raw());
            }
        }
        assert_eq!(count, 10);
    }

    #[test]
    fn test_modifiers_are_not_keys() {
        let t = tables();
        for code in modifier::ALL {
            assert!(t.is_modifier(code));
            assert_eq!(t.resolve(code), None);
        }
        assert!(!t.is_modifier(Keycode(0x001E)));
    }

    #[test]
    fn test_canonical_name_is_case_insensitive_and_aliased() {
        let t = tables();
        assert_eq!(t.canonical_name("f5"), Some("F5"));
        assert_eq!(t.canonical_name("numpad5"), Some("Numpad5"));
        assert_eq!(t.canonical_name("Escape"), Some("Esc"));
        assert_eq!(t.canonical_name("esc"), Some("Esc"));
        assert_eq!(t.canonical_name("num7"), Some("Numpad7"));
        assert_eq!(t.canonical_name("pgdn"), Some("PageDown"));
        assert_eq!(t.canonical_name("a"), Some("A"));
        assert_eq!(t.canonical_name("Hyper"), None);
    }

    #[test]
    fn test_build_rejects_duplicate_primary_keycode() {
        let err = KeyTables::build(&[("A", 0x1E), ("Also A", 0x1E)], &[], &[], &[]).unwrap_err();
        assert!(err.contains("claimed by both"), "unexpected error: {}", err);
    }

    #[test]
    fn test_build_rejects_alternate_colliding_with_primary() {
        let err =
            KeyTables::build(&[("A", 0x1E), ("B", 0x30)], &[("A", 0x30)], &[], &[]).unwrap_err();
        assert!(err.contains("collides"), "unexpected error: {}", err);
    }

    #[test]
    fn test_build_rejects_modifier_listed_as_key() {
        let err = KeyTables::build(&[("Ctrl", 0x1D)], &[], &[Keycode(0x1D)], &[]).unwrap_err();
        assert!(err.contains("modifier"), "unexpected error: {}", err);
    }

    #[test]
    fn test_build_rejects_dangling_alias() {
        let err = KeyTables::build(&[("A", 0x1E)], &[], &[], &[("Ay", "Q")]).unwrap_err();
        assert!(err.contains("unknown key"), "unexpected error: {}", err);
    }
}
