//! Translation from Windows low-level hook data to [`Keycode`].
//!
//! Kept free of Win32 types so the mapping can be tested on every platform.

use fe2cm_common::keymap::NUMLOCK_OFF_PREFIX;
use fe2cm_common::Keycode;

/// Prefix for most extended (E0) keys.
const EXTENDED_PREFIX: u16 = 0x0E00;
/// Prefix for the extended arrow keys.
const ARROW_PREFIX: u16 = 0xE000;

const VK_PAUSE: u32 = 0x13;
const VK_NUMLOCK: u32 = 0x90;

/// Scan codes of the arrow cluster (and keypad 5, which shares the block).
const ARROW_SCANS: [u16; 5] = [0x48, 0x4B, 0x4C, 0x4D, 0x50];

/// Keypad scan codes that double as navigation keys when NumLock is off.
const KEYPAD_NAV_SCANS: [u16; 11] = [
    0x47, 0x48, 0x49, 0x4B, 0x4C, 0x4D, 0x4F, 0x50, 0x51, 0x52, 0x53,
];

/// Map a `KBDLLHOOKSTRUCT`'s scan code, extended flag and virtual key to a
/// keycode. Returns `None` for events without a scan code (synthesized input).
pub fn keycode_from_scan(scan_code: u32, extended: bool, vk_code: u32) -> Option<Keycode> {
    // Pause and NumLock report each other's extended flag.
    match vk_code {
        VK_PAUSE => return Some(Keycode(EXTENDED_PREFIX | 0x45)),
        VK_NUMLOCK => return Some(Keycode(0x45)),
        _ => {}
    }

    let scan = (scan_code & 0xFF) as u16;
    if scan == 0 {
        return None;
    }

    let code = if extended {
        if ARROW_SCANS.contains(&scan) {
            ARROW_PREFIX | scan
        } else {
            EXTENDED_PREFIX | scan
        }
    } else if KEYPAD_NAV_SCANS.contains(&scan) && is_keypad_nav_vk(vk_code) {
        // Keypad key without NumLock: Windows reports VK_HOME, VK_LEFT, ...
        NUMLOCK_OFF_PREFIX | scan
    } else {
        scan
    };

    Some(Keycode(code))
}

/// Virtual keys Windows substitutes for keypad digits when NumLock is off.
fn is_keypad_nav_vk(vk_code: u32) -> bool {
    matches!(
        vk_code,
        0x0C // VK_CLEAR
            | 0x21 // VK_PRIOR
            | 0x22 // VK_NEXT
            | 0x23 // VK_END
            | 0x24 // VK_HOME
            | 0x25 // VK_LEFT
            | 0x26 // VK_UP
            | 0x27 // VK_RIGHT
            | 0x28 // VK_DOWN
            | 0x2D // VK_INSERT
            | 0x2E // VK_DELETE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fe2cm_common::keymap::{self, modifier};

    fn name(code: Option<Keycode>) -> Option<&'static str> {
        code.and_then(keymap::resolve_name)
    }

    #[test]
    fn test_plain_keys() {
        assert_eq!(name(keycode_from_scan(0x1E, false, 0x41)), Some("A"));
        assert_eq!(name(keycode_from_scan(0x3F, false, 0x74)), Some("F5"));
        assert_eq!(name(keycode_from_scan(0x39, false, 0x20)), Some("Space"));
        assert_eq!(name(keycode_from_scan(0x1C, false, 0x0D)), Some("Enter"));
    }

    #[test]
    fn test_extended_keys() {
        assert_eq!(name(keycode_from_scan(0x1C, true, 0x0D)), Some("NumpadEnter"));
        assert_eq!(name(keycode_from_scan(0x35, true, 0x6F)), Some("NumpadDivide"));
        assert_eq!(name(keycode_from_scan(0x53, true, 0x2E)), Some("Delete"));
        assert_eq!(name(keycode_from_scan(0x47, true, 0x24)), Some("Home"));
        assert_eq!(name(keycode_from_scan(0x37, true, 0x2C)), Some("PrintScreen"));
    }

    #[test]
    fn test_arrow_keys() {
        assert_eq!(name(keycode_from_scan(0x48, true, 0x26)), Some("Up"));
        assert_eq!(name(keycode_from_scan(0x50, true, 0x28)), Some("Down"));
        assert_eq!(name(keycode_from_scan(0x4B, true, 0x25)), Some("Left"));
        assert_eq!(name(keycode_from_scan(0x4D, true, 0x27)), Some("Right"));
    }

    #[test]
    fn test_keypad_with_numlock_on() {
        assert_eq!(name(keycode_from_scan(0x47, false, 0x67)), Some("Numpad7"));
        assert_eq!(name(keycode_from_scan(0x52, false, 0x60)), Some("Numpad0"));
        assert_eq!(name(keycode_from_scan(0x4E, false, 0x6B)), Some("NumpadAdd"));
        assert_eq!(name(keycode_from_scan(0x53, false, 0x6E)), Some("NumpadDecimal"));
    }

    #[test]
    fn test_keypad_with_numlock_off() {
        let home = keycode_from_scan(0x47, false, 0x24).unwrap();
        assert_eq!(home, keymap::numpad_alt_keycode("Numpad7").unwrap());
        assert_eq!(keymap::resolve_name(home), Some("Numpad7"));

        let clear = keycode_from_scan(0x4C, false, 0x0C).unwrap();
        assert_eq!(keymap::resolve_name(clear), Some("Numpad5"));

        let insert = keycode_from_scan(0x52, false, 0x2D).unwrap();
        assert_eq!(keymap::resolve_name(insert), Some("Numpad0"));
    }

    #[test]
    fn test_pause_and_numlock() {
        assert_eq!(name(keycode_from_scan(0x45, false, 0x13)), Some("Pause"));
        assert_eq!(name(keycode_from_scan(0x45, true, 0x90)), Some("NumLock"));
    }

    #[test]
    fn test_modifiers() {
        assert_eq!(keycode_from_scan(0x1D, false, 0xA2), Some(modifier::CONTROL_LEFT));
        assert_eq!(keycode_from_scan(0x1D, true, 0xA3), Some(modifier::CONTROL_RIGHT));
        assert_eq!(keycode_from_scan(0x38, false, 0xA4), Some(modifier::ALT_LEFT));
        assert_eq!(keycode_from_scan(0x38, true, 0xA5), Some(modifier::ALT_RIGHT));
        assert_eq!(keycode_from_scan(0x2A, false, 0xA0), Some(modifier::SHIFT_LEFT));
        assert_eq!(keycode_from_scan(0x36, false, 0xA1), Some(modifier::SHIFT_RIGHT));
        assert_eq!(keycode_from_scan(0x5B, true, 0x5B), Some(modifier::META_LEFT));
        assert_eq!(keycode_from_scan(0x5C, true, 0x5C), Some(modifier::META_RIGHT));
    }

    #[test]
    fn test_synthesized_input_without_scan_code() {
        assert_eq!(keycode_from_scan(0, false, 0x41), None);
    }
}
