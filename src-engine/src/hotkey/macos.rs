//! macOS keyboard hook using CGEventTap.
//!
//! This implementation uses a listen-only Core Graphics Event Tap to observe
//! global keyboard events. It requires Accessibility permission to function.

use super::backend::{forward_event, HotkeyBackend};
use fe2cm_common::keymap::{self, modifier};
use fe2cm_common::{KeyEvent, Keycode, ModifierState};
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// macOS virtual key codes (ANSI layout)
mod keycode {
    pub const A: u16 = 0x00;
    pub const S: u16 = 0x01;
    pub const D: u16 = 0x02;
    pub const F: u16 = 0x03;
    pub const H: u16 = 0x04;
    pub const G: u16 = 0x05;
    pub const Z: u16 = 0x06;
    pub const X: u16 = 0x07;
    pub const C: u16 = 0x08;
    pub const V: u16 = 0x09;
    pub const B: u16 = 0x0B;
    pub const Q: u16 = 0x0C;
    pub const W: u16 = 0x0D;
    pub const E: u16 = 0x0E;
    pub const R: u16 = 0x0F;
    pub const Y: u16 = 0x10;
    pub const T: u16 = 0x11;
    pub const DIGIT_1: u16 = 0x12;
    pub const DIGIT_2: u16 = 0x13;
    pub const DIGIT_3: u16 = 0x14;
    pub const DIGIT_4: u16 = 0x15;
    pub const DIGIT_6: u16 = 0x16;
    pub const DIGIT_5: u16 = 0x17;
    pub const EQUAL: u16 = 0x18;
    pub const DIGIT_9: u16 = 0x19;
    pub const DIGIT_7: u16 = 0x1A;
    pub const MINUS: u16 = 0x1B;
    pub const DIGIT_8: u16 = 0x1C;
    pub const DIGIT_0: u16 = 0x1D;
    pub const BRACKET_RIGHT: u16 = 0x1E;
    pub const O: u16 = 0x1F;
    pub const U: u16 = 0x20;
    pub const BRACKET_LEFT: u16 = 0x21;
    pub const I: u16 = 0x22;
    pub const P: u16 = 0x23;
    pub const ENTER: u16 = 0x24;
    pub const L: u16 = 0x25;
    pub const J: u16 = 0x26;
    pub const QUOTE: u16 = 0x27;
    pub const K: u16 = 0x28;
    pub const SEMICOLON: u16 = 0x29;
    pub const BACKSLASH: u16 = 0x2A;
    pub const COMMA: u16 = 0x2B;
    pub const SLASH: u16 = 0x2C;
    pub const N: u16 = 0x2D;
    pub const M: u16 = 0x2E;
    pub const PERIOD: u16 = 0x2F;
    pub const TAB: u16 = 0x30;
    pub const SPACE: u16 = 0x31;
    pub const BACKQUOTE: u16 = 0x32;
    pub const BACKSPACE: u16 = 0x33;
    pub const ESCAPE: u16 = 0x35;
    pub const RIGHT_META: u16 = 0x36;
    pub const LEFT_META: u16 = 0x37;
    pub const LEFT_SHIFT: u16 = 0x38;
    pub const CAPS_LOCK: u16 = 0x39;
    pub const LEFT_OPTION: u16 = 0x3A;
    pub const LEFT_CONTROL: u16 = 0x3B;
    pub const RIGHT_SHIFT: u16 = 0x3C;
    pub const RIGHT_OPTION: u16 = 0x3D;
    pub const RIGHT_CONTROL: u16 = 0x3E;
    pub const F17: u16 = 0x40;
    pub const NUMPAD_DECIMAL: u16 = 0x41;
    pub const NUMPAD_MULTIPLY: u16 = 0x43;
    pub const NUMPAD_ADD: u16 = 0x45;
    /// Keypad Clear, in the NumLock position
    pub const NUM_LOCK: u16 = 0x47;
    pub const NUMPAD_DIVIDE: u16 = 0x4B;
    pub const NUMPAD_ENTER: u16 = 0x4C;
    pub const NUMPAD_SUBTRACT: u16 = 0x4E;
    pub const F18: u16 = 0x4F;
    pub const F19: u16 = 0x50;
    pub const NUMPAD_0: u16 = 0x52;
    pub const NUMPAD_1: u16 = 0x53;
    pub const NUMPAD_2: u16 = 0x54;
    pub const NUMPAD_3: u16 = 0x55;
    pub const NUMPAD_4: u16 = 0x56;
    pub const NUMPAD_5: u16 = 0x57;
    pub const NUMPAD_6: u16 = 0x58;
    pub const NUMPAD_7: u16 = 0x59;
    pub const F20: u16 = 0x5A;
    pub const NUMPAD_8: u16 = 0x5B;
    pub const NUMPAD_9: u16 = 0x5C;
    pub const F5: u16 = 0x60;
    pub const F6: u16 = 0x61;
    pub const F7: u16 = 0x62;
    pub const F3: u16 = 0x63;
    pub const F8: u16 = 0x64;
    pub const F9: u16 = 0x65;
    pub const F11: u16 = 0x67;
    pub const F13: u16 = 0x69;
    pub const F16: u16 = 0x6A;
    pub const F14: u16 = 0x6B;
    pub const F10: u16 = 0x6D;
    pub const F12: u16 = 0x6F;
    pub const F15: u16 = 0x71;
    /// Help, in the Insert position
    pub const INSERT: u16 = 0x72;
    pub const HOME: u16 = 0x73;
    pub const PAGE_UP: u16 = 0x74;
    pub const FORWARD_DELETE: u16 = 0x75;
    pub const F4: u16 = 0x76;
    pub const END: u16 = 0x77;
    pub const F2: u16 = 0x78;
    pub const PAGE_DOWN: u16 = 0x79;
    pub const F1: u16 = 0x7A;
    pub const ARROW_LEFT: u16 = 0x7B;
    pub const ARROW_RIGHT: u16 = 0x7C;
    pub const ARROW_DOWN: u16 = 0x7D;
    pub const ARROW_UP: u16 = 0x7E;
}

/// Map a macOS modifier key to its keycode.
fn macos_modifier(code: u16) -> Option<Keycode> {
    match code {
        keycode::LEFT_CONTROL => Some(modifier::CONTROL_LEFT),
        keycode::RIGHT_CONTROL => Some(modifier::CONTROL_RIGHT),
        keycode::LEFT_OPTION => Some(modifier::ALT_LEFT),
        keycode::RIGHT_OPTION => Some(modifier::ALT_RIGHT),
        keycode::LEFT_SHIFT => Some(modifier::SHIFT_LEFT),
        keycode::RIGHT_SHIFT => Some(modifier::SHIFT_RIGHT),
        keycode::LEFT_META => Some(modifier::META_LEFT),
        keycode::RIGHT_META => Some(modifier::META_RIGHT),
        _ => None,
    }
}

/// Map a macOS virtual key code to a key name.
fn macos_key_name(code: u16) -> Option<&'static str> {
    let name = match code {
        keycode::A => "A",
        keycode::B => "B",
        keycode::C => "C",
        keycode::D => "D",
        keycode::E => "E",
        keycode::F => "F",
        keycode::G => "G",
        keycode::H => "H",
        keycode::I => "I",
        keycode::J => "J",
        keycode::K => "K",
        keycode::L => "L",
        keycode::M => "M",
        keycode::N => "N",
        keycode::O => "O",
        keycode::P => "P",
        keycode::Q => "Q",
        keycode::R => "R",
        keycode::S => "S",
        keycode::T => "T",
        keycode::U => "U",
        keycode::V => "V",
        keycode::W => "W",
        keycode::X => "X",
        keycode::Y => "Y",
        keycode::Z => "Z",
        keycode::DIGIT_0 => "0",
        keycode::DIGIT_1 => "1",
        keycode::DIGIT_2 => "2",
        keycode::DIGIT_3 => "3",
        keycode::DIGIT_4 => "4",
        keycode::DIGIT_5 => "5",
        keycode::DIGIT_6 => "6",
        keycode::DIGIT_7 => "7",
        keycode::DIGIT_8 => "8",
        keycode::DIGIT_9 => "9",
        keycode::F1 => "F1",
        keycode::F2 => "F2",
        keycode::F3 => "F3",
        keycode::F4 => "F4",
        keycode::F5 => "F5",
        keycode::F6 => "F6",
        keycode::F7 => "F7",
        keycode::F8 => "F8",
        keycode::F9 => "F9",
        keycode::F10 => "F10",
        keycode::F11 => "F11",
        keycode::F12 => "F12",
        keycode::F13 => "F13",
        keycode::F14 => "F14",
        keycode::F15 => "F15",
        keycode::F16 => "F16",
        keycode::F17 => "F17",
        keycode::F18 => "F18",
        keycode::F19 => "F19",
        keycode::F20 => "F20",
        keycode::ESCAPE => "Esc",
        keycode::TAB => "Tab",
        keycode::CAPS_LOCK => "CapsLock",
        keycode::SPACE => "Space",
        keycode::ENTER => "Enter",
        keycode::BACKSPACE => "Backspace",
        keycode::INSERT => "Insert",
        keycode::FORWARD_DELETE => "Delete",
        keycode::HOME => "Home",
        keycode::END => "End",
        keycode::PAGE_UP => "PageUp",
        keycode::PAGE_DOWN => "PageDown",
        keycode::ARROW_UP => "Up",
        keycode::ARROW_DOWN => "Down",
        keycode::ARROW_LEFT => "Left",
        keycode::ARROW_RIGHT => "Right",
        keycode::NUM_LOCK => "NumLock",
        keycode::BACKQUOTE => "`",
        keycode::MINUS => "-",
        keycode::EQUAL => "=",
        keycode::BRACKET_LEFT => "[",
        keycode::BRACKET_RIGHT => "]",
        keycode::BACKSLASH => "\\",
        keycode::SEMICOLON => ";",
        keycode::QUOTE => "'",
        keycode::COMMA => ",",
        keycode::PERIOD => ".",
        keycode::SLASH => "/",
        keycode::NUMPAD_0 => "Numpad0",
        keycode::NUMPAD_1 => "Numpad1",
        keycode::NUMPAD_2 => "Numpad2",
        keycode::NUMPAD_3 => "Numpad3",
        keycode::NUMPAD_4 => "Numpad4",
        keycode::NUMPAD_5 => "Numpad5",
        keycode::NUMPAD_6 => "Numpad6",
        keycode::NUMPAD_7 => "Numpad7",
        keycode::NUMPAD_8 => "Numpad8",
        keycode::NUMPAD_9 => "Numpad9",
        keycode::NUMPAD_ADD => "NumpadAdd",
        keycode::NUMPAD_SUBTRACT => "NumpadSubtract",
        keycode::NUMPAD_MULTIPLY => "NumpadMultiply",
        keycode::NUMPAD_DIVIDE => "NumpadDivide",
        keycode::NUMPAD_DECIMAL => "NumpadDecimal",
        keycode::NUMPAD_ENTER => "NumpadEnter",
        _ => return None,
    };
    Some(name)
}

fn macos_to_keycode(code: u16) -> Option<Keycode> {
    macos_modifier(code).or_else(|| macos_key_name(code).and_then(keymap::keycode_for))
}

fn modifiers_from_flags(flags: macos_ffi::CGEventFlags) -> ModifierState {
    ModifierState {
        ctrl: flags & macos_ffi::kCGEventFlagMaskControl != 0,
        alt: flags & macos_ffi::kCGEventFlagMaskAlternate != 0,
        shift: flags & macos_ffi::kCGEventFlagMaskShift != 0,
        meta: flags & macos_ffi::kCGEventFlagMaskCommand != 0,
    }
}

/// macOS keyboard hook backend using CGEventTap
pub struct MacOSHotkeyBackend {
    /// Whether the backend is currently running
    running: Arc<AtomicBool>,
    /// Handle to the event tap thread
    thread_handle: Option<JoinHandle<()>>,
    /// Last known unavailability reason
    unavailable_reason: Option<String>,
}

/// Returns true if the process currently has macOS Accessibility permission.
/// This is safe to call at any time and does not show a system dialog.
pub fn check_accessibility_permission() -> bool {
    unsafe { macos_ffi::AXIsProcessTrusted() }
}

/// Prompt macOS to show the Accessibility permission dialog for this process.
/// Returns the current trust state.
pub fn request_accessibility_permission() -> bool {
    unsafe {
        let key = macos_ffi::kAXTrustedCheckOptionPrompt as macos_ffi::CFTypeRef;
        let value = macos_ffi::kCFBooleanTrue;

        let options = macos_ffi::CFDictionaryCreate(
            std::ptr::null(),
            &key,
            &value,
            1,
            &macos_ffi::kCFTypeDictionaryKeyCallBacks,
            &macos_ffi::kCFTypeDictionaryValueCallBacks,
        );

        if options.is_null() {
            error!("[Hotkey] Failed to create CFDictionary for AXIsProcessTrustedWithOptions");
            return macos_ffi::AXIsProcessTrusted();
        }

        let trusted = macos_ffi::AXIsProcessTrustedWithOptions(options);
        macos_ffi::CFRelease(options as macos_ffi::CFTypeRef);
        info!("[Hotkey] Accessibility prompt shown, trusted={}", trusted);
        trusted
    }
}

impl MacOSHotkeyBackend {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            unavailable_reason: None,
        }
    }
}

impl Default for MacOSHotkeyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HotkeyBackend for MacOSHotkeyBackend {
    fn start(&mut self, sender: SyncSender<KeyEvent>) -> Result<(), String> {
        if self.running.load(Ordering::SeqCst) {
            return Err("Hotkey backend already running".to_string());
        }

        if !check_accessibility_permission() {
            let msg = "Global hotkeys require Accessibility permission. Grant permission in System Settings > Privacy & Security > Accessibility, then restart.".to_string();
            warn!("[Hotkey] Accessibility permission not granted");
            self.unavailable_reason = Some(msg.clone());
            return Err(msg);
        }

        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        let (ready_sender, ready_receiver) = std::sync::mpsc::channel::<Result<(), String>>();

        let handle = thread::Builder::new()
            .name("fe2cm-hotkey-hook".to_string())
            .spawn(move || {
                info!("[Hotkey] Starting macOS event tap");

                if let Err(e) = run_event_tap(running.clone(), sender, &ready_sender) {
                    error!("[Hotkey] Event tap error: {}", e);
                    let _ = ready_sender.send(Err(e));
                }
                running.store(false, Ordering::SeqCst);

                info!("[Hotkey] Event tap thread exiting");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                format!("Failed to spawn event tap thread: {}", e)
            })?;

        match ready_receiver.recv_timeout(std::time::Duration::from_secs(5)) {
            Ok(Ok(())) => {
                self.thread_handle = Some(handle);
                self.unavailable_reason = None;
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                self.unavailable_reason = Some(e.clone());
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err("Timed out waiting for event tap".to_string())
            }
        }
    }

    fn stop(&mut self) {
        if self.thread_handle.is_none() {
            return;
        }

        info!("[Hotkey] Stopping hotkey backend");
        self.running.store(false, Ordering::SeqCst);

        // The run loop checks the flag every 100ms
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_available(&self) -> bool {
        // Permission is checked when starting
        true
    }

    fn unavailable_reason(&self) -> Option<String> {
        self.unavailable_reason.clone()
    }
}

impl Drop for MacOSHotkeyBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

struct EventTapContext {
    sender: SyncSender<KeyEvent>,
    /// The tap itself, for re-enabling after a timeout
    tap: AtomicPtr<c_void>,
}

/// Run the CGEventTap on this thread until `running` is cleared.
fn run_event_tap(
    running: Arc<AtomicBool>,
    sender: SyncSender<KeyEvent>,
    ready: &std::sync::mpsc::Sender<Result<(), String>>,
) -> Result<(), String> {
    unsafe {
        let event_mask = (1 << macos_ffi::kCGEventKeyDown)
            | (1 << macos_ffi::kCGEventKeyUp)
            | (1 << macos_ffi::kCGEventFlagsChanged);

        let context = Box::new(EventTapContext {
            sender,
            tap: AtomicPtr::new(std::ptr::null_mut()),
        });
        let context_ptr = Box::into_raw(context);

        let tap = macos_ffi::CGEventTapCreate(
            macos_ffi::kCGSessionEventTap,
            macos_ffi::kCGHeadInsertEventTap,
            macos_ffi::kCGEventTapOptionListenOnly,
            event_mask,
            event_tap_callback,
            context_ptr as *mut c_void,
        );

        if tap.is_null() {
            drop(Box::from_raw(context_ptr));
            return Err("Failed to create event tap. Check Accessibility permissions.".to_string());
        }
        (*context_ptr).tap.store(tap, Ordering::SeqCst);

        let run_loop_source = macos_ffi::CFMachPortCreateRunLoopSource(std::ptr::null(), tap, 0);

        if run_loop_source.is_null() {
            macos_ffi::CFRelease(tap as *const c_void);
            drop(Box::from_raw(context_ptr));
            return Err("Failed to create run loop source".to_string());
        }

        let run_loop = macos_ffi::CFRunLoopGetCurrent();
        macos_ffi::CFRunLoopAddSource(run_loop, run_loop_source, macos_ffi::kCFRunLoopCommonModes);

        macos_ffi::CGEventTapEnable(tap, true);

        debug!("[Hotkey] Event tap created and enabled");
        let _ = ready.send(Ok(()));

        while running.load(Ordering::SeqCst) {
            let result = macos_ffi::CFRunLoopRunInMode(macos_ffi::kCFRunLoopDefaultMode, 0.1, true);

            if result == macos_ffi::kCFRunLoopRunFinished {
                break;
            }
        }

        macos_ffi::CGEventTapEnable(tap, false);
        macos_ffi::CFRunLoopRemoveSource(
            run_loop,
            run_loop_source,
            macos_ffi::kCFRunLoopCommonModes,
        );
        macos_ffi::CFRelease(run_loop_source as *const c_void);
        macos_ffi::CFRelease(tap as *const c_void);
        // Drops the sender, which ends the dispatcher
        drop(Box::from_raw(context_ptr));

        debug!("[Hotkey] Event tap cleaned up");
    }

    Ok(())
}

extern "C" fn event_tap_callback(
    _proxy: macos_ffi::CGEventTapProxy,
    event_type: macos_ffi::CGEventType,
    event: macos_ffi::CGEventRef,
    user_info: *mut c_void,
) -> macos_ffi::CGEventRef {
    let context = unsafe { &*(user_info as *const EventTapContext) };

    if event_type == macos_ffi::kCGEventTapDisabledByTimeout
        || event_type == macos_ffi::kCGEventTapDisabledByUserInput
    {
        warn!("[Hotkey] Event tap disabled by the system, re-enabling");
        let tap = context.tap.load(Ordering::SeqCst);
        if !tap.is_null() {
            unsafe { macos_ffi::CGEventTapEnable(tap, true) };
        }
        return event;
    }

    let code = unsafe {
        macos_ffi::CGEventGetIntegerValueField(event, macos_ffi::kCGKeyboardEventKeycode)
    } as u16;
    let flags = unsafe { macos_ffi::CGEventGetFlags(event) };
    let modifiers = modifiers_from_flags(flags);

    let Some(keycode) = macos_to_keycode(code) else {
        debug!("[Hotkey] Event tap: keycode=0x{:02X} -> unmapped", code);
        return event;
    };

    let key_event = if event_type == macos_ffi::kCGEventFlagsChanged {
        // Modifier keys only report flag changes; the flag tells press from release.
        let is_pressed = if modifiers_held(keycode, modifiers) {
            true
        } else if code == keycode::CAPS_LOCK {
            flags & macos_ffi::kCGEventFlagMaskAlphaShift != 0
        } else {
            false
        };
        if is_pressed {
            KeyEvent::down(keycode, modifiers)
        } else {
            KeyEvent::up(keycode, modifiers)
        }
    } else if event_type == macos_ffi::kCGEventKeyDown {
        KeyEvent::down(keycode, modifiers)
    } else if event_type == macos_ffi::kCGEventKeyUp {
        KeyEvent::up(keycode, modifiers)
    } else {
        return event;
    };

    forward_event(&context.sender, key_event);
    event
}

/// Whether the flag for this modifier key is set.
fn modifiers_held(keycode: Keycode, modifiers: ModifierState) -> bool {
    match keycode {
        k if k == modifier::CONTROL_LEFT || k == modifier::CONTROL_RIGHT => modifiers.ctrl,
        k if k == modifier::ALT_LEFT || k == modifier::ALT_RIGHT => modifiers.alt,
        k if k == modifier::SHIFT_LEFT || k == modifier::SHIFT_RIGHT => modifiers.shift,
        k if k == modifier::META_LEFT || k == modifier::META_RIGHT => modifiers.meta,
        _ => false,
    }
}

/// FFI bindings for macOS APIs
#[allow(non_upper_case_globals)]
mod macos_ffi {
    use std::ffi::c_void;

    // Types
    pub type CGEventTapProxy = *mut c_void;
    pub type CGEventRef = *mut c_void;
    pub type CGEventType = u32;
    pub type CGEventFlags = u64;
    pub type CFMachPortRef = *mut c_void;
    pub type CFRunLoopSourceRef = *mut c_void;
    pub type CFRunLoopRef = *mut c_void;
    pub type CFAllocatorRef = *const c_void;
    pub type CFStringRef = *const c_void;
    pub type CFTypeRef = *const c_void;

    // Event types
    pub const kCGEventKeyDown: CGEventType = 10;
    pub const kCGEventKeyUp: CGEventType = 11;
    pub const kCGEventFlagsChanged: CGEventType = 12;
    pub const kCGEventTapDisabledByTimeout: CGEventType = 0xFFFF_FFFE;
    pub const kCGEventTapDisabledByUserInput: CGEventType = 0xFFFF_FFFF;

    // Event tap locations
    pub const kCGSessionEventTap: u32 = 1;
    pub const kCGHeadInsertEventTap: u32 = 0;
    pub const kCGEventTapOptionListenOnly: u32 = 1;

    // Event field keys
    pub const kCGKeyboardEventKeycode: u32 = 9;

    // Event flags
    pub const kCGEventFlagMaskAlternate: CGEventFlags = 0x00080000;
    pub const kCGEventFlagMaskControl: CGEventFlags = 0x00040000;
    pub const kCGEventFlagMaskShift: CGEventFlags = 0x00020000;
    pub const kCGEventFlagMaskAlphaShift: CGEventFlags = 0x00010000;
    pub const kCGEventFlagMaskCommand: CGEventFlags = 0x00100000;

    // Run loop constants
    pub const kCFRunLoopRunFinished: i32 = 1;

    // Callback type
    pub type CGEventTapCallBack =
        extern "C" fn(CGEventTapProxy, CGEventType, CGEventRef, *mut c_void) -> CGEventRef;

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        pub static kCFRunLoopCommonModes: CFStringRef;
        pub static kCFRunLoopDefaultMode: CFStringRef;

        pub fn CFRunLoopGetCurrent() -> CFRunLoopRef;
        pub fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);
        pub fn CFRunLoopRemoveSource(
            rl: CFRunLoopRef,
            source: CFRunLoopSourceRef,
            mode: CFStringRef,
        );
        pub fn CFRunLoopRunInMode(
            mode: CFStringRef,
            seconds: f64,
            return_after_source_handled: bool,
        ) -> i32;
        pub fn CFMachPortCreateRunLoopSource(
            allocator: CFAllocatorRef,
            port: CFMachPortRef,
            order: i64,
        ) -> CFRunLoopSourceRef;
        pub fn CFRelease(cf: CFTypeRef);
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        pub fn CGEventTapCreate(
            tap: u32,
            place: u32,
            options: u32,
            events_of_interest: u64,
            callback: CGEventTapCallBack,
            user_info: *mut c_void,
        ) -> CFMachPortRef;
        pub fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
        pub fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
        pub fn CGEventGetFlags(event: CGEventRef) -> CGEventFlags;
    }

    pub type CFDictionaryRef = *const c_void;
    pub type CFIndex = isize;

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        pub static kCFBooleanTrue: CFTypeRef;
        pub static kCFTypeDictionaryKeyCallBacks: c_void;
        pub static kCFTypeDictionaryValueCallBacks: c_void;
        pub fn CFDictionaryCreate(
            allocator: CFAllocatorRef,
            keys: *const CFTypeRef,
            values: *const CFTypeRef,
            num_values: CFIndex,
            key_callbacks: *const c_void,
            value_callbacks: *const c_void,
        ) -> CFDictionaryRef;
    }

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        pub static kAXTrustedCheckOptionPrompt: CFStringRef;

        pub fn AXIsProcessTrusted() -> bool;

        pub fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mapped_key_exists_in_tables() {
        for code in 0u16..0x80 {
            if let Some(name) = macos_key_name(code) {
                assert!(keymap::keycode_for(name).is_some(), "missing key {}", name);
            }
        }
    }

    #[test]
    fn test_modifier_keys_map_to_modifier_keycodes() {
        assert_eq!(macos_to_keycode(keycode::LEFT_META), Some(modifier::META_LEFT));
        assert_eq!(macos_to_keycode(keycode::RIGHT_OPTION), Some(modifier::ALT_RIGHT));
        assert!(keymap::is_modifier_keycode(macos_to_keycode(keycode::LEFT_SHIFT).unwrap()));
    }

    #[test]
    fn test_flags_to_modifiers() {
        let flags = macos_ffi::kCGEventFlagMaskCommand | macos_ffi::kCGEventFlagMaskShift;
        assert_eq!(modifiers_from_flags(flags), ModifierState::new(false, false, true, true));
    }
}
