//! Windows keyboard hook using `WH_KEYBOARD_LL`.
//!
//! The hook is installed on a dedicated thread that runs a message loop;
//! Windows calls the hook procedure on that thread for every key transition
//! system-wide. The procedure translates the event and hands it to the
//! dispatcher channel without blocking, then always passes the event on.

use super::backend::{forward_event, HotkeyBackend, ModifierTracker};
use super::scancode::keycode_from_scan;
use fe2cm_common::KeyEvent;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT,
    LLKHF_EXTENDED, MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT,
    WM_SYSKEYDOWN, WM_SYSKEYUP,
};

/// How long `start` waits for the hook thread before giving up on it.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Windows keyboard hook backend
pub struct WindowsHotkeyBackend {
    /// Whether the hook is currently installed
    running: Arc<AtomicBool>,
    /// Handle to the hook thread
    thread_handle: Option<JoinHandle<()>>,
    /// Thread ID for posting quit message
    thread_id: Option<u32>,
    /// Last known unavailability reason
    unavailable_reason: Option<String>,
}

impl WindowsHotkeyBackend {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
            thread_id: None,
            unavailable_reason: None,
        }
    }
}

impl Default for WindowsHotkeyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HotkeyBackend for WindowsHotkeyBackend {
    fn start(&mut self, sender: SyncSender<KeyEvent>) -> Result<(), String> {
        if self.running.load(Ordering::SeqCst) {
            return Err("Hotkey backend already running".to_string());
        }

        let running = self.running.clone();

        // The hook thread reports its ID once the hook is installed, or why it failed
        let (ready_sender, ready_receiver) = mpsc::channel::<Result<u32, String>>();

        let handle = thread::Builder::new()
            .name("fe2cm-hotkey-hook".to_string())
            .spawn(move || {
                info!("[Hotkey] Starting Windows keyboard hook thread");
                run_hook_loop(running, sender, ready_sender);
                info!("[Hotkey] Hook thread exiting");
            })
            .map_err(|e| format!("Failed to spawn hook thread: {}", e))?;

        match ready_receiver.recv_timeout(READY_TIMEOUT) {
            Ok(Ok(tid)) => {
                self.thread_id = Some(tid);
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
                warn!("[Hotkey] Hook thread did not report within {:?}", READY_TIMEOUT);
                reap_hook_thread(&ready_receiver, handle, post_quit);
                self.running.store(false, Ordering::SeqCst);
                let reason = "Timed out waiting for keyboard hook thread".to_string();
                self.unavailable_reason = Some(reason.clone());
                Err(reason)
            }
        }
    }

    fn stop(&mut self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        info!("[Hotkey] Stopping hotkey backend");

        if let Some(tid) = self.thread_id.take() {
            post_quit(tid);
        }

        // Wait for the hook to be removed
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_available(&self) -> bool {
        // Low-level hooks need no special permissions
        true
    }

    fn unavailable_reason(&self) -> Option<String> {
        self.unavailable_reason.clone()
    }
}

impl Drop for WindowsHotkeyBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

// Thread-local context for the hook procedure
thread_local! {
    static HOOK_CONTEXT: RefCell<Option<HookContext>> = const { RefCell::new(None) };
}

struct HookContext {
    sender: SyncSender<KeyEvent>,
    modifiers: ModifierTracker,
}

/// Install the hook and pump messages until WM_QUIT.
/// Post WM_QUIT to the hook thread's message loop.
fn post_quit(tid: u32) {
    unsafe {
        if let Err(e) = PostThreadMessageW(tid, WM_QUIT, WPARAM(0), LPARAM(0)) {
            error!("[Hotkey] Failed to post WM_QUIT: {}", e);
        }
    }
}

/// Wait for a hook thread that missed the ready timeout, tear down the hook
/// it installed late, and join it.
fn reap_hook_thread(
    ready: &Receiver<Result<u32, String>>,
    handle: JoinHandle<()>,
    quit: impl FnOnce(u32),
) {
    match ready.recv() {
        Ok(Ok(tid)) => {
            debug!("[Hotkey] Late hook on thread {}, removing it", tid);
            quit(tid);
        }
        Ok(Err(e)) => debug!("[Hotkey] Late hook thread failed: {}", e),
        Err(_) => {}
    }
    if handle.join().is_err() {
        error!("[Hotkey] Hook thread panicked");
    }
}

fn run_hook_loop(
    running: Arc<AtomicBool>,
    sender: SyncSender<KeyEvent>,
    ready: mpsc::Sender<Result<u32, String>>,
) {
    unsafe {
        HOOK_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = Some(HookContext {
                sender,
                modifiers: ModifierTracker::new(),
            });
        });

        let hook = match SetWindowsHookExW(WH_KEYBOARD_LL, Some(hook_proc), None, 0) {
            Ok(hook) => hook,
            Err(e) => {
                HOOK_CONTEXT.with(|ctx| *ctx.borrow_mut() = None);
                let _ = ready.send(Err(format!("Failed to install keyboard hook: {}", e)));
                return;
            }
        };

        // Create the message queue so WM_QUIT can be posted as soon as we report ready
        let mut msg = MSG::default();
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);

        running.store(true, Ordering::SeqCst);
        let _ = ready.send(Ok(GetCurrentThreadId()));
        debug!("[Hotkey] WH_KEYBOARD_LL installed");

        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
        debug!("[Hotkey] Received WM_QUIT, removing hook");

        if let Err(e) = UnhookWindowsHookEx(hook) {
            error!("[Hotkey] Failed to remove keyboard hook: {}", e);
        }

        // Dropping the context drops the sender, which ends the dispatcher.
        HOOK_CONTEXT.with(|ctx| *ctx.borrow_mut() = None);
        running.store(false, Ordering::SeqCst);
    }
}

/// Low-level keyboard hook procedure
unsafe extern "system" fn hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let is_down = match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(true),
            WM_KEYUP | WM_SYSKEYUP => Some(false),
            _ => None,
        };

        if let Some(is_down) = is_down {
            let kb = &*(lparam.0 as *const KBDLLHOOKSTRUCT);
            let extended = (kb.flags.0 & LLKHF_EXTENDED.0) != 0;
            match keycode_from_scan(kb.scanCode, extended, kb.vkCode) {
                Some(keycode) => {
                    HOOK_CONTEXT.with(|ctx| {
                        if let Some(ref mut context) = *ctx.borrow_mut() {
                            let event = context.modifiers.event(keycode, is_down);
                            forward_event(&context.sender, event);
                        }
                    });
                }
                None => {
                    debug!(
                        "[Hotkey] Hook event: vk=0x{:02X} scan=0x{:02X} ext={} -> unmapped",
                        kb.vkCode, kb.scanCode, extended
                    );
                }
            }
        }
    }

    CallNextHookEx(HHOOK::default(), code, wparam, lparam)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_late_hook_thread_is_told_to_quit_and_joined() {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
        let quit_tid = Arc::new(AtomicU32::new(0));
        let seen = quit_tid.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let _ = ready_tx.send(Ok(42));
            while seen.load(Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(5));
            }
        });

        assert!(ready_rx.recv_timeout(Duration::from_millis(1)).is_err());
        let quit = quit_tid.clone();
        reap_hook_thread(&ready_rx, handle, move |tid| quit.store(tid, Ordering::SeqCst));
        assert_eq!(quit_tid.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_late_hook_failure_needs_no_quit() {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
        let handle = thread::spawn(move || {
            let _ = ready_tx.send(Err("denied".to_string()));
        });
        reap_hook_thread(&ready_rx, handle, |_| panic!("no hook to remove"));
    }
}
