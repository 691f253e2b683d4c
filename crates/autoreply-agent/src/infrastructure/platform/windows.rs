//! Win32 desktop adapter.
//!
//! Key messages are delivered with `SendMessageW` / `PostMessageW` directly
//! to the target window, keyboard state is read and written with
//! `GetKeyboardState` / `SetKeyboardState`, and the clipboard is read as
//! `CF_UNICODETEXT`.

#![cfg(target_os = "windows")]

use std::time::Duration;

use autoreply_core::{KeyEventMessage, KeyboardLayout, KeyboardStateSnapshot, VirtualKey, WindowHandle};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, HANDLE, HGLOBAL, HWND, LPARAM, WPARAM};
use windows::Win32::System::DataExchange::{
    CloseClipboard, GetClipboardData, GetClipboardSequenceNumber, IsClipboardFormatAvailable,
    OpenClipboard,
};
use windows::Win32::System::Memory::{GlobalLock, GlobalSize, GlobalUnlock};
use windows::Win32::System::Threading::{AttachThreadInput, GetCurrentThreadId};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyboardState, MapVirtualKeyW, SetKeyboardState, MAPVK_VK_TO_VSC,
};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowExW, FindWindowW, GetWindowThreadProcessId, IsWindow, PostMessageW, SendMessageTimeoutW,
    SendMessageW, SMTO_ABORTIFHUNG, WA_ACTIVE, WM_ACTIVATE, WM_NULL, WM_SETTEXT,
};

use crate::application::chat_window::DesktopSession;
use crate::application::inject_key::{PlatformError, WindowMessaging};

use super::text_until_nul;

const CF_UNICODETEXT: u32 = 13;

/// The interactive desktop of the current session.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Desktop;

impl Win32Desktop {
    pub fn new() -> Self {
        Self
    }
}

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut _)
}

fn handle(hwnd: HWND) -> Option<WindowHandle> {
    let h = WindowHandle(hwnd.0 as isize);
    (!h.is_null()).then_some(h)
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn message_params(message: &KeyEventMessage) -> (u32, WPARAM, LPARAM) {
    (
        message.kind.message_id(),
        WPARAM(message.key.0 as usize),
        LPARAM(message.param.0 as isize),
    )
}

fn last_error(call: &str, e: windows::core::Error) -> PlatformError {
    PlatformError(format!("{call} failed: {e}"))
}

impl KeyboardLayout for Win32Desktop {
    fn scan_code(&self, key: VirtualKey) -> u16 {
        // SAFETY: MapVirtualKeyW has no pointer arguments.
        unsafe { MapVirtualKeyW(key.0 as u32, MAPVK_VK_TO_VSC) as u16 }
    }
}

impl WindowMessaging for Win32Desktop {
    fn is_window(&self, h: WindowHandle) -> bool {
        // SAFETY: IsWindow accepts any handle value, including stale ones.
        !h.is_null() && unsafe { IsWindow(hwnd(h)) }.as_bool()
    }

    fn window_thread_id(&self, h: WindowHandle) -> Option<u32> {
        // SAFETY: the process-id out pointer is optional and omitted.
        let thread = unsafe { GetWindowThreadProcessId(hwnd(h), None) };
        (thread != 0).then_some(thread)
    }

    fn current_thread_id(&self) -> u32 {
        // SAFETY: no arguments.
        unsafe { GetCurrentThreadId() }
    }

    fn activate(&self, h: WindowHandle) {
        // SAFETY: WM_ACTIVATE carries no pointers; a stale handle is ignored.
        unsafe {
            SendMessageW(hwnd(h), WM_ACTIVATE, WPARAM(WA_ACTIVE as usize), LPARAM(0));
        }
    }

    fn attach_thread_input(&self, from: u32, to: u32, attach: bool) -> Result<(), PlatformError> {
        // SAFETY: thread ids are plain integers; the OS validates them.
        let ok = unsafe { AttachThreadInput(from, to, BOOL::from(attach)) }.as_bool();
        if ok {
            Ok(())
        } else {
            Err(PlatformError(format!(
                "AttachThreadInput({from}, {to}, {attach}) returned FALSE"
            )))
        }
    }

    fn keyboard_state(&self) -> Result<KeyboardStateSnapshot, PlatformError> {
        let mut state = KeyboardStateSnapshot::cleared();
        // SAFETY: the buffer is exactly 256 bytes, as GetKeyboardState requires.
        unsafe { GetKeyboardState(&mut state.0) }.map_err(|e| last_error("GetKeyboardState", e))?;
        Ok(state)
    }

    fn set_keyboard_state(&self, state: &KeyboardStateSnapshot) -> Result<(), PlatformError> {
        // SAFETY: the buffer is exactly 256 bytes and outlives the call.
        unsafe { SetKeyboardState(state.as_bytes()) }.map_err(|e| last_error("SetKeyboardState", e))
    }

    fn send_key_message(
        &self,
        h: WindowHandle,
        message: &KeyEventMessage,
    ) -> Result<(), PlatformError> {
        let (msg, wparam, lparam) = message_params(message);
        // SAFETY: key messages carry no pointers.  The return value of a key
        // message is not a status code, so it is ignored.
        unsafe {
            SendMessageW(hwnd(h), msg, wparam, lparam);
        }
        Ok(())
    }

    fn post_key_message(
        &self,
        h: WindowHandle,
        message: &KeyEventMessage,
    ) -> Result<(), PlatformError> {
        let (msg, wparam, lparam) = message_params(message);
        // SAFETY: key messages carry no pointers.
        unsafe { PostMessageW(hwnd(h), msg, wparam, lparam) }
            .map_err(|e| last_error("PostMessageW", e))
    }

    fn flush_message_queue(&self, h: WindowHandle, timeout: Duration) -> bool {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        // SAFETY: WM_NULL carries no pointers and the result pointer is omitted.
        let result = unsafe {
            SendMessageTimeoutW(
                hwnd(h),
                WM_NULL,
                WPARAM(0),
                LPARAM(0),
                SMTO_ABORTIFHUNG,
                millis,
                None,
            )
        };
        result.0 != 0
    }
}

impl DesktopSession for Win32Desktop {
    fn find_window(&self, title: &str) -> Option<WindowHandle> {
        let title = to_wide(title);
        // SAFETY: `title` is NUL-terminated and lives for the call.
        unsafe { FindWindowW(PCWSTR::null(), PCWSTR(title.as_ptr())) }
            .ok()
            .and_then(handle)
    }

    fn find_child(&self, parent: WindowHandle, class: &str) -> Option<WindowHandle> {
        let class = to_wide(class);
        // SAFETY: `class` is NUL-terminated and lives for the call.
        unsafe {
            FindWindowExW(
                hwnd(parent),
                HWND::default(),
                PCWSTR(class.as_ptr()),
                PCWSTR::null(),
            )
        }
        .ok()
        .and_then(handle)
    }

    fn set_window_text(&self, h: WindowHandle, text: &str) -> Result<(), PlatformError> {
        let wide = to_wide(text);
        // SAFETY: WM_SETTEXT is sent synchronously, so `wide` outlives its use.
        let result = unsafe {
            SendMessageW(hwnd(h), WM_SETTEXT, WPARAM(0), LPARAM(wide.as_ptr() as isize))
        };
        if result.0 == 0 {
            return Err(PlatformError("WM_SETTEXT was rejected".to_string()));
        }
        Ok(())
    }

    fn clipboard_sequence(&self) -> u32 {
        // SAFETY: no arguments.
        unsafe { GetClipboardSequenceNumber() }
    }

    fn read_clipboard_text(&self) -> Result<Option<String>, PlatformError> {
        // SAFETY: the clipboard is opened and closed within this block, and
        // the locked buffer is only read while the lock is held.
        unsafe {
            if IsClipboardFormatAvailable(CF_UNICODETEXT).is_err() {
                return Ok(None);
            }
            OpenClipboard(HWND::default()).map_err(|e| last_error("OpenClipboard", e))?;
            let text = read_locked_unicode();
            let _ = CloseClipboard();
            text
        }
    }
}

/// Reads `CF_UNICODETEXT` from an already opened clipboard.
///
/// # Safety
///
/// The caller must hold the clipboard open.
unsafe fn read_locked_unicode() -> Result<Option<String>, PlatformError> {
    let data: HANDLE =
        GetClipboardData(CF_UNICODETEXT).map_err(|e| last_error("GetClipboardData", e))?;
    let global = HGLOBAL(data.0);
    let ptr = GlobalLock(global) as *const u16;
    if ptr.is_null() {
        return Err(PlatformError("GlobalLock returned null".to_string()));
    }
    // The allocation may lack a terminator; never read past its size.
    let units = GlobalSize(global) / std::mem::size_of::<u16>();
    let text = text_until_nul(std::slice::from_raw_parts(ptr, units));
    let _ = GlobalUnlock(global);
    Ok(Some(text))
}
