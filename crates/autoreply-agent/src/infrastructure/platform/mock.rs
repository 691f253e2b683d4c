//! In-memory desktop for unit and integration tests.
//!
//! `MockDesktop` stands in for the Win32 window manager.  It keeps a small
//! table of windows, a keyboard-state buffer, and a clipboard, and records
//! every OS call it receives in order so tests can assert on exact sequences.
//!
//! It also plays the part of a chat client closely enough to exercise the
//! driver end to end:
//!
//! - `Ctrl+A` posted to a window marks its content as selected.
//! - `Ctrl+C` posted to a window with a selection copies the content to the
//!   clipboard and bumps the clipboard sequence number.
//! - `Enter` sent to a window submits its current text and clears it.
//!
//! Modifiers only count when the keyboard-state buffer says they are held
//! *and* the caller is attached to the window's thread, which is what the
//! real target would observe.
//!
//! # Failure injection
//!
//! [`FailPoint`]s make individual calls fail so cleanup paths can be tested
//! without a broken OS.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use autoreply_core::{
    keyevent::UsQwertyLayout, KeyEventMessage, KeyTransition, KeyboardLayout,
    KeyboardStateSnapshot, VirtualKey, WindowHandle,
};

use crate::application::chat_window::DesktopSession;
use crate::application::inject_key::{PlatformError, WindowMessaging};

/// Thread id reported for the caller.
pub const CALLER_THREAD: u32 = 1;

const FIRST_WINDOW_THREAD: u32 = 100;
const FIRST_HANDLE: isize = 0x1000;

/// One recorded OS call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    IsWindow(WindowHandle),
    WindowThreadId(WindowHandle),
    Activate(WindowHandle),
    Attach { from: u32, to: u32 },
    Detach { from: u32, to: u32 },
    GetKeyboardState,
    SetKeyboardState(KeyboardStateSnapshot),
    Send { hwnd: WindowHandle, message: KeyEventMessage },
    Post { hwnd: WindowHandle, message: KeyEventMessage },
    Flush(WindowHandle),
    FindWindow(String),
    FindChild { parent: WindowHandle, class: String },
    SetText { hwnd: WindowHandle, text: String },
    ClipboardSequence,
    ReadClipboard,
}

impl PlatformCall {
    /// Short name used for sequence assertions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::IsWindow(_) => "is_window",
            Self::WindowThreadId(_) => "window_thread_id",
            Self::Activate(_) => "activate",
            Self::Attach { .. } => "attach",
            Self::Detach { .. } => "detach",
            Self::GetKeyboardState => "get_state",
            Self::SetKeyboardState(_) => "set_state",
            Self::Send { .. } => "send",
            Self::Post { .. } => "post",
            Self::Flush(_) => "flush",
            Self::FindWindow(_) => "find_window",
            Self::FindChild { .. } => "find_child",
            Self::SetText { .. } => "set_text",
            Self::ClipboardSequence => "clipboard_sequence",
            Self::ReadClipboard => "read_clipboard",
        }
    }

    fn is_key_message(&self) -> bool {
        matches!(self, Self::Send { .. } | Self::Post { .. })
    }
}

/// A call that should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// `attach_thread_input(.., true)` fails.
    Attach,
    /// Reading the keyboard state fails.
    GetState,
    /// The first keyboard-state write fails.
    ApplyState,
    /// The second keyboard-state write fails.
    RestoreState,
    /// Every posted message is rejected.
    Post,
    /// Every sent message is rejected.
    Send,
    /// The target window closes as soon as the bridge attaches.
    VanishOnAttach,
    /// Reading the clipboard fails.
    Clipboard,
}

#[derive(Debug, Clone)]
struct MockWindow {
    handle: WindowHandle,
    title: String,
    class: String,
    parent: Option<WindowHandle>,
    thread: u32,
    content: String,
    selected: bool,
}

#[derive(Debug, Default)]
struct DesktopState {
    windows: Vec<MockWindow>,
    keyboard: KeyboardStateSnapshot,
    attached: Vec<(u32, u32)>,
    clipboard: Option<String>,
    clipboard_sequence: u32,
    submitted: Vec<String>,
    state_writes: usize,
    hung: bool,
    next_handle: isize,
    next_thread: u32,
}

/// Recording fake of the desktop.  Safe to share across threads in an `Arc`.
#[derive(Default)]
pub struct MockDesktop {
    state: Mutex<DesktopState>,
    calls: Mutex<Vec<PlatformCall>>,
    failures: Vec<FailPoint>,
}

impl MockDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level window owned by a fresh thread.
    pub fn with_window(self, title: &str, class: &str) -> Self {
        {
            let mut state = self.state();
            let thread = state.allocate_thread();
            state.add_window(title, class, None, thread, "");
        }
        self
    }

    /// Adds a child control under the first top-level window titled
    /// `parent_title`, on the parent's thread.
    ///
    /// # Panics
    ///
    /// If no such parent exists; builders are test-only.
    pub fn with_child(self, parent_title: &str, class: &str, content: &str) -> Self {
        {
            let mut state = self.state();
            let parent = state
                .windows
                .iter()
                .find(|w| w.parent.is_none() && w.title == parent_title)
                .map(|w| (w.handle, w.thread))
                .unwrap_or_else(|| panic!("no top-level window titled {parent_title:?}"));
            state.add_window("", class, Some(parent.0), parent.1, content);
        }
        self
    }

    /// A chat window titled `title` with a transcript list control and an
    /// input box, using the default class names.
    pub fn chat_app(title: &str, transcript: &str) -> Self {
        Self::new()
            .with_window(title, "#32770")
            .with_child(title, "EVA_VH_ListControl_Dblclk", transcript)
            .with_child(title, "RichEdit50W", "")
    }

    pub fn failing_at(mut self, point: FailPoint) -> Self {
        self.failures.push(point);
        self
    }

    /// Puts `text` on the clipboard without changing the sequence number.
    pub fn with_clipboard(self, text: &str) -> Self {
        self.state().clipboard = Some(text.to_string());
        self
    }

    /// Seeds the keyboard-state buffer.  Not counted as a state write.
    pub fn with_keyboard_state(self, snapshot: KeyboardStateSnapshot) -> Self {
        self.state().keyboard = snapshot;
        self
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the `Send` and `Post` calls.
    pub fn dispatched_messages(&self) -> Vec<PlatformCall> {
        self.calls()
            .into_iter()
            .filter(PlatformCall::is_key_message)
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&PlatformCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn current_keyboard_state(&self) -> KeyboardStateSnapshot {
        self.state().keyboard.clone()
    }

    /// `true` while any input-queue attachment is outstanding.
    pub fn is_attached(&self) -> bool {
        !self.state().attached.is_empty()
    }

    pub fn window_by_title(&self, title: &str) -> Option<WindowHandle> {
        self.state()
            .windows
            .iter()
            .find(|w| w.parent.is_none() && w.title == title)
            .map(|w| w.handle)
    }

    pub fn child_by_class(&self, parent: WindowHandle, class: &str) -> Option<WindowHandle> {
        self.state().find_child(parent, class)
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.state().clipboard.clone()
    }

    pub fn window_text(&self, hwnd: WindowHandle) -> Option<String> {
        self.state().window(hwnd).map(|w| w.content.clone())
    }

    /// Texts submitted with Enter, oldest first.
    pub fn submitted_messages(&self) -> Vec<String> {
        self.state().submitted.clone()
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Removes `hwnd` and any children.
    pub fn close_window(&self, hwnd: WindowHandle) {
        self.state()
            .windows
            .retain(|w| w.handle != hwnd && w.parent != Some(hwnd));
    }

    pub fn set_window_thread(&self, hwnd: WindowHandle, thread: u32) {
        let mut state = self.state();
        for w in state
            .windows
            .iter_mut()
            .filter(|w| w.handle == hwnd || w.parent == Some(hwnd))
        {
            w.thread = thread;
        }
    }

    /// A hung target never acknowledges a queue flush.
    pub fn set_hung(&self, hung: bool) {
        self.state().hung = hung;
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn state(&self) -> MutexGuard<'_, DesktopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: PlatformCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn fails(&self, point: FailPoint) -> bool {
        self.failures.contains(&point)
    }

    fn mock_error(what: &str) -> PlatformError {
        PlatformError(format!("mock failure: {what}"))
    }

    /// Reacts to a key-down the way the simulated chat client would.
    fn deliver(&self, hwnd: WindowHandle, message: &KeyEventMessage) {
        if message.kind.transition() != KeyTransition::Down {
            return;
        }
        let mut state = self.state();
        let Some(thread) = state.window(hwnd).map(|w| w.thread) else {
            return;
        };
        let ctrl_visible = state.keyboard.is_pressed(VirtualKey::CONTROL)
            && (thread == CALLER_THREAD || state.attached.contains(&(CALLER_THREAD, thread)));

        match message.key {
            VirtualKey(b'A') if ctrl_visible => {
                if let Some(w) = state.window_mut(hwnd) {
                    w.selected = true;
                }
            }
            VirtualKey(b'C') if ctrl_visible => {
                let copied = state
                    .window(hwnd)
                    .filter(|w| w.selected)
                    .map(|w| w.content.clone());
                if let Some(text) = copied {
                    state.clipboard = Some(text);
                    state.clipboard_sequence += 1;
                }
            }
            VirtualKey::RETURN if !ctrl_visible => {
                let text = state
                    .window_mut(hwnd)
                    .map(|w| std::mem::take(&mut w.content));
                if let Some(text) = text {
                    state.submitted.push(text);
                }
            }
            _ => {}
        }
    }
}

impl DesktopState {
    fn allocate_thread(&mut self) -> u32 {
        let thread = FIRST_WINDOW_THREAD + self.next_thread;
        self.next_thread += 1;
        thread
    }

    fn add_window(
        &mut self,
        title: &str,
        class: &str,
        parent: Option<WindowHandle>,
        thread: u32,
        content: &str,
    ) {
        let handle = WindowHandle(FIRST_HANDLE + self.next_handle);
        self.next_handle += 1;
        self.windows.push(MockWindow {
            handle,
            title: title.to_string(),
            class: class.to_string(),
            parent,
            thread,
            content: content.to_string(),
            selected: false,
        });
    }

    fn window(&self, hwnd: WindowHandle) -> Option<&MockWindow> {
        self.windows.iter().find(|w| w.handle == hwnd)
    }

    fn window_mut(&mut self, hwnd: WindowHandle) -> Option<&mut MockWindow> {
        self.windows.iter_mut().find(|w| w.handle == hwnd)
    }

    fn find_child(&self, parent: WindowHandle, class: &str) -> Option<WindowHandle> {
        self.windows
            .iter()
            .find(|w| w.parent == Some(parent) && w.class == class)
            .map(|w| w.handle)
    }
}

impl KeyboardLayout for MockDesktop {
    fn scan_code(&self, key: VirtualKey) -> u16 {
        UsQwertyLayout.scan_code(key)
    }
}

impl WindowMessaging for MockDesktop {
    fn is_window(&self, hwnd: WindowHandle) -> bool {
        self.record(PlatformCall::IsWindow(hwnd));
        self.state().window(hwnd).is_some()
    }

    fn window_thread_id(&self, hwnd: WindowHandle) -> Option<u32> {
        self.record(PlatformCall::WindowThreadId(hwnd));
        self.state().window(hwnd).map(|w| w.thread)
    }

    fn current_thread_id(&self) -> u32 {
        CALLER_THREAD
    }

    fn activate(&self, hwnd: WindowHandle) {
        self.record(PlatformCall::Activate(hwnd));
    }

    fn attach_thread_input(&self, from: u32, to: u32, attach: bool) -> Result<(), PlatformError> {
        if !attach {
            self.record(PlatformCall::Detach { from, to });
            self.state().attached.retain(|&pair| pair != (from, to));
            return Ok(());
        }

        self.record(PlatformCall::Attach { from, to });
        if self.fails(FailPoint::Attach) {
            return Err(Self::mock_error("AttachThreadInput"));
        }
        let mut state = self.state();
        state.attached.push((from, to));
        if self.fails(FailPoint::VanishOnAttach) {
            state.windows.retain(|w| w.thread != to);
        }
        Ok(())
    }

    fn keyboard_state(&self) -> Result<KeyboardStateSnapshot, PlatformError> {
        self.record(PlatformCall::GetKeyboardState);
        if self.fails(FailPoint::GetState) {
            return Err(Self::mock_error("GetKeyboardState"));
        }
        Ok(self.state().keyboard.clone())
    }

    fn set_keyboard_state(&self, snapshot: &KeyboardStateSnapshot) -> Result<(), PlatformError> {
        self.record(PlatformCall::SetKeyboardState(snapshot.clone()));
        let mut state = self.state();
        state.state_writes += 1;
        let failing = match state.state_writes {
            1 => self.fails(FailPoint::ApplyState),
            2 => self.fails(FailPoint::RestoreState),
            _ => false,
        };
        if failing {
            return Err(Self::mock_error("SetKeyboardState"));
        }
        state.keyboard = snapshot.clone();
        Ok(())
    }

    fn send_key_message(
        &self,
        hwnd: WindowHandle,
        message: &KeyEventMessage,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Send {
            hwnd,
            message: *message,
        });
        if self.fails(FailPoint::Send) {
            return Err(Self::mock_error("SendMessageW"));
        }
        self.deliver(hwnd, message);
        Ok(())
    }

    fn post_key_message(
        &self,
        hwnd: WindowHandle,
        message: &KeyEventMessage,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Post {
            hwnd,
            message: *message,
        });
        if self.fails(FailPoint::Post) {
            return Err(Self::mock_error("PostMessageW"));
        }
        self.deliver(hwnd, message);
        Ok(())
    }

    fn flush_message_queue(&self, hwnd: WindowHandle, _timeout: Duration) -> bool {
        self.record(PlatformCall::Flush(hwnd));
        !self.state().hung
    }
}

impl DesktopSession for MockDesktop {
    fn find_window(&self, title: &str) -> Option<WindowHandle> {
        self.record(PlatformCall::FindWindow(title.to_string()));
        self.window_by_title(title)
    }

    fn find_child(&self, parent: WindowHandle, class: &str) -> Option<WindowHandle> {
        self.record(PlatformCall::FindChild {
            parent,
            class: class.to_string(),
        });
        self.state().find_child(parent, class)
    }

    fn set_window_text(&self, hwnd: WindowHandle, text: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::SetText {
            hwnd,
            text: text.to_string(),
        });
        let mut state = self.state();
        let window = state
            .window_mut(hwnd)
            .ok_or_else(|| Self::mock_error("WM_SETTEXT on missing window"))?;
        window.content = text.to_string();
        Ok(())
    }

    fn clipboard_sequence(&self) -> u32 {
        self.record(PlatformCall::ClipboardSequence);
        self.state().clipboard_sequence
    }

    fn read_clipboard_text(&self) -> Result<Option<String>, PlatformError> {
        self.record(PlatformCall::ReadClipboard);
        if self.fails(FailPoint::Clipboard) {
            return Err(Self::mock_error("OpenClipboard"));
        }
        Ok(self.state().clipboard.clone())
    }
}
