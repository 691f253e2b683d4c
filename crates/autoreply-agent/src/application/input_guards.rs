//! Scoped guards for the chord path.
//!
//! Both guards undo their effect exactly once: either through the explicit
//! `detach` / `release` call on the happy path, or from `Drop` when an error
//! unwinds the sequence early.

use autoreply_core::{KeyboardStateSnapshot, WindowHandle};
use tracing::{debug, warn};

use super::inject_key::{InjectionError, WindowMessaging};

// ── ThreadInputBridge ─────────────────────────────────────────────────────────

/// Joins the caller's input queue with the thread that owns a target window.
///
/// While attached, keyboard-state reads and writes made by the caller act on
/// the buffer the target window reads from.
pub struct ThreadInputBridge<'a, P: WindowMessaging> {
    platform: &'a P,
    caller: u32,
    target: u32,
    attached: bool,
}

impl<'a, P: WindowMessaging> ThreadInputBridge<'a, P> {
    /// Activates `hwnd`, then attaches the calling thread to its owner thread.
    ///
    /// When the caller already owns the window no attachment is made and the
    /// returned bridge is a no-op.
    ///
    /// # Errors
    ///
    /// [`InjectionError::WindowGone`] if the window has no owner thread, or
    /// [`InjectionError::BridgeAttachFailed`] if the OS refused the attach.
    pub fn attach(platform: &'a P, hwnd: WindowHandle) -> Result<Self, InjectionError> {
        let target = platform
            .window_thread_id(hwnd)
            .ok_or(InjectionError::WindowGone)?;
        let caller = platform.current_thread_id();

        platform.activate(hwnd);

        if caller == target {
            debug!(thread_id = target, "target window owned by caller; no bridge needed");
            return Ok(Self {
                platform,
                caller,
                target,
                attached: false,
            });
        }

        platform
            .attach_thread_input(caller, target, true)
            .map_err(|e| InjectionError::BridgeAttachFailed {
                thread_id: target,
                reason: e.0,
            })?;
        debug!(caller, target, "input queues attached");

        Ok(Self {
            platform,
            caller,
            target,
            attached: true,
        })
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Detaches the queues.  Calling it again, or dropping afterwards, does
    /// nothing.  A failed detach is logged and not retried.
    pub fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        match self
            .platform
            .attach_thread_input(self.caller, self.target, false)
        {
            Ok(()) => debug!(caller = self.caller, target = self.target, "input queues detached"),
            Err(e) => warn!(
                caller = self.caller,
                target = self.target,
                "failed to detach input queues: {e}"
            ),
        }
    }
}

impl<P: WindowMessaging> Drop for ThreadInputBridge<'_, P> {
    fn drop(&mut self) {
        self.detach();
    }
}

// ── KeyboardStateGuard ────────────────────────────────────────────────────────

/// Captures the keyboard-state buffer and puts it back when done.
pub struct KeyboardStateGuard<'a, P: WindowMessaging> {
    platform: &'a P,
    original: Option<KeyboardStateSnapshot>,
}

impl<'a, P: WindowMessaging> KeyboardStateGuard<'a, P> {
    /// Reads the current buffer so it can be restored later.
    ///
    /// # Errors
    ///
    /// [`InjectionError::StateApplyFailed`] if the buffer could not be read.
    pub fn acquire(platform: &'a P) -> Result<Self, InjectionError> {
        let original = platform
            .keyboard_state()
            .map_err(|e| InjectionError::StateApplyFailed(e.0))?;
        Ok(Self {
            platform,
            original: Some(original),
        })
    }

    /// Installs `state` as the current buffer.
    pub fn apply(&mut self, state: &KeyboardStateSnapshot) -> Result<(), InjectionError> {
        self.platform
            .set_keyboard_state(state)
            .map_err(|e| InjectionError::StateApplyFailed(e.0))
    }

    /// Restores the captured buffer.  Only the first call does anything.
    ///
    /// # Errors
    ///
    /// [`InjectionError::StateRestoreFailed`] if the OS rejected the buffer;
    /// the guard is spent either way.
    pub fn release(&mut self) -> Result<(), InjectionError> {
        match self.original.take() {
            Some(original) => self
                .platform
                .set_keyboard_state(&original)
                .map_err(|e| InjectionError::StateRestoreFailed(e.0)),
            None => Ok(()),
        }
    }

    pub fn is_released(&self) -> bool {
        self.original.is_none()
    }
}

impl<P: WindowMessaging> Drop for KeyboardStateGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{e}");
        }
    }
}
