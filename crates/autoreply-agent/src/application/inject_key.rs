//! KeyInjector: delivers one logical keystroke to a target window.
//!
//! Keystrokes go straight into the target window's message queue rather than
//! through the global input stream, so the target does not need focus and the
//! user's own typing is left alone.
//!
//! # Two delivery paths
//!
//! - **Plain keys** (no modifiers) are *sent*: `SendMessage` blocks until the
//!   target has processed the down message, then the up message is sent.  No
//!   shared state is touched, so plain injection may run concurrently.
//!
//! - **Chords** (one or more modifiers) need the target to *see* Ctrl/Alt as
//!   held.  A window reads modifier state from its thread's keyboard-state
//!   buffer, so the injector joins the target thread's input queue
//!   ([`ThreadInputBridge`]), swaps in a buffer with the modifiers pressed
//!   ([`KeyboardStateGuard`]), *posts* the down/up pair, then restores the
//!   buffer and detaches.  The buffer is shared by every window on the joined
//!   thread, so at most one chord is in flight per process.
//!
//! Both guards release on drop, so every early return after the bridge is
//! attached still restores the keyboard state and detaches.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;

use autoreply_core::{
    KeyChord, KeyEventMessage, KeyStroke, KeyboardLayout, KeyboardStateSnapshot, ModifierSet,
    VirtualKey, WindowHandle,
};
use thiserror::Error;
use tracing::debug;

use super::input_guards::{KeyboardStateGuard, ThreadInputBridge};
use super::settle::SettleStrategy;

/// Error reported by an OS adapter call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

/// Error type for keystroke injection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectionError {
    /// The handle was not a live window at validation or revalidation time.
    #[error("target window no longer exists")]
    WindowGone,
    /// The caller could not join the target thread's input queue.
    #[error("could not attach to input queue of thread {thread_id}: {reason}")]
    BridgeAttachFailed { thread_id: u32, reason: String },
    /// Reading or installing the keyboard-state buffer failed.
    #[error("failed to apply keyboard state: {0}")]
    StateApplyFailed(String),
    /// The captured keyboard state could not be put back.
    #[error("failed to restore keyboard state: {0}")]
    StateRestoreFailed(String),
    /// The OS refused to queue or deliver a key message.
    #[error("key message delivery failed: {0}")]
    DeliveryFailed(String),
    /// Shutdown was requested before the chord sequence began.
    #[error("injection cancelled before modifier state was applied")]
    Cancelled,
}

/// OS operations the injector needs.
///
/// The Win32 implementation lives in `infrastructure::platform::windows`;
/// tests use `infrastructure::platform::mock::MockDesktop`, which records
/// every call in order.
pub trait WindowMessaging: KeyboardLayout + Send + Sync {
    /// `true` if `hwnd` currently identifies a live window.
    fn is_window(&self, hwnd: WindowHandle) -> bool;

    /// Thread that owns `hwnd`, or `None` if the window is gone.
    fn window_thread_id(&self, hwnd: WindowHandle) -> Option<u32>;

    /// Thread id of the caller.
    fn current_thread_id(&self) -> u32;

    /// Tells `hwnd` it has been activated (`WM_ACTIVATE` / `WA_ACTIVE`).
    fn activate(&self, hwnd: WindowHandle);

    /// Joins (`attach = true`) or splits the input queues of two threads.
    fn attach_thread_input(&self, from: u32, to: u32, attach: bool) -> Result<(), PlatformError>;

    /// Reads the calling thread's keyboard-state buffer.
    fn keyboard_state(&self) -> Result<KeyboardStateSnapshot, PlatformError>;

    /// Replaces the calling thread's keyboard-state buffer.
    fn set_keyboard_state(&self, state: &KeyboardStateSnapshot) -> Result<(), PlatformError>;

    /// Sends `message` and waits for the target to process it.
    fn send_key_message(
        &self,
        hwnd: WindowHandle,
        message: &KeyEventMessage,
    ) -> Result<(), PlatformError>;

    /// Queues `message` without waiting.
    fn post_key_message(
        &self,
        hwnd: WindowHandle,
        message: &KeyEventMessage,
    ) -> Result<(), PlatformError>;

    /// Waits until `hwnd`'s thread has drained its queue, at most `timeout`.
    ///
    /// Returns `false` when the wait timed out, which means delivery state
    /// is unknown, not that delivery failed.
    fn flush_message_queue(&self, hwnd: WindowHandle, timeout: Duration) -> bool;
}

/// Serializes the chord path across the whole process.
static CHORD_LOCK: Mutex<()> = Mutex::new(());

/// Delivers keystrokes to windows through a [`WindowMessaging`] platform.
pub struct KeyInjector<P> {
    platform: Arc<P>,
    settle: SettleStrategy,
    running: Arc<AtomicBool>,
}

impl<P: WindowMessaging> KeyInjector<P> {
    /// Creates an injector with the default settle strategy and no shutdown flag.
    pub fn new(platform: Arc<P>) -> Self {
        Self {
            platform,
            settle: SettleStrategy::default(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_settle(mut self, settle: SettleStrategy) -> Self {
        self.settle = settle;
        self
    }

    /// Shares the application's running flag.  Once it reads `false`, chords
    /// that have not yet attached to the target thread fail with
    /// [`InjectionError::Cancelled`].
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn settle_strategy(&self) -> SettleStrategy {
        self.settle
    }

    /// Delivers `key` with `modifiers` held to `hwnd`.
    ///
    /// # Errors
    ///
    /// - [`InjectionError::WindowGone`] if `hwnd` is not live; nothing is sent.
    /// - [`InjectionError::BridgeAttachFailed`], [`InjectionError::StateApplyFailed`]
    ///   or [`InjectionError::StateRestoreFailed`] from the chord path, after
    ///   cleanup has run.
    /// - [`InjectionError::DeliveryFailed`] if the OS rejected a message.
    /// - [`InjectionError::Cancelled`] if shutdown was requested first.
    pub fn post_key(
        &self,
        hwnd: WindowHandle,
        key: VirtualKey,
        modifiers: &ModifierSet,
        extended: bool,
    ) -> Result<(), InjectionError> {
        if !self.platform.is_window(hwnd) {
            return Err(InjectionError::WindowGone);
        }

        let stroke = KeyStroke::new(key, modifiers, extended, self.platform.as_ref());

        if modifiers.is_empty() {
            debug!(?hwnd, %key, "sending plain key");
            return self.send_plain(hwnd, &stroke);
        }

        let _exclusive = CHORD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(?hwnd, %key, ?modifiers, "posting chord");
        self.post_chord_locked(hwnd, modifiers, &stroke)
    }

    /// [`post_key`](Self::post_key) for a parsed [`KeyChord`].
    pub fn post_chord(&self, hwnd: WindowHandle, chord: &KeyChord) -> Result<(), InjectionError> {
        self.post_key(hwnd, chord.key, &chord.modifiers, chord.extended)
    }

    fn send_plain(&self, hwnd: WindowHandle, stroke: &KeyStroke) -> Result<(), InjectionError> {
        self.platform
            .send_key_message(hwnd, &stroke.down)
            .map_err(|e| InjectionError::DeliveryFailed(e.0))?;
        self.platform
            .send_key_message(hwnd, &stroke.up)
            .map_err(|e| InjectionError::DeliveryFailed(e.0))
    }

    fn post_chord_locked(
        &self,
        hwnd: WindowHandle,
        modifiers: &ModifierSet,
        stroke: &KeyStroke,
    ) -> Result<(), InjectionError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(InjectionError::Cancelled);
        }

        let platform = self.platform.as_ref();
        let mut bridge = ThreadInputBridge::attach(platform, hwnd)?;
        let mut state = KeyboardStateGuard::acquire(platform)?;
        state.apply(&KeyboardStateSnapshot::with_modifiers(modifiers))?;
        self.settle.settle(platform, hwnd);

        if !platform.is_window(hwnd) {
            return Err(InjectionError::WindowGone);
        }
        platform
            .post_key_message(hwnd, &stroke.down)
            .map_err(|e| InjectionError::DeliveryFailed(e.0))?;
        self.settle.settle(platform, hwnd);
        platform
            .post_key_message(hwnd, &stroke.up)
            .map_err(|e| InjectionError::DeliveryFailed(e.0))?;
        self.settle.settle(platform, hwnd);

        state.release()?;
        self.settle.settle(platform, hwnd);
        bridge.detach();
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::platform::mock::{FailPoint, MockDesktop, PlatformCall};
    use autoreply_core::{KeyMessageKind, ParamWord};

    const A: VirtualKey = VirtualKey(0x41);

    fn injector(desktop: MockDesktop) -> (KeyInjector<MockDesktop>, Arc<MockDesktop>, WindowHandle) {
        let hwnd = desktop.window_by_title("Chat").expect("window registered");
        let desktop = Arc::new(desktop);
        let injector = KeyInjector::new(Arc::clone(&desktop))
            .with_settle(SettleStrategy::Fixed(Duration::ZERO));
        (injector, desktop, hwnd)
    }

    fn chat() -> MockDesktop {
        MockDesktop::new().with_window("Chat", "ChatFrame")
    }

    // ── Plain path ────────────────────────────────────────────────────────────

    #[test]
    fn test_plain_key_is_sent_down_then_up_without_bridge() {
        // Arrange
        let (inj, desk, hwnd) = injector(chat());

        // Act
        inj.post_key(hwnd, VirtualKey::RETURN, &ModifierSet::new(), false)
            .unwrap();

        // Assert
        let messages = desk.dispatched_messages();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], PlatformCall::Send { message, .. } if message.kind == KeyMessageKind::KeyDown));
        assert!(matches!(messages[1], PlatformCall::Send { message, .. } if message.kind == KeyMessageKind::KeyUp));
        assert!(desk.calls().iter().all(|c| !matches!(
            c,
            PlatformCall::Attach { .. } | PlatformCall::SetKeyboardState(_)
        )));
    }

    #[test]
    fn test_plain_key_up_param_carries_transition_bits() {
        let (inj, desk, hwnd) = injector(chat());

        inj.post_key(hwnd, A, &ModifierSet::new(), false).unwrap();

        let messages = desk.dispatched_messages();
        let PlatformCall::Send { message, .. } = messages[1] else {
            panic!("expected send, got {:?}", messages[1]);
        };
        assert_eq!(message.param, ParamWord(0xC01E_0000));
    }

    #[test]
    fn test_dead_window_returns_window_gone_and_sends_nothing() {
        // Arrange
        let (inj, desk, _) = injector(chat());
        let stale = WindowHandle(0xDEAD);

        // Act
        let result = inj.post_key(stale, A, &ModifierSet::from([VirtualKey::CONTROL]), false);

        // Assert
        assert_eq!(result, Err(InjectionError::WindowGone));
        assert!(desk.dispatched_messages().is_empty());
        assert!(desk
            .calls()
            .iter()
            .all(|c| matches!(c, PlatformCall::IsWindow(_))));
    }

    #[test]
    fn test_plain_send_failure_is_delivery_failed() {
        let (inj, _, hwnd) = injector(chat().failing_at(FailPoint::Send));
        let result = inj.post_key(hwnd, A, &ModifierSet::new(), false);
        assert!(matches!(result, Err(InjectionError::DeliveryFailed(_))));
    }

    // ── Chord path ────────────────────────────────────────────────────────────

    #[test]
    fn test_ctrl_a_runs_full_sequence_in_order() {
        // Arrange
        let (inj, desk, hwnd) = injector(chat());
        let before = desk.current_keyboard_state();

        // Act
        inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false)
            .unwrap();

        // Assert
        let calls = desk.calls();
        let kinds: Vec<&'static str> = calls.iter().map(PlatformCall::label).collect();
        assert_eq!(
            kinds,
            vec![
                "is_window",
                "window_thread_id",
                "activate",
                "attach",
                "get_state",
                "set_state",
                "is_window",
                "post",
                "post",
                "set_state",
                "detach",
            ]
        );
        assert_eq!(desk.current_keyboard_state(), before);
    }

    #[test]
    fn test_chord_applies_modifier_snapshot_then_restores_original() {
        let (inj, desk, hwnd) = injector(chat());
        let original = desk.current_keyboard_state();

        inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false)
            .unwrap();

        let applied: Vec<KeyboardStateSnapshot> = desk
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::SetKeyboardState(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(applied.len(), 2);
        assert!(applied[0].is_pressed(VirtualKey::CONTROL));
        assert_eq!(applied[1], original);
    }

    #[test]
    fn test_bridge_attach_failure_reports_error_and_posts_nothing() {
        // Arrange
        let (inj, desk, hwnd) = injector(chat().failing_at(FailPoint::Attach));

        // Act
        let result = inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false);

        // Assert
        assert!(matches!(result, Err(InjectionError::BridgeAttachFailed { .. })));
        assert!(desk.dispatched_messages().is_empty());
        assert!(!desk.is_attached());
    }

    #[test]
    fn test_state_apply_failure_still_detaches() {
        // Arrange
        let (inj, desk, hwnd) = injector(chat().failing_at(FailPoint::ApplyState));

        // Act
        let result = inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false);

        // Assert
        assert!(matches!(result, Err(InjectionError::StateApplyFailed(_))));
        assert!(desk.dispatched_messages().is_empty());
        assert!(!desk.is_attached());
        assert_eq!(desk.count(|c| matches!(c, PlatformCall::Detach { .. })), 1);
    }

    #[test]
    fn test_restore_failure_is_reported_after_messages_and_still_detaches() {
        // Arrange
        let (inj, desk, hwnd) = injector(chat().failing_at(FailPoint::RestoreState));

        // Act
        let result = inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false);

        // Assert
        assert!(matches!(result, Err(InjectionError::StateRestoreFailed(_))));
        assert_eq!(desk.dispatched_messages().len(), 2);
        assert!(!desk.is_attached());
    }

    #[test]
    fn test_post_failure_restores_state_and_detaches() {
        // Arrange
        let (inj, desk, hwnd) = injector(chat().failing_at(FailPoint::Post));
        let original = desk.current_keyboard_state();

        // Act
        let result = inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false);

        // Assert
        assert!(matches!(result, Err(InjectionError::DeliveryFailed(_))));
        assert_eq!(desk.current_keyboard_state(), original);
        assert!(!desk.is_attached());
    }

    #[test]
    fn test_window_closing_mid_sequence_is_window_gone_with_cleanup() {
        // Arrange: the window disappears as soon as the bridge is attached.
        let (inj, desk, hwnd) = injector(chat().failing_at(FailPoint::VanishOnAttach));
        let original = desk.current_keyboard_state();

        // Act
        let result = inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false);

        // Assert
        assert_eq!(result, Err(InjectionError::WindowGone));
        assert!(desk.dispatched_messages().is_empty());
        assert_eq!(desk.current_keyboard_state(), original);
        assert!(!desk.is_attached());
    }

    #[test]
    fn test_cancelled_before_attach_touches_nothing() {
        // Arrange
        let running = Arc::new(AtomicBool::new(false));
        let (inj, desk, hwnd) = injector(chat());
        let inj = inj.with_running_flag(running);

        // Act
        let result = inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false);

        // Assert
        assert_eq!(result, Err(InjectionError::Cancelled));
        assert_eq!(desk.count(|c| matches!(c, PlatformCall::Attach { .. })), 0);
    }

    #[test]
    fn test_cancel_flag_does_not_block_plain_keys() {
        let (inj, desk, hwnd) = injector(chat());
        let inj = inj.with_running_flag(Arc::new(AtomicBool::new(false)));

        inj.post_key(hwnd, VirtualKey::RETURN, &ModifierSet::new(), false)
            .unwrap();

        assert_eq!(desk.dispatched_messages().len(), 2);
    }

    #[test]
    fn test_alt_tab_posts_system_messages_with_context_code() {
        let (inj, desk, hwnd) = injector(chat());

        inj.post_key(hwnd, VirtualKey::TAB, &ModifierSet::from([VirtualKey::MENU]), false)
            .unwrap();

        let posted: Vec<KeyEventMessage> = desk
            .dispatched_messages()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Post { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(posted[0].kind, KeyMessageKind::SysKeyDown);
        assert_eq!(posted[1].kind, KeyMessageKind::SysKeyUp);
        assert!(posted.iter().all(|m| m.param.has_context_code()));
    }

    #[test]
    fn test_acknowledge_strategy_flushes_after_each_step() {
        let (inj, desk, hwnd) = injector(chat());
        let inj = inj.with_settle(SettleStrategy::Acknowledge {
            timeout: Duration::from_millis(50),
        });

        inj.post_key(hwnd, A, &ModifierSet::from([VirtualKey::CONTROL]), false)
            .unwrap();

        // apply, down, up, restore
        assert_eq!(desk.count(|c| matches!(c, PlatformCall::Flush(_))), 4);
    }

    #[test]
    fn test_post_chord_uses_chord_fields() {
        let (inj, desk, hwnd) = injector(chat());
        let chord: KeyChord = "Ctrl+NumpadEnter".parse().unwrap();

        inj.post_chord(hwnd, &chord).unwrap();

        let first_post = desk
            .dispatched_messages()
            .into_iter()
            .find_map(|c| match c {
                PlatformCall::Post { message, .. } => Some(message),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_post.key, VirtualKey::RETURN);
        assert!(first_post.param.is_extended());
    }
}
