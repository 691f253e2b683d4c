//! Integration tests for keystroke injection.
//!
//! These tests drive `KeyInjector` through its public API against the
//! recording `MockDesktop` and check the observable message sequences.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use autoreply_agent::application::inject_key::{InjectionError, KeyInjector, WindowMessaging};
use autoreply_agent::application::settle::SettleStrategy;
use autoreply_agent::infrastructure::platform::mock::{FailPoint, MockDesktop, PlatformCall};
use autoreply_core::{
    keyevent::{CONTEXT_CODE_FLAG, KEY_UP_FLAGS},
    KeyMessageKind, KeyboardStateSnapshot, ModifierSet, VirtualKey, WindowHandle,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn setup(desk: MockDesktop) -> (KeyInjector<MockDesktop>, Arc<MockDesktop>) {
    let desk = Arc::new(desk);
    let injector =
        KeyInjector::new(Arc::clone(&desk)).with_settle(SettleStrategy::Fixed(Duration::ZERO));
    (injector, desk)
}

fn ctrl() -> ModifierSet {
    ModifierSet::from([VirtualKey::CONTROL])
}

/// Every call from the first state write up to the restoring write.
fn chord_core(calls: &[PlatformCall]) -> Vec<PlatformCall> {
    calls
        .iter()
        .filter(|c| {
            matches!(
                c,
                PlatformCall::SetKeyboardState(_) | PlatformCall::Post { .. }
            )
        })
        .cloned()
        .collect()
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn test_missing_test_chat_window_yields_window_gone_and_zero_messages() {
    // Arrange: "Test Chat" is not open, so lookup yields no live handle.
    let (injector, desk) = setup(MockDesktop::new());
    let hwnd = desk.window_by_title("Test Chat").unwrap_or(WindowHandle::NULL);

    // Act
    let result = injector.post_key(hwnd, VirtualKey(b'A'), &ctrl(), false);

    // Assert
    assert_eq!(result, Err(InjectionError::WindowGone));
    assert!(desk.dispatched_messages().is_empty());
    assert!(!desk.is_attached());
}

#[test]
fn test_ctrl_a_applies_posts_and_restores_in_order() {
    // Arrange
    let (injector, desk) = setup(MockDesktop::new().with_window("Test Chat", "Frame"));
    let hwnd = desk.window_by_title("Test Chat").unwrap();
    let original = desk.current_keyboard_state();

    // Act
    injector
        .post_key(hwnd, VirtualKey(b'A'), &ctrl(), false)
        .unwrap();

    // Assert
    let core = chord_core(&desk.calls());
    assert_eq!(core.len(), 4, "{core:?}");

    let PlatformCall::SetKeyboardState(applied) = &core[0] else {
        panic!("expected state apply, got {:?}", core[0]);
    };
    assert_eq!(applied, &KeyboardStateSnapshot::with_modifiers(&ctrl()));

    let PlatformCall::Post { message: down, .. } = &core[1] else {
        panic!("expected post, got {:?}", core[1]);
    };
    assert_eq!(down.kind, KeyMessageKind::KeyDown);
    assert_eq!(down.param.0 & CONTEXT_CODE_FLAG, 0);
    assert_eq!(down.param.0 & KEY_UP_FLAGS, 0);

    let PlatformCall::Post { message: up, .. } = &core[2] else {
        panic!("expected post, got {:?}", core[2]);
    };
    assert_eq!(up.kind, KeyMessageKind::KeyUp);
    assert_eq!(up.param.0 & KEY_UP_FLAGS, KEY_UP_FLAGS);

    assert_eq!(core[3], PlatformCall::SetKeyboardState(original));
}

#[test]
fn test_alt_tab_uses_system_messages_with_context_code() {
    // Arrange
    let (injector, desk) = setup(MockDesktop::new().with_window("Test Chat", "Frame"));
    let hwnd = desk.window_by_title("Test Chat").unwrap();

    // Act
    injector
        .post_key(
            hwnd,
            VirtualKey::TAB,
            &ModifierSet::from([VirtualKey::MENU]),
            false,
        )
        .unwrap();

    // Assert
    let kinds: Vec<(KeyMessageKind, bool)> = desk
        .dispatched_messages()
        .into_iter()
        .filter_map(|c| match c {
            PlatformCall::Post { message, .. } => {
                Some((message.kind, message.param.has_context_code()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (KeyMessageKind::SysKeyDown, true),
            (KeyMessageKind::SysKeyUp, true)
        ]
    );
}

#[test]
fn test_chord_restores_seeded_keyboard_state_byte_for_byte() {
    // Arrange: CapsLock toggled and Shift held before the chord.
    let mut seeded = KeyboardStateSnapshot::cleared();
    seeded.0[0x14] = 0x01;
    seeded.0[VirtualKey::SHIFT.0 as usize] = 0x80;
    let (injector, desk) = setup(
        MockDesktop::new()
            .with_window("Test Chat", "Frame")
            .with_keyboard_state(seeded.clone()),
    );
    let hwnd = desk.window_by_title("Test Chat").unwrap();

    // Act
    injector
        .post_key(hwnd, VirtualKey(b'A'), &ctrl(), false)
        .unwrap();

    // Assert
    let core = chord_core(&desk.calls());
    assert_eq!(
        core.last(),
        Some(&PlatformCall::SetKeyboardState(seeded.clone()))
    );
    assert_eq!(desk.current_keyboard_state(), seeded);
}

#[test]
fn test_every_failure_point_leaves_state_restored_and_detached() {
    for point in [
        FailPoint::ApplyState,
        FailPoint::Post,
        FailPoint::VanishOnAttach,
    ] {
        // Arrange
        let (injector, desk) = setup(
            MockDesktop::new()
                .with_window("Test Chat", "Frame")
                .failing_at(point),
        );
        let hwnd = desk.window_by_title("Test Chat").unwrap();
        let original = desk.current_keyboard_state();

        // Act
        let result = injector.post_key(hwnd, VirtualKey(b'A'), &ctrl(), false);

        // Assert
        assert!(result.is_err(), "{point:?} should fail");
        assert_eq!(desk.current_keyboard_state(), original, "{point:?}");
        assert!(!desk.is_attached(), "{point:?}");
        assert_eq!(
            desk.count(|c| matches!(c, PlatformCall::Detach { .. })),
            1,
            "{point:?}"
        );
    }
}

#[test]
fn test_concurrent_chords_never_overlap() {
    // Arrange
    let (injector, desk) = setup(
        MockDesktop::new()
            .with_window("Chat One", "Frame")
            .with_window("Chat Two", "Frame"),
    );
    let injector = Arc::new(injector);
    let targets = [
        desk.window_by_title("Chat One").unwrap(),
        desk.window_by_title("Chat Two").unwrap(),
    ];

    // Act
    let handles: Vec<_> = targets
        .into_iter()
        .map(|hwnd| {
            let injector = Arc::clone(&injector);
            thread::spawn(move || {
                for _ in 0..20 {
                    injector
                        .post_key(hwnd, VirtualKey(b'C'), &ctrl(), false)
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Assert: attach/detach strictly alternate across both threads.
    let mut open = false;
    for call in desk.calls() {
        match call {
            PlatformCall::Attach { .. } => {
                assert!(!open, "second attach while a chord was in flight");
                open = true;
            }
            PlatformCall::Detach { .. } => {
                assert!(open);
                open = false;
            }
            _ => {}
        }
    }
    assert!(!open);
    assert_eq!(desk.count(|c| matches!(c, PlatformCall::Attach { .. })), 40);
}

#[test]
fn test_plain_injection_never_touches_keyboard_state() {
    // Arrange
    let (injector, desk) = setup(MockDesktop::new().with_window("Test Chat", "Frame"));
    let hwnd = desk.window_by_title("Test Chat").unwrap();

    // Act
    for key in [VirtualKey::RETURN, VirtualKey(b'X'), VirtualKey::LEFT] {
        injector
            .post_key(hwnd, key, &ModifierSet::new(), key.is_extended())
            .unwrap();
    }

    // Assert
    assert_eq!(
        desk.count(|c| matches!(
            c,
            PlatformCall::GetKeyboardState | PlatformCall::SetKeyboardState(_)
        )),
        0
    );
    assert_eq!(desk.dispatched_messages().len(), 6);
}

#[test]
fn test_window_closed_between_calls_is_detected() {
    // Arrange
    let (injector, desk) = setup(MockDesktop::new().with_window("Test Chat", "Frame"));
    let hwnd = desk.window_by_title("Test Chat").unwrap();
    injector
        .post_key(hwnd, VirtualKey(b'A'), &ctrl(), false)
        .unwrap();

    // Act
    desk.close_window(hwnd);
    let result = injector.post_key(hwnd, VirtualKey(b'C'), &ctrl(), false);

    // Assert
    assert_eq!(result, Err(InjectionError::WindowGone));
    assert!(!desk.is_window(hwnd));
}
