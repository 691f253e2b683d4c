//! Keyboard-state snapshots.
//!
//! Windows keeps a 256-byte keyboard-state buffer per thread input queue.  The
//! high bit (0x80) of entry `vk` means "pressed", the low bit means "toggled"
//! (for lock keys).  `GetKeyboardState` / `SetKeyboardState` read and write the
//! whole buffer at once, so a snapshot is the unit of capture and restore.

use crate::keymap::{ModifierSet, VirtualKey};

/// High bit of a keyboard-state entry.
pub const PRESSED: u8 = 0x80;

/// Size of the keyboard-state buffer.
pub const KEY_STATE_LEN: usize = 256;

/// A copy of the 256-entry keyboard-state buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyboardStateSnapshot(pub [u8; KEY_STATE_LEN]);

impl KeyboardStateSnapshot {
    /// A buffer with no key pressed or toggled.
    pub fn cleared() -> Self {
        Self([0; KEY_STATE_LEN])
    }

    /// A cleared buffer with the pressed bit set for every member of `modifiers`.
    ///
    /// Starts from a cleared buffer rather than the captured one, so keys the
    /// user happens to hold are not forwarded with the chord.
    pub fn with_modifiers(modifiers: &ModifierSet) -> Self {
        let mut snapshot = Self::cleared();
        for key in modifiers.iter() {
            snapshot.press(key);
        }
        snapshot
    }

    pub fn press(&mut self, key: VirtualKey) {
        self.0[key.index()] |= PRESSED;
    }

    pub fn release(&mut self, key: VirtualKey) {
        self.0[key.index()] &= !PRESSED;
    }

    pub fn is_pressed(&self, key: VirtualKey) -> bool {
        self.0[key.index()] & PRESSED != 0
    }

    /// Keys whose pressed bit is set, in ascending code order.
    pub fn pressed_keys(&self) -> impl Iterator<Item = VirtualKey> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, state)| **state & PRESSED != 0)
            .map(|(vk, _)| VirtualKey(vk as u8))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_STATE_LEN] {
        &self.0
    }
}

impl Default for KeyboardStateSnapshot {
    fn default() -> Self {
        Self::cleared()
    }
}

impl std::fmt::Debug for KeyboardStateSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 256 bytes of mostly zeros is unreadable; list what matters.
        let pressed: Vec<VirtualKey> = self.pressed_keys().collect();
        f.debug_struct("KeyboardStateSnapshot")
            .field("pressed", &pressed)
            .finish()
    }
}
