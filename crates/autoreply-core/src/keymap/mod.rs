//! Virtual key codes, modifier sets, and key chords.
//!
//! A [`VirtualKey`] is the layout-independent code Windows assigns to a
//! logical key (`VK_*` in `<winuser.h>`).  Pressing the letter A produces
//! `0x41` on every layout; the layout-dependent *scan code* is derived later,
//! at encode time, through a [`crate::keyevent::KeyboardLayout`].
//!
//! # Sub-modules
//!
//! - **`windows_vk`** – name table used to parse and print key names
//!   (`"Ctrl"`, `"Tab"`, `"NumpadEnter"`) and the list of keys that need the
//!   extended-key flag.
//! - **`chord`** – [`KeyChord`]: a primary key plus modifiers, parsed from
//!   strings such as `"Ctrl+A"` in the configuration file.

pub mod chord;
pub mod windows_vk;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use chord::{ChordParseError, KeyChord};

/// A Windows Virtual Key code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualKey(pub u8);

impl VirtualKey {
    pub const BACK: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const RETURN: Self = Self(0x0D);
    pub const SHIFT: Self = Self(0x10);
    pub const CONTROL: Self = Self(0x11);
    /// Alt.
    pub const MENU: Self = Self(0x12);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);
    pub const PRIOR: Self = Self(0x21);
    pub const NEXT: Self = Self(0x22);
    pub const END: Self = Self(0x23);
    pub const HOME: Self = Self(0x24);
    pub const LEFT: Self = Self(0x25);
    pub const UP: Self = Self(0x26);
    pub const RIGHT: Self = Self(0x27);
    pub const DOWN: Self = Self(0x28);
    pub const INSERT: Self = Self(0x2D);
    pub const DELETE: Self = Self(0x2E);
    pub const LWIN: Self = Self(0x5B);
    pub const RWIN: Self = Self(0x5C);
    pub const F1: Self = Self(0x70);
    pub const LSHIFT: Self = Self(0xA0);
    pub const RSHIFT: Self = Self(0xA1);
    pub const LCONTROL: Self = Self(0xA2);
    pub const RCONTROL: Self = Self(0xA3);
    pub const LMENU: Self = Self(0xA4);
    pub const RMENU: Self = Self(0xA5);

    /// Virtual key for an ASCII letter or digit (`'a'` and `'A'` both map to `0x41`).
    ///
    /// Returns `None` for any other character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='z' => Some(Self(c.to_ascii_uppercase() as u8)),
            'A'..='Z' | '0'..='9' => Some(Self(c as u8)),
            _ => None,
        }
    }

    /// Index into a 256-entry keyboard-state buffer.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `true` for the Alt family (`VK_MENU`, `VK_LMENU`, `VK_RMENU`).
    pub fn is_alt(self) -> bool {
        matches!(self, Self::MENU | Self::LMENU | Self::RMENU)
    }

    /// `true` for keys that must carry the extended-key flag to be told apart
    /// from a same-coded counterpart.
    pub fn is_extended(self) -> bool {
        windows_vk::is_extended_vk(self.0)
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match windows_vk::vk_name(self.0) {
            Some(name) => f.write_str(name),
            None => write!(f, "VK(0x{:02X})", self.0),
        }
    }
}

/// Keys held down concurrently with the primary key.
///
/// Unordered and duplicate-free: inserting the same key twice keeps one
/// entry.  An empty set means "no modifier path".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModifierSet {
    keys: Vec<VirtualKey>,
}

impl ModifierSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key`; returns `false` if it was already present.
    pub fn insert(&mut self, key: VirtualKey) -> bool {
        match self.keys.binary_search(&key) {
            Ok(_) => false,
            Err(pos) => {
                self.keys.insert(pos, key);
                true
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: VirtualKey) -> Self {
        self.insert(key);
        self
    }

    pub fn contains(&self, key: VirtualKey) -> bool {
        self.keys.binary_search(&key).is_ok()
    }

    /// `true` if any member of the Alt family is held.
    pub fn contains_alt(&self) -> bool {
        self.keys.iter().any(|k| k.is_alt())
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Members in ascending key-code order.
    pub fn iter(&self) -> impl Iterator<Item = VirtualKey> + '_ {
        self.keys.iter().copied()
    }
}

impl FromIterator<VirtualKey> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = VirtualKey>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<const N: usize> From<[VirtualKey; N]> for ModifierSet {
    fn from(keys: [VirtualKey; N]) -> Self {
        keys.into_iter().collect()
    }
}
