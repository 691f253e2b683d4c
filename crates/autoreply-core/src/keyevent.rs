//! Key-event message encoding.
//!
//! A keystroke delivered through a window's message queue is a pair of
//! messages: a down transition and an up transition.  Each carries the
//! virtual key in `wParam` and a 32-bit *parameter word* in `lParam`:
//!
//! ```text
//!  31  30  29  28..25  24  23..16     15..0
//! ┌───┬───┬───┬──────┬───┬─────────┬──────────────┐
//! │ T │ P │ C │  --  │ E │  scan   │ repeat count │
//! └───┴───┴───┴──────┴───┴─────────┴──────────────┘
//!  T = transition state (1 on key up)
//!  P = previous key state (1 on key up)
//!  C = context code (1 when Alt is held)
//!  E = extended key
//! ```
//!
//! The repeat count is always written as 0.  The scan code comes from the
//! active keyboard layout and is looked up on every encode, so a layout switch
//! between keystrokes is picked up.

use crate::keymap::{ModifierSet, VirtualKey};

/// `WM_KEYDOWN`.
pub const WM_KEYDOWN: u32 = 0x0100;
/// `WM_KEYUP`.
pub const WM_KEYUP: u32 = 0x0101;
/// `WM_SYSKEYDOWN`.
pub const WM_SYSKEYDOWN: u32 = 0x0104;
/// `WM_SYSKEYUP`.
pub const WM_SYSKEYUP: u32 = 0x0105;

/// Bit 24: extended key.
pub const EXTENDED_KEY_FLAG: u32 = 0x0100_0000;
/// Bit 29: context code (Alt held).
pub const CONTEXT_CODE_FLAG: u32 = 0x2000_0000;
/// Bit 30: previous key state.
pub const PREVIOUS_STATE_FLAG: u32 = 0x4000_0000;
/// Bit 31: transition state.
pub const TRANSITION_STATE_FLAG: u32 = 0x8000_0000;
/// Bits 30 and 31, always set on an up transition.
pub const KEY_UP_FLAGS: u32 = PREVIOUS_STATE_FLAG | TRANSITION_STATE_FLAG;

/// Maps virtual keys to scan codes through the active keyboard layout.
///
/// The Win32 implementation calls `MapVirtualKeyW(vk, MAPVK_VK_TO_VSC)`;
/// tests use a fixed table.
pub trait KeyboardLayout {
    fn scan_code(&self, key: VirtualKey) -> u16;
}

/// Down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    Down,
    Up,
}

/// Window message kind for a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMessageKind {
    KeyDown,
    KeyUp,
    SysKeyDown,
    SysKeyUp,
}

impl KeyMessageKind {
    /// Picks the plain or system variant for `transition`.
    pub fn for_transition(transition: KeyTransition, system: bool) -> Self {
        match (transition, system) {
            (KeyTransition::Down, false) => Self::KeyDown,
            (KeyTransition::Up, false) => Self::KeyUp,
            (KeyTransition::Down, true) => Self::SysKeyDown,
            (KeyTransition::Up, true) => Self::SysKeyUp,
        }
    }

    /// The `WM_*` message number.
    pub fn message_id(self) -> u32 {
        match self {
            Self::KeyDown => WM_KEYDOWN,
            Self::KeyUp => WM_KEYUP,
            Self::SysKeyDown => WM_SYSKEYDOWN,
            Self::SysKeyUp => WM_SYSKEYUP,
        }
    }

    pub fn is_system(self) -> bool {
        matches!(self, Self::SysKeyDown | Self::SysKeyUp)
    }

    pub fn transition(self) -> KeyTransition {
        match self {
            Self::KeyDown | Self::SysKeyDown => KeyTransition::Down,
            Self::KeyUp | Self::SysKeyUp => KeyTransition::Up,
        }
    }
}

/// The 32-bit `lParam` of a key message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamWord(pub u32);

impl ParamWord {
    pub fn scan_code(self) -> u16 {
        ((self.0 >> 16) & 0xFF) as u16
    }

    pub fn repeat_count(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn is_extended(self) -> bool {
        self.0 & EXTENDED_KEY_FLAG != 0
    }

    pub fn has_context_code(self) -> bool {
        self.0 & CONTEXT_CODE_FLAG != 0
    }

    /// `true` when both up-transition bits (30 and 31) are set.
    pub fn has_up_flags(self) -> bool {
        self.0 & KEY_UP_FLAGS == KEY_UP_FLAGS
    }

    /// `true` when either up-transition bit is set.
    pub fn has_any_up_flag(self) -> bool {
        self.0 & KEY_UP_FLAGS != 0
    }
}

/// Builds the parameter word for a single transition.
///
/// Only the low byte of the scan code fits in bits 16..24; extended scan
/// codes (`0xE0xx`) are expressed through `extended` instead.
pub fn encode_param(
    scan_code: u16,
    extended: bool,
    system_context: bool,
    transition: KeyTransition,
) -> ParamWord {
    let mut word = u32::from(scan_code & 0xFF) << 16;
    if extended {
        word |= EXTENDED_KEY_FLAG;
    }
    if system_context {
        word |= CONTEXT_CODE_FLAG;
    }
    if transition == KeyTransition::Up {
        word |= KEY_UP_FLAGS;
    }
    ParamWord(word)
}

/// Encodes the down-transition parameter word for `key` using `layout`.
pub fn encode(
    layout: &dyn KeyboardLayout,
    key: VirtualKey,
    is_extended: bool,
    is_system_context: bool,
) -> ParamWord {
    encode_param(
        layout.scan_code(key),
        is_extended,
        is_system_context,
        KeyTransition::Down,
    )
}

/// A single key message: kind, virtual key (`wParam`), parameter word (`lParam`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEventMessage {
    pub kind: KeyMessageKind,
    pub key: VirtualKey,
    pub param: ParamWord,
}

/// The down/up message pair for one logical keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub down: KeyEventMessage,
    pub up: KeyEventMessage,
}

impl KeyStroke {
    /// Encodes `key` pressed with `modifiers`.
    ///
    /// When the Alt family is among the modifiers both messages use the
    /// system variants and both parameter words carry the context code.
    pub fn new(
        key: VirtualKey,
        modifiers: &ModifierSet,
        extended: bool,
        layout: &dyn KeyboardLayout,
    ) -> Self {
        let system = modifiers.contains_alt();
        let scan = layout.scan_code(key);
        let message = |transition| KeyEventMessage {
            kind: KeyMessageKind::for_transition(transition, system),
            key,
            param: encode_param(scan, extended, system, transition),
        };
        Self {
            down: message(KeyTransition::Down),
            up: message(KeyTransition::Up),
        }
    }
}

/// Scan codes of the US-QWERTY set-1 layout for the keys this crate names.
///
/// Used where no OS layout is available (tests, benches, the mock desktop).
#[derive(Debug, Clone, Copy, Default)]
pub struct UsQwertyLayout;

impl KeyboardLayout for UsQwertyLayout {
    fn scan_code(&self, key: VirtualKey) -> u16 {
        const LETTERS: [u16; 26] = [
            0x1E, 0x30, 0x2E, 0x20, 0x12, 0x21, 0x22, 0x23, 0x17, 0x24, 0x25, 0x26, 0x32, // A-M
            0x31, 0x18, 0x19, 0x10, 0x13, 0x1F, 0x14, 0x16, 0x2F, 0x11, 0x2D, 0x15, 0x2C, // N-Z
        ];
        match key.0 {
            0x41..=0x5A => LETTERS[(key.0 - 0x41) as usize],
            0x31..=0x39 => u16::from(key.0 - 0x31) + 0x02,
            0x30 => 0x0B,
            0x08 => 0x0E,
            0x09 => 0x0F,
            0x0D => 0x1C,
            0x10 | 0xA0 => 0x2A,
            0xA1 => 0x36,
            0x11 | 0xA2 | 0xA3 => 0x1D,
            0x12 | 0xA4 | 0xA5 => 0x38,
            0x1B => 0x01,
            0x20 => 0x39,
            0x21 => 0x49,
            0x22 => 0x51,
            0x23 => 0x4F,
            0x24 => 0x47,
            0x25 => 0x4B,
            0x26 => 0x48,
            0x27 => 0x4D,
            0x28 => 0x50,
            0x2D => 0x52,
            0x2E => 0x53,
            0x70..=0x79 => u16::from(key.0 - 0x70) + 0x3B,
            0x7A => 0x57,
            0x7B => 0x58,
            _ => 0,
        }
    }
}
