//! # autoreply-core
//!
//! OS-free building blocks for chat-autoreply's keyboard-injection layer.
//!
//! The agent crate types a reply into a chat window by posting key messages
//! straight into the window's message queue instead of going through the
//! global input stream.  Everything that can be computed without touching the
//! OS lives here so it can be tested on any platform:
//!
//! - **`keymap`** – virtual key codes, modifier sets, and key chords parsed
//!   from configuration strings (`"Ctrl+A"`).
//!
//! - **`keyevent`** – the down/up message pair for a keystroke: message kind
//!   (`WM_KEYDOWN` vs `WM_SYSKEYDOWN`) and the packed `lParam` word with scan
//!   code, extended-key, context-code and transition bits.
//!
//! - **`keystate`** – 256-byte keyboard-state snapshots that are captured,
//!   replaced with a modifier-only buffer, and restored around a chord.
//!
//! - **`window`** – the thread-safe, opaque [`WindowHandle`].

pub mod keyevent;
pub mod keymap;
pub mod keystate;
pub mod window;

pub use keyevent::{
    KeyEventMessage, KeyMessageKind, KeyStroke, KeyTransition, KeyboardLayout, ParamWord,
};
pub use keymap::{KeyChord, ModifierSet, VirtualKey};
pub use keystate::KeyboardStateSnapshot;
pub use window::WindowHandle;
