//! Desktop adapters implementing `WindowMessaging` and `DesktopSession`.
//!
//! The Win32 implementation is selected at compile time; the mock is always
//! available for tests.

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Decodes UTF-16 clipboard text up to the first NUL, or the whole buffer
/// when it has none.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn text_until_nul(units: &[u16]) -> String {
    let len = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..len])
}
