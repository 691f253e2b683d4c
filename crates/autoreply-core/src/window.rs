//! Opaque window handles.

use std::fmt;

/// Raw value of an on-screen window handle (`HWND`).
///
/// Stored as an integer so it can cross threads; the OS adapter converts it
/// back at the FFI boundary.  A handle may go stale at any moment (window
/// closed, process exited), so holders must revalidate before every use and
/// never keep one across operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    /// The null handle, never a live window.
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowHandle(0x{:X})", self.0)
    }
}
