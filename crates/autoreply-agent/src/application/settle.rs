//! How the injector waits between steps of a chord.
//!
//! Posted messages are processed asynchronously by the target thread, so the
//! keyboard-state buffer must stay in place until the target has read it.

use std::time::Duration;

use autoreply_core::WindowHandle;
use tracing::warn;

use super::inject_key::WindowMessaging;

/// Default pause between chord steps.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// Sleep for a fixed interval.  Zero skips the sleep.
    Fixed(Duration),
    /// Block until the target thread drains its queue, bounded by `timeout`.
    /// A timeout is logged as unknown delivery, not treated as an error.
    Acknowledge { timeout: Duration },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_STEP_DELAY)
    }
}

impl SettleStrategy {
    pub fn settle<P: WindowMessaging + ?Sized>(&self, platform: &P, hwnd: WindowHandle) {
        match *self {
            Self::Fixed(delay) if delay.is_zero() => {}
            Self::Fixed(delay) => std::thread::sleep(delay),
            Self::Acknowledge { timeout } => {
                if !platform.flush_message_queue(hwnd, timeout) {
                    warn!(
                        ?hwnd,
                        timeout_ms = timeout.as_millis() as u64,
                        "target did not acknowledge within timeout; delivery state unknown"
                    );
                }
            }
        }
    }
}
