//! ChatWindowDriver: reads a chat transcript out of a window and types replies
//! back into it.
//!
//! The transcript is pulled through the clipboard: the driver posts `Ctrl+A`
//! then `Ctrl+C` to the transcript control and reads the clipboard text.  A
//! reply is written into the input control with `WM_SETTEXT` and submitted
//! with a plain `Enter`.
//!
//! Window and control lookup happens fresh on every call; handles are never
//! cached between operations.

use std::sync::Arc;
use std::time::Duration;

use autoreply_core::{KeyChord, ModifierSet, VirtualKey, WindowHandle};
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::inject_key::{InjectionError, KeyInjector, PlatformError, WindowMessaging};

/// Window lookup, text and clipboard operations on top of [`WindowMessaging`].
pub trait DesktopSession: WindowMessaging {
    /// Top-level window with exactly this title.
    fn find_window(&self, title: &str) -> Option<WindowHandle>;

    /// First direct child of `parent` with this window class.
    fn find_child(&self, parent: WindowHandle, class: &str) -> Option<WindowHandle>;

    /// Replaces a control's text (`WM_SETTEXT`).
    fn set_window_text(&self, hwnd: WindowHandle, text: &str) -> Result<(), PlatformError>;

    /// Monotonic counter that changes whenever the clipboard content changes.
    fn clipboard_sequence(&self) -> u32;

    /// Current Unicode clipboard text, or `None` if there is none.
    fn read_clipboard_text(&self) -> Result<Option<String>, PlatformError>;
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no window titled {0:?}")]
    WindowNotFound(String),
    #[error("window {title:?} has no child control of class {class:?}")]
    ControlNotFound { title: String, class: String },
    #[error("clipboard holds no text after copy")]
    ClipboardEmpty,
    #[error("clipboard did not change after copy; the transcript control ignored Ctrl+C")]
    ClipboardUnchanged,
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Injection(#[from] InjectionError),
}

/// Per-client knobs for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    /// Window class of the transcript list control.
    pub transcript_class: String,
    /// Window class of the message input box.
    pub input_class: String,
    pub select_all: KeyChord,
    pub copy: KeyChord,
    /// Pause between select-all and copy so the list can update its selection.
    pub select_settle: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            transcript_class: "EVA_VH_ListControl_Dblclk".to_string(),
            input_class: "RichEdit50W".to_string(),
            select_all: KeyChord::ctrl(VirtualKey(b'A')),
            copy: KeyChord::ctrl(VirtualKey(b'C')),
            select_settle: Duration::from_millis(1000),
        }
    }
}

pub struct ChatWindowDriver<P> {
    injector: KeyInjector<P>,
    settings: DriverSettings,
}

impl<P: DesktopSession> ChatWindowDriver<P> {
    pub fn new(injector: KeyInjector<P>, settings: DriverSettings) -> Self {
        Self { injector, settings }
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn platform(&self) -> &Arc<P> {
        self.injector.platform()
    }

    /// Copies the whole transcript of the chat window titled `title`.
    ///
    /// The window and transcript control are located before the clipboard is
    /// touched, so a lookup failure leaves the clipboard as it was.
    ///
    /// # Errors
    ///
    /// - [`DriverError::WindowNotFound`] / [`DriverError::ControlNotFound`]
    /// - [`DriverError::Injection`] if either chord could not be delivered
    /// - [`DriverError::ClipboardUnchanged`] if the copy did not land
    /// - [`DriverError::ClipboardEmpty`] if it landed with no text
    #[instrument(skip(self))]
    pub fn extract_transcript(&self, title: &str) -> Result<String, DriverError> {
        let control = self.locate(title, &self.settings.transcript_class)?;
        let platform = self.platform();

        let before = platform.clipboard_sequence();
        self.injector.post_chord(control, &self.settings.select_all)?;
        if !self.settings.select_settle.is_zero() {
            std::thread::sleep(self.settings.select_settle);
        }
        self.injector.post_chord(control, &self.settings.copy)?;

        if platform.clipboard_sequence() == before {
            return Err(DriverError::ClipboardUnchanged);
        }
        let text = platform
            .read_clipboard_text()?
            .filter(|t| !t.is_empty())
            .ok_or(DriverError::ClipboardEmpty)?;

        info!(chars = text.chars().count(), "transcript extracted");
        Ok(text)
    }

    /// Types `text` into the input box of the chat window titled `title` and
    /// presses Enter.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub fn send_message(&self, title: &str, text: &str) -> Result<(), DriverError> {
        let input = self.locate(title, &self.settings.input_class)?;

        self.platform().set_window_text(input, text)?;
        self.injector
            .post_key(input, VirtualKey::RETURN, &ModifierSet::new(), false)?;

        info!("message submitted");
        Ok(())
    }

    fn locate(&self, title: &str, class: &str) -> Result<WindowHandle, DriverError> {
        let platform = self.platform();
        let window = platform
            .find_window(title)
            .ok_or_else(|| DriverError::WindowNotFound(title.to_string()))?;
        let control =
            platform
                .find_child(window, class)
                .ok_or_else(|| DriverError::ControlNotFound {
                    title: title.to_string(),
                    class: class.to_string(),
                })?;
        debug!(?window, ?control, class, "control located");
        Ok(control)
    }
}
