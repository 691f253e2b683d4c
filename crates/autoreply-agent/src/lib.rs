//! autoreply-agent library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the agent do?
//!
//! 1. Finds the chat window by its exact title.
//! 2. Copies the transcript out of the list control by posting `Ctrl+A` and
//!    `Ctrl+C` into the control's message queue.  The window does not need
//!    focus and the user's own keyboard is not touched.
//! 3. Asks a text generation backend for the next line of the conversation.
//! 4. After confirmation, writes the reply into the input box and posts
//!    `Enter`.

/// Application layer: injection, the chat driver, and reply composition.
pub mod application;

/// Infrastructure layer: desktop adapters, HTTP generation client, config.
pub mod infrastructure;
