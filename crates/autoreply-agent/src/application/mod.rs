//! Application layer use cases for the agent.
//!
//! - **`inject_key`** – `KeyInjector` and the `WindowMessaging` port it drives.
//!   Plain keys are sent synchronously; chords go through the guarded
//!   bridge / keyboard-state sequence.
//!
//! - **`input_guards`** – `ThreadInputBridge` and `KeyboardStateGuard`, the
//!   two scoped resources of the chord path.
//!
//! - **`settle`** – how long to wait between chord steps.
//!
//! - **`chat_window`** – `ChatWindowDriver`: transcript extraction through
//!   the clipboard and reply submission through the input control.
//!
//! - **`compose_reply`** – `AutoReplyUseCase`, which joins the driver with a
//!   `TextGenerationClient`.

pub mod chat_window;
pub mod compose_reply;
pub mod inject_key;
pub mod input_guards;
pub mod settle;
