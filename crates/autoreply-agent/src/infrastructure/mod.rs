//! Infrastructure layer for the agent.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `autoreply_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`platform`** – the Win32 desktop (window lookup, message injection,
//!   keyboard state, clipboard) and an in-memory `MockDesktop` for tests.
//!
//! - **`generation`** – `OpenAiClient`, the HTTP implementation of
//!   `TextGenerationClient`.
//!
//! - **`storage`** – TOML configuration file persistence.

pub mod generation;
pub mod platform;
pub mod storage;
