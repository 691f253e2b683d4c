//! Text generation backends.

pub mod openai;

pub use openai::OpenAiClient;
