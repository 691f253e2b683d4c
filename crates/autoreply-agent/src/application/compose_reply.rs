//! AutoReplyUseCase: turns a chat transcript into reply candidates and sends
//! the chosen one back.
//!
//! Text generation sits behind [`TextGenerationClient`] so the use case can
//! be tested without network access; the production implementation is
//! `infrastructure::generation::OpenAiClient`.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::chat_window::{ChatWindowDriver, DesktopSession, DriverError};

/// Sampling parameters passed through to the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Number of candidates to request.
    pub candidates: u32,
    pub stop: Vec<String>,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            system_prompt: "You are an AI that texts like an actual person.".to_string(),
            temperature: 0.4,
            max_tokens: 128,
            candidates: 1,
            stop: Vec::new(),
            presence_penalty: 0.1,
            frequency_penalty: 0.1,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("backend returned no usable candidates")]
    NoCandidates,
}

/// Produces reply candidates for a prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<String>, GenerationError>;
}

/// Builds the prompt sent to the backend from a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPrompt {
    /// The local user's name as shown in the chat client.
    pub display_name: String,
    /// Language the reply should be written in.
    pub language: String,
}

impl ReplyPrompt {
    pub fn new(display_name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            language: language.into(),
        }
    }

    pub fn render(&self, transcript: &str) -> String {
        format!(
            "{transcript}\nThis is an ongoing dialogue between two people in a chat. \
             Provide the next sentence from {name}'s perspective in {language}. \
             Do not include [name] or [time] stamps in the result.",
            name = self.display_name,
            language = self.language,
        )
    }
}

/// Trims candidates and drops empty ones.
pub fn clean_candidates(raw: Vec<String>) -> Result<Vec<String>, GenerationError> {
    let cleaned: Vec<String> = raw
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(GenerationError::NoCandidates);
    }
    Ok(cleaned)
}

/// A transcript together with the replies proposed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    pub transcript: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("text generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("blocking worker failed: {0}")]
    Worker(String),
    #[error("cancelled by shutdown request")]
    Cancelled,
}

/// Reads the chat, asks the backend for a reply, and sends it.
pub struct AutoReplyUseCase<P> {
    driver: Arc<ChatWindowDriver<P>>,
    client: Arc<dyn TextGenerationClient>,
    prompt: ReplyPrompt,
    options: GenerationOptions,
    window_title: String,
    running: Arc<AtomicBool>,
}

impl<P: DesktopSession + 'static> AutoReplyUseCase<P> {
    pub fn new(
        driver: ChatWindowDriver<P>,
        client: Arc<dyn TextGenerationClient>,
        prompt: ReplyPrompt,
        options: GenerationOptions,
        window_title: impl Into<String>,
    ) -> Self {
        Self {
            driver: Arc::new(driver),
            client,
            prompt,
            options,
            window_title: window_title.into(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shares the application's running flag.  Once it reads `false`, no
    /// further transcript is read and nothing more is typed into the chat.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    fn ensure_running(&self) -> Result<(), ReplyError> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            warn!("shutdown requested; skipping chat interaction");
            Err(ReplyError::Cancelled)
        }
    }

    /// Extracts the transcript and generates reply candidates for it.
    pub async fn draft_reply(&self) -> Result<ReplyDraft, ReplyError> {
        self.ensure_running()?;
        let transcript = self
            .with_driver(|driver, title| driver.extract_transcript(&title))
            .await?;

        let prompt = self.prompt.render(&transcript);
        info!(model = %self.options.model, "requesting reply candidates");
        let raw = self.client.generate(&prompt, &self.options).await?;
        let candidates = clean_candidates(raw)?;
        self.ensure_running()?;

        Ok(ReplyDraft {
            transcript,
            candidates,
        })
    }

    /// Types `text` into the chat window and submits it.
    ///
    /// Fails with [`ReplyError::Cancelled`] without touching the window once
    /// shutdown has been requested.
    pub async fn send_reply(&self, text: &str) -> Result<(), ReplyError> {
        self.ensure_running()?;
        let text = text.to_string();
        self.with_driver(move |driver, title| driver.send_message(&title, &text))
            .await
    }

    /// Runs a blocking driver call on Tokio's blocking pool.
    async fn with_driver<T, F>(&self, f: F) -> Result<T, ReplyError>
    where
        T: Send + 'static,
        F: FnOnce(&ChatWindowDriver<P>, String) -> Result<T, DriverError> + Send + 'static,
    {
        let driver = Arc::clone(&self.driver);
        let title = self.window_title.clone();
        let result = tokio::task::spawn_blocking(move || f(&driver, title))
            .await
            .map_err(|e| ReplyError::Worker(e.to_string()))?;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chat_window::DriverSettings;
    use crate::application::inject_key::KeyInjector;
    use crate::application::settle::SettleStrategy;
    use crate::infrastructure::platform::mock::MockDesktop;
    use std::time::Duration;

    fn use_case(
        desk: MockDesktop,
        client: MockTextGenerationClient,
    ) -> (AutoReplyUseCase<MockDesktop>, Arc<MockDesktop>) {
        let desk = Arc::new(desk);
        let injector = KeyInjector::new(Arc::clone(&desk))
            .with_settle(SettleStrategy::Fixed(Duration::ZERO));
        let driver = ChatWindowDriver::new(
            injector,
            DriverSettings {
                select_settle: Duration::ZERO,
                ..DriverSettings::default()
            },
        );
        let uc = AutoReplyUseCase::new(
            driver,
            Arc::new(client),
            ReplyPrompt::new("Minji", "korean"),
            GenerationOptions::default(),
            "Test Chat",
        );
        (uc, desk)
    }

    #[test]
    fn test_prompt_puts_transcript_first_and_names_speaker_and_language() {
        let prompt = ReplyPrompt::new("Minji", "korean").render("A: hi");

        assert!(prompt.starts_with("A: hi\n"));
        assert!(prompt.contains("Minji's perspective in korean"));
        assert!(prompt.contains("[name]"));
        assert!(prompt.contains("[time]"));
    }

    #[test]
    fn test_clean_candidates_trims_and_drops_empty() {
        let cleaned = clean_candidates(vec!["  hey  ".into(), " \n".into(), "ok".into()]).unwrap();
        assert_eq!(cleaned, vec!["hey".to_string(), "ok".to_string()]);
    }

    #[test]
    fn test_clean_candidates_all_empty_is_no_candidates() {
        let result = clean_candidates(vec!["   ".into()]);
        assert!(matches!(result, Err(GenerationError::NoCandidates)));
    }

    #[test]
    fn test_default_options_match_chat_tuning() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.model, "gpt-3.5-turbo");
        assert_eq!(opts.max_tokens, 128);
        assert_eq!(opts.candidates, 1);
        assert!((opts.temperature - 0.4).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_draft_reply_sends_rendered_prompt_and_returns_candidates() {
        // Arrange
        let mut client = MockTextGenerationClient::new();
        client
            .expect_generate()
            .withf(|prompt, opts| prompt.starts_with("Kim: lunch?\n") && opts.candidates == 1)
            .times(1)
            .returning(|_, _| Ok(vec![" sure, 12? ".to_string()]));
        let (uc, _) = use_case(MockDesktop::chat_app("Test Chat", "Kim: lunch?"), client);

        // Act
        let draft = uc.draft_reply().await.unwrap();

        // Assert
        assert_eq!(draft.transcript, "Kim: lunch?");
        assert_eq!(draft.candidates, vec!["sure, 12?".to_string()]);
    }

    #[tokio::test]
    async fn test_draft_reply_without_window_never_calls_backend() {
        // Arrange
        let mut client = MockTextGenerationClient::new();
        client.expect_generate().times(0);
        let (uc, _) = use_case(MockDesktop::new(), client);

        // Act
        let result = uc.draft_reply().await;

        // Assert
        assert!(matches!(
            result,
            Err(ReplyError::Driver(DriverError::WindowNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_draft_reply_propagates_generation_error() {
        let mut client = MockTextGenerationClient::new();
        client.expect_generate().returning(|_, _| {
            Err(GenerationError::Api {
                status: 429,
                body: "rate limited".into(),
            })
        });
        let (uc, _) = use_case(MockDesktop::chat_app("Test Chat", "x"), client);

        let result = uc.draft_reply().await;

        assert!(matches!(
            result,
            Err(ReplyError::Generation(GenerationError::Api { status: 429, .. }))
        ));
    }

    #[test]
    fn test_send_reply_submits_text() {
        // Arrange
        let (uc, desk) = use_case(
            MockDesktop::chat_app("Test Chat", ""),
            MockTextGenerationClient::new(),
        );

        // Act
        tokio_test::block_on(uc.send_reply("on my way")).unwrap();

        // Assert
        assert_eq!(desk.submitted_messages(), vec!["on my way".to_string()]);
    }

    #[test]
    fn test_send_reply_after_shutdown_types_nothing() {
        // Arrange
        let running = Arc::new(AtomicBool::new(true));
        let (uc, desk) = use_case(
            MockDesktop::chat_app("Test Chat", ""),
            MockTextGenerationClient::new(),
        );
        let uc = uc.with_running_flag(Arc::clone(&running));

        // Act
        running.store(false, Ordering::SeqCst);
        let result = tokio_test::block_on(uc.send_reply("on my way"));

        // Assert
        assert!(matches!(result, Err(ReplyError::Cancelled)));
        assert!(desk.submitted_messages().is_empty());
        assert!(desk.dispatched_messages().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_during_generation_discards_draft() {
        // Arrange: the flag flips while the backend is answering.
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let mut client = MockTextGenerationClient::new();
        client.expect_generate().returning(move |_, _| {
            flag.store(false, Ordering::SeqCst);
            Ok(vec!["late reply".into()])
        });
        let (uc, _) = use_case(MockDesktop::chat_app("Test Chat", "x"), client);
        let uc = uc.with_running_flag(running);

        // Act
        let result = uc.draft_reply().await;

        // Assert
        assert!(matches!(result, Err(ReplyError::Cancelled)));
    }
}
