//! chat-autoreply entry point.
//!
//! ```text
//! main()
//!  └─ load_config()                 -- TOML, defaults on first run
//!  └─ tracing init                  -- RUST_LOG, else config.log_level
//!  └─ AutoReplyUseCase::draft_reply -- copy transcript, generate candidates
//!  └─ "Send? (y/n)"                 -- stdin confirmation
//!  └─ AutoReplyUseCase::send_reply  -- set text, press Enter
//! ```
//!
//! Ctrl-C clears the shared running flag and interrupts whichever await is
//! in progress; the program then prints "Cancelled." and exits.

use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Context};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use autoreply_agent::infrastructure::storage::config::{
    config_file_path, load_config, write_default_config_if_missing, AppConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("chat-autoreply starting");

    if config.chat.window_title.is_empty() {
        let path = config_file_path().context("resolving config path")?;
        if write_default_config_if_missing(&path).context("writing default configuration")? {
            info!(path = %path.display(), "wrote default configuration");
        }
        bail!("chat.window_title is not set; edit {}", path.display());
    }

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::SeqCst);
            let _ = shutdown_tx.send(true);
        }
    });

    if let Err(e) = run(&config, running, shutdown_rx).await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

/// Resolves to `None` if shutdown is signalled before `fut` completes.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
async fn until_shutdown<T>(
    mut shutdown: watch::Receiver<bool>,
    fut: impl Future<Output = T>,
) -> Option<T> {
    let stop = async move {
        // A closed channel means the signal task ended without a request.
        if shutdown.wait_for(|&stop| stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        out = fut => Some(out),
        () = stop => None,
    }
}

#[cfg(target_os = "windows")]
async fn run(
    config: &AppConfig,
    running: Arc<AtomicBool>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    use autoreply_agent::application::{
        chat_window::ChatWindowDriver,
        compose_reply::{AutoReplyUseCase, ReplyError},
        inject_key::KeyInjector,
    };
    use autoreply_agent::infrastructure::{
        generation::OpenAiClient, platform::windows::Win32Desktop,
    };

    let injector = KeyInjector::new(Arc::new(Win32Desktop::new()))
        .with_settle(config.injection.settle_strategy())
        .with_running_flag(Arc::clone(&running));
    let driver = ChatWindowDriver::new(injector, config.driver_settings());
    let client = Arc::new(OpenAiClient::new(
        &config.generation.base_url,
        &config.generation.api_key_env,
        config.generation.timeout(),
    ));
    let use_case = AutoReplyUseCase::new(
        driver,
        client,
        config.reply_prompt(),
        config.generation.options(),
        &config.chat.window_title,
    )
    .with_running_flag(running);

    let draft = match until_shutdown(shutdown.clone(), use_case.draft_reply()).await {
        Some(Err(ReplyError::Cancelled)) | None => {
            println!("Cancelled.");
            return Ok(());
        }
        Some(draft) => draft?,
    };
    println!("Copied transcript:\n{}", draft.transcript);
    for (i, candidate) in draft.candidates.iter().enumerate() {
        println!("Candidate {}:\n{candidate}", i + 1);
    }

    let Some(reply) = draft.candidates.first() else {
        bail!("no reply candidates");
    };
    let confirmed = until_shutdown(shutdown, confirm("Send? (y/n) "))
        .await
        .transpose()?
        .unwrap_or(false);
    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    match use_case.send_reply(reply).await {
        Ok(()) => println!("Sent: {reply}"),
        Err(ReplyError::Cancelled) => println!("Cancelled."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
async fn run(
    _config: &AppConfig,
    _running: Arc<AtomicBool>,
    _shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    bail!("window-message injection is only available on Windows")
}

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
async fn confirm(question: &str) -> anyhow::Result<bool> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}
