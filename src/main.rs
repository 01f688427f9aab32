use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use homework_bot::config::Config;
use homework_bot::logging;
use homework_bot::model::LoopState;
use homework_bot::poller::Poller;
use homework_bot::practicum::PracticumClient;
use homework_bot::telegram::TelegramNotifier;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to an optional YAML tuning file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(args.config.as_deref());

    // Logging needs the tuning's log file, so it starts after loading; a
    // config failure still reaches stderr through anyhow.
    let log_file = cfg
        .as_ref()
        .map(|c| c.tuning.log_file.clone())
        .unwrap_or_else(|_| "homework_bot.log".to_string());
    logging::init(Path::new(&log_file))?;

    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(%err, "configuration error; not starting");
            return Err(err.into());
        }
    };
    info!(?cfg, "configuration loaded");

    let api = PracticumClient::new(
        cfg.practicum_token.clone(),
        cfg.tuning.endpoint_url()?,
        cfg.tuning.request_timeout(),
    )
    .context("failed to build status API client")?;
    let notifier = TelegramNotifier::new(
        &cfg.telegram_token,
        &cfg.telegram_chat_id,
        cfg.tuning.request_timeout(),
    )
    .context("failed to build Telegram client")?;

    let state = LoopState::starting_at(chrono::Utc::now().timestamp(), cfg.tuning.lookback_secs);
    let mut poller = Poller::new(&api, &notifier, cfg.tuning.retry_interval(), state);

    tokio::select! {
        _ = poller.run() => {}
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            info!("shutdown signal received; exiting");
        }
    }

    Ok(())
}
