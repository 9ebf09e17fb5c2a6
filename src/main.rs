//! slack-stacker: posts new Stack Exchange questions to a Slack webhook.
//!
//! Meant to be run from cron: each invocation does a single poll and exits.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slack_stacker::config;
use slack_stacker::notify::{LogNotifier, Notifier, SlackNotifier};
use slack_stacker::runner::{RunOutcome, Runner};
use slack_stacker::stack::StackExchangeClient;
use slack_stacker::state::state_reader;
use slack_stacker::storage::StateStore;
use slack_stacker::versioned::JsonCodec;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Config file (TOML or JSON).
    #[arg(short = 'f', long = "config")]
    config: PathBuf,

    /// Log new questions instead of posting them.
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("slack_stacker=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when there is none.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let cfg = config::load_from(&cli.config)?;

    let notifier: Box<dyn Notifier> = if cli.dry_run {
        Box::new(LogNotifier)
    } else {
        Box::new(SlackNotifier::new(cfg.slack_webhook_url.clone()))
    };
    let source = StackExchangeClient::new(&cfg.api_base_url, cfg.stackexchange_key.clone())?;

    let runner = Runner::new(
        cfg.tags.clone(),
        Box::new(source),
        notifier,
        StateStore::new(&cfg.state_file),
        state_reader(JsonCodec::pretty()),
    );

    match runner.run_once(Utc::now()).await {
        Ok(RunOutcome::Completed { notified, .. }) => {
            tracing::info!(notified, "done");
            Ok(())
        }
        Ok(outcome) => {
            tracing::info!(?outcome, "done");
            Ok(())
        }
        Err(e) => {
            tracing::error!("run aborted, state file left untouched: {e:#}");
            Err(e)
        }
    }
}
