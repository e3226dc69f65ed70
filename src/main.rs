//! The `shopflow` binary
//!
//! Runs scripted shopping flows against the configured storefront and
//! exits non-zero if any of them fails.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use postcondition_gate::OperatorGate;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use shopflow_cli::config::HarnessConfig;
use shopflow_cli::flows::{self, FLOW_NAMES};
use shopflow_cli::report;
use shopflow_cli::session::Session;

#[derive(Parser)]
#[command(name = "shopflow", version, about = "Resilient e-commerce UI automation harness")]
struct Cli {
    /// Path to a config file (default: config/shopflow.{yaml,toml,json})
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long, global = true)]
    headed: bool,

    /// Directory for screenshots and run reports
    #[arg(long, global = true)]
    artifacts: Option<PathBuf>,

    /// Whole-flow budget, e.g. "90s" or "2m"
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    flow_timeout: Option<Duration>,

    /// Price ceiling: filter search results and cap the cart total
    #[arg(long, global = true)]
    max_price: Option<f64>,

    /// Wait for an operator keypress if a CAPTCHA blocks the login flow
    #[arg(long, global = true)]
    interactive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single flow by name
    Run { flow: String },

    /// Run every flow, login first
    Suite,

    /// List available flow names
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if matches!(cli.command, Command::List) {
        for name in FLOW_NAMES {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = HarnessConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if cli.headed {
        config.headless = false;
    }
    if let Some(dir) = cli.artifacts {
        config.artifacts_dir = dir;
    }
    if let Some(timeout) = cli.flow_timeout {
        config.flow_timeout_secs = timeout.as_secs().max(1);
    }
    if let Some(price) = cli.max_price {
        config.max_price = Some(price);
    }

    let captcha_gate = cli.interactive.then(spawn_captcha_gate);

    let flows = match &cli.command {
        Command::Run { flow } => {
            let flow = flows::by_name(flow, &config, captcha_gate).with_context(|| {
                format!("unknown flow '{flow}' (available: {})", FLOW_NAMES.join(", "))
            })?;
            vec![flow]
        }
        Command::Suite => flows::suite(&config, captcha_gate),
        Command::List => unreachable!(),
    };

    if flows.iter().any(|f| f.name == "login") && !config.credentials.is_complete() {
        anyhow::bail!(
            "the login flow needs credentials; set SHOPFLOW_CREDENTIALS__USERNAME and \
             SHOPFLOW_CREDENTIALS__PASSWORD"
        );
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling run");
                cancel.cancel();
            }
        });
    }

    let session = Session::launch(&config).await.context("launching browser")?;
    let mut results = Vec::with_capacity(flows.len());
    for flow in &flows {
        if cancel.is_cancelled() {
            break;
        }
        // A failed flow does not stop the suite; each flow starts from its
        // own navigation.
        results.push(session.run(flow, &cancel).await);
    }
    session.close().await;

    report::log_summary(&results);
    report::write_report(&results, &config.artifacts_dir)
        .await
        .context("writing run report")?;

    if results.len() == flows.len() && results.iter().all(|r| r.succeeded()) {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// Gate that opens when the operator presses Enter.
fn spawn_captcha_gate() -> OperatorGate {
    let (handle, gate) = OperatorGate::pair();
    tokio::task::spawn_blocking(move || {
        eprintln!("If a CAPTCHA appears, solve it in the browser, then press Enter here.");
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_ok() {
            handle.open();
        }
    });
    gate
}
