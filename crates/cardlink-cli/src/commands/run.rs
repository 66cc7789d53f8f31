//! Run command - execute a remote service through the configured reader

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use cardlink_core::Outcome;
use cardlink_http::{HttpConfig, HttpNetworkClient};
use cardlink_terminal::{create_reader, Terminal};

use crate::config::Config;
use crate::output::OutputContext;

/// Scan prompt shown by readers that have a display
const SCAN_MESSAGE: &str = "Present your card";

/// Execute one remote service; `Ok(false)` when the service reported a failure
pub async fn run(
    config: &Config,
    http: &HttpConfig,
    service_id: &str,
    input: Option<&str>,
    wait: bool,
    ctx: &OutputContext,
) -> Result<bool> {
    let reader = create_reader(&config.reader).context("Failed to open card reader")?;
    let network = HttpNetworkClient::new(http).context("Failed to create HTTP client")?;
    info!(url = %network.service_url(), "Using remote service endpoint");

    let mut terminal = Terminal::new(reader, Arc::new(network), config.terminal.clone());
    if let Some(scenario) = config.read_selection_scenario()? {
        terminal.set_card_selection_scenario(&scenario);
    }

    let outcome = execute(&mut terminal, service_id, input, wait, ctx).await;
    terminal.release();

    let Some(outcome) = outcome? else {
        ctx.warn("Interrupted");
        return Ok(false);
    };
    ctx.print_outcome(service_id, &outcome);
    Ok(outcome.is_success())
}

/// `None` when interrupted with Ctrl+C; the session's channel is closed
/// before this returns
async fn execute(
    terminal: &mut Terminal,
    service_id: &str,
    input: Option<&str>,
    wait: bool,
    ctx: &OutputContext,
) -> Result<Option<Outcome>> {
    if wait {
        terminal.set_scan_message(SCAN_MESSAGE);
        ctx.info("Waiting for card...");
        let present = tokio::select! {
            present = terminal.wait_for_card() => present.context("Card detection failed")?,
            _ = tokio::signal::ctrl_c() => return Ok(None),
        };
        if !present {
            anyhow::bail!("No card presented");
        }
    }

    ctx.info(&format!("Executing remote service '{}'...", service_id));
    let outcome = tokio::select! {
        outcome = terminal.execute_remote_service(service_id, input) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    Ok(outcome)
}

/// Read the service input from `--input` or `--input-file`
pub fn read_input(
    input: Option<String>,
    input_file: Option<&std::path::Path>,
) -> Result<Option<String>> {
    match (input, input_file) {
        (Some(input), _) => Ok(Some(input)),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))
            .map(Some),
        (None, None) => Ok(None),
    }
}
