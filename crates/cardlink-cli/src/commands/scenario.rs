//! Check-scenario command - validate a card selection scenario file

use std::path::Path;

use anyhow::{Context, Result};

use cardlink_core::CardSelectionScenario;

use crate::output::{OutputContext, SelectorRow};

/// Parse a selection scenario file and show what it would select
pub fn check_scenario(path: &Path, ctx: &OutputContext) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read selection scenario: {}", path.display()))?;
    let scenario = CardSelectionScenario::from_json(&json)
        .with_context(|| format!("Invalid selection scenario: {}", path.display()))?;

    ctx.info(&format!(
        "{:?} selection, channel {:?}",
        scenario.multi_selection_processing, scenario.channel_control
    ));

    let rows = selector_rows(&scenario);
    ctx.print(&rows);
    ctx.success(&format!("{} valid", path.display()));
    Ok(())
}

fn selector_rows(scenario: &CardSelectionScenario) -> Vec<SelectorRow> {
    scenario
        .card_selectors
        .iter()
        .zip(scenario.selection_requests())
        .enumerate()
        .map(|(index, (selector, request))| SelectorRow {
            index,
            aid: selector
                .aid
                .as_deref()
                .map(hex::encode_upper)
                .unwrap_or_else(|| "-".to_string()),
            occurrence: format!("{:?}", selector.file_occurrence),
            control: format!("{:?}", selector.file_control_information),
            apdus: request
                .card_request
                .as_ref()
                .map_or(0, |r| r.apdu_requests.len()),
            status_words: request
                .successful_selection_status_words
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect()
}
