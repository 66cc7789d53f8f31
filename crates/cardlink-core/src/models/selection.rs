//! Pre-configured selection scenario

use serde::{Deserialize, Serialize};

use super::{CardSelectionRequest, CardSelector, ChannelControl, MultiSelectionProcessing};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultCardSelection {
    pub card_selection_request: CardSelectionRequest,
}

/// Selection run before a remote service starts
///
/// `card_selectors` and `default_card_selections` pair up by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSelectionScenario {
    pub multi_selection_processing: MultiSelectionProcessing,
    pub channel_control: ChannelControl,
    pub card_selectors: Vec<CardSelector>,
    pub default_card_selections: Vec<DefaultCardSelection>,
}

/// Scenario parse failures
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Invalid selection scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Selection scenario has {selectors} selectors but {selections} selections")]
    Unpaired { selectors: usize, selections: usize },
}

impl CardSelectionScenario {
    /// Parse a scenario and check its selectors pair up with its selections
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(json)?;
        if scenario.card_selectors.len() != scenario.default_card_selections.len() {
            return Err(ScenarioError::Unpaired {
                selectors: scenario.card_selectors.len(),
                selections: scenario.default_card_selections.len(),
            });
        }
        Ok(scenario)
    }

    pub fn selection_requests(&self) -> Vec<CardSelectionRequest> {
        self.default_card_selections
            .iter()
            .map(|s| s.card_selection_request.clone())
            .collect()
    }
}

/// Pre-computed selection results attached to the first message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedCardSelectionScenario {
    /// JSON list of `CardSelectionResponse`, encoded as a string
    pub processed_card_selection_scenario_json_string: String,
}
