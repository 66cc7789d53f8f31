//! Output formatting for the cardlink CLI (text, json)

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use cardlink_core::{Outcome, StatusCode};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet && self.format == OutputFormat::Text {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet && self.format == OutputFormat::Text {
            eprintln!("{}", msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print rows as a table or a JSON array
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Text => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
        }
    }

    /// Print the result of a remote service execution
    pub fn print_outcome(&self, service_id: &str, outcome: &Outcome) {
        match self.format {
            OutputFormat::Text => match outcome {
                Outcome::Success(output) => {
                    self.success(&format!("Service {} completed", service_id));
                    if let Some(output) = output {
                        println!("{}", output);
                    }
                }
                Outcome::Failure {
                    status,
                    message,
                    data,
                } => {
                    self.error(&format!("Service {} failed: {}: {}", service_id, status, message));
                    if let Some(output) = data {
                        println!("{}", output);
                    }
                }
            },
            OutputFormat::Json => {
                let report = OutcomeReport::new(service_id, outcome);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
    }
}

/// JSON rendering of an [`Outcome`]
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport<'a> {
    pub service_id: &'a str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a str>,
}

impl<'a> OutcomeReport<'a> {
    pub fn new(service_id: &'a str, outcome: &'a Outcome) -> Self {
        let message = match outcome {
            Outcome::Success(_) => None,
            Outcome::Failure { message, .. } => Some(message.as_str()),
        };
        Self {
            service_id,
            success: outcome.is_success(),
            status: outcome.status(),
            code: outcome.status().map(StatusCode::code),
            message,
            output: outcome.data().map(String::as_str),
        }
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Reader display for readers command
#[derive(Debug, Tabled, Serialize)]
#[cfg_attr(not(feature = "pcsc"), allow(dead_code))]
pub struct ReaderRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Reader")]
    pub name: String,
}

/// Selector display for check-scenario command
#[derive(Debug, Tabled, Serialize)]
pub struct SelectorRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "AID")]
    pub aid: String,
    #[tabled(rename = "Occurrence")]
    pub occurrence: String,
    #[tabled(rename = "FCI")]
    pub control: String,
    #[tabled(rename = "APDUs")]
    pub apdus: usize,
    #[tabled(rename = "Selection SWs")]
    pub status_words: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardlink_core::TerminalError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_success_report() {
        let outcome = Outcome::Success(Some("42".to_string()));
        let report = serde_json::to_value(OutcomeReport::new("READ", &outcome)).unwrap();
        assert_eq!(
            report,
            json!({"serviceId": "READ", "success": true, "output": "42"})
        );
    }

    #[test]
    fn test_failure_report() {
        let error = TerminalError::CardCommand("Unexpected status word: 6A83".to_string());
        let outcome = Outcome::failure(&error, None);
        let report = serde_json::to_value(OutcomeReport::new("READ", &outcome)).unwrap();
        assert_eq!(report["success"], json!(false));
        assert_eq!(report["status"], json!("CARD_COMMAND_ERROR"));
        assert_eq!(report["code"], json!(3));
        assert_eq!(report["message"], json!(error.message()));
        assert!(report.get("output").is_none());
    }
}
