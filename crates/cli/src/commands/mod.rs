pub mod briefing;
pub mod config;
pub mod kpis;
pub mod segments;
pub mod tool;

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;

use scudo_core::briefing::{normalize, BriefingInput};
use scudo_core::domain::customer::CustomerRecord;

pub const EXIT_OK: u8 = 0;
pub const EXIT_ANALYSIS_FAILED: u8 = 1;
pub const EXIT_INPUT_OR_CONFIG: u8 = 2;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn json(exit_code: u8, output: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(output) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure("output", "serialization", error.to_string(), EXIT_ANALYSIS_FAILED),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Reads the payload from `path`, or from stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut raw = String::new();
            io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

pub(crate) fn read_customers(
    command: &str,
    path: Option<&Path>,
) -> Result<Vec<CustomerRecord>, CommandResult> {
    let raw = read_input(path).map_err(|error| {
        CommandResult::failure(command, "input_read", error.to_string(), EXIT_INPUT_OR_CONFIG)
    })?;

    normalize(&BriefingInput::Raw(raw)).map(|payload| payload.customers).map_err(|error| {
        CommandResult::failure(command, "input_data", error.to_string(), EXIT_INPUT_OR_CONFIG)
    })
}
