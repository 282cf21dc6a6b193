use std::path::Path;

use scudo_core::briefing::BriefingEngine;
use scudo_core::config::AppConfig;

use super::{read_input, CommandResult, EXIT_ANALYSIS_FAILED, EXIT_INPUT_OR_CONFIG, EXIT_OK};

pub fn run(config: &AppConfig, input: Option<&Path>) -> CommandResult {
    match read_input(input) {
        Ok(raw) => analyze(config, raw),
        Err(error) => {
            CommandResult::failure("briefing", "input_read", error.to_string(), EXIT_INPUT_OR_CONFIG)
        }
    }
}

/// Unreadable payloads still produce a briefing object; only the exit code
/// tells the caller it was a fallback.
pub fn analyze(config: &AppConfig, raw: String) -> CommandResult {
    let outcome = BriefingEngine::new(config.briefing).analyze(raw);
    let exit_code = if outcome.is_success() { EXIT_OK } else { EXIT_ANALYSIS_FAILED };
    CommandResult::json(exit_code, &outcome)
}
