use std::path::Path;

use serde_json::json;

use scudo_core::segments::segment_overview;

use super::{read_customers, CommandResult, EXIT_OK};

pub fn run(input: Option<&Path>) -> CommandResult {
    let customers = match read_customers("segments", input) {
        Ok(customers) => customers,
        Err(failure) => return failure,
    };

    let segments = segment_overview(&customers);
    CommandResult::json(
        EXIT_OK,
        &json!({ "total_segments": segments.len(), "segments": segments }),
    )
}
