use std::path::Path;

use scudo_core::segments::compute_kpis;

use super::{read_customers, CommandResult, EXIT_OK};

pub fn run(input: Option<&Path>) -> CommandResult {
    match read_customers("kpis", input) {
        Ok(customers) => CommandResult::json(EXIT_OK, &compute_kpis(&customers)),
        Err(failure) => failure,
    }
}
