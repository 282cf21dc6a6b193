use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use scudo_agent::actions::{InMemoryEmailSender, InMemoryPromotionStore};
use scudo_agent::runtime::{AgentRuntime, Collaborators};
use scudo_agent::sources::InMemoryDataSource;
use scudo_core::config::{AppConfig, DataSourceConfig};

use super::{read_input, CommandResult, EXIT_ANALYSIS_FAILED, EXIT_INPUT_OR_CONFIG, EXIT_OK};

/// Builds an in-memory source from `{"<table>": [rows...], ...}`. The
/// logical names `customers`, `promotions` and `orders` land in their
/// configured tables.
pub fn load_tables(raw: &str, tables: &DataSourceConfig) -> Result<InMemoryDataSource> {
    let document: Value = serde_json::from_str(raw).context("tables file is not valid JSON")?;
    let Some(rows_by_table) = document.as_object() else {
        bail!("tables file must be a JSON object keyed by source name");
    };

    let mut source = InMemoryDataSource::for_tables(tables);
    for (name, rows) in rows_by_table {
        let Some(rows) = rows.as_array() else {
            bail!("table `{name}` must be an array of rows");
        };
        source = source.with_table(tables.resolve(name), rows.clone());
    }
    Ok(source)
}

fn load_source(path: Option<&Path>, tables: &DataSourceConfig) -> Result<InMemoryDataSource> {
    let raw = read_input(path).context("could not read tables input")?;
    load_tables(&raw, tables)
}

fn parse_args(args: Option<&str>) -> Result<Value> {
    match args {
        Some(args) => serde_json::from_str(args).context("--args is not valid JSON"),
        None => Ok(Value::Null),
    }
}

pub fn run(config: &AppConfig, name: &str, tables: Option<&Path>, args: Option<&str>) -> CommandResult {
    let prepared = load_source(tables, &config.data_sources)
        .and_then(|source| parse_args(args).map(|input| (source, input)));
    let (source, input) = match prepared {
        Ok(prepared) => prepared,
        Err(error) => {
            return CommandResult::failure("tool", "input_data", format!("{error:#}"), EXIT_INPUT_OR_CONFIG)
        }
    };

    let collaborators = Collaborators {
        source: Arc::new(source),
        email: Arc::new(InMemoryEmailSender::new()),
        promotions: Arc::new(InMemoryPromotionStore::new()),
    };
    let runtime = match AgentRuntime::new(config, collaborators) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("tool", "config_validation", error.to_string(), EXIT_INPUT_OR_CONFIG)
        }
    };

    let executor = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(executor) => executor,
        Err(error) => {
            return CommandResult::failure("tool", "runtime", error.to_string(), EXIT_ANALYSIS_FAILED)
        }
    };

    match executor.block_on(runtime.run_tool(name, input)) {
        Ok(output) => {
            let exit_code =
                if output.get("success") == Some(&Value::Bool(false)) { EXIT_ANALYSIS_FAILED } else { EXIT_OK };
            CommandResult::json(exit_code, &output)
        }
        Err(error) => {
            CommandResult::failure("tool", "unknown_tool", error.to_string(), EXIT_INPUT_OR_CONFIG)
        }
    }
}
