use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use scudo_core::config::{detect_config_path, AppConfig};
use toml::Value;

/// Effective configuration, one line per field with where its value came from.
pub fn run(config: &AppConfig, explicit_path: Option<&Path>) -> String {
    let config_file_path: Option<PathBuf> = match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => detect_config_path(),
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let briefing = &config.briefing;
    let fields: [(&str, String, &[&str]); 12] = [
        (
            "briefing.urgent_churn_threshold",
            briefing.urgent_churn.to_string(),
            &["SCUDO_URGENT_CHURN_THRESHOLD"],
        ),
        (
            "briefing.min_upsell_spending",
            briefing.min_upsell_spending.to_string(),
            &["SCUDO_MIN_UPSELL_SPENDING"],
        ),
        (
            "briefing.high_risk_segment_threshold",
            briefing.high_risk_segment.to_string(),
            &["SCUDO_HIGH_RISK_SEGMENT_THRESHOLD"],
        ),
        (
            "briefing.max_urgent_customers",
            briefing.max_urgent_customers.to_string(),
            &["SCUDO_MAX_URGENT_CUSTOMERS"],
        ),
        (
            "briefing.max_opportunities",
            briefing.max_opportunities.to_string(),
            &["SCUDO_MAX_OPPORTUNITIES"],
        ),
        (
            "data_sources.customers_table",
            config.data_sources.customers_table.clone(),
            &["SCUDO_CUSTOMERS_TABLE"],
        ),
        (
            "data_sources.promotions_table",
            config.data_sources.promotions_table.clone(),
            &["SCUDO_PROMOTIONS_TABLE"],
        ),
        (
            "data_sources.orders_table",
            config.data_sources.orders_table.clone(),
            &["SCUDO_ORDERS_TABLE"],
        ),
        ("email.from_address", config.email.from_address.clone(), &["SCUDO_EMAIL_FROM_ADDRESS"]),
        ("email.enabled", config.email.enabled.to_string(), &["SCUDO_EMAIL_ENABLED"]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SCUDO_LOGGING_LEVEL", "SCUDO_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["SCUDO_LOGGING_FORMAT", "SCUDO_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in fields {
        let source =
            field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
