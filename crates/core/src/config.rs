use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::briefing::BriefingThresholds;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub briefing: BriefingThresholds,
    pub data_sources: DataSourceConfig,
    pub email: EmailConfig,
    pub logging: LoggingConfig,
}

pub const CUSTOMERS_SOURCE: &str = "customers";
pub const PROMOTIONS_SOURCE: &str = "promotions";
pub const ORDERS_SOURCE: &str = "orders";

/// Table names of the operational store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataSourceConfig {
    pub customers_table: String,
    pub promotions_table: String,
    pub orders_table: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            customers_table: CUSTOMERS_SOURCE.to_string(),
            promotions_table: PROMOTIONS_SOURCE.to_string(),
            orders_table: ORDERS_SOURCE.to_string(),
        }
    }
}

impl DataSourceConfig {
    /// Maps a logical source name to its configured table. Other names pass
    /// through unchanged.
    pub fn resolve<'a>(&'a self, source: &'a str) -> &'a str {
        match source {
            CUSTOMERS_SOURCE => &self.customers_table,
            PROMOTIONS_SOURCE => &self.promotions_table,
            ORDERS_SOURCE => &self.orders_table,
            other => other,
        }
    }

    pub fn table_names(&self) -> [&str; 3] {
        [&self.customers_table, &self.promotions_table, &self.orders_table]
    }
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub from_address: String,
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub urgent_churn_threshold: Option<f64>,
    pub min_upsell_spending: Option<f64>,
    pub customers_table: Option<String>,
    pub email_from_address: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            briefing: BriefingThresholds::default(),
            data_sources: DataSourceConfig::default(),
            email: EmailConfig { from_address: "noreply@infinitra.com".to_string(), enabled: true },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("scudo.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(briefing) = patch.briefing {
            if let Some(value) = briefing.urgent_churn_threshold {
                self.briefing.urgent_churn = value;
            }
            if let Some(value) = briefing.min_upsell_spending {
                self.briefing.min_upsell_spending = value;
            }
            if let Some(value) = briefing.high_risk_segment_threshold {
                self.briefing.high_risk_segment = value;
            }
            if let Some(value) = briefing.max_urgent_customers {
                self.briefing.max_urgent_customers = value;
            }
            if let Some(value) = briefing.max_opportunities {
                self.briefing.max_opportunities = value;
            }
        }

        if let Some(data_sources) = patch.data_sources {
            if let Some(customers_table) = data_sources.customers_table {
                self.data_sources.customers_table = customers_table;
            }
            if let Some(promotions_table) = data_sources.promotions_table {
                self.data_sources.promotions_table = promotions_table;
            }
            if let Some(orders_table) = data_sources.orders_table {
                self.data_sources.orders_table = orders_table;
            }
        }

        if let Some(email) = patch.email {
            if let Some(from_address) = email.from_address {
                self.email.from_address = from_address;
            }
            if let Some(enabled) = email.enabled {
                self.email.enabled = enabled;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SCUDO_URGENT_CHURN_THRESHOLD") {
            self.briefing.urgent_churn = parse_f64("SCUDO_URGENT_CHURN_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SCUDO_MIN_UPSELL_SPENDING") {
            self.briefing.min_upsell_spending = parse_f64("SCUDO_MIN_UPSELL_SPENDING", &value)?;
        }
        if let Some(value) = read_env("SCUDO_HIGH_RISK_SEGMENT_THRESHOLD") {
            self.briefing.high_risk_segment =
                parse_f64("SCUDO_HIGH_RISK_SEGMENT_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SCUDO_MAX_URGENT_CUSTOMERS") {
            self.briefing.max_urgent_customers = parse_usize("SCUDO_MAX_URGENT_CUSTOMERS", &value)?;
        }
        if let Some(value) = read_env("SCUDO_MAX_OPPORTUNITIES") {
            self.briefing.max_opportunities = parse_usize("SCUDO_MAX_OPPORTUNITIES", &value)?;
        }

        if let Some(value) = read_env("SCUDO_CUSTOMERS_TABLE") {
            self.data_sources.customers_table = value;
        }
        if let Some(value) = read_env("SCUDO_PROMOTIONS_TABLE") {
            self.data_sources.promotions_table = value;
        }
        if let Some(value) = read_env("SCUDO_ORDERS_TABLE") {
            self.data_sources.orders_table = value;
        }

        if let Some(value) = read_env("SCUDO_EMAIL_FROM_ADDRESS") {
            self.email.from_address = value;
        }
        if let Some(value) = read_env("SCUDO_EMAIL_ENABLED") {
            self.email.enabled = parse_bool("SCUDO_EMAIL_ENABLED", &value)?;
        }

        let log_level = read_env("SCUDO_LOGGING_LEVEL").or_else(|| read_env("SCUDO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SCUDO_LOGGING_FORMAT").or_else(|| read_env("SCUDO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(urgent_churn) = overrides.urgent_churn_threshold {
            self.briefing.urgent_churn = urgent_churn;
        }
        if let Some(min_upsell_spending) = overrides.min_upsell_spending {
            self.briefing.min_upsell_spending = min_upsell_spending;
        }
        if let Some(customers_table) = overrides.customers_table {
            self.data_sources.customers_table = customers_table;
        }
        if let Some(from_address) = overrides.email_from_address {
            self.email.from_address = from_address;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.briefing
            .validate()
            .map_err(|error| ConfigError::Validation(format!("briefing: {error}")))?;
        validate_data_sources(&self.data_sources)?;
        validate_email(&self.email)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("scudo.toml"), PathBuf::from("config/scudo.toml")]
        .into_iter()
        .find(|path| path.exists())
}

pub fn detect_config_path() -> Option<PathBuf> {
    resolve_config_path(None)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data_sources(data_sources: &DataSourceConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("data_sources.customers_table", &data_sources.customers_table),
        ("data_sources.promotions_table", &data_sources.promotions_table),
        ("data_sources.orders_table", &data_sources.orders_table),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{name} must not be empty")));
        }
    }

    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    let address = email.from_address.trim();
    let valid = address
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid {
        return Err(ConfigError::Validation(format!(
            "email.from_address must be an email address, got `{address}`"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    briefing: Option<BriefingPatch>,
    data_sources: Option<DataSourcesPatch>,
    email: Option<EmailPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct BriefingPatch {
    urgent_churn_threshold: Option<f64>,
    min_upsell_spending: Option<f64>,
    high_risk_segment_threshold: Option<f64>,
    max_urgent_customers: Option<usize>,
    max_opportunities: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct DataSourcesPatch {
    customers_table: Option<String>,
    promotions_table: Option<String>,
    orders_table: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    from_address: Option<String>,
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
