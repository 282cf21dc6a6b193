use thiserror::Error;

/// Failure modes of one briefing analysis pass. The engine turns every
/// variant into a structured failure result instead of returning it.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BriefingError {
    #[error("payload is not valid JSON: {reason}")]
    MalformedInput { reason: String },
    #[error("no customer data found (keys present: {})", describe_keys(.keys))]
    NoCustomerData { keys: Option<Vec<String>> },
    #[error("invalid briefing thresholds: {0}")]
    InvalidThresholds(String),
    #[error("{0}")]
    Computation(String),
}

impl BriefingError {
    /// Malformed or unrecognized payloads come with a guided fallback output;
    /// everything else is reported as an analysis failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedInput { .. } | Self::NoCustomerData { .. })
    }
}

fn describe_keys(keys: &Option<Vec<String>>) -> String {
    match keys {
        Some(keys) if keys.is_empty() => "none".to_string(),
        Some(keys) => keys.join(", "),
        None => "payload is not an object".to_string(),
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApplicationError {
    #[error(transparent)]
    Briefing(#[from] BriefingError),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("action rejected by policy: {0}")]
    PolicyViolation(String),
}

impl ApplicationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Briefing(error) if error.is_recoverable() => {
                "The customer data could not be read. Request raw customer records and try again."
            }
            Self::Briefing(_) => "The daily briefing could not be generated.",
            Self::Integration(_) => "A data or notification provider is unavailable. Please retry shortly.",
            Self::Configuration(_) => "An unexpected internal error occurred.",
            Self::PolicyViolation(_) => "That action is not allowed from the assistant.",
        }
    }
}
