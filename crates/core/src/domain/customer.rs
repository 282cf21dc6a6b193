use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_NAME: &str = "Unknown";
pub const UNKNOWN_SEGMENT: &str = "Unknown";

/// Converts an externally supplied JSON value to `f64`, returning `default`
/// whenever the value is missing, null, non-numeric or not finite.
pub fn coerce_float(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(Value::Bool(flag)) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };

    parsed.filter(|number| number.is_finite()).unwrap_or(default)
}

/// Reads an identifier-like field. Strings are returned as-is, numbers are
/// rendered in decimal form; anything else is treated as absent.
pub fn identifier_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    }
}

/// First non-empty identifier among `keys`, in order.
pub fn first_identifier(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| identifier_field(record, key)).find(|id| !id.is_empty())
}

fn text_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Customer record as seen by the briefing engine. Built once at ingestion;
/// all later stages read typed fields only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub segment: String,
    pub total_spent: f64,
    pub churn_risk: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rfm_score: Option<f64>,
    /// Remaining source fields, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomerRecord {
    /// Types a raw JSON entry. Returns `None` for entries that are not
    /// objects; those are skipped rather than treated as errors.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(Self::from_map)
    }

    pub fn from_map(record: &Map<String, Value>) -> Self {
        let id = identifier_field(record, "id")
            .or_else(|| identifier_field(record, "customer_id"))
            .unwrap_or_default();
        let name = text_field(record, "name").unwrap_or_else(|| UNKNOWN_NAME.to_string());
        let email = text_field(record, "email").unwrap_or_default();
        let segment = text_field(record, "segment").unwrap_or_else(|| UNKNOWN_SEGMENT.to_string());

        let extra = record
            .iter()
            .filter(|(key, _)| !TYPED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id,
            name,
            email,
            segment,
            total_spent: coerce_float(record.get("total_spent"), 0.0),
            churn_risk: coerce_float(record.get("churn_risk"), 0.0),
            churn_probability: record
                .get("churn_probability")
                .map(|value| coerce_float(Some(value), 0.0)),
            rfm_score: record.get("rfm_score").map(|value| coerce_float(Some(value), 0.0)),
            extra,
        }
    }

    pub fn is_in_segment(&self, segment: &str) -> bool {
        self.segment == segment
    }
}

const TYPED_FIELDS: &[&str] = &[
    "id",
    "name",
    "email",
    "segment",
    "total_spent",
    "churn_risk",
    "churn_probability",
    "rfm_score",
];
