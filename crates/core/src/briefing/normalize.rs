//! Payload normalization: JSON parsing, shape resolution and the
//! operational/analytical merge.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::customer::{coerce_float, first_identifier, CustomerRecord};
use crate::errors::BriefingError;

pub const OPERATIONAL_KEY: &str = "operational_customers";
pub const ANALYTICAL_KEY: &str = "analytical_data";
pub const DATA_KEY: &str = "data";
pub const CUSTOMERS_KEY: &str = "customers";

/// Raw payload handed to the engine by the data-retrieval collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum BriefingInput {
    /// Serialized JSON text, not yet parsed.
    Raw(String),
    /// Already-parsed payload.
    Structured(Value),
}

impl BriefingInput {
    /// At most `max_chars` characters of the input, for diagnostics.
    pub fn preview(&self, max_chars: usize) -> String {
        let text = match self {
            Self::Raw(text) if text.is_empty() => return "No data".to_string(),
            Self::Raw(text) => text.clone(),
            Self::Structured(Value::Null) => return "No data".to_string(),
            Self::Structured(value) => value.to_string(),
        };
        text.chars().take(max_chars).collect()
    }
}

impl From<String> for BriefingInput {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<&str> for BriefingInput {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<Value> for BriefingInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Raw(text),
            other => Self::Structured(other),
        }
    }
}

/// Recognized payload layouts, in probing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadShape {
    /// Operational profiles plus analytical risk rows, merged by id.
    Merged,
    /// Generic `data` list.
    Data,
    /// Operational profiles without analytical rows.
    OperationalOnly,
    /// Plain `customers` list.
    Customers,
    /// Any other list under a key mentioning "customer".
    CustomerKey,
}

impl PayloadShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merged => "merged",
            Self::Data => "data",
            Self::OperationalOnly => "operational_only",
            Self::Customers => "customers",
            Self::CustomerKey => "customer_key",
        }
    }
}

type ShapeMatcher = fn(&Map<String, Value>) -> Option<Vec<Value>>;

const SHAPE_MATCHERS: &[(PayloadShape, ShapeMatcher)] = &[
    (PayloadShape::Merged, match_merged),
    (PayloadShape::Data, match_data),
    (PayloadShape::OperationalOnly, match_operational_only),
    (PayloadShape::Customers, match_customers),
    (PayloadShape::CustomerKey, match_customer_key),
];

fn array_at<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    payload.get(key).and_then(Value::as_array)
}

fn match_merged(payload: &Map<String, Value>) -> Option<Vec<Value>> {
    let operational = array_at(payload, OPERATIONAL_KEY)?;
    let analytical = array_at(payload, ANALYTICAL_KEY)?;
    Some(merge_operational_analytical(operational, analytical))
}

fn match_data(payload: &Map<String, Value>) -> Option<Vec<Value>> {
    array_at(payload, DATA_KEY).cloned()
}

fn match_operational_only(payload: &Map<String, Value>) -> Option<Vec<Value>> {
    array_at(payload, OPERATIONAL_KEY).cloned()
}

fn match_customers(payload: &Map<String, Value>) -> Option<Vec<Value>> {
    array_at(payload, CUSTOMERS_KEY).cloned()
}

fn match_customer_key(payload: &Map<String, Value>) -> Option<Vec<Value>> {
    payload
        .iter()
        .filter(|(key, _)| key.to_lowercase().contains("customer"))
        .find_map(|(_, value)| value.as_array().cloned())
}

/// Customer records resolved from a payload.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedPayload {
    pub shape: PayloadShape,
    pub customers: Vec<CustomerRecord>,
    /// Entries that were not JSON objects and were dropped.
    pub skipped_entries: usize,
}

/// Parses the payload if needed and resolves the customer collection.
pub fn normalize(input: &BriefingInput) -> Result<NormalizedPayload, BriefingError> {
    let parsed;
    let payload = match input {
        BriefingInput::Raw(text) => {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|error| BriefingError::MalformedInput { reason: error.to_string() })?;
            &parsed
        }
        BriefingInput::Structured(value) => value,
    };

    let (shape, entries) = resolve_collection(payload)?;
    let customers = entries.iter().filter_map(CustomerRecord::from_value).collect::<Vec<_>>();
    let skipped_entries = entries.len() - customers.len();

    debug!(
        event_name = "briefing.normalize.resolved",
        shape = shape.as_str(),
        record_count = customers.len(),
        skipped_entries,
        "customer collection resolved"
    );

    Ok(NormalizedPayload { shape, customers, skipped_entries })
}

/// Runs the shape matchers in order and returns the first hit.
pub fn resolve_collection(payload: &Value) -> Result<(PayloadShape, Vec<Value>), BriefingError> {
    let Some(object) = payload.as_object() else {
        return Err(BriefingError::NoCustomerData { keys: None });
    };

    SHAPE_MATCHERS
        .iter()
        .find_map(|(shape, matcher)| matcher(object).map(|entries| (*shape, entries)))
        .ok_or_else(|| BriefingError::NoCustomerData { keys: Some(object.keys().cloned().collect()) })
}

/// Overlays analytical risk fields onto operational profile records.
///
/// The output has exactly one entry per operational entry, in the same
/// order. Entries that are not objects pass through unchanged.
pub fn merge_operational_analytical(operational: &[Value], analytical: &[Value]) -> Vec<Value> {
    let lookup = analytical
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|record| {
            first_identifier(record, &["customer_id", "id"]).map(|id| (id, record))
        })
        .collect::<HashMap<_, _>>();

    let mut matched = 0usize;
    let merged = operational
        .iter()
        .map(|entry| {
            let Some(record) = entry.as_object() else {
                return entry.clone();
            };

            let mut merged = record.clone();
            let analytics = first_identifier(record, &["id", "customer_id"])
                .and_then(|id| lookup.get(&id).copied());
            if analytics.is_some() {
                matched += 1;
            }

            for field in ["churn_risk", "churn_probability", "rfm_score"] {
                let value = analytics.map_or(0.0, |row| coerce_float(row.get(field), 0.0));
                merged.insert(field.to_string(), Value::from(value));
            }

            Value::Object(merged)
        })
        .collect::<Vec<_>>();

    debug!(
        event_name = "briefing.normalize.merged",
        operational_count = operational.len(),
        analytical_count = lookup.len(),
        matched,
        "operational and analytical records merged"
    );

    merged
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{merge_operational_analytical, normalize, BriefingInput, PayloadShape};
    use crate::errors::BriefingError;

    #[test]
    fn raw_text_that_is_not_json_is_malformed() {
        let result = normalize(&BriefingInput::from("not json"));
        assert!(matches!(result, Err(BriefingError::MalformedInput { .. })));
    }

    #[test]
    fn merged_shape_wins_over_data_key() {
        let payload = json!({
            "data": [{"id": "ignored"}],
            "operational_customers": [{"id": "c-1", "name": "Ada"}],
            "analytical_data": [{"customer_id": "c-1", "churn_risk": "0.9"}]
        });

        let normalized = normalize(&BriefingInput::from(payload)).expect("normalize");
        assert_eq!(normalized.shape, PayloadShape::Merged);
        assert_eq!(normalized.customers.len(), 1);
        assert_eq!(normalized.customers[0].churn_risk, 0.9);
    }

    #[test]
    fn shapes_are_probed_in_fixed_order() {
        let cases = [
            (json!({"data": [], "customers": [{"id": "x"}]}), PayloadShape::Data),
            (json!({"operational_customers": [{}], "customers": []}), PayloadShape::OperationalOnly),
            (json!({"customers": [{}], "vip_customers": []}), PayloadShape::Customers),
            (json!({"count": 2, "VipCustomerRows": [{}]}), PayloadShape::CustomerKey),
        ];

        for (payload, expected) in cases {
            let normalized = normalize(&BriefingInput::from(payload)).expect("normalize");
            assert_eq!(normalized.shape, expected);
        }
    }

    #[test]
    fn non_array_values_fall_through_to_later_shapes() {
        let payload = json!({"data": "summary text", "customers": [{"id": "c-1"}]});
        let normalized = normalize(&BriefingInput::from(payload)).expect("normalize");
        assert_eq!(normalized.shape, PayloadShape::Customers);
    }

    #[test]
    fn unrecognized_payload_reports_present_keys() {
        let result = normalize(&BriefingInput::from(json!({"foo": "bar"})));
        assert_eq!(result, Err(BriefingError::NoCustomerData { keys: Some(vec!["foo".to_string()]) }));

        let result = normalize(&BriefingInput::from("[1, 2]"));
        assert_eq!(result, Err(BriefingError::NoCustomerData { keys: None }));
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let payload = json!({"customers": [{"id": "c-1"}, "c-2", 3, null]});
        let normalized = normalize(&BriefingInput::from(payload)).expect("normalize");
        assert_eq!(normalized.customers.len(), 1);
        assert_eq!(normalized.skipped_entries, 3);
    }

    #[test]
    fn merge_preserves_operational_order_count_and_fields() {
        let operational = vec![
            json!({"id": "c-1", "name": "Ada", "segment": "VIP", "total_spent": 8500}),
            json!("not a record"),
            json!({"customer_id": "c-2", "name": "Bo", "churn_risk": 0.99}),
            json!({"id": "c-3", "name": "Cy"}),
        ];
        let analytical = vec![
            json!({"customer_id": "c-1", "churn_risk": "0.85", "churn_probability": 0.8, "rfm_score": 4.5}),
            json!({"id": "c-2", "churn_risk": "bogus"}),
            json!(42),
        ];

        let merged = merge_operational_analytical(&operational, &analytical);
        assert_eq!(merged.len(), operational.len());

        assert_eq!(merged[0]["name"], "Ada");
        assert_eq!(merged[0]["total_spent"], 8500);
        assert_eq!(merged[0]["churn_risk"], 0.85);
        assert_eq!(merged[0]["rfm_score"], 4.5);

        assert_eq!(merged[1], json!("not a record"));

        assert_eq!(merged[2]["name"], "Bo");
        assert_eq!(merged[2]["churn_risk"], 0.0);
        assert_eq!(merged[2]["churn_probability"], 0.0);

        for field in ["churn_risk", "churn_probability", "rfm_score"] {
            assert_eq!(merged[3][field], Value::from(0.0));
        }
    }

    #[test]
    fn merge_matches_numeric_and_string_ids() {
        let operational = vec![json!({"id": "7"})];
        let analytical = vec![json!({"customer_id": 7, "churn_risk": 0.75})];

        let merged = merge_operational_analytical(&operational, &analytical);
        assert_eq!(merged[0]["churn_risk"], 0.75);
    }

    #[test]
    fn preview_truncates_on_character_boundaries() {
        let input = BriefingInput::from("é".repeat(150));
        assert_eq!(input.preview(100).chars().count(), 100);
        assert_eq!(BriefingInput::from("").preview(100), "No data");
    }
}
