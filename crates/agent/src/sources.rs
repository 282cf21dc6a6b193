use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use scudo_core::config::DataSourceConfig;
pub use scudo_core::config::{CUSTOMERS_SOURCE, ORDERS_SOURCE, PROMOTIONS_SOURCE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),
    #[error("malformed data api result: {0}")]
    MalformedStatement(String),
}

/// Narrowing applied to a table scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SourceFilter {
    #[default]
    All,
    Segment(String),
    Status(String),
}

impl SourceFilter {
    /// Reads `{"segment": ..}` or `{"status": ..}`; segment wins when both
    /// are present. Anything else scans the whole table.
    pub fn from_value(filters: Option<&Value>) -> Self {
        let Some(object) = filters.and_then(Value::as_object) else {
            return Self::All;
        };

        if let Some(segment) = object.get("segment").and_then(Value::as_str) {
            return Self::Segment(segment.to_string());
        }
        if let Some(status) = object.get("status").and_then(Value::as_str) {
            return Self::Status(status.to_string());
        }
        Self::All
    }

    fn matches(&self, row: &Value) -> bool {
        let field_is =
            |field: &str, expected: &str| row.get(field).and_then(Value::as_str) == Some(expected);
        match self {
            Self::All => true,
            Self::Segment(segment) => {
                field_is("segment", segment) || field_is("segment_id", segment)
            }
            Self::Status(status) => field_is("status", status),
        }
    }
}

#[async_trait]
pub trait CustomerDataSource: Send + Sync {
    /// Returns `{"success": true, "count": n, "data": [...]}` for a known
    /// source.
    async fn fetch(&self, source: &str, filter: &SourceFilter) -> Result<Value, SourceError>;
}

#[derive(Default)]
pub struct InMemoryDataSource {
    tables: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source with the three standard tables, all empty.
    pub fn with_standard_sources() -> Self {
        Self::for_tables(&DataSourceConfig::default())
    }

    /// Source with the configured customer, promotion and order tables, all
    /// empty.
    pub fn for_tables(config: &DataSourceConfig) -> Self {
        let tables =
            config.table_names().into_iter().map(|name| (name.to_string(), Vec::new())).collect();
        Self { tables: RwLock::new(tables) }
    }

    pub fn with_table(mut self, source: impl Into<String>, rows: Vec<Value>) -> Self {
        self.tables.get_mut().insert(source.into(), rows);
        self
    }

    pub async fn insert(&self, source: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().await;
        tables.entry(source.to_string()).or_default().extend(rows);
    }

    /// Loads a relational statement result as the rows of `source`.
    pub async fn load_statement_result(
        &self,
        source: &str,
        result: &Value,
    ) -> Result<usize, SourceError> {
        let rows = decode_statement_result(result)?;
        let count = rows.len();
        self.insert(source, rows).await;
        Ok(count)
    }
}

#[async_trait]
impl CustomerDataSource for InMemoryDataSource {
    async fn fetch(&self, source: &str, filter: &SourceFilter) -> Result<Value, SourceError> {
        let tables = self.tables.read().await;
        let rows = tables.get(source).ok_or_else(|| SourceError::UnknownSource(source.to_string()))?;

        let data: Vec<Value> = rows.iter().filter(|row| filter.matches(row)).cloned().collect();
        debug!(
            event_name = "source.fetch.completed",
            source,
            filter = ?filter,
            count = data.len(),
            "fetched rows"
        );

        Ok(json!({ "success": true, "count": data.len(), "data": data }))
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ColumnMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

/// One cell of a data API record. At most one value field is set.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataApiField {
    #[serde(default)]
    pub is_null: Option<bool>,
    #[serde(default)]
    pub long_value: Option<i64>,
    #[serde(default)]
    pub double_value: Option<f64>,
    #[serde(default)]
    pub string_value: Option<String>,
    #[serde(default)]
    pub boolean_value: Option<bool>,
}

impl DataApiField {
    pub fn to_value(&self) -> Value {
        if self.is_null == Some(true) {
            return Value::Null;
        }
        if let Some(value) = self.long_value {
            return Value::from(value);
        }
        if let Some(value) = self.double_value {
            return Value::from(value);
        }
        if let Some(value) = &self.string_value {
            return Value::String(value.clone());
        }
        if let Some(value) = self.boolean_value {
            return Value::Bool(value);
        }
        Value::Null
    }
}

pub fn decode_rows(columns: &[ColumnMetadata], records: &[Vec<DataApiField>]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            let row: Map<String, Value> = record
                .iter()
                .enumerate()
                .map(|(index, field)| {
                    let name = columns
                        .get(index)
                        .and_then(|column| column.name.clone())
                        .unwrap_or_else(|| format!("col_{index}"));
                    (name, field.to_value())
                })
                .collect();
            Value::Object(row)
        })
        .collect()
}

/// Decodes `{"columnMetadata": [...], "records": [[...], ...]}`.
pub fn decode_statement_result(result: &Value) -> Result<Vec<Value>, SourceError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct StatementResult {
        #[serde(default)]
        column_metadata: Vec<ColumnMetadata>,
        #[serde(default)]
        records: Vec<Vec<DataApiField>>,
    }

    let parsed = StatementResult::deserialize(result)
        .map_err(|error| SourceError::MalformedStatement(error.to_string()))?;
    Ok(decode_rows(&parsed.column_metadata, &parsed.records))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use scudo_core::config::DataSourceConfig;

    use super::{
        decode_statement_result, CustomerDataSource, InMemoryDataSource, SourceError,
        SourceFilter, CUSTOMERS_SOURCE,
    };

    fn customers() -> InMemoryDataSource {
        InMemoryDataSource::with_standard_sources().with_table(
            CUSTOMERS_SOURCE,
            vec![
                json!({"id": "c1", "segment": "VIP", "status": "active"}),
                json!({"id": "c2", "segment": "Active", "status": "churned"}),
                json!({"id": "c3", "segment": "VIP", "status": "churned"}),
            ],
        )
    }

    #[tokio::test]
    async fn fetch_filters_by_segment_and_status() {
        let source = customers();

        let vip = source
            .fetch(CUSTOMERS_SOURCE, &SourceFilter::Segment("VIP".to_string()))
            .await
            .expect("vip fetch");
        assert_eq!(vip["count"], 2);

        let churned = source
            .fetch(CUSTOMERS_SOURCE, &SourceFilter::from_value(Some(&json!({"status": "churned"}))))
            .await
            .expect("status fetch");
        assert_eq!(churned["data"][0]["id"], "c2");
        assert_eq!(churned["data"][1]["id"], "c3");
    }

    #[tokio::test]
    async fn segment_filter_also_matches_segment_ids() {
        let source = InMemoryDataSource::with_standard_sources().with_table(
            CUSTOMERS_SOURCE,
            vec![json!({"id": "c9", "segment_id": "AT_RISK"}), json!({"id": "c1", "segment": "VIP"})],
        );

        let at_risk = source
            .fetch(CUSTOMERS_SOURCE, &SourceFilter::Segment("AT_RISK".to_string()))
            .await
            .expect("segment id fetch");
        assert_eq!(at_risk["count"], 1);
        assert_eq!(at_risk["data"][0]["id"], "c9");
    }

    #[tokio::test]
    async fn configured_tables_are_seeded_empty() {
        let config = DataSourceConfig {
            customers_table: "prod_customers".to_string(),
            ..DataSourceConfig::default()
        };
        let source = InMemoryDataSource::for_tables(&config);

        let customers = source.fetch("prod_customers", &SourceFilter::All).await.expect("renamed");
        assert_eq!(customers["count"], 0);
        assert!(source.fetch(CUSTOMERS_SOURCE, &SourceFilter::All).await.is_err());
    }

    #[tokio::test]
    async fn unknown_source_is_an_error() {
        let source = customers();
        let error = source.fetch("invoices", &SourceFilter::All).await.expect_err("unknown source");
        assert_eq!(error, SourceError::UnknownSource("invoices".to_string()));
        assert_eq!(error.to_string(), "Unknown source: invoices");
    }

    #[test]
    fn filter_defaults_to_full_scan() {
        assert_eq!(SourceFilter::from_value(None), SourceFilter::All);
        assert_eq!(SourceFilter::from_value(Some(&json!({"region": "EU"}))), SourceFilter::All);
        assert_eq!(
            SourceFilter::from_value(Some(&json!({"status": "x", "segment": "VIP"}))),
            SourceFilter::Segment("VIP".to_string())
        );
    }

    #[test]
    fn statement_rows_decode_with_column_names() {
        let result = json!({
            "columnMetadata": [{"name": "customer_id"}, {"name": "churn_probability"}, {}],
            "records": [
                [{"longValue": 42}, {"doubleValue": 0.81}, {"stringValue": "VIP"}],
                [{"stringValue": "c-7"}, {"isNull": true}, {"booleanValue": true}]
            ]
        });

        let rows = decode_statement_result(&result).expect("decodes");
        assert_eq!(rows[0], json!({"customer_id": 42, "churn_probability": 0.81, "col_2": "VIP"}));
        assert_eq!(rows[1], json!({"customer_id": "c-7", "churn_probability": null, "col_2": true}));
    }

    #[test]
    fn statement_without_metadata_uses_positional_names() {
        let rows = decode_statement_result(&json!({"records": [[{"longValue": 1}]]}))
            .expect("decodes");
        assert_eq!(rows, vec![json!({"col_0": 1})]);
    }

    #[tokio::test]
    async fn statement_result_loads_into_a_table() {
        let source = InMemoryDataSource::new();
        let loaded = source
            .load_statement_result(
                "analytical",
                &json!({"columnMetadata": [{"name": "id"}], "records": [[{"stringValue": "a"}]]}),
            )
            .await
            .expect("loads");
        assert_eq!(loaded, 1);

        let fetched = source.fetch("analytical", &SourceFilter::All).await.expect("fetch");
        assert_eq!(fetched["data"], json!([{"id": "a"}]));
    }
}
