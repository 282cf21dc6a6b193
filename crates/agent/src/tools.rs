use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use scudo_core::briefing::{normalize, BriefingEngine, BriefingInput};
use scudo_core::config::DataSourceConfig;
use scudo_core::domain::customer::{coerce_float, first_identifier, CustomerRecord};
use scudo_core::segments::{
    compute_kpis, rfm_distribution, score_rfm, segment_insights, segment_overview,
    segment_recommendations, RfmInput,
};

use crate::actions::{EmailMessage, EmailSender, Promotion, PromotionStore, ALL_SEGMENTS};
use crate::guardrails::ActionPolicy;
use crate::sources::{CustomerDataSource, SourceFilter};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| &**tool)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// One line per tool, for prompting an assistant.
    pub fn describe(&self) -> String {
        if self.tools.is_empty() {
            return "No tools available.".to_string();
        }

        let mut context = String::from("AVAILABLE TOOLS:\n");
        for name in self.names() {
            if let Some(tool) = self.get(name) {
                context.push_str(&format!("- {name}: {}\n", tool.description()));
            }
        }
        context
    }

    /// Runs a tool by name. Tool failures come back as
    /// `{"success": false, "error": ..}`; only an unknown name is an `Err`.
    pub async fn execute(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| anyhow!("unknown tool `{name}`"))?;

        match tool.execute(input).await {
            Ok(output) => {
                debug!(event_name = "tool.execute.completed", tool = name, "tool executed");
                Ok(output)
            }
            Err(error) => {
                warn!(
                    event_name = "tool.execute.failed",
                    tool = name,
                    error = %format!("{error:#}"),
                    "tool execution failed"
                );
                Ok(json!({ "success": false, "error": format!("{error:#}") }))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn parse_input<T>(tool: &str, input: Value) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(input).with_context(|| format!("invalid input for {tool}"))
}

async fn fetch_customers(
    source: &dyn CustomerDataSource,
    tables: &DataSourceConfig,
) -> Result<Vec<CustomerRecord>> {
    let payload = source.fetch(&tables.customers_table, &SourceFilter::All).await?;
    Ok(normalize(&BriefingInput::Structured(payload))?.customers)
}

/// Runs the briefing engine over a supplied payload, or over the customer
/// table when none is given.
pub struct AnalyzeDailyBriefingTool {
    engine: BriefingEngine,
    source: Arc<dyn CustomerDataSource>,
    tables: DataSourceConfig,
}

impl AnalyzeDailyBriefingTool {
    pub fn new(
        engine: BriefingEngine,
        source: Arc<dyn CustomerDataSource>,
        tables: DataSourceConfig,
    ) -> Self {
        Self { engine, source, tables }
    }
}

/// Payload handed to the briefing tool: a bare string, or `raw_data`
/// (alias `customer_data`) inside an argument object.
fn supplied_payload(input: Value) -> Option<Value> {
    match input {
        Value::String(text) => Some(Value::String(text)),
        Value::Object(mut arguments) => arguments
            .remove("raw_data")
            .or_else(|| arguments.remove("customer_data"))
            .filter(|data| !data.is_null()),
        _ => None,
    }
}

#[async_trait]
impl Tool for AnalyzeDailyBriefingTool {
    fn name(&self) -> &'static str {
        "analyze_daily_briefing"
    }

    fn description(&self) -> &'static str {
        "Prioritized daily briefing: urgent customers, opportunities, trends and next actions"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let payload = match supplied_payload(input) {
            Some(payload) => payload,
            None => self.source.fetch(&self.tables.customers_table, &SourceFilter::All).await?,
        };
        Ok(self.engine.analyze(payload).to_value())
    }
}

pub struct GetDataTool {
    source: Arc<dyn CustomerDataSource>,
    tables: DataSourceConfig,
}

impl GetDataTool {
    pub fn new(source: Arc<dyn CustomerDataSource>, tables: DataSourceConfig) -> Self {
        Self { source, tables }
    }
}

#[derive(Deserialize)]
struct GetDataInput {
    source: String,
    #[serde(default)]
    filters: Option<Value>,
}

#[async_trait]
impl Tool for GetDataTool {
    fn name(&self) -> &'static str {
        "get_data"
    }

    fn description(&self) -> &'static str {
        "Fast data retrieval from customers, promotions or orders with optional filters"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: GetDataInput = parse_input(self.name(), input)?;
        let filter = SourceFilter::from_value(input.filters.as_ref());
        Ok(self.source.fetch(self.tables.resolve(&input.source), &filter).await?)
    }
}

pub struct SendEmailTool {
    sender: Arc<dyn EmailSender>,
    policy: ActionPolicy,
    from_address: String,
}

impl SendEmailTool {
    pub fn new(sender: Arc<dyn EmailSender>, policy: ActionPolicy, from_address: String) -> Self {
        Self { sender, policy, from_address }
    }
}

#[derive(Deserialize)]
struct SendEmailInput {
    to_email: String,
    subject: String,
    message: String,
    #[serde(default)]
    from_email: Option<String>,
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &'static str {
        "send_email"
    }

    fn description(&self) -> &'static str {
        "Send a plain-text email to one recipient"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: SendEmailInput = parse_input(self.name(), input)?;
        if !self.policy.email_enabled {
            return Err(anyhow!("email sending is disabled"));
        }
        if input.to_email.trim().is_empty() {
            return Err(anyhow!("to_email must not be empty"));
        }

        let message = EmailMessage {
            from: input.from_email.unwrap_or_else(|| self.from_address.clone()),
            to: input.to_email,
            subject: input.subject,
            body: input.message,
        };
        let sent_to = message.to.clone();
        let subject = message.subject.clone();
        let message_id = self.sender.send(message).await?;

        Ok(json!({
            "success": true,
            "message_id": message_id,
            "sent_to": sent_to,
            "subject": subject,
        }))
    }
}

pub struct CreatePromotionTool {
    store: Arc<dyn PromotionStore>,
    policy: ActionPolicy,
}

impl CreatePromotionTool {
    pub fn new(store: Arc<dyn PromotionStore>, policy: ActionPolicy) -> Self {
        Self { store, policy }
    }
}

#[derive(Deserialize)]
struct CreatePromotionInput {
    name: String,
    description: String,
    discount_percent: u8,
    #[serde(default = "all_segments")]
    target_segment: String,
}

fn all_segments() -> String {
    ALL_SEGMENTS.to_string()
}

#[async_trait]
impl Tool for CreatePromotionTool {
    fn name(&self) -> &'static str {
        "create_promotion"
    }

    fn description(&self) -> &'static str {
        "Create an active promotion for one segment or for all customers"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: CreatePromotionInput = parse_input(self.name(), input)?;
        if input.discount_percent > self.policy.max_discount_percent {
            return Err(anyhow!(
                "discount of {}% exceeds the {}% limit",
                input.discount_percent,
                self.policy.max_discount_percent
            ));
        }

        let promotion = Promotion::new(
            input.name,
            input.description,
            input.discount_percent,
            input.target_segment,
            Utc::now(),
        );
        self.store.save(promotion.clone()).await?;

        Ok(json!({ "success": true, "promotion_id": promotion.id, "created": promotion }))
    }
}

pub struct AnalyzeCustomerSegmentsTool {
    source: Arc<dyn CustomerDataSource>,
    tables: DataSourceConfig,
}

impl AnalyzeCustomerSegmentsTool {
    pub fn new(source: Arc<dyn CustomerDataSource>, tables: DataSourceConfig) -> Self {
        Self { source, tables }
    }
}

#[async_trait]
impl Tool for AnalyzeCustomerSegmentsTool {
    fn name(&self) -> &'static str {
        "analyze_customer_segments"
    }

    fn description(&self) -> &'static str {
        "Segment overview with counts, average spend, average risk, priority and KPIs"
    }

    async fn execute(&self, _input: Value) -> Result<Value> {
        let customers = fetch_customers(self.source.as_ref(), &self.tables).await?;
        let segments = segment_overview(&customers);

        Ok(json!({
            "success": true,
            "analysis_type": "segment_overview",
            "total_segments": segments.len(),
            "segments": segments,
            "kpis": compute_kpis(&customers),
        }))
    }
}

/// Recency assumed for customers whose orders carry no usable date.
pub const DEFAULT_RECENCY_DAYS: u32 = 30;

pub struct CalculateRfmScoresTool {
    source: Arc<dyn CustomerDataSource>,
    tables: DataSourceConfig,
}

impl CalculateRfmScoresTool {
    pub fn new(source: Arc<dyn CustomerDataSource>, tables: DataSourceConfig) -> Self {
        Self { source, tables }
    }
}

#[derive(Default, Deserialize)]
struct RfmToolInput {
    #[serde(default)]
    customer_ids: Option<Vec<String>>,
}

#[derive(Default)]
struct OrderHistory {
    total_spent: f64,
    order_count: u32,
    latest: Option<NaiveDate>,
}

fn order_date(order: &serde_json::Map<String, Value>) -> Option<NaiveDate> {
    let raw = order.get("order_date").or_else(|| order.get("created_date"))?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

fn order_histories(orders: &Value) -> HashMap<String, OrderHistory> {
    let mut histories: HashMap<String, OrderHistory> = HashMap::new();
    let rows = orders.get("data").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

    for order in rows.iter().filter_map(Value::as_object) {
        let Some(customer_id) = first_identifier(order, &["customer_id"]) else {
            continue;
        };
        let history = histories.entry(customer_id).or_default();
        history.total_spent += coerce_float(order.get("amount"), 0.0);
        history.order_count += 1;
        if let Some(date) = order_date(order) {
            history.latest = history.latest.max(Some(date));
        }
    }

    histories
}

#[async_trait]
impl Tool for CalculateRfmScoresTool {
    fn name(&self) -> &'static str {
        "calculate_rfm_scores"
    }

    fn description(&self) -> &'static str {
        "Recency, frequency and monetary scores with segment assignments"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: RfmToolInput =
            if input.is_null() { RfmToolInput::default() } else { parse_input(self.name(), input)? };

        let customers = fetch_customers(self.source.as_ref(), &self.tables).await?;
        let orders = self.source.fetch(&self.tables.orders_table, &SourceFilter::All).await?;
        let histories = order_histories(&orders);
        let today = Utc::now().date_naive();

        let scores = customers
            .iter()
            .filter(|customer| {
                input.customer_ids.as_ref().map_or(true, |ids| ids.contains(&customer.id))
            })
            .filter_map(|customer| {
                let history = histories.get(&customer.id)?;
                let recency_days = history
                    .latest
                    .map(|date| u32::try_from((today - date).num_days().max(0)).unwrap_or(u32::MAX))
                    .unwrap_or(DEFAULT_RECENCY_DAYS);
                Some(score_rfm(&RfmInput {
                    customer_id: customer.id.clone(),
                    customer_name: customer.name.clone(),
                    total_spent: history.total_spent,
                    order_count: history.order_count,
                    recency_days,
                }))
            })
            .collect::<Vec<_>>();

        let distribution: BTreeMap<String, usize> = rfm_distribution(&scores);
        Ok(json!({
            "success": true,
            "analysis_type": "rfm_calculation",
            "customer_count": scores.len(),
            "rfm_data": scores,
            "segment_distribution": distribution,
        }))
    }
}

/// Customers shown alongside segment insights.
const SAMPLE_CUSTOMERS: usize = 3;

pub struct GetSegmentInsightsTool {
    source: Arc<dyn CustomerDataSource>,
    tables: DataSourceConfig,
}

impl GetSegmentInsightsTool {
    pub fn new(source: Arc<dyn CustomerDataSource>, tables: DataSourceConfig) -> Self {
        Self { source, tables }
    }
}

#[derive(Deserialize)]
struct SegmentInsightsInput {
    segment_id: String,
}

#[async_trait]
impl Tool for GetSegmentInsightsTool {
    fn name(&self) -> &'static str {
        "get_segment_insights"
    }

    fn description(&self) -> &'static str {
        "Characteristics, opportunities, risks and recommendations for a segment"
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: SegmentInsightsInput = parse_input(self.name(), input)?;
        let filter = SourceFilter::Segment(input.segment_id.clone());
        let payload = self.source.fetch(&self.tables.customers_table, &filter).await?;
        let members = payload.get("data").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]);

        if members.is_empty() {
            return Ok(json!({
                "success": false,
                "error": format!("No customers found in segment: {}", input.segment_id),
            }));
        }

        Ok(json!({
            "success": true,
            "segment_id": input.segment_id,
            "customer_count": members.len(),
            "insights": segment_insights(&input.segment_id),
            "recommendations": segment_recommendations(&input.segment_id),
            "sample_customers": &members[..members.len().min(SAMPLE_CUSTOMERS)],
        }))
    }
}
