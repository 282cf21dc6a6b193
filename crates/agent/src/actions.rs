use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use scudo_core::briefing::{
    normalize, ActionKind, ActionParams, BriefingInput, ContextAction, DataRequestParams,
    EmailParams, PromotionParams,
};
use scudo_core::config::DataSourceConfig;
use scudo_core::errors::BriefingError;
use scudo_core::segments::{segment_overview, SegmentSummary};

use crate::guardrails::{ActionPolicy, GuardrailDecision};
use crate::sources::{CustomerDataSource, SourceError, SourceFilter};

pub const DEFAULT_FROM_ADDRESS: &str = "noreply@infinitra.com";

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action blocked ({reason_code}): {user_message}")]
    Blocked { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    #[error("email delivery failed: {0}")]
    Email(String),
    #[error("promotion store failed: {0}")]
    PromotionStore(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Briefing(#[from] BriefingError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn retention(from: &str, params: &EmailParams) -> Self {
        Self {
            from: from.to_string(),
            to: params.customer_email.clone(),
            subject: "We'd love to hear from you".to_string(),
            body: "Hello,\n\nThank you for being a valued customer. We noticed it has been a \
                   while and would like to know how we can serve you better. Reply to this \
                   email and our team will get back to you personally.\n\nBest regards"
                .to_string(),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Returns the provider message id.
    async fn send(&self, message: EmailMessage) -> Result<String, ActionError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmail {
    pub message_id: String,
    pub message: EmailMessage,
}

#[derive(Default)]
pub struct InMemoryEmailSender {
    outbox: RwLock<Vec<SentEmail>>,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.outbox.read().await.clone()
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<String, ActionError> {
        let message_id = Uuid::new_v4().to_string();
        self.outbox.write().await.push(SentEmail { message_id: message_id.clone(), message });
        Ok(message_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionType {
    /// Targets one segment, delivered in a scheduled run.
    Batch,
    Realtime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Active,
}

pub const ALL_SEGMENTS: &str = "all";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub description: String,
    pub discount_percent: u8,
    pub target_segment: String,
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    pub status: PromotionStatus,
    pub created_date: DateTime<Utc>,
}

impl Promotion {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        discount_percent: u8,
        target_segment: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let target_segment = target_segment.into();
        let promotion_type =
            if target_segment == ALL_SEGMENTS { PromotionType::Realtime } else { PromotionType::Batch };

        Self {
            id: format!("promo-{}", now.format("%Y%m%d%H%M%S")),
            name: name.into(),
            description: description.into(),
            discount_percent,
            target_segment,
            promotion_type,
            status: PromotionStatus::Active,
            created_date: now,
        }
    }

    pub fn for_campaign(params: &PromotionParams, now: DateTime<Utc>) -> Self {
        Self::new(
            format!("{} {} Campaign", params.target_segment, params.promotion_type.title()),
            format!("{}% off for {} customers", params.discount_percent, params.target_segment),
            params.discount_percent,
            params.target_segment.clone(),
            now,
        )
    }
}

#[async_trait]
pub trait PromotionStore: Send + Sync {
    async fn save(&self, promotion: Promotion) -> Result<(), ActionError>;
}

#[derive(Default)]
pub struct InMemoryPromotionStore {
    promotions: RwLock<Vec<Promotion>>,
}

impl InMemoryPromotionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<Promotion> {
        self.promotions.read().await.clone()
    }
}

#[async_trait]
impl PromotionStore for InMemoryPromotionStore {
    async fn save(&self, promotion: Promotion) -> Result<(), ActionError> {
        self.promotions.write().await.push(promotion);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    EmailSent { message_id: String, sent_to: String, subject: String },
    PromotionCreated { promotion: Promotion },
    SegmentOverview { segments: Vec<SegmentSummary> },
    DataFetched { query: String, count: usize, data: Value },
}

/// Executes context actions against injected collaborators.
pub struct ActionDispatcher {
    source: Arc<dyn CustomerDataSource>,
    email: Arc<dyn EmailSender>,
    promotions: Arc<dyn PromotionStore>,
    policy: ActionPolicy,
    from_address: String,
    tables: DataSourceConfig,
}

impl ActionDispatcher {
    pub fn new(
        source: Arc<dyn CustomerDataSource>,
        email: Arc<dyn EmailSender>,
        promotions: Arc<dyn PromotionStore>,
        policy: ActionPolicy,
    ) -> Self {
        Self {
            source,
            email,
            promotions,
            policy,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            tables: DataSourceConfig::default(),
        }
    }

    pub fn with_from_address(mut self, from_address: impl Into<String>) -> Self {
        self.from_address = from_address.into();
        self
    }

    pub fn with_tables(mut self, tables: DataSourceConfig) -> Self {
        self.tables = tables;
        self
    }

    pub fn policy(&self) -> &ActionPolicy {
        &self.policy
    }

    pub async fn dispatch(&self, action: &ContextAction) -> Result<DispatchOutcome, ActionError> {
        self.dispatch_at(action, Utc::now()).await
    }

    pub async fn dispatch_at(
        &self,
        action: &ContextAction,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, ActionError> {
        match self.policy.evaluate(action) {
            GuardrailDecision::Allow => {}
            GuardrailDecision::Deny { reason_code, user_message, fallback_path }
            | GuardrailDecision::Degrade { reason_code, user_message, fallback_path } => {
                warn!(
                    event_name = "action.dispatch.blocked",
                    action = action.action.as_str(),
                    reason_code,
                    fallback_path,
                    "context action blocked by policy"
                );
                return Err(ActionError::Blocked { reason_code, user_message, fallback_path });
            }
        }

        let outcome = match (&action.action, &action.params) {
            (ActionKind::SendEmail, ActionParams::Email(params)) => self.send_email(params).await?,
            (ActionKind::CreatePromotion, ActionParams::Promotion(params)) => {
                self.create_promotion(params, now).await?
            }
            (ActionKind::ShowCustomerSegments, _) => self.show_segments().await?,
            (ActionKind::ProcessDataRequest, ActionParams::DataRequest(params)) => {
                self.refetch(params).await?
            }
            (ActionKind::ProcessDataRequest, _) => {
                self.refetch(&DataRequestParams { query: String::new() }).await?
            }
            // the policy denies every other pairing
            (kind, _) => {
                return Err(ActionError::Blocked {
                    reason_code: "mismatched_params",
                    user_message: format!("The {} action is missing its parameters.", kind.as_str()),
                    fallback_path: "request_explicit_action",
                })
            }
        };

        info!(
            event_name = "action.dispatch.completed",
            action = action.action.as_str(),
            label = %action.label,
            "context action dispatched"
        );
        Ok(outcome)
    }

    async fn send_email(&self, params: &EmailParams) -> Result<DispatchOutcome, ActionError> {
        let message = EmailMessage::retention(&self.from_address, params);
        let sent_to = message.to.clone();
        let subject = message.subject.clone();
        let message_id = self.email.send(message).await?;
        Ok(DispatchOutcome::EmailSent { message_id, sent_to, subject })
    }

    async fn create_promotion(
        &self,
        params: &PromotionParams,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, ActionError> {
        let promotion = Promotion::for_campaign(params, now);
        self.promotions.save(promotion.clone()).await?;
        Ok(DispatchOutcome::PromotionCreated { promotion })
    }

    async fn show_segments(&self) -> Result<DispatchOutcome, ActionError> {
        let payload = self.source.fetch(&self.tables.customers_table, &SourceFilter::All).await?;
        let normalized = normalize(&BriefingInput::Structured(payload))?;
        Ok(DispatchOutcome::SegmentOverview { segments: segment_overview(&normalized.customers) })
    }

    async fn refetch(&self, params: &DataRequestParams) -> Result<DispatchOutcome, ActionError> {
        let payload = self.source.fetch(&self.tables.customers_table, &SourceFilter::All).await?;
        let data = payload.get("data").cloned().unwrap_or(Value::Array(Vec::new()));
        let count = data.as_array().map_or(0, Vec::len);
        Ok(DispatchOutcome::DataFetched { query: params.query.clone(), count, data })
    }
}
