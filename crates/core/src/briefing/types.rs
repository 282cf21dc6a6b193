//! Types produced by one briefing analysis pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::normalize::BriefingInput;
use crate::errors::BriefingError;

/// Projection of a customer whose churn risk crossed the urgency threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UrgentCustomer {
    pub name: String,
    pub id: String,
    pub email: String,
    pub risk: f64,
    pub value: f64,
    pub segment: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Upsell,
    Premium,
}

impl OpportunityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upsell => "upsell",
            Self::Premium => "premium",
        }
    }

    /// Title-cased label used in the narrative.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Upsell => "Upsell",
            Self::Premium => "Premium",
        }
    }

    /// Discount offered by the promotion suggested for this opportunity.
    pub fn promotion_discount_percent(&self) -> u8 {
        match self {
            Self::Upsell => 15,
            Self::Premium => 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(rename = "type")]
    pub kind: OpportunityKind,
    pub segment: String,
    pub count: usize,
    pub potential_revenue: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trend {
    /// `data` maps segment to customer count in first-seen order.
    SegmentDistribution { data: Map<String, Value>, insight: String },
    HighRiskSegment { segment: String, avg_risk: f64, count: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendEmail,
    CreatePromotion,
    ShowCustomerSegments,
    ProcessDataRequest,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendEmail => "send_email",
            Self::CreatePromotion => "create_promotion",
            Self::ShowCustomerSegments => "show_customer_segments",
            Self::ProcessDataRequest => "process_data_request",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailParams {
    pub customer_id: String,
    pub customer_email: String,
    pub template: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionParams {
    pub target_segment: String,
    pub promotion_type: OpportunityKind,
    pub discount_percent: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequestParams {
    pub query: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

/// Parameters of a context action. Variants are tried in declaration order
/// when decoding, so the empty variant stays last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionParams {
    Email(EmailParams),
    Promotion(PromotionParams),
    DataRequest(DataRequestParams),
    None(NoParams),
}

/// Descriptor of a follow-up action. The engine only produces these; an
/// executor elsewhere performs the side effects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextAction {
    pub label: String,
    pub action: ActionKind,
    pub params: ActionParams,
    pub priority: Priority,
}

impl ContextAction {
    pub fn retention_email(customer: &UrgentCustomer) -> Self {
        Self {
            label: format!("Contact {}", customer.name),
            action: ActionKind::SendEmail,
            params: ActionParams::Email(EmailParams {
                customer_id: customer.id.clone(),
                customer_email: customer.email.clone(),
                template: "retention".to_string(),
            }),
            priority: Priority::Urgent,
        }
    }

    pub fn segment_campaign(opportunity: &Opportunity) -> Self {
        Self {
            label: format!("Create {} Campaign", opportunity.segment),
            action: ActionKind::CreatePromotion,
            params: ActionParams::Promotion(PromotionParams {
                target_segment: opportunity.segment.clone(),
                promotion_type: opportunity.kind,
                discount_percent: opportunity.kind.promotion_discount_percent(),
            }),
            priority: Priority::High,
        }
    }

    pub fn view_analytics() -> Self {
        Self {
            label: "View Detailed Analytics".to_string(),
            action: ActionKind::ShowCustomerSegments,
            params: ActionParams::None(NoParams::default()),
            priority: Priority::Medium,
        }
    }

    pub fn request_raw_data() -> Self {
        Self {
            label: "Request Raw Customer Data".to_string(),
            action: ActionKind::ProcessDataRequest,
            params: ActionParams::DataRequest(DataRequestParams {
                query: "get all customer records with churn_risk total_spent segment".to_string(),
            }),
            priority: Priority::High,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsUsed {
    pub urgent_churn: f64,
    #[serde(serialize_with = "whole_amount")]
    pub min_upsell_spending: f64,
}

/// Whole-dollar amounts serialize as integers (`500`, not `500.0`).
fn whole_amount<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if amount.fract() == 0.0 && amount.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub urgent_count: usize,
    pub opportunities_count: usize,
    pub trends_count: usize,
    pub analysis_timestamp: DateTime<Utc>,
    pub thresholds_used: ThresholdsUsed,
}

/// Terminal output of a successful analysis pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BriefingResult {
    pub briefing_text: String,
    pub context_actions: Vec<ContextAction>,
    pub summary_stats: SummaryStats,
}

/// Structured failure returned in place of a briefing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BriefingFailure {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub briefing_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_actions: Option<Vec<ContextAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data_preview: Option<String>,
}

pub const RAW_PREVIEW_CHARS: usize = 100;

impl BriefingFailure {
    pub fn from_error(error: &BriefingError, input: &BriefingInput) -> Self {
        match error {
            BriefingError::MalformedInput { .. } => Self {
                success: false,
                error: "Data source returned text instead of structured customer data".to_string(),
                briefing_text: Some(
                    "❌ **Data Issue**: Unable to generate briefing. The data source returned \
                     analysis text instead of raw customer records. Please request 'raw customer \
                     data' specifically."
                        .to_string(),
                ),
                context_actions: Some(vec![ContextAction::request_raw_data()]),
                raw_data_preview: None,
            },
            BriefingError::NoCustomerData { keys } => {
                let found = match keys {
                    Some(keys) => format!("[{}]", keys.join(", ")),
                    None => "not an object".to_string(),
                };
                Self {
                    success: false,
                    error: "No customer data found in data source response".to_string(),
                    briefing_text: Some(format!(
                        "❌ **Data Structure Issue**: Expected customer records but found keys: \
                         {found}. Need customer data with churn_risk and spending information."
                    )),
                    context_actions: Some(Vec::new()),
                    raw_data_preview: None,
                }
            }
            other => Self {
                success: false,
                error: format!("Daily briefing analysis failed: {other}"),
                briefing_text: None,
                context_actions: None,
                raw_data_preview: Some(input.preview(RAW_PREVIEW_CHARS)),
            },
        }
    }
}

/// Either a briefing or an explanatory failure; serializes to exactly one
/// of the two documented JSON shapes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BriefingOutcome {
    Briefing(BriefingResult),
    Failed(BriefingFailure),
}

impl BriefingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Briefing(_))
    }

    pub fn briefing(&self) -> Option<&BriefingResult> {
        match self {
            Self::Briefing(result) => Some(result),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&BriefingFailure> {
        match self {
            Self::Briefing(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|error| {
            serde_json::json!({
                "success": false,
                "error": format!("Daily briefing analysis failed: {error}"),
            })
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|error| {
            format!(
                "{{\"success\":false,\"error\":\"Daily briefing analysis failed: {}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ActionKind, ActionParams, ContextAction, Opportunity, OpportunityKind, Priority,
        ThresholdsUsed, Trend,
    };

    #[test]
    fn whole_upsell_spend_serializes_as_integer() {
        let whole = ThresholdsUsed { urgent_churn: 0.7, min_upsell_spending: 500.0 };
        assert_eq!(
            serde_json::to_string(&whole).expect("serializes"),
            r#"{"urgent_churn":0.7,"min_upsell_spending":500}"#
        );

        let fractional = ThresholdsUsed { urgent_churn: 0.7, min_upsell_spending: 499.5 };
        assert_eq!(serde_json::to_value(fractional).expect("serializes")["min_upsell_spending"], 499.5);
    }

    #[test]
    fn opportunity_serializes_kind_as_type() {
        let opportunity = Opportunity {
            kind: OpportunityKind::Premium,
            segment: "VIP".to_string(),
            count: 2,
            potential_revenue: 1500.0,
        };

        let value = serde_json::to_value(&opportunity).expect("serialize opportunity");
        assert_eq!(value["type"], "premium");
        assert_eq!(value["count"], 2);
    }

    #[test]
    fn trend_variants_are_tagged_by_type() {
        let trend = Trend::HighRiskSegment {
            segment: "Dormant".to_string(),
            avg_risk: 0.62,
            count: 4,
        };

        let value = serde_json::to_value(&trend).expect("serialize trend");
        assert_eq!(value, json!({"type": "high_risk_segment", "segment": "Dormant", "avg_risk": 0.62, "count": 4}));
    }

    #[test]
    fn view_analytics_action_has_empty_params_object() {
        let value =
            serde_json::to_value(ContextAction::view_analytics()).expect("serialize action");

        assert_eq!(value["action"], "show_customer_segments");
        assert_eq!(value["params"], json!({}));
        assert_eq!(value["priority"], "medium");
    }

    #[test]
    fn action_params_decode_to_the_matching_variant() {
        let action: ContextAction = serde_json::from_value(json!({
            "label": "Create VIP Campaign",
            "action": "create_promotion",
            "params": {"target_segment": "VIP", "promotion_type": "premium", "discount_percent": 10},
            "priority": "high"
        }))
        .expect("decode action");

        assert_eq!(action.action, ActionKind::CreatePromotion);
        assert_eq!(action.priority, Priority::High);
        assert!(matches!(action.params, ActionParams::Promotion(ref params) if params.discount_percent == 10));

        let empty: ContextAction = serde_json::from_value(json!({
            "label": "View Detailed Analytics",
            "action": "show_customer_segments",
            "params": {},
            "priority": "medium"
        }))
        .expect("decode empty params");
        assert!(matches!(empty.params, ActionParams::None(_)));
    }
}
