use serde::{Deserialize, Serialize};

use crate::briefing::HIGH_RISK_SEGMENT_THRESHOLD;
use crate::domain::customer::CustomerRecord;
use crate::domain::segment::aggregate_by_segment;

const HIGH_PRIORITY_SEGMENTS: &[&str] = &["VIP", "At-Risk", "Dormant"];
const MEDIUM_PRIORITY_AVG_SPEND: f64 = 2000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentPriority {
    High,
    Medium,
    Low,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub name: String,
    pub count: usize,
    pub avg_spend: f64,
    pub avg_risk: f64,
    pub priority: SegmentPriority,
}

/// One summary per segment, in order of first appearance.
pub fn segment_overview(customers: &[CustomerRecord]) -> Vec<SegmentSummary> {
    aggregate_by_segment(customers)
        .into_iter()
        .map(|aggregate| {
            let avg_spend = aggregate.avg_spent();
            let avg_risk = aggregate.avg_risk();
            let priority = if avg_risk > HIGH_RISK_SEGMENT_THRESHOLD
                || HIGH_PRIORITY_SEGMENTS.contains(&aggregate.segment.as_str())
            {
                SegmentPriority::High
            } else if avg_spend >= MEDIUM_PRIORITY_AVG_SPEND {
                SegmentPriority::Medium
            } else {
                SegmentPriority::Low
            };

            SegmentSummary { name: aggregate.segment, count: aggregate.count, avg_spend, avg_risk, priority }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInsights {
    pub characteristics: Vec<String>,
    pub opportunities: Vec<String>,
    pub risks: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn insights(characteristics: &[&str], opportunities: &[&str], risks: &[&str]) -> SegmentInsights {
    SegmentInsights {
        characteristics: owned(characteristics),
        opportunities: owned(opportunities),
        risks: owned(risks),
    }
}

pub fn segment_insights(segment_id: &str) -> SegmentInsights {
    match segment_id {
        "VIP_HIGH_VALUE" => insights(
            &["High spending", "Frequent purchases", "Tech enthusiasts"],
            &["Premium product launches", "Exclusive events", "Early access programs"],
            &["High expectations", "Price sensitivity to premium items"],
        ),
        "PRICE_SENSITIVE" => insights(
            &["Budget conscious", "Deal seekers", "Basic needs focus"],
            &["Volume discounts", "Bundle offers", "Loyalty programs"],
            &["Low margins", "High churn on price increases"],
        ),
        "AT_RISK" => insights(
            &["Declining engagement", "Reduced purchase frequency"],
            &["Win-back campaigns", "Personalized offers", "Feedback collection"],
            &["Imminent churn", "Negative word-of-mouth"],
        ),
        _ => insights(
            &["Standard customer behavior"],
            &["Standard marketing approaches"],
            &["Standard business risks"],
        ),
    }
}

pub fn segment_recommendations(segment_id: &str) -> Vec<String> {
    match segment_id {
        "VIP_HIGH_VALUE" => owned(&[
            "Create exclusive VIP tier with premium benefits",
            "Offer early access to new products",
            "Implement white-glove customer service",
        ]),
        "AT_RISK" => owned(&[
            "Launch immediate win-back campaign",
            "Offer personalized discount based on purchase history",
            "Conduct exit interview survey",
        ]),
        "NEW_CUSTOMER" => owned(&[
            "Implement onboarding email sequence",
            "Offer first-purchase discount",
            "Collect preference data for personalization",
        ]),
        _ => owned(&["Monitor segment performance", "Test targeted campaigns", "Collect customer feedback"]),
    }
}
