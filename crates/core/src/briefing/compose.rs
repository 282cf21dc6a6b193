//! Narrative text and follow-up actions for a briefing.

use chrono::NaiveDate;

use super::types::{ContextAction, Opportunity, Trend, UrgentCustomer};

/// Urgent customers that get a retention email action.
pub const MAX_URGENT_ACTIONS: usize = 2;
/// Opportunities that get a promotion action.
pub const MAX_OPPORTUNITY_ACTIONS: usize = 2;

pub fn compose(
    urgent: &[UrgentCustomer],
    opportunities: &[Opportunity],
    trends: &[Trend],
    date: NaiveDate,
) -> (String, Vec<ContextAction>) {
    (briefing_narrative(urgent, opportunities, trends, date), context_actions(urgent, opportunities))
}

pub fn briefing_narrative(
    urgent: &[UrgentCustomer],
    opportunities: &[Opportunity],
    trends: &[Trend],
    date: NaiveDate,
) -> String {
    let mut narrative =
        format!("📊 **Daily Business Briefing - {}**\n\n", date.format("%B %d, %Y"));

    if urgent.is_empty() {
        narrative.push_str("✅ **No urgent customer issues detected**\n\n");
    } else {
        narrative.push_str(&format!("🚨 **URGENT ({} high-risk customers)**\n", urgent.len()));
        for customer in urgent {
            narrative.push_str(&format!(
                "• **{}** (${} value) - {}% churn risk\n",
                customer.name,
                format_currency(customer.value),
                whole_percent(customer.risk)
            ));
        }
        narrative.push('\n');
    }

    if !opportunities.is_empty() {
        narrative
            .push_str(&format!("⚡ **OPPORTUNITIES ({} identified)**\n", opportunities.len()));
        for opportunity in opportunities {
            narrative.push_str(&format!(
                "• **{} {}**: {} customers, ${} potential\n",
                opportunity.segment,
                opportunity.kind.title(),
                opportunity.count,
                format_currency(opportunity.potential_revenue)
            ));
        }
        narrative.push('\n');
    }

    if !trends.is_empty() {
        narrative.push_str(&format!("📈 **TRENDS ({} patterns)**\n", trends.len()));
        for trend in trends {
            match trend {
                Trend::SegmentDistribution { insight, .. } => {
                    narrative.push_str(&format!("• {insight}\n"));
                }
                Trend::HighRiskSegment { segment, avg_risk, count } => {
                    narrative.push_str(&format!(
                        "• **{segment} segment** showing {}% avg churn risk ({count} customers)\n",
                        whole_percent(*avg_risk)
                    ));
                }
            }
        }
        narrative.push('\n');
    }

    narrative.push_str(
        "💡 **Recommended Actions**: Use the buttons below to take immediate action on priority items.",
    );
    narrative
}

/// Retention emails for the top urgent customers, campaigns for the top
/// opportunities, then the analytics shortcut.
pub fn context_actions(
    urgent: &[UrgentCustomer],
    opportunities: &[Opportunity],
) -> Vec<ContextAction> {
    urgent
        .iter()
        .take(MAX_URGENT_ACTIONS)
        .map(ContextAction::retention_email)
        .chain(opportunities.iter().take(MAX_OPPORTUNITY_ACTIONS).map(ContextAction::segment_campaign))
        .chain(std::iter::once(ContextAction::view_analytics()))
        .collect()
}

/// Whole dollars with thousands separators, e.g. `12,500`.
pub fn format_currency(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (index, digit) in rounded.chars().enumerate() {
        if index > 0 && (rounded.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if value < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Ratio in [0,1] as a truncated whole percentage.
fn whole_percent(ratio: f64) -> i64 {
    (ratio * 100.0) as i64
}
