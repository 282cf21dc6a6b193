//! Daily briefing analysis engine
//!
//! Turns one customer payload into a prioritized briefing:
//! 1. **Normalize** (`normalize`) - parse, resolve the payload shape, merge
//!    operational and analytical records, type every record
//! 2. **Select** - urgent customers (`urgency`), revenue opportunities
//!    (`opportunity`) and segment trends (`trends`), independently
//! 3. **Compose** (`compose`) - narrative text and follow-up actions
//!
//! The engine is pure and synchronous. It never returns an error to its
//! caller: unreadable payloads produce a guided fallback result and any other
//! failure is reported as a `success: false` object.

pub mod compose;
pub mod normalize;
pub mod opportunity;
pub mod trends;
pub mod types;
pub mod urgency;

pub use compose::{briefing_narrative, compose, context_actions};
pub use normalize::{merge_operational_analytical, normalize, BriefingInput, NormalizedPayload, PayloadShape};
pub use opportunity::find_opportunities;
pub use trends::analyze_trends;
pub use types::*;
pub use urgency::identify_urgent;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::customer::CustomerRecord;
use crate::errors::BriefingError;

/// Churn risk above which a customer needs attention today.
pub const URGENT_CHURN_THRESHOLD: f64 = 0.7;
/// Spend above which an active customer is an upsell candidate.
pub const MIN_UPSELL_SPENDING: f64 = 500.0;
/// Average churn risk above which a whole segment is flagged.
pub const HIGH_RISK_SEGMENT_THRESHOLD: f64 = 0.5;
pub const MAX_URGENT_CUSTOMERS: usize = 3;
pub const MAX_OPPORTUNITIES: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BriefingThresholds {
    pub urgent_churn: f64,
    pub min_upsell_spending: f64,
    pub high_risk_segment: f64,
    pub max_urgent_customers: usize,
    pub max_opportunities: usize,
}

impl Default for BriefingThresholds {
    fn default() -> Self {
        Self {
            urgent_churn: URGENT_CHURN_THRESHOLD,
            min_upsell_spending: MIN_UPSELL_SPENDING,
            high_risk_segment: HIGH_RISK_SEGMENT_THRESHOLD,
            max_urgent_customers: MAX_URGENT_CUSTOMERS,
            max_opportunities: MAX_OPPORTUNITIES,
        }
    }
}

impl BriefingThresholds {
    pub fn validate(&self) -> Result<(), BriefingError> {
        for (name, value) in
            [("urgent_churn", self.urgent_churn), ("high_risk_segment", self.high_risk_segment)]
        {
            if !(0.0..=1.0).contains(&value) {
                return Err(BriefingError::InvalidThresholds(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }

        if !self.min_upsell_spending.is_finite() || self.min_upsell_spending < 0.0 {
            return Err(BriefingError::InvalidThresholds(format!(
                "min_upsell_spending must be a non-negative amount, got {}",
                self.min_upsell_spending
            )));
        }

        if self.max_urgent_customers == 0 || self.max_opportunities == 0 {
            return Err(BriefingError::InvalidThresholds(
                "max_urgent_customers and max_opportunities must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn used(&self) -> ThresholdsUsed {
        ThresholdsUsed {
            urgent_churn: self.urgent_churn,
            min_upsell_spending: self.min_upsell_spending,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BriefingEngine {
    thresholds: BriefingThresholds,
}

impl BriefingEngine {
    pub fn new(thresholds: BriefingThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &BriefingThresholds {
        &self.thresholds
    }

    /// Analyzes a payload as of now.
    pub fn analyze(&self, input: impl Into<BriefingInput>) -> BriefingOutcome {
        self.analyze_at(input, Utc::now())
    }

    /// Analyzes a payload as of `now`. Never fails; see [`BriefingOutcome`].
    pub fn analyze_at(&self, input: impl Into<BriefingInput>, now: DateTime<Utc>) -> BriefingOutcome {
        let input = input.into();

        match self.try_analyze(&input, now) {
            Ok(result) => BriefingOutcome::Briefing(result),
            Err(error) => {
                warn!(
                    event_name = "briefing.analysis.failed",
                    recoverable = error.is_recoverable(),
                    error = %error,
                    "daily briefing analysis did not produce a briefing"
                );
                BriefingOutcome::Failed(BriefingFailure::from_error(&error, &input))
            }
        }
    }

    pub fn try_analyze(
        &self,
        input: &BriefingInput,
        now: DateTime<Utc>,
    ) -> Result<BriefingResult, BriefingError> {
        self.thresholds.validate()?;
        let payload = normalize(input)?;
        self.analyze_records(&payload.customers, now)
    }

    /// Runs selection and composition over already-typed records.
    pub fn analyze_records(
        &self,
        customers: &[CustomerRecord],
        now: DateTime<Utc>,
    ) -> Result<BriefingResult, BriefingError> {
        let thresholds = &self.thresholds;

        let urgent =
            identify_urgent(customers, thresholds.urgent_churn, thresholds.max_urgent_customers);
        let opportunities = find_opportunities(
            customers,
            thresholds.min_upsell_spending,
            thresholds.max_opportunities,
        );
        let trends = analyze_trends(customers, thresholds.high_risk_segment);

        ensure_finite(&urgent, &opportunities, &trends)?;

        let (briefing_text, context_actions) =
            compose(&urgent, &opportunities, &trends, now.date_naive());

        let summary_stats = SummaryStats {
            urgent_count: urgent.len(),
            opportunities_count: opportunities.len(),
            trends_count: trends.len(),
            analysis_timestamp: now,
            thresholds_used: thresholds.used(),
        };

        info!(
            event_name = "briefing.analysis.completed",
            record_count = customers.len(),
            urgent_count = summary_stats.urgent_count,
            opportunities_count = summary_stats.opportunities_count,
            trends_count = summary_stats.trends_count,
            action_count = context_actions.len(),
            "daily briefing analysis complete"
        );

        Ok(BriefingResult { briefing_text, context_actions, summary_stats })
    }
}

/// Figures that overflowed cannot be rendered or serialized faithfully.
fn ensure_finite(
    urgent: &[UrgentCustomer],
    opportunities: &[Opportunity],
    trends: &[Trend],
) -> Result<(), BriefingError> {
    if let Some(opportunity) =
        opportunities.iter().find(|opportunity| !opportunity.potential_revenue.is_finite())
    {
        return Err(BriefingError::Computation(format!(
            "potential revenue for the {} {} opportunity is not a finite number",
            opportunity.segment,
            opportunity.kind.as_str()
        )));
    }

    for trend in trends {
        if let Trend::HighRiskSegment { segment, avg_risk, .. } = trend {
            if !avg_risk.is_finite() {
                return Err(BriefingError::Computation(format!(
                    "average churn risk for segment {segment} is not a finite number"
                )));
            }
        }
    }

    if urgent.iter().any(|customer| !customer.value.is_finite() || !customer.risk.is_finite()) {
        return Err(BriefingError::Computation(
            "urgent customer figures are not finite numbers".to_string(),
        ));
    }

    Ok(())
}

/// Runs the engine with the standard thresholds.
pub fn analyze_daily_briefing(input: impl Into<BriefingInput>) -> BriefingOutcome {
    BriefingEngine::default().analyze(input)
}
