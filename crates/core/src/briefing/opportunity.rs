use tracing::debug;

use super::types::{Opportunity, OpportunityKind};
use crate::domain::customer::CustomerRecord;

pub const UPSELL_SEGMENT: &str = "Active";
pub const PREMIUM_SEGMENT: &str = "VIP";

/// Upsell is only worth a campaign once more than this many customers qualify.
pub const UPSELL_MIN_CUSTOMERS: usize = 5;
pub const UPSELL_REVENUE_RATE: f64 = 0.20;
pub const PREMIUM_REVENUE_RATE: f64 = 0.15;

/// Revenue opportunities in emission order (upsell, then premium), truncated
/// to `max_results`.
pub fn find_opportunities(
    customers: &[CustomerRecord],
    min_spend: f64,
    max_results: usize,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();

    let upsell = customers
        .iter()
        .filter(|customer| {
            customer.is_in_segment(UPSELL_SEGMENT) && customer.total_spent > min_spend
        })
        .collect::<Vec<_>>();
    if upsell.len() > UPSELL_MIN_CUSTOMERS {
        opportunities.push(opportunity(OpportunityKind::Upsell, UPSELL_SEGMENT, &upsell));
    }

    let premium =
        customers.iter().filter(|customer| customer.is_in_segment(PREMIUM_SEGMENT)).collect::<Vec<_>>();
    if !premium.is_empty() {
        opportunities.push(opportunity(OpportunityKind::Premium, PREMIUM_SEGMENT, &premium));
    }

    debug!(
        event_name = "briefing.opportunity.found",
        upsell_candidates = upsell.len(),
        premium_candidates = premium.len(),
        emitted = opportunities.len(),
        "revenue opportunities evaluated"
    );

    opportunities.truncate(max_results);
    opportunities
}

fn opportunity(kind: OpportunityKind, segment: &str, members: &[&CustomerRecord]) -> Opportunity {
    let rate = match kind {
        OpportunityKind::Upsell => UPSELL_REVENUE_RATE,
        OpportunityKind::Premium => PREMIUM_REVENUE_RATE,
    };
    let spend = members.iter().map(|customer| customer.total_spent).sum::<f64>();

    Opportunity {
        kind,
        segment: segment.to_string(),
        count: members.len(),
        potential_revenue: spend * rate,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::find_opportunities;
    use crate::briefing::types::OpportunityKind;
    use crate::domain::customer::CustomerRecord;

    fn customer(segment: &str, spent: f64) -> CustomerRecord {
        CustomerRecord::from_value(&json!({"segment": segment, "total_spent": spent}))
            .expect("object")
    }

    fn active_customers(count: usize, spent: f64) -> Vec<CustomerRecord> {
        (0..count).map(|_| customer("Active", spent)).collect()
    }

    #[test]
    fn five_active_spenders_do_not_trigger_upsell() {
        let opportunities = find_opportunities(&active_customers(5, 1000.0), 500.0, 2);
        assert!(opportunities.is_empty());
    }

    #[test]
    fn six_active_spenders_trigger_upsell() {
        let opportunities = find_opportunities(&active_customers(6, 1000.0), 500.0, 2);

        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].kind, OpportunityKind::Upsell);
        assert_eq!(opportunities[0].count, 6);
        assert!((opportunities[0].potential_revenue - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn spend_must_exceed_minimum() {
        let mut customers = active_customers(5, 1000.0);
        customers.push(customer("Active", 500.0));

        assert!(find_opportunities(&customers, 500.0, 2).is_empty());
    }

    #[test]
    fn premium_follows_upsell_and_counts_all_vips() {
        let mut customers = active_customers(6, 600.0);
        customers.push(customer("VIP", 8000.0));
        customers.push(customer("VIP", 0.0));

        let opportunities = find_opportunities(&customers, 500.0, 2);
        assert_eq!(opportunities.len(), 2);
        assert_eq!(opportunities[0].kind, OpportunityKind::Upsell);
        assert_eq!(opportunities[1].kind, OpportunityKind::Premium);
        assert_eq!(opportunities[1].segment, "VIP");
        assert_eq!(opportunities[1].count, 2);
        assert!((opportunities[1].potential_revenue - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn truncation_keeps_emission_order() {
        let mut customers = active_customers(6, 600.0);
        customers.push(customer("VIP", 8000.0));

        let opportunities = find_opportunities(&customers, 500.0, 1);
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].kind, OpportunityKind::Upsell);
    }
}
