use tracing::debug;

use super::types::UrgentCustomer;
use crate::domain::customer::CustomerRecord;

/// Customers whose churn risk is strictly above `threshold`, highest spend
/// first, at most `limit` of them. Ties keep their input order.
pub fn identify_urgent(
    customers: &[CustomerRecord],
    threshold: f64,
    limit: usize,
) -> Vec<UrgentCustomer> {
    let mut urgent = customers
        .iter()
        .filter(|customer| customer.churn_risk > threshold)
        .map(|customer| UrgentCustomer {
            name: customer.name.clone(),
            id: customer.id.clone(),
            email: customer.email.clone(),
            risk: customer.churn_risk,
            value: customer.total_spent,
            segment: customer.segment.clone(),
        })
        .collect::<Vec<_>>();

    let qualifying = urgent.len();
    urgent.sort_by(|left, right| right.value.total_cmp(&left.value));
    urgent.truncate(limit);

    debug!(
        event_name = "briefing.urgency.selected",
        qualifying,
        selected = urgent.len(),
        threshold,
        "urgent customers selected"
    );

    urgent
}
