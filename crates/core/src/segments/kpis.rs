use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerRecord;
use crate::domain::segment::aggregate_by_segment;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCount {
    pub segment_name: String,
    pub count: usize,
}

/// Headline dashboard figures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerKpis {
    pub total_customers: usize,
    pub total_revenue: f64,
    pub avg_revenue: f64,
    pub avg_churn_risk: f64,
    pub segment_distribution: Vec<SegmentCount>,
}

pub fn compute_kpis(customers: &[CustomerRecord]) -> CustomerKpis {
    let total_customers = customers.len();
    let total_revenue = customers.iter().map(|customer| customer.total_spent).sum::<f64>();
    let total_risk = customers.iter().map(|customer| customer.churn_risk).sum::<f64>();

    let (avg_revenue, avg_churn_risk) = if total_customers == 0 {
        (0.0, 0.0)
    } else {
        (total_revenue / total_customers as f64, total_risk / total_customers as f64)
    };

    let segment_distribution = aggregate_by_segment(customers)
        .into_iter()
        .map(|aggregate| SegmentCount { segment_name: aggregate.segment, count: aggregate.count })
        .collect();

    CustomerKpis { total_customers, total_revenue, avg_revenue, avg_churn_risk, segment_distribution }
}
