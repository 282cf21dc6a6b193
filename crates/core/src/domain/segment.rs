use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::customer::CustomerRecord;

/// Per-segment totals over a customer list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentAggregate {
    pub segment: String,
    pub count: usize,
    pub total_spent: f64,
    pub total_risk: f64,
}

impl SegmentAggregate {
    pub fn avg_risk(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_risk / self.count as f64
        }
    }

    pub fn avg_spent(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_spent / self.count as f64
        }
    }
}

/// Aggregates customers by segment, in order of first appearance.
pub fn aggregate_by_segment(customers: &[CustomerRecord]) -> Vec<SegmentAggregate> {
    let mut positions = HashMap::<&str, usize>::new();
    let mut aggregates = Vec::<SegmentAggregate>::new();

    for customer in customers {
        let index = *positions.entry(customer.segment.as_str()).or_insert_with(|| {
            aggregates.push(SegmentAggregate {
                segment: customer.segment.clone(),
                ..SegmentAggregate::default()
            });
            aggregates.len() - 1
        });

        let aggregate = &mut aggregates[index];
        aggregate.count += 1;
        aggregate.total_spent += customer.total_spent;
        aggregate.total_risk += customer.churn_risk;
    }

    aggregates
}
