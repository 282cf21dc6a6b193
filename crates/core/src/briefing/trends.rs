use serde_json::{Map, Value};
use tracing::debug;

use super::types::Trend;
use crate::domain::customer::CustomerRecord;
use crate::domain::segment::{aggregate_by_segment, SegmentAggregate};

/// Segment distribution first (when any customers exist), then one entry per
/// segment whose average churn risk exceeds `high_risk_threshold`.
pub fn analyze_trends(customers: &[CustomerRecord], high_risk_threshold: f64) -> Vec<Trend> {
    let aggregates = aggregate_by_segment(customers);
    let mut trends = Vec::new();

    if let Some(largest) = largest_segment(&aggregates) {
        let data = aggregates
            .iter()
            .map(|aggregate| (aggregate.segment.clone(), Value::from(aggregate.count)))
            .collect::<Map<_, _>>();
        trends.push(Trend::SegmentDistribution {
            data,
            insight: format!("Largest segment: {} ({} customers)", largest.segment, largest.count),
        });
    }

    trends.extend(aggregates.iter().filter(|aggregate| aggregate.avg_risk() > high_risk_threshold).map(
        |aggregate| Trend::HighRiskSegment {
            segment: aggregate.segment.clone(),
            avg_risk: aggregate.avg_risk(),
            count: aggregate.count,
        },
    ));

    debug!(
        event_name = "briefing.trends.analyzed",
        segment_count = aggregates.len(),
        trend_count = trends.len(),
        "performance trends analyzed"
    );

    trends
}

/// First segment reaching the maximum count.
fn largest_segment(aggregates: &[SegmentAggregate]) -> Option<&SegmentAggregate> {
    aggregates.iter().fold(None, |best, aggregate| match best {
        Some(current) if current.count >= aggregate.count => Some(current),
        _ => Some(aggregate),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::analyze_trends;
    use crate::briefing::types::Trend;
    use crate::domain::customer::CustomerRecord;

    fn customers(rows: &[Value]) -> Vec<CustomerRecord> {
        rows.iter().filter_map(CustomerRecord::from_value).collect()
    }

    #[test]
    fn no_customers_means_no_trends() {
        assert!(analyze_trends(&[], 0.5).is_empty());
    }

    #[test]
    fn distribution_names_largest_segment_with_first_seen_tie_break() {
        let customers = customers(&[
            json!({"segment": "Regular"}),
            json!({"segment": "VIP"}),
            json!({"segment": "VIP"}),
            json!({"segment": "Regular"}),
            json!({"segment": "New"}),
        ]);

        let trends = analyze_trends(&customers, 0.5);
        let Some(Trend::SegmentDistribution { data, insight }) = trends.first() else {
            panic!("distribution trend should come first");
        };

        assert_eq!(insight, "Largest segment: Regular (2 customers)");
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["Regular", "VIP", "New"]);
        assert_eq!(data.get("VIP"), Some(&json!(2)));
        assert_eq!(data.get("New"), Some(&json!(1)));
    }

    #[test]
    fn distribution_serializes_segments_in_first_seen_order() {
        let customers = customers(&[
            json!({"segment": "Zeta"}),
            json!({"segment": "Alpha"}),
            json!({"segment": "Zeta"}),
        ]);

        let encoded = serde_json::to_string(&analyze_trends(&customers, 0.5)[0]).expect("serializes");
        assert!(encoded.contains(r#""data":{"Zeta":2,"Alpha":1}"#), "unexpected encoding {encoded}");
    }

    #[test]
    fn flags_every_segment_above_average_risk_threshold() {
        let customers = customers(&[
            json!({"segment": "Dormant", "churn_risk": 0.9}),
            json!({"segment": "Dormant", "churn_risk": 0.3}),
            json!({"segment": "VIP", "churn_risk": 0.1}),
            json!({"segment": "At-Risk", "churn_risk": "0.8"}),
            json!({"segment": "Active", "churn_risk": 0.5}),
        ]);

        let trends = analyze_trends(&customers, 0.5);
        assert_eq!(trends.len(), 3);

        let flagged = trends
            .iter()
            .filter_map(|trend| match trend {
                Trend::HighRiskSegment { segment, avg_risk, count } => {
                    Some((segment.as_str(), *avg_risk, *count))
                }
                Trend::SegmentDistribution { .. } => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(flagged.len(), 2);
        assert_eq!(flagged[0].0, "Dormant");
        assert!((flagged[0].1 - 0.6).abs() < 1e-9);
        assert_eq!(flagged[0].2, 2);
        assert_eq!(flagged[1].0, "At-Risk");
    }

    #[test]
    fn missing_segment_counts_as_unknown() {
        let trends = analyze_trends(&customers(&[json!({"churn_risk": 0.9})]), 0.5);

        assert!(matches!(
            &trends[1],
            Trend::HighRiskSegment { segment, count: 1, .. } if segment == "Unknown"
        ));
    }
}
