use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Purchase history summary used for RFM scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RfmInput {
    pub customer_id: String,
    pub customer_name: String,
    pub total_spent: f64,
    pub order_count: u32,
    pub recency_days: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RfmScore {
    pub customer_id: String,
    pub customer_name: String,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    /// Three-digit code, recency first.
    pub rfm_segment: String,
    pub total_spent: f64,
    pub order_count: u32,
    pub segment_interpretation: String,
}

pub fn score_rfm(input: &RfmInput) -> RfmScore {
    let monetary_score = match input.total_spent {
        spent if spent > 5000.0 => 5,
        spent if spent > 2000.0 => 4,
        _ => 3,
    };
    let frequency_score = match input.order_count {
        orders if orders > 30 => 5,
        orders if orders > 15 => 4,
        _ => 3,
    };
    let recency_score = match input.recency_days {
        days if days < 30 => 5,
        days if days < 90 => 3,
        _ => 1,
    };

    let rfm_segment = format!("{recency_score}{frequency_score}{monetary_score}");
    let segment_interpretation = interpret_rfm_segment(&rfm_segment).to_string();

    RfmScore {
        customer_id: input.customer_id.clone(),
        customer_name: input.customer_name.clone(),
        recency_score,
        frequency_score,
        monetary_score,
        rfm_segment,
        total_spent: input.total_spent,
        order_count: input.order_count,
        segment_interpretation,
    }
}

pub fn interpret_rfm_segment(code: &str) -> &'static str {
    match code {
        "555" => "Champions - Best customers",
        "554" => "Loyal Customers - High value",
        "544" => "Potential Loyalists",
        "333" => "Regular Customers",
        "123" => "At Risk - Low engagement",
        "111" => "Lost Customers",
        _ => "Standard Customer",
    }
}

/// Number of customers per RFM code.
pub fn rfm_distribution(scores: &[RfmScore]) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for score in scores {
        *distribution.entry(score.rfm_segment.clone()).or_insert(0) += 1;
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::{interpret_rfm_segment, rfm_distribution, score_rfm, RfmInput};

    fn input(total_spent: f64, order_count: u32, recency_days: u32) -> RfmInput {
        RfmInput {
            customer_id: "c-1".to_string(),
            customer_name: "Ada".to_string(),
            total_spent,
            order_count,
            recency_days,
        }
    }

    #[test]
    fn top_customer_is_a_champion() {
        let score = score_rfm(&input(9000.0, 40, 3));
        assert_eq!(score.rfm_segment, "555");
        assert_eq!(score.segment_interpretation, "Champions - Best customers");
    }

    #[test]
    fn score_bands_use_strict_boundaries() {
        let score = score_rfm(&input(5000.0, 30, 30));
        assert_eq!((score.recency_score, score.frequency_score, score.monetary_score), (3, 4, 4));

        let score = score_rfm(&input(2000.0, 15, 90));
        assert_eq!(score.rfm_segment, "133");
        assert_eq!(score.segment_interpretation, "Standard Customer");
    }

    #[test]
    fn unknown_codes_are_standard_customers() {
        assert_eq!(interpret_rfm_segment("333"), "Regular Customers");
        assert_eq!(interpret_rfm_segment("999"), "Standard Customer");
    }

    #[test]
    fn distribution_counts_codes() {
        let scores = vec![
            score_rfm(&input(9000.0, 40, 3)),
            score_rfm(&input(9500.0, 35, 1)),
            score_rfm(&input(100.0, 1, 200)),
        ];

        let distribution = rfm_distribution(&scores);
        assert_eq!(distribution.get("555"), Some(&2));
        assert_eq!(distribution.get("133"), Some(&1));
    }
}
