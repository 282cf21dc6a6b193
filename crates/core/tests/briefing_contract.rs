use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use scudo_core::briefing::merge_operational_analytical;
use scudo_core::{analyze_daily_briefing, BriefingEngine, BriefingInput};

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).single().expect("valid timestamp")
}

fn run(payload: Value) -> Value {
    BriefingEngine::default().analyze_at(payload, at()).to_value()
}

fn customer(id: &str, segment: &str, total_spent: f64, churn_risk: f64) -> Value {
    json!({
        "id": id,
        "name": format!("Customer {id}"),
        "email": format!("{id}@example.com"),
        "segment": segment,
        "total_spent": total_spent,
        "churn_risk": churn_risk,
    })
}

fn action_names(result: &Value) -> Vec<&str> {
    result["context_actions"]
        .as_array()
        .map(|actions| actions.iter().filter_map(|action| action["action"].as_str()).collect())
        .unwrap_or_default()
}

#[test]
fn merge_keeps_one_record_per_operational_entry() {
    let operational = vec![
        json!({"id": "a", "name": "Ann"}),
        json!({"id": "b", "name": "Ben"}),
        json!("stray"),
        json!({"customer_id": "c"}),
    ];
    let analytical = vec![json!({"customer_id": "a", "churn_risk": "0.9"}), json!({"id": "c", "rfm_score": 7})];

    let merged = merge_operational_analytical(&operational, &analytical);

    assert_eq!(merged.len(), operational.len());
    assert_eq!(merged[0]["name"], "Ann");
    assert_eq!(merged[0]["churn_risk"], 0.9);
    assert_eq!(merged[1]["churn_risk"], 0.0);
    assert_eq!(merged[1]["rfm_score"], 0.0);
    assert_eq!(merged[2], json!("stray"));
    assert_eq!(merged[3]["rfm_score"], 7.0);
}

#[test]
fn merged_payload_feeds_urgency_selection() {
    let result = run(json!({
        "operational_customers": [
            {"id": 17, "name": "Numeric", "segment": "Active", "total_spent": 900},
            {"id": "x", "name": "Calm", "segment": "Active", "total_spent": 100}
        ],
        "analytical_data": [{"customer_id": "17", "churn_risk": 0.95}]
    }));

    assert_eq!(result["summary_stats"]["urgent_count"], 1);
    assert_eq!(result["context_actions"][0]["params"]["customer_id"], "17");
}

#[test]
fn urgency_is_strictly_above_threshold_and_capped_at_three() {
    let result = run(json!({"customers": [
        customer("at-threshold", "Active", 9000.0, 0.7),
        customer("low", "Active", 100.0, 0.71),
        customer("mid", "Active", 500.0, 0.8),
        customer("high", "Active", 5000.0, 0.9),
        customer("top", "Active", 7000.0, 0.75),
    ]}));

    assert_eq!(result["summary_stats"]["urgent_count"], 3);
    let emailed: Vec<&str> = result["context_actions"]
        .as_array()
        .map(|actions| {
            actions.iter().filter_map(|action| action["params"]["customer_id"].as_str()).collect()
        })
        .unwrap_or_default();
    assert_eq!(emailed, vec!["top", "high"]);

    let text = result["briefing_text"].as_str().unwrap_or_default();
    assert!(text.contains("Customer mid"));
    assert!(!text.contains("Customer at-threshold"));
    assert!(!text.contains("Customer low"));
}

#[test]
fn upsell_needs_more_than_five_qualifying_active_customers() {
    let five: Vec<Value> =
        (0..5).map(|index| customer(&format!("a{index}"), "Active", 1000.0, 0.1)).collect();
    let result = run(json!({ "customers": five }));
    assert_eq!(result["summary_stats"]["opportunities_count"], 0);

    let six: Vec<Value> =
        (0..6).map(|index| customer(&format!("a{index}"), "Active", 1000.0, 0.1)).collect();
    let result = run(json!({ "customers": six }));
    assert_eq!(result["summary_stats"]["opportunities_count"], 1);
    assert_eq!(result["context_actions"][0]["params"]["promotion_type"], "upsell");
    assert_eq!(result["context_actions"][0]["params"]["discount_percent"], 15);
    assert!(result["briefing_text"].as_str().unwrap_or_default().contains("6 customers"));
}

#[test]
fn repeated_analysis_is_identical_for_a_fixed_clock() {
    let payload = json!({"customers": [
        customer("v1", "VIP", 8500.0, 0.85),
        customer("a1", "Active", 700.0, 0.2),
    ]});

    assert_eq!(run(payload.clone()), run(payload));
}

#[test]
fn summary_counters_are_integers() {
    let result = run(json!({"customers": [customer("v1", "VIP", 1200.0, 0.6)]}));
    let stats = &result["summary_stats"];

    for counter in ["urgent_count", "opportunities_count", "trends_count"] {
        assert!(stats[counter].is_u64(), "{counter} should serialize as an integer");
    }
    assert_eq!(stats["trends_count"], 2);
    assert_eq!(stats["analysis_timestamp"], "2024-03-05T09:30:00Z");
    assert_eq!(stats["thresholds_used"], json!({"urgent_churn": 0.7, "min_upsell_spending": 500}));
    assert!(stats["thresholds_used"]["min_upsell_spending"].is_u64());
}

#[test]
fn empty_customer_list_produces_quiet_briefing() {
    let result = run(json!({"customers": []}));

    assert!(result.get("success").is_none());
    assert_eq!(result["summary_stats"]["urgent_count"], 0);
    assert_eq!(result["summary_stats"]["trends_count"], 0);
    assert_eq!(action_names(&result), vec!["show_customer_segments"]);

    let text = result["briefing_text"].as_str().unwrap_or_default();
    assert!(text.starts_with("📊 **Daily Business Briefing - March 05, 2024**"));
    assert!(text.contains("No urgent customer issues detected"));
}

#[test]
fn at_risk_vip_drives_email_and_premium_campaign() {
    let mut customers = vec![customer("vip-1", "VIP", 8500.0, 0.85)];
    customers.extend((0..9).map(|index| customer(&format!("act-{index}"), "Active", 600.0, 0.1)));

    let result = run(json!({ "customers": customers }));

    assert_eq!(
        action_names(&result),
        vec!["send_email", "create_promotion", "create_promotion", "show_customer_segments"]
    );
    let email = &result["context_actions"][0];
    assert_eq!(email["priority"], "urgent");
    assert_eq!(email["params"], json!({
        "customer_id": "vip-1",
        "customer_email": "vip-1@example.com",
        "template": "retention"
    }));

    let premium = &result["context_actions"][2]["params"];
    assert_eq!(premium["target_segment"], "VIP");
    assert_eq!(premium["promotion_type"], "premium");
    assert_eq!(premium["discount_percent"], 10);

    let text = result["briefing_text"].as_str().unwrap_or_default();
    assert!(text.contains("$8,500"));
    assert!(text.contains("85%"));
}

#[test]
fn text_payload_gets_data_issue_guidance() {
    let result = run(Value::String("not json".to_string()));

    assert_eq!(result["success"], false);
    assert!(result["briefing_text"].as_str().unwrap_or_default().contains("Data Issue"));
    assert_eq!(action_names(&result), vec!["process_data_request"]);
    assert_eq!(result["context_actions"][0]["priority"], "high");
}

#[test]
fn unrecognized_object_reports_missing_customer_data() {
    let outcome = analyze_daily_briefing(BriefingInput::from(json!({"foo": "bar"})));
    let result = outcome.to_value();

    assert!(!outcome.is_success());
    assert!(result["error"].as_str().unwrap_or_default().starts_with("No customer data found"));
    assert!(result["briefing_text"].as_str().unwrap_or_default().contains("foo"));
    assert_eq!(result["context_actions"], json!([]));
}

#[test]
fn engine_can_be_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BriefingEngine>();
}
