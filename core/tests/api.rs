use retention_core::{
    api::{
        check_inflow_handling, handle_extend, handle_simulate, list_scenarios,
        scenario_steady_states, simulate_params_from_json, Response,
    },
    config::SimConfig,
    error::SimError,
};
use serde_json::{json, Value};

fn config() -> SimConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    SimConfig::builtin()
}

fn records(body: Value) -> Vec<Value> {
    match body {
        Value::Array(records) => records,
        other => panic!("expected an array of records, got {other}"),
    }
}

// ── simulate ─────────────────────────────────────────────────────────────────

#[test]
fn empty_request_uses_defaults() {
    let params = simulate_params_from_json(&json!({})).unwrap();
    assert_eq!(params.initial_population, 10_000);
    assert_eq!(params.new_customers_per_month, 800);
    assert_eq!(params.months, 12);
    assert_eq!(params.scenario, "Default");

    let out = records(handle_simulate(&config(), &json!({})).unwrap());
    assert_eq!(out.len(), 13);
}

#[test]
fn numeric_strings_and_fractions_are_accepted() {
    let params = simulate_params_from_json(&json!({
        "initialCustomers": "5000",
        "newCustomersPerMonth": 120.9,
        "months": " 6 ",
    }))
    .unwrap();
    assert_eq!(params.initial_population, 5000);
    assert_eq!(params.new_customers_per_month, 120);
    assert_eq!(params.months, 6);
}

#[test]
fn non_numeric_parameter_is_a_client_error() {
    let config = config();
    let err = handle_simulate(&config, &json!({ "initialCustomers": "many" })).unwrap_err();
    assert!(matches!(err, SimError::InvalidParameters(_)));

    let response = Response::from_result(handle_simulate(&config, &json!({ "months": [3] })));
    assert_eq!(response.status, 400);
    assert!(response.body["error"].as_str().unwrap().contains("numeric values expected"));
}

#[test]
fn unknown_scenario_response_lists_available_scenarios() {
    let response = Response::from_result(handle_simulate(&config(), &json!({ "scenario": "Boom" })));
    assert_eq!(response.status, 400);
    let message = response.body["error"].as_str().unwrap();
    assert!(message.starts_with("Unknown scenario: Boom"));
    assert!(message.contains("Strong Marketing Campaign"));
}

#[test]
fn simulate_records_carry_every_key_convention() {
    let out = records(
        handle_simulate(&config(), &json!({ "initialCustomers": 1000, "months": 1 })).unwrap(),
    );
    let first = &out[0];

    for keys in [
        ["Immediate Repurchase", "Immediate_Repurchase", "IR"],
        ["Loyal Customer", "Loyal_Customer", "LC"],
        ["Occasional Buyer", "Occasional_Buyer", "OB"],
        ["Discount Buyer", "Discount_Buyer", "DB"],
        ["No Repurchase", "No_Repurchase", "NR"],
    ] {
        assert_eq!(first[keys[0]], first[keys[1]]);
        assert_eq!(first[keys[0]], first[keys[2]]);
    }
    assert_eq!(first["Immediate Repurchase"], json!(250));
    assert_eq!(first["Total Customers"], json!(1000));
    assert_eq!(first["Total_Customers"], json!(1000));
    assert_eq!(first["Churn Rate"], json!(0.0));
    assert_eq!(first["Month"], json!(0));
}

// ── extend ───────────────────────────────────────────────────────────────────

#[test]
fn extend_continues_a_simulate_response() {
    let config = config();
    let prior = handle_simulate(&config, &json!({ "months": 3 })).unwrap();

    let out = records(
        handle_extend(&config, &json!({ "previousResults": prior, "months": 2 })).unwrap(),
    );
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["Month"], json!(4));
    assert_eq!(out[1]["Month"], json!(5));
    assert_eq!(out[0]["Total Customers"], json!(13_199));
}

#[test]
fn extend_defaults_to_three_months() {
    let config = config();
    let prior = json!([{ "Month": 0, "IR": 10, "LC": 10, "OB": 10, "DB": 10, "NR": 0 }]);
    let out = records(handle_extend(&config, &json!({ "previousResults": prior })).unwrap());
    assert_eq!(out.len(), 3);
}

#[test]
fn extend_without_previous_results_is_rejected() {
    let response = Response::from_result(handle_extend(&config(), &json!({ "months": 3 })));
    assert_eq!(response.status, 400);
    assert_eq!(
        response.body["error"],
        json!("Invalid parameters: No previous results provided")
    );
}

#[test]
fn extend_accepts_starting_population_override() {
    let config = config();
    let prior = json!([{ "Month": 2, "IR": 100, "LC": 200, "OB": 300, "DB": 400, "NR": 50 }]);
    let out = records(
        handle_extend(
            &config,
            &json!({
                "previousResults": prior,
                "months": 1,
                "newCustomersPerMonth": 0,
                "startingPopulation": "2000",
            }),
        )
        .unwrap(),
    );
    assert_eq!(out[0]["Total Customers"], json!(1999));
}

// ── catalog views ────────────────────────────────────────────────────────────

#[test]
fn scenario_listing_is_in_catalog_order() {
    assert_eq!(
        list_scenarios(&config()),
        json!([
            "Default",
            "Economic Recession",
            "Strong Marketing Campaign",
            "New Competitor",
            "Price Increase",
        ])
    );
}

#[test]
fn steady_states_cover_every_scenario() {
    let out = scenario_steady_states(&config()).unwrap();
    let map = out.as_object().unwrap();
    assert_eq!(map.len(), 5);
    for (name, shares) in map {
        let shares = shares.as_object().unwrap();
        assert_eq!(shares.len(), 4, "{name}");
        let sum: f64 = shares.values().map(|v| v.as_f64().unwrap()).sum();
        assert!((sum - 1.0).abs() < 1e-9, "{name}: steady state sums to {sum}");
    }
}

#[test]
fn inflow_self_check_passes_with_builtin_config() {
    assert!(check_inflow_handling(&config()).unwrap());
}

// ── input ceilings ───────────────────────────────────────────────────────────

#[test]
fn oversized_counts_are_rejected_not_overflowed() {
    let config = config();
    let prior = json!([{ "Month": 0, "IR": 10, "LC": 10, "OB": 10, "DB": 10, "NR": 0 }]);
    let requests = [
        (true, json!({ "initialCustomers": i64::MAX, "newCustomersPerMonth": 0, "months": 1 })),
        (true, json!({ "initialCustomers": 1e300, "months": 1 })),
        (true, json!({ "initialCustomers": 1000, "newCustomersPerMonth": i64::MAX, "months": 1 })),
        (true, json!({ "months": 1_000_000 })),
        (false, json!({ "previousResults": prior, "startingPopulation": i64::MAX })),
        (false, json!({ "previousResults": prior, "newCustomersPerMonth": i64::MAX })),
    ];
    for (is_simulate, body) in requests {
        let result = if is_simulate {
            handle_simulate(&config, &body)
        } else {
            handle_extend(&config, &body)
        };
        let response = Response::from_result(result);
        assert_eq!(response.status, 400, "request {body} should be rejected");
    }
}

#[test]
fn boolean_parameters_count_as_one_and_zero() {
    let params = simulate_params_from_json(&json!({ "months": true, "newCustomersPerMonth": false })).unwrap();
    assert_eq!(params.months, 1);
    assert_eq!(params.new_customers_per_month, 0);
}
