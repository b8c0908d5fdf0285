//! Property checks over generated run parameters.

use proptest::prelude::*;
use retention_core::{
    config::SimConfig,
    engine::{simulate, SimParams},
    record::records_to_json,
    rehydrate::{extend, rehydrate, ExtendParams},
    segment::Segment,
    summary::new_customer_series,
};

const SCENARIOS: [&str; 5] = [
    "Default",
    "Economic Recession",
    "Strong Marketing Campaign",
    "New Competitor",
    "Price Increase",
];

/// Four active shares normalized to sum 1, nobody churned.
fn distribution() -> impl Strategy<Value = [f64; 5]> {
    prop::array::uniform4(0.01f64..1.0).prop_map(|raw| {
        let sum: f64 = raw.iter().sum();
        [raw[0] / sum, raw[1] / sum, raw[2] / sum, raw[3] / sum, 0.0]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn runs_keep_counts_consistent(
        population in 1i64..200_000,
        inflow in 0i64..5_000,
        months in 1i64..36,
        scenario in prop::sample::select(SCENARIOS.to_vec()),
        dist in distribution(),
    ) {
        let config = SimConfig::builtin();
        let params = SimParams::new(population, inflow, scenario, months)
            .with_initial_distribution(dist);
        let records = simulate(&config, &params).unwrap();
        prop_assert_eq!(records.len() as i64, months + 1);

        for pair in records.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            prop_assert_eq!(next.total_customers, next.counts.iter().sum::<i64>());
            prop_assert!(next.counts.iter().all(|c| *c >= 0));
            // Five roundings of at most half a customer each.
            let expected = prev.total_customers + inflow;
            prop_assert!(
                (next.total_customers - expected).abs() <= 3,
                "month {}: total {} vs {}", next.month, next.total_customers, expected
            );
        }
    }

    #[test]
    fn rehydrated_seed_reproduces_last_counts(
        population in 1i64..100_000,
        inflow in 0i64..2_000,
        months in 1i64..24,
    ) {
        let config = SimConfig::builtin();
        let records = simulate(&config, &SimParams::new(population, inflow, "Default", months)).unwrap();
        let seed = rehydrate(&records_to_json(&records)).unwrap();

        let last = records.last().unwrap();
        prop_assert_eq!(seed.population, last.total_customers);
        prop_assert_eq!(seed.start_month, last.month);
        for segment in Segment::ALL {
            let rebuilt = (seed.distribution[segment.index()] * seed.population as f64).round_ties_even();
            prop_assert_eq!(rebuilt as i64, last.count(segment));
        }
    }

    #[test]
    fn fractional_counts_seed_their_rounded_values(
        counts in prop::array::uniform4(0.0f64..10_000.0),
    ) {
        let prior = vec![serde_json::json!({
            "Month": 1, "IR": counts[0], "LC": counts[1], "OB": counts[2], "DB": counts[3], "NR": 0,
        })];
        let seed = rehydrate(&prior).unwrap();
        prop_assume!(seed.population > 0);
        for (share, count) in seed.distribution.iter().zip(seed.counts.iter()) {
            let seeded = share * seed.population as f64;
            prop_assert!((seeded - count).abs() < 1e-6, "{seeded} vs {count}");
        }
    }

    #[test]
    fn extension_length_and_numbering_match_request(
        population in 1i64..50_000,
        prior_months in 1i64..12,
        months in 1i64..12,
        inflow in 0i64..1_000,
    ) {
        let config = SimConfig::builtin();
        let prior = simulate(&config, &SimParams::new(population, 500, "Default", prior_months)).unwrap();
        let params = ExtendParams {
            new_customers_per_month: inflow,
            scenario:                "Strong Marketing Campaign".into(),
            months,
            starting_population:     None,
        };
        let extended = extend(&config, &records_to_json(&prior), &params).unwrap();

        prop_assert_eq!(extended.len() as i64, months);
        let last_prior = prior.last().unwrap().month;
        for (i, r) in extended.iter().enumerate() {
            prop_assert_eq!(r.month, last_prior + 1 + i as u64);
        }
    }

    #[test]
    fn new_customer_series_telescopes_to_net_change(
        population in 1i64..50_000,
        inflow in 0i64..3_000,
    ) {
        let config = SimConfig::builtin();
        let records = simulate(&config, &SimParams::new(population, inflow, "Economic Recession", 12)).unwrap();
        let series = new_customer_series(&records);
        let nr = Segment::NoRepurchase;

        prop_assert_eq!(series.len(), records.len());
        prop_assert_eq!(series[0], records[0].total_customers);

        let (first, last) = (&records[0], &records[records.len() - 1]);
        let net = (last.total_customers - first.total_customers) + (last.count(nr) - first.count(nr));
        prop_assert_eq!(series[1..].iter().sum::<i64>(), net);
    }
}
