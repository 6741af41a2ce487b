//! Properties of the decision engine over generated forecasts and prices

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tou_discharge::decision::{Decision, DecisionInput, DischargeDecisionEngine};
use tou_discharge::demand::{DemandEstimate, EnergyDemandEstimator};
use tou_discharge::types::{PredictionSeries, TimeOfUsePrices};
use tou_discharge::window::SchedulingWindow;

/// Small deterministic generator so failures are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

struct Case {
    now: DateTime<Utc>,
    demand: DemandEstimate,
    prices: TimeOfUsePrices,
}

fn day() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2021-06-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn engine() -> DischargeDecisionEngine {
    DischargeDecisionEngine::new(SchedulingWindow::new(17, 7).unwrap(), Tz::UTC)
}

fn cases(seed: u64, count: usize) -> Vec<Case> {
    let mut rng = Lcg(seed);
    let start = day();
    (0..count)
        .filter_map(|_| {
            let production: Vec<i32> = (0..192).map(|_| rng.next(3000) as i32 - 200).collect();
            let consumption: Vec<i32> = (0..192).map(|_| rng.next(4000) as i32).collect();
            let prices: Vec<f64> = (0..192).map(|_| rng.next(50) as f64 / 2.0).collect();
            let now = start + TimeDelta::minutes(rng.next(48 * 60) as i64);

            let production = PredictionSeries::with_slot_minutes(
                start,
                15,
                production.into_iter().map(Some).collect(),
            );
            let consumption = PredictionSeries::with_slot_minutes(
                start,
                15,
                consumption.into_iter().map(Some).collect(),
            );
            let prices = TimeOfUsePrices::from_steps(start, start, TimeDelta::minutes(15), &prices);

            let window = engine().active_window(now)?;
            let demand =
                EnergyDemandEstimator::estimate(Some(&production), Some(&consumption), &window, now)?;
            Some(Case {
                now,
                demand,
                prices,
            })
        })
        .collect()
}

fn decide(case: &Case, usable_wh: f64) -> Decision {
    engine()
        .decide(&DecisionInput {
            now: case.now,
            demand: Some(&case.demand),
            usable_capacity_wh: Some(usable_wh),
            prices: Some(&case.prices),
        })
        .decision
}

#[test]
fn equal_inputs_give_equal_verdicts() {
    for case in cases(7, 40) {
        let input = DecisionInput {
            now: case.now,
            demand: Some(&case.demand),
            usable_capacity_wh: Some(2500.0),
            prices: Some(&case.prices),
        };
        assert_eq!(engine().decide(&input), engine().decide(&input));
    }
}

#[test]
fn allow_is_monotonic_in_usable_capacity() {
    for case in cases(42, 60) {
        let mut allowed_at = None;
        for step in 0..=40 {
            let usable = f64::from(step) * 500.0;
            let decision = decide(&case, usable);
            assert_ne!(decision, Decision::InsufficientData);
            if let Some(first) = allowed_at {
                assert_eq!(
                    decision,
                    Decision::Allow,
                    "now={} allowed at {} but not at {}",
                    case.now,
                    first,
                    usable
                );
            } else if decision == Decision::Allow {
                allowed_at = Some(usable);
            }
        }
    }
}

#[test]
fn covering_the_balance_exactly_allows() {
    for case in cases(3, 30) {
        let balance = case.demand.remaining_consumption_wh();
        assert_eq!(decide(&case, balance), Decision::Allow);
    }
}

#[test]
fn target_slots_stay_inside_the_remaining_window() {
    for case in cases(11, 40) {
        let window = engine().active_window(case.now).unwrap();
        let verdict = engine().decide(&DecisionInput {
            now: case.now,
            demand: Some(&case.demand),
            usable_capacity_wh: Some(0.0),
            prices: Some(&case.prices),
        });
        let current_slot = case.demand.slots.first().map(|s| s.start);
        for slot in verdict.target_hours.iter() {
            assert!(*slot < window.end);
            assert!(Some(*slot) >= current_slot);
        }
    }
}

#[test]
fn outside_the_window_always_allows() {
    let mut rng = Lcg(99);
    for _ in 0..50 {
        // 07:00 to 16:59 lies outside the overnight window
        let now = day() + TimeDelta::minutes(7 * 60 + rng.next(10 * 60) as i64);
        let verdict = engine().decide(&DecisionInput {
            now,
            demand: None,
            usable_capacity_wh: None,
            prices: None,
        });
        assert_eq!(verdict.decision, Decision::Allow);
        assert!(verdict.target_hours.is_empty());
    }
}
