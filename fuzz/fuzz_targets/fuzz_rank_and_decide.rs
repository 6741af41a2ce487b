#![no_main]
use chrono::{DateTime, TimeDelta, Utc};
use libfuzzer_sys::fuzz_target;
use tou_discharge::decision::{DecisionInput, DischargeDecisionEngine};
use tou_discharge::demand::EnergyDemandEstimator;
use tou_discharge::indexer::PriceWindowIndexer;
use tou_discharge::types::{PredictionSeries, TimeOfUsePrices};
use tou_discharge::window::SchedulingWindow;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (header, body) = data.split_at(4);
    let Ok(window) = SchedulingWindow::new(header[0] % 24, header[1] % 24) else {
        return;
    };
    let start = DateTime::<Utc>::UNIX_EPOCH;
    let now = start + TimeDelta::minutes(i64::from(u16::from_be_bytes([header[2], header[3]])) % 2880);

    // Each 8-byte chunk: price (f32 bits) plus consumption and production in W
    let mut prices = Vec::new();
    let mut consumption = Vec::new();
    let mut production = Vec::new();
    for chunk in body.chunks_exact(8) {
        prices.push(f64::from(f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])));
        consumption.push(Some(i32::from(i16::from_be_bytes([chunk[4], chunk[5]]))));
        production.push(Some(i32::from(i16::from_be_bytes([chunk[6], chunk[7]]))));
    }

    let series = TimeOfUsePrices::from_steps(start, start, TimeDelta::minutes(15), &prices);
    let ranking = PriceWindowIndexer::rank(&series.points());
    for pair in ranking.order().windows(2) {
        let (a, b) = (prices[pair[0]], prices[pair[1]]);
        assert!(a <= b);
    }

    let engine = DischargeDecisionEngine::new(window, chrono_tz::Tz::UTC);
    let Some(active) = engine.active_window(now) else {
        return;
    };
    let consumption = PredictionSeries::with_slot_minutes(start, 15, consumption);
    let production = PredictionSeries::with_slot_minutes(start, 15, production);
    let demand = EnergyDemandEstimator::estimate(Some(&production), Some(&consumption), &active, now);
    if let Some(demand) = demand.as_ref() {
        assert!(demand.remaining_consumption_wh() >= 0.0);
    }
    let input = DecisionInput {
        now,
        demand: demand.as_ref(),
        usable_capacity_wh: Some(f64::from(header[0]) * 100.0),
        prices: Some(&series),
    };
    assert_eq!(engine.decide(&input), engine.decide(&input));
});
