//! Property tests for parser and aggregator invariants.
//!
//! Uses proptest to verify:
//! 1. Order preservation — N well-formed rows parse to N records in order
//! 2. Maximality — the peak's high bounds every record and is attained
//! 3. Tie-break stability — equal maxima resolve to the earliest record
//! 4. Determinism — repeated aggregation is bit-identical

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use stockpeak_core::{find_peak, parse_rows, peak_of_rows, PriceRecord};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..1000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_record(day: i64) -> impl Strategy<Value = PriceRecord> {
    (arb_price(), arb_price(), arb_price(), arb_price(), 0..1_000_000_000u64).prop_map(
        move |(open, high, low, close, volume)| PriceRecord {
            date: base_date() + Duration::days(day),
            open,
            high,
            low,
            close,
            volume,
        },
    )
}

fn arb_records() -> impl Strategy<Value = Vec<PriceRecord>> {
    (1usize..60).prop_flat_map(|n| {
        (0..n as i64)
            .map(arb_record)
            .collect::<Vec<_>>()
    })
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 2).unwrap()
}

fn to_row(record: &PriceRecord) -> Vec<String> {
    vec![
        record.date.format("%Y/%m/%d").to_string(),
        record.close.to_string(),
        record.volume.to_string(),
        record.open.to_string(),
        record.high.to_string(),
        record.low.to_string(),
    ]
}

// ── 1. Order preservation ────────────────────────────────────────────

proptest! {
    #[test]
    fn parse_preserves_count_and_order(records in arb_records()) {
        let rows: Vec<Vec<String>> = records.iter().map(to_row).collect();
        let parsed = parse_rows(&rows).unwrap();
        prop_assert_eq!(parsed, records);
    }
}

// ── 2. Maximality ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn peak_bounds_every_record(records in arb_records()) {
        let peak = find_peak(&records).unwrap();
        for record in &records {
            prop_assert!(peak.high >= record.high);
        }
        prop_assert!(records
            .iter()
            .any(|r| r.date == peak.date && r.high == peak.high));
    }

    #[test]
    fn streaming_peak_equals_collected_peak(records in arb_records()) {
        let rows: Vec<Vec<String>> = records.iter().map(to_row).collect();
        prop_assert_eq!(peak_of_rows(&rows).unwrap(), find_peak(&records).unwrap());
    }
}

// ── 3. Tie-break stability ───────────────────────────────────────────

proptest! {
    #[test]
    fn equal_maxima_pick_the_earliest(
        records in arb_records(),
        first in 0usize..60,
        second in 0usize..60,
    ) {
        let n = records.len();
        let (a, b) = (first % n, second % n);
        prop_assume!(a != b);

        let mut records = records;
        let top = records.iter().map(|r| r.high).fold(f64::MIN, f64::max) + 1.0;
        records[a].high = top;
        records[b].high = top;

        let peak = find_peak(&records).unwrap();
        prop_assert_eq!(peak.date, records[a.min(b)].date);
        prop_assert_eq!(peak.high, top);
    }
}

// ── 4. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn aggregation_is_deterministic(records in arb_records()) {
        let first = find_peak(&records).unwrap();
        let second = find_peak(&records).unwrap();
        prop_assert_eq!(first.date, second.date);
        prop_assert_eq!(first.high.to_bits(), second.high.to_bits());
    }
}
