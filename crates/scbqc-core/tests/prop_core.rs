// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Property-Based Tests (proptest) for scbqc-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for scbqc-core using proptest.
//!
//! Covers: resistance→temperature inversion over the calibrated range,
//! solver totality, sweep setpoints, metric identities, combined-table
//! alignment.

use proptest::prelude::*;
use scbqc_core::combined::CombinedDeltaTable;
use scbqc_core::converter::Converter;
use scbqc_core::metrics::compute_metrics;
use scbqc_core::rtd::RtdSolver;
use scbqc_core::sweep::sweep_voltages;
use scbqc_types::config::{RtdCurve, SweepParams};
use scbqc_types::constants::{RTD_T_MAX, RTD_T_MIN};
use scbqc_types::state::{ChannelId, ChannelSeries, Sample};

fn series_with(name: &str, deltas: &[f64]) -> ChannelSeries {
    let samples = deltas
        .iter()
        .enumerate()
        .map(|(i, d)| Sample {
            source_voltage: 3.0 + i as f64 * 0.08,
            measured_current: 80.0,
            measured_voltage_scb: 0.88,
            temperature_scb: Some(40.0),
            temperature_vrb: Some(40.0 + d),
        })
        .collect();
    ChannelSeries::from_samples(ChannelId::from(name), samples)
}

// ── Solver ───────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn solver_inverts_forward_curve(t in RTD_T_MIN..=RTD_T_MAX) {
        let curve = RtdCurve::default();
        let solver = RtdSolver::new(curve);
        let back = solver.solve_temperature(curve.resistance_at(t));
        prop_assert!(back.is_some(), "no root at t={}", t);
        let back = back.unwrap();
        prop_assert!((back - t).abs() < 1e-3, "t={} solved={}", t, back);
    }

    #[test]
    fn solver_is_total(r in prop::num::f64::ANY) {
        // any input: absent or finite, never a panic
        if let Some(t) = RtdSolver::default().solve_temperature(r) {
            prop_assert!(t.is_finite());
        }
    }

    #[test]
    fn converter_is_total(i in prop::num::f64::ANY, v in prop::num::f64::ANY) {
        let (scb, vrb) = Converter::default().convert(i, v);
        prop_assert!(scb.map_or(true, f64::is_finite));
        prop_assert!(vrb.map_or(true, f64::is_finite));
    }
}

// ── Sweep ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn setpoints_are_increasing_and_bounded(
        start in 0.0f64..10.0,
        span in 0.0f64..5.0,
        step in 0.01f64..1.0,
    ) {
        let params = SweepParams {
            start_v: start,
            end_v: start + span,
            step_v: step,
            settle_s: 0.0,
        };
        let v: Vec<f64> = sweep_voltages(&params).collect();
        prop_assert!(!v.is_empty());
        prop_assert_eq!(v[0], start);
        prop_assert!(v.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(*v.last().unwrap() <= start + span + 1e-9);
        prop_assert!(*v.last().unwrap() + step > start + span - 1e-9);
    }
}

// ── Metrics ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rmse_bounds_mean_abs(deltas in prop::collection::vec(-5.0f64..5.0, 1..60)) {
        let m = compute_metrics(&series_with("PTA1", &deltas), 1.0).unwrap();
        prop_assert!(m.mean_abs_error <= m.rmse + 1e-12);
        prop_assert!(m.rmse <= m.max_abs_error + 1e-12);
        prop_assert!(m.mean_error.abs() <= m.mean_abs_error + 1e-12);
        prop_assert_eq!(m.verdict.is_pass(), m.rmse <= 1.0);
        prop_assert_eq!(m.qualifying_samples, deltas.len());
    }
}

// ── Combined table ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn combined_rows_match_longest_channel(lens in prop::collection::vec(0usize..12, 1..6)) {
        let mut table = CombinedDeltaTable::new();
        for (i, &n) in lens.iter().enumerate() {
            table.add_channel(&series_with(&format!("PTA{}", i + 1), &vec![0.25; n]));
        }
        let longest = *lens.iter().max().unwrap();
        prop_assert_eq!(table.row_count(), longest);
        for (i, &n) in lens.iter().enumerate() {
            let col = table.column(&ChannelId::new(format!("PTA{}", i + 1))).unwrap();
            prop_assert_eq!(col.len(), longest);
            prop_assert!(col[..n].iter().all(Option::is_some));
            prop_assert!(col[n..].iter().all(Option::is_none));
        }
        prop_assert!(table.rows().iter().all(|r| r.len() == lens.len() + 1));
    }
}
