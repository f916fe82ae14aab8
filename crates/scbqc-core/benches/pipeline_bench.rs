// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Pipeline Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use scbqc_core::converter::Converter;
use scbqc_core::instrument::{Router, SyntheticRig};
use scbqc_core::metrics::compute_metrics;
use scbqc_core::rtd::RtdSolver;
use scbqc_core::sweep::sweep;
use scbqc_types::config::{Calibration, RtdCurve, SweepParams};
use scbqc_types::state::ChannelId;
use std::hint::black_box;

fn bench_params() -> SweepParams {
    SweepParams {
        settle_s: 0.0,
        ..SweepParams::default()
    }
}

fn bench_solver(c: &mut Criterion) {
    let curve = RtdCurve::default();
    let solver = RtdSolver::new(curve);
    let mut group = c.benchmark_group("solve_temperature");

    for &t in &[-150.0, -20.0, 25.0, 400.0] {
        let r = curve.resistance_at(t);
        group.bench_function(format!("{t}C"), |b| {
            b.iter(|| black_box(solver.solve_temperature(black_box(r))));
        });
    }
    group.finish();
}

fn bench_channel(c: &mut Criterion) {
    let params = bench_params();
    let converter = Converter::default();
    let channel = ChannelId::from("PTA1");

    c.bench_function("sweep_and_score_default_ramp", |b| {
        b.iter(|| {
            let mut rig = SyntheticRig::new(Calibration::default(), RtdCurve::default(), &params)
                .with_noise(0.02, 5e-5);
            rig.select(&channel).expect("synthetic routing should succeed");
            let outcome =
                sweep(&channel, &params, &mut rig, &converter).expect("sweep should succeed");
            let metrics = compute_metrics(&outcome.series, 0.5).expect("metrics should succeed");
            black_box(metrics.rmse);
        });
    });
}

criterion_group!(benches, bench_solver, bench_channel);
criterion_main!(benches);
