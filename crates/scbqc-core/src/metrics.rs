// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Channel Metrics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Delta-temperature statistics and the pass/fail verdict.
//!
//! `δ = T_vrb − T_scb` over samples where both temperatures exist.
//! A channel passes iff `rmse(δ) ≤ threshold`.

use scbqc_math::stats::error_stats;
use scbqc_types::config::validate_threshold;
use scbqc_types::error::{QcError, QcResult};
use scbqc_types::state::{ChannelMetrics, ChannelSeries, Verdict};

/// RMSE criterion.
pub fn verdict_for(rmse: f64, threshold_c: f64) -> Verdict {
    if rmse <= threshold_c {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}

/// Reduce a channel series to [`ChannelMetrics`].
///
/// Fails with `EmptySeries` when no sample has both temperatures, and with
/// `ConfigError` for a negative or non-finite threshold.
pub fn compute_metrics(series: &ChannelSeries, threshold_c: f64) -> QcResult<ChannelMetrics> {
    validate_threshold(threshold_c)?;
    let deltas = series.qualifying_deltas();
    let stats = error_stats(&deltas).ok_or_else(|| QcError::EmptySeries {
        channel: series.channel.to_string(),
    })?;

    Ok(ChannelMetrics {
        mean_error: stats.mean,
        mean_abs_error: stats.mean_abs,
        max_abs_error: stats.max_abs,
        stddev_error: stats.std_pop,
        rmse: stats.rmse,
        verdict: verdict_for(stats.rmse, threshold_c),
        qualifying_samples: stats.count,
    })
}
