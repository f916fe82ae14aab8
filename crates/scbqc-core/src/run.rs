// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Run Aggregator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Channel-by-channel test run.
//!
//! # Invariants
//!
//! 1. **Whole-record publication**: a channel record and its combined-table
//!    column are published under one write lock. A snapshot never holds a
//!    record without its column or the reverse.
//!
//! 2. **Fail before touching hardware**: configuration, base directory and
//!    channel list are validated before the first `select`.
//!
//! 3. **Channel isolation**: a routing failure, an empty series or an
//!    artifact write failure marks that channel `Failed`; later channels run.
//!
//! 4. **Cancellation sticks**: once `cancel()` is called the run stops at the
//!    next channel boundary, and the channel in flight is discarded. The flag
//!    stays set until `clear_cancel()`.

use crate::artifacts::{
    remove_metrics_file, write_combined_deltas, write_data_file, write_metrics_file,
    write_run_summary,
};
use crate::combined::CombinedDeltaTable;
use crate::converter::Converter;
use crate::instrument::{Instrument, Router};
use crate::metrics::compute_metrics;
use crate::sweep::sweep;
use scbqc_types::config::RunConfig;
use scbqc_types::error::{QcError, QcResult};
use scbqc_types::state::{ChannelId, ChannelMetrics, ChannelSeries, StepFault};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::{info, warn};

/// How a channel ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelOutcome {
    Measured(ChannelMetrics),
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelStatus {
    /// Every step kept, every sample has both temperatures.
    Succeeded,
    /// Measured, but steps were dropped or some samples lack a temperature.
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel: ChannelId,
    pub series: ChannelSeries,
    pub faults: Vec<StepFault>,
    pub outcome: ChannelOutcome,
    pub elapsed_s: f64,
}

impl ChannelRecord {
    fn failed(channel: &ChannelId, reason: String, elapsed_s: f64) -> Self {
        ChannelRecord {
            channel: channel.clone(),
            series: ChannelSeries::new(channel.clone()),
            faults: Vec::new(),
            outcome: ChannelOutcome::Failed { reason },
            elapsed_s,
        }
    }

    pub fn status(&self) -> ChannelStatus {
        match self.outcome {
            ChannelOutcome::Failed { .. } => ChannelStatus::Failed,
            ChannelOutcome::Measured(_) => {
                let incomplete = self.series.samples.iter().any(|s| s.delta().is_none());
                if self.faults.is_empty() && !incomplete {
                    ChannelStatus::Succeeded
                } else {
                    ChannelStatus::Partial
                }
            }
        }
    }

    pub fn metrics(&self) -> Option<&ChannelMetrics> {
        match &self.outcome {
            ChannelOutcome::Measured(m) => Some(m),
            ChannelOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Everything a run has produced so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_name: String,
    pub run_dir: PathBuf,
    pub threshold_c: f64,
    pub state: RunState,
    pub records: BTreeMap<ChannelId, ChannelRecord>,
    pub combined: CombinedDeltaTable,
}

impl Default for RunResult {
    fn default() -> Self {
        RunResult {
            run_name: String::new(),
            run_dir: PathBuf::new(),
            threshold_c: 0.0,
            state: RunState::Idle,
            records: BTreeMap::new(),
            combined: CombinedDeltaTable::new(),
        }
    }
}

impl RunResult {
    pub fn record(&self, channel: &ChannelId) -> Option<&ChannelRecord> {
        self.records.get(channel)
    }

    pub fn status(&self, channel: &ChannelId) -> Option<ChannelStatus> {
        self.records.get(channel).map(ChannelRecord::status)
    }

    /// Channels with a verdict.
    pub fn completed_channels(&self) -> BTreeSet<ChannelId> {
        self.records
            .values()
            .filter(|r| r.metrics().is_some())
            .map(|r| r.channel.clone())
            .collect()
    }

    pub fn failed_channels(&self) -> Vec<ChannelId> {
        self.records
            .values()
            .filter(|r| r.status() == ChannelStatus::Failed)
            .map(|r| r.channel.clone())
            .collect()
    }

    /// True when at least one channel was measured and every measured channel passed.
    pub fn all_passed(&self) -> bool {
        let mut verdicts = self.records.values().filter_map(ChannelRecord::metrics).peekable();
        verdicts.peek().is_some() && verdicts.all(|m| m.verdict.is_pass())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_name: self.run_name.clone(),
            threshold_c: self.threshold_c,
            state: self.state,
            channels: self
                .records
                .values()
                .map(|r| ChannelSummary {
                    channel: r.channel.clone(),
                    status: r.status(),
                    samples: r.series.len(),
                    dropped_steps: r.faults.len(),
                    metrics: r.metrics().copied(),
                    failure: match &r.outcome {
                        ChannelOutcome::Failed { reason } => Some(reason.clone()),
                        ChannelOutcome::Measured(_) => None,
                    },
                    elapsed_s: r.elapsed_s,
                })
                .collect(),
        }
    }
}

/// Per-channel line of `run_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: ChannelId,
    pub status: ChannelStatus,
    pub samples: usize,
    pub dropped_steps: usize,
    pub metrics: Option<ChannelMetrics>,
    pub failure: Option<String>,
    pub elapsed_s: f64,
}

/// Contents of `run_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_name: String,
    pub threshold_c: f64,
    pub state: RunState,
    pub channels: Vec<ChannelSummary>,
}

/// Shared handle on a run. Clones see the same state and cancel flag.
#[derive(Debug, Clone, Default)]
pub struct RunSession {
    result: Arc<RwLock<RunResult>>,
    cancel: Arc<AtomicBool>,
}

impl RunSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RunResult> {
        self.result.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunResult> {
        self.result.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> RunResult {
        self.read().clone()
    }

    pub fn state(&self) -> RunState {
        self.read().state
    }

    pub fn list_completed_channels(&self) -> BTreeSet<ChannelId> {
        self.read().completed_channels()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Start a run. Records of an earlier run into the same directory are
    /// kept so re-run channels replace their own entries only.
    fn begin(&self, config: &RunConfig, run_dir: &Path) {
        let mut result = self.write();
        if result.run_dir != run_dir {
            *result = RunResult::default();
        }
        result.run_name = config.test_name.clone();
        result.run_dir = run_dir.to_path_buf();
        result.threshold_c = config.threshold_c;
        result.state = RunState::Running;
    }

    /// Publish a channel record and its combined column together.
    fn publish(&self, record: ChannelRecord) -> CombinedDeltaTable {
        let mut result = self.write();
        match record.outcome {
            ChannelOutcome::Measured(_) => result.combined.add_channel(&record.series),
            ChannelOutcome::Failed { .. } => {
                result.combined.remove_channel(&record.channel);
            }
        }
        result.records.insert(record.channel.clone(), record);
        result.combined.clone()
    }

    fn finish(&self, state: RunState) -> RunResult {
        let mut result = self.write();
        result.state = state;
        result.clone()
    }
}

fn validate_channels(channels: &[ChannelId]) -> QcResult<()> {
    if channels.is_empty() {
        return Err(QcError::ConfigError("no channels selected".to_string()));
    }
    let mut seen = BTreeSet::new();
    if let Some(dup) = channels.iter().find(|c| !seen.insert(*c)) {
        return Err(QcError::ConfigError(format!("channel {dup} selected twice")));
    }
    Ok(())
}

/// Route, sweep, score and persist one channel. `None` when the run was
/// cancelled while the channel was in flight.
fn run_channel<B: Instrument + Router + ?Sized>(
    session: &RunSession,
    config: &RunConfig,
    run_dir: &Path,
    channel: &ChannelId,
    bench: &mut B,
    converter: &Converter,
) -> QcResult<Option<ChannelRecord>> {
    let started = Instant::now();
    info!(channel = %channel, "channel start");

    if let Err(err) = bench.select(channel) {
        warn!(channel = %channel, error = %err, "routing failed");
        return Ok(Some(ChannelRecord::failed(
            channel,
            err.to_string(),
            started.elapsed().as_secs_f64(),
        )));
    }

    let outcome = sweep(channel, &config.sweep, bench, converter)?;
    if session.is_cancelled() {
        info!(channel = %channel, "cancelled mid-channel, discarding");
        return Ok(None);
    }

    let result = write_data_file(run_dir, &outcome.series).and_then(|_| {
        let metrics = compute_metrics(&outcome.series, config.threshold_c)?;
        write_metrics_file(run_dir, channel, &metrics)?;
        Ok(metrics)
    });
    let outcome_kind = match result {
        Ok(metrics) => ChannelOutcome::Measured(metrics),
        Err(err) => {
            warn!(channel = %channel, error = %err, "channel failed");
            if let Err(e) = remove_metrics_file(run_dir, channel) {
                warn!(channel = %channel, error = %e, "could not remove stale metrics file");
            }
            ChannelOutcome::Failed {
                reason: err.to_string(),
            }
        }
    };

    Ok(Some(ChannelRecord {
        channel: channel.clone(),
        series: outcome.series,
        faults: outcome.faults,
        outcome: outcome_kind,
        elapsed_s: started.elapsed().as_secs_f64(),
    }))
}

/// Run every channel in `channels`, in the given order, through the full
/// pipeline and publish each result to `session` as it lands.
///
/// Only configuration problems are errors, plus failure to write the final
/// combined table or summary. Channel-level problems end up in the records.
pub fn run_test<B: Instrument + Router + ?Sized>(
    session: &RunSession,
    config: &RunConfig,
    channels: &[ChannelId],
    bench: &mut B,
) -> QcResult<RunResult> {
    config.validate()?;
    if !config.base_dir.is_dir() {
        return Err(QcError::ConfigError(format!(
            "base directory {} does not exist",
            config.base_dir.display()
        )));
    }
    validate_channels(channels)?;
    let run_dir = config.run_dir();
    std::fs::create_dir_all(&run_dir)?;

    let converter = Converter::new(config.calibration, config.curve);
    session.begin(config, &run_dir);
    info!(
        run = %config.test_name,
        channels = channels.len(),
        threshold_c = config.threshold_c,
        dir = %run_dir.display(),
        "run start"
    );
    let started = Instant::now();

    let mut state = RunState::Completed;
    for channel in channels {
        if session.is_cancelled() {
            state = RunState::Cancelled;
            break;
        }
        let Some(record) = run_channel(session, config, &run_dir, channel, bench, &converter)?
        else {
            state = RunState::Cancelled;
            break;
        };

        info!(
            channel = %channel,
            status = ?record.status(),
            samples = record.series.len(),
            dropped = record.faults.len(),
            elapsed_s = record.elapsed_s,
            "channel done"
        );
        let combined = session.publish(record);
        if let Err(err) = write_combined_deltas(&run_dir, &combined) {
            warn!(error = %err, "combined table not written");
        }
    }

    let result = session.finish(state);
    write_combined_deltas(&run_dir, &result.combined)?;
    write_run_summary(&run_dir, &result.summary())?;
    info!(
        run = %config.test_name,
        state = ?state,
        completed = result.completed_channels().len(),
        failed = result.failed_channels().len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "run done"
    );
    Ok(result)
}
