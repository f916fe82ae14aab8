// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Run Artifacts
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! On-disk artifacts of a run.
//!
//! ```text
//! <base>/<test_name>/
//!     combined_deltas.csv
//!     run_summary.json
//!     <channel>/<channel>_metrics.txt
//!     <channel>/<channel>_data.csv
//! ```
//!
//! Every file is written to a sibling `.tmp` and renamed into place, so a
//! reader never sees a half-written artifact.

use crate::combined::{CombinedDeltaTable, REFERENCE_HEADER};
use scbqc_types::constants::{COMBINED_DELTAS_FILE, RUN_SUMMARY_FILE};
use scbqc_types::error::{QcError, QcResult};
use scbqc_types::state::{ChannelId, ChannelMetrics, ChannelSeries, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_CSV_HEADER: &str = concat!(
    "Voltage (V),Current (µA),Voltage_SCB (V),",
    "Temperature_SCB (°C),Temperature_VRB (°C),Delta_Temperature (°C)",
);

const LABEL_MEAN: &str = "Mean Error";
const LABEL_MEAN_ABS: &str = "Mean Absolute Error";
const LABEL_MAX: &str = "Max Error";
const LABEL_STD: &str = "Standard Deviation";
const LABEL_RMSE: &str = "RMSE";
const LABEL_VERDICT: &str = "Quality State";
const UNIT_C: &str = "°C";

pub fn channel_dir(run_dir: &Path, channel: &ChannelId) -> PathBuf {
    run_dir.join(channel.as_str())
}

pub fn metrics_path(run_dir: &Path, channel: &ChannelId) -> PathBuf {
    channel_dir(run_dir, channel).join(format!("{channel}_metrics.txt"))
}

pub fn data_path(run_dir: &Path, channel: &ChannelId) -> PathBuf {
    channel_dir(run_dir, channel).join(format!("{channel}_data.csv"))
}

fn write_atomic(path: &Path, contents: &str) -> QcResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn format_error(path: &Path, message: impl Into<String>) -> QcError {
    QcError::ArtifactFormat {
        path: path.display().to_string(),
        message: message.into(),
    }
}

// ── Metrics file ─────────────────────────────────────────────────────

pub fn render_metrics(metrics: &ChannelMetrics) -> String {
    let mut out = String::new();
    for (label, value) in [
        (LABEL_MEAN, metrics.mean_error),
        (LABEL_MEAN_ABS, metrics.mean_abs_error),
        (LABEL_MAX, metrics.max_abs_error),
        (LABEL_STD, metrics.stddev_error),
        (LABEL_RMSE, metrics.rmse),
    ] {
        let _ = writeln!(out, "{label}: {value:.3} {UNIT_C}");
    }
    let _ = writeln!(out, "{LABEL_VERDICT}: {}", metrics.verdict);
    out
}

pub fn write_metrics_file(
    run_dir: &Path,
    channel: &ChannelId,
    metrics: &ChannelMetrics,
) -> QcResult<PathBuf> {
    fs::create_dir_all(channel_dir(run_dir, channel))?;
    let path = metrics_path(run_dir, channel);
    write_atomic(&path, &render_metrics(metrics))?;
    Ok(path)
}

/// Drop a verdict left by an earlier run of `channel`. Missing is fine.
pub fn remove_metrics_file(run_dir: &Path, channel: &ChannelId) -> QcResult<()> {
    match fs::remove_file(metrics_path(run_dir, channel)) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

/// A metrics file read back. Values carry the file's 3-decimal precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub mean_error: f64,
    pub mean_abs_error: f64,
    pub max_error: f64,
    pub stddev_error: f64,
    pub rmse: f64,
    pub verdict: Verdict,
}

/// Parse the text of a metrics file. `path` only labels errors.
pub fn parse_metrics(text: &str, path: &Path) -> QcResult<MetricsSummary> {
    let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (label, value) = line
            .split_once(':')
            .ok_or_else(|| format_error(path, format!("line without label: '{line}'")))?;
        fields.insert(label.trim(), value.trim());
    }

    let number = |label: &str| -> QcResult<f64> {
        let raw: &str = fields
            .get(label)
            .copied()
            .ok_or_else(|| format_error(path, format!("missing '{label}'")))?;
        let digits = raw.strip_suffix(UNIT_C).unwrap_or(raw).trim();
        digits
            .parse::<f64>()
            .map_err(|_| format_error(path, format!("bad value for '{label}': '{raw}'")))
    };

    let verdict = fields
        .get(LABEL_VERDICT)
        .ok_or_else(|| format_error(path, format!("missing '{LABEL_VERDICT}'")))?
        .parse::<Verdict>()
        .map_err(|e| format_error(path, e))?;

    Ok(MetricsSummary {
        mean_error: number(LABEL_MEAN)?,
        mean_abs_error: number(LABEL_MEAN_ABS)?,
        max_error: number(LABEL_MAX)?,
        stddev_error: number(LABEL_STD)?,
        rmse: number(LABEL_RMSE)?,
        verdict,
    })
}

pub fn parse_metrics_file(path: impl AsRef<Path>) -> QcResult<MetricsSummary> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_metrics(&text, path)
}

// ── Data file ────────────────────────────────────────────────────────

pub fn render_data_csv(series: &ChannelSeries) -> String {
    let mut out = String::with_capacity(64 * (series.len() + 1));
    out.push_str(DATA_CSV_HEADER);
    out.push('\n');
    for s in &series.samples {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            s.source_voltage,
            s.measured_current,
            s.measured_voltage_scb,
            format_cell(s.temperature_scb),
            format_cell(s.temperature_vrb),
            format_cell(s.delta()),
        );
    }
    out
}

pub fn write_data_file(run_dir: &Path, series: &ChannelSeries) -> QcResult<PathBuf> {
    fs::create_dir_all(channel_dir(run_dir, &series.channel))?;
    let path = data_path(run_dir, &series.channel);
    write_atomic(&path, &render_data_csv(series))?;
    Ok(path)
}

// ── Combined deltas ──────────────────────────────────────────────────

pub fn render_combined_csv(table: &CombinedDeltaTable) -> String {
    let mut out = table.headers().join(",");
    out.push('\n');
    for row in table.rows() {
        let cells: Vec<String> = row.into_iter().map(format_cell).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

pub fn write_combined_deltas(run_dir: &Path, table: &CombinedDeltaTable) -> QcResult<PathBuf> {
    fs::create_dir_all(run_dir)?;
    let path = run_dir.join(COMBINED_DELTAS_FILE);
    write_atomic(&path, &render_combined_csv(table))?;
    Ok(path)
}

/// `combined_deltas.csv` read back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedDeltas {
    pub temperature_vrb: Vec<Option<f64>>,
    pub deltas: BTreeMap<ChannelId, Vec<Option<f64>>>,
}

impl CombinedDeltas {
    pub fn row_count(&self) -> usize {
        self.temperature_vrb.len()
    }
}

pub fn read_combined_deltas(run_dir: &Path) -> QcResult<CombinedDeltas> {
    let path = run_dir.join(COMBINED_DELTAS_FILE);
    let text = fs::read_to_string(&path)?;
    let mut lines = text.lines();

    let header = lines.next().ok_or_else(|| format_error(&path, "empty file"))?;
    let mut columns = header.split(',');
    if columns.next() != Some(REFERENCE_HEADER) {
        return Err(format_error(
            &path,
            format!("first column must be '{REFERENCE_HEADER}'"),
        ));
    }
    let channels: Vec<ChannelId> = columns.map(ChannelId::from).collect();

    let mut out = CombinedDeltas::default();
    let mut channel_cols: Vec<Vec<Option<f64>>> = vec![Vec::new(); channels.len()];
    for (lineno, line) in lines.enumerate().filter(|(_, l)| !l.is_empty()) {
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() != channels.len() + 1 {
            return Err(format_error(
                &path,
                format!(
                    "row {} has {} cells, expected {}",
                    lineno + 2,
                    cells.len(),
                    channels.len() + 1
                ),
            ));
        }
        let mut parsed = Vec::with_capacity(cells.len());
        for cell in cells {
            let value = if cell.is_empty() {
                None
            } else {
                Some(cell.parse::<f64>().map_err(|_| {
                    format_error(&path, format!("row {}: bad number '{cell}'", lineno + 2))
                })?)
            };
            parsed.push(value);
        }
        out.temperature_vrb.push(parsed[0]);
        for (col, value) in channel_cols.iter_mut().zip(&parsed[1..]) {
            col.push(*value);
        }
    }
    out.deltas = channels.into_iter().zip(channel_cols).collect();
    Ok(out)
}

// ── Run directory ────────────────────────────────────────────────────

/// Channels under `run_dir` that have a metrics file, in channel order.
/// A missing run directory has no completed channels.
pub fn scan_completed_channels(run_dir: &Path) -> QcResult<BTreeSet<ChannelId>> {
    let mut done = BTreeSet::new();
    if !run_dir.is_dir() {
        return Ok(done);
    }
    for entry in fs::read_dir(run_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(ChannelId::from) else {
            continue;
        };
        if metrics_path(run_dir, &name).is_file() {
            done.insert(name);
        }
    }
    Ok(done)
}

pub fn write_run_summary<T: Serialize>(run_dir: &Path, summary: &T) -> QcResult<PathBuf> {
    fs::create_dir_all(run_dir)?;
    let path = run_dir.join(RUN_SUMMARY_FILE);
    write_atomic(&path, &serde_json::to_string_pretty(summary)?)?;
    Ok(path)
}
