// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Logical channel name such as `PTA1` or `PTB12`.
///
/// Ordered by the 3-character prefix, then by the numeric suffix, so
/// `PTA2 < PTA10 < PTB1`. Names without a numeric suffix sort after the
/// numbered ones sharing their prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        ChannelId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn sort_key(&self) -> (&str, Option<u64>, &str) {
        let split = self
            .0
            .char_indices()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        let (prefix, suffix) = self.0.split_at(split);
        (prefix, suffix.parse::<u64>().ok(), suffix)
    }
}

impl Ord for ChannelId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (pa, na, sa) = self.sort_key();
        let (pb, nb, sb) = other.sort_key();
        pa.cmp(pb)
            .then_with(|| match (na, nb) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| sa.cmp(sb))
    }
}

impl PartialOrd for ChannelId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        ChannelId::new(name)
    }
}

/// One sweep step on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub source_voltage: f64,
    /// Reference-path current (µA).
    pub measured_current: f64,
    pub measured_voltage_scb: f64,
    /// `None` when the SCB resistance has no physical temperature.
    pub temperature_scb: Option<f64>,
    /// `None` when the VRB resistance has no physical temperature.
    pub temperature_vrb: Option<f64>,
}

impl Sample {
    /// `temperature_vrb - temperature_scb`, when both are defined.
    pub fn delta(&self) -> Option<f64> {
        match (self.temperature_vrb, self.temperature_scb) {
            (Some(vrb), Some(scb)) => Some(vrb - scb),
            _ => None,
        }
    }
}

/// Samples of one channel, ordered by increasing source voltage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub channel: ChannelId,
    pub samples: Vec<Sample>,
}

impl ChannelSeries {
    pub fn new(channel: ChannelId) -> Self {
        ChannelSeries {
            channel,
            samples: Vec::new(),
        }
    }

    pub fn from_samples(channel: ChannelId, samples: Vec<Sample>) -> Self {
        debug_assert!(samples
            .windows(2)
            .all(|w| w[0].source_voltage < w[1].source_voltage));
        ChannelSeries { channel, samples }
    }

    pub fn push(&mut self, sample: Sample) {
        debug_assert!(self
            .samples
            .last()
            .map_or(true, |last| last.source_voltage < sample.source_voltage));
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Per-sample deltas, `None` where a temperature is absent.
    pub fn deltas(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(Sample::delta).collect()
    }

    /// Deltas of the samples where both temperatures are defined.
    pub fn qualifying_deltas(&self) -> Vec<f64> {
        self.samples.iter().filter_map(Sample::delta).collect()
    }

    pub fn vrb_temperatures(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.temperature_vrb).collect()
    }
}

/// Channel quality verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("Pass"),
            Verdict::Fail => f.write_str("Fail"),
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pass" => Ok(Verdict::Pass),
            "Fail" => Ok(Verdict::Fail),
            other => Err(format!("unknown verdict '{other}'")),
        }
    }
}

/// Summary statistics of a channel's delta series (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub mean_error: f64,
    pub mean_abs_error: f64,
    pub max_abs_error: f64,
    /// Population standard deviation.
    pub stddev_error: f64,
    pub rmse: f64,
    pub verdict: Verdict,
    /// Samples with both temperatures defined.
    pub qualifying_samples: usize,
}

/// A sweep step dropped because the instrument faulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFault {
    pub source_voltage: f64,
    pub message: String,
}
