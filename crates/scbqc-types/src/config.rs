// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::*;
use crate::error::{QcError, QcResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level run configuration.
/// Only `test_name`, `base_dir` and `threshold_c` are required in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub test_name: String,
    pub base_dir: PathBuf,
    /// Pass/fail limit on the channel RMSE (°C).
    pub threshold_c: f64,
    #[serde(default)]
    pub sweep: SweepParams,
    #[serde(default)]
    pub calibration: Calibration,
    #[serde(default)]
    pub curve: RtdCurve,
}

/// Voltage ramp applied to every channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepParams {
    #[serde(default = "default_start_v")]
    pub start_v: f64,
    #[serde(default = "default_end_v")]
    pub end_v: f64,
    #[serde(default = "default_step_v")]
    pub step_v: f64,
    #[serde(default = "default_settle_s")]
    pub settle_s: f64,
}

/// Run-level calibration of the two measurement paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// SCB divider series resistor (Ω).
    #[serde(default = "default_rv")]
    pub rv_ohm: f64,
    /// SCB reference voltage, also the VRB gain (V).
    #[serde(default = "default_vref")]
    pub vref_v: f64,
}

/// Callendar–Van Dusen coefficients of the reference sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RtdCurve {
    #[serde(default = "default_r0")]
    pub r0: f64,
    #[serde(default = "default_a")]
    pub a: f64,
    #[serde(default = "default_b")]
    pub b: f64,
    #[serde(default = "default_c")]
    pub c: f64,
}

fn default_start_v() -> f64 {
    DEFAULT_SWEEP_START_V
}
fn default_end_v() -> f64 {
    DEFAULT_SWEEP_END_V
}
fn default_step_v() -> f64 {
    DEFAULT_SWEEP_STEP_V
}
fn default_settle_s() -> f64 {
    DEFAULT_SETTLE_S
}
fn default_rv() -> f64 {
    DEFAULT_RV_OHM
}
fn default_vref() -> f64 {
    DEFAULT_VREF_V
}
fn default_r0() -> f64 {
    RTD_R0
}
fn default_a() -> f64 {
    RTD_A
}
fn default_b() -> f64 {
    RTD_B
}
fn default_c() -> f64 {
    RTD_C
}

impl Default for SweepParams {
    fn default() -> Self {
        SweepParams {
            start_v: default_start_v(),
            end_v: default_end_v(),
            step_v: default_step_v(),
            settle_s: default_settle_s(),
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            rv_ohm: default_rv(),
            vref_v: default_vref(),
        }
    }
}

impl Default for RtdCurve {
    fn default() -> Self {
        RtdCurve {
            r0: default_r0(),
            a: default_a(),
            b: default_b(),
            c: default_c(),
        }
    }
}

impl SweepParams {
    pub fn validate(&self) -> QcResult<()> {
        if !self.start_v.is_finite() || !self.end_v.is_finite() {
            return Err(QcError::ConfigError(
                "sweep start_v and end_v must be finite".to_string(),
            ));
        }
        if !self.step_v.is_finite() || self.step_v <= 0.0 {
            return Err(QcError::ConfigError(
                "sweep step_v must be finite and > 0".to_string(),
            ));
        }
        if self.end_v < self.start_v {
            return Err(QcError::ConfigError(format!(
                "sweep end_v ({:.3}) is below start_v ({:.3})",
                self.end_v, self.start_v
            )));
        }
        let points = ((self.end_v - self.start_v) / self.step_v).floor();
        if !points.is_finite() || points >= MAX_SWEEP_POINTS as f64 {
            return Err(QcError::ConfigError(format!(
                "sweep {:.3} V → {:.3} V in {} V steps exceeds {MAX_SWEEP_POINTS} points",
                self.start_v, self.end_v, self.step_v
            )));
        }
        if self.settle_s < 0.0 || Duration::try_from_secs_f64(self.settle_s).is_err() {
            return Err(QcError::ConfigError(format!(
                "sweep settle_s must be a representable duration >= 0, got {}",
                self.settle_s
            )));
        }
        Ok(())
    }

    /// Number of points the ramp visits, end inclusive.
    /// Saturates instead of wrapping for parameters `validate` rejects.
    pub fn step_count(&self) -> usize {
        let span = (self.end_v - self.start_v) / self.step_v;
        let last = (span + SWEEP_END_TOLERANCE_V / self.step_v).floor();
        if last.is_nan() || last < 0.0 {
            return 0;
        }
        (last as usize).saturating_add(1)
    }
}

impl Calibration {
    pub fn validate(&self) -> QcResult<()> {
        if !self.rv_ohm.is_finite() || self.rv_ohm <= 0.0 {
            return Err(QcError::ConfigError(
                "calibration rv_ohm must be finite and > 0".to_string(),
            ));
        }
        if !self.vref_v.is_finite() || self.vref_v <= 0.0 {
            return Err(QcError::ConfigError(
                "calibration vref_v must be finite and > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl RtdCurve {
    /// Forward model: resistance (Ω) at temperature `t` (°C).
    pub fn resistance_at(&self, t: f64) -> f64 {
        let mut ratio = 1.0 + self.a * t + self.b * t * t;
        if t < 0.0 {
            ratio += self.c * (t - 100.0) * t.powi(3);
        }
        self.r0 * ratio
    }

    pub fn validate(&self) -> QcResult<()> {
        let finite = [self.r0, self.a, self.b, self.c]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.r0 <= 0.0 {
            return Err(QcError::ConfigError(
                "RTD curve needs finite coefficients and r0 > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks a pass/fail threshold (°C).
pub fn validate_threshold(threshold_c: f64) -> QcResult<()> {
    if !threshold_c.is_finite() || threshold_c < 0.0 {
        return Err(QcError::ConfigError(format!(
            "threshold must be finite and >= 0, got {threshold_c}"
        )));
    }
    Ok(())
}

impl RunConfig {
    /// Config with bench defaults for everything but the identity of the run.
    pub fn new(
        test_name: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        threshold_c: f64,
    ) -> Self {
        RunConfig {
            test_name: test_name.into(),
            base_dir: base_dir.into(),
            threshold_c,
            sweep: SweepParams::default(),
            calibration: Calibration::default(),
            curve: RtdCurve::default(),
        }
    }

    /// Load from a JSON file and validate.
    pub fn from_file(path: impl AsRef<Path>) -> QcResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks only; the run directory is checked when the run starts.
    pub fn validate(&self) -> QcResult<()> {
        if self.test_name.trim().is_empty() {
            return Err(QcError::ConfigError("test name must not be empty".to_string()));
        }
        if self.test_name.contains(&['/', '\\'][..]) {
            return Err(QcError::ConfigError(format!(
                "test name '{}' must not contain path separators",
                self.test_name
            )));
        }
        validate_threshold(self.threshold_c)?;
        self.sweep.validate()?;
        self.calibration.validate()?;
        self.curve.validate()?;
        Ok(())
    }

    /// `base_dir/test_name`
    pub fn run_dir(&self) -> PathBuf {
        self.base_dir.join(&self.test_name)
    }
}
