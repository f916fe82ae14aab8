// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Instruments
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Instrument and routing seams, plus a synthetic bench.
//!
//! The synthetic rig models a PT10000 reference swept across a temperature
//! ramp that follows the source voltage, and an SCB front end that sees the
//! same temperature through a per-channel gain/offset error. Readings carry
//! Gaussian noise and can be made to fault on demand.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use scbqc_types::config::{Calibration, RtdCurve, SweepParams};
use scbqc_types::error::{QcError, QcResult};
use scbqc_types::state::ChannelId;
use std::collections::{BTreeMap, BTreeSet};

/// Source + meters. A failed call is a per-step measurement fault.
pub trait Instrument {
    fn set_source_voltage(&mut self, volts: f64) -> QcResult<()>;
    /// Reference-path current (µA).
    fn read_current(&mut self) -> QcResult<f64>;
    /// SCB output voltage (V).
    fn read_voltage(&mut self) -> QcResult<f64>;
}

/// Physical channel selection. Must be idempotent.
pub trait Router {
    fn select(&mut self, channel: &ChannelId) -> QcResult<()>;
}

/// Separate instrument and router driven as one bench.
pub struct SplitBench<I, R> {
    pub instrument: I,
    pub router: R,
}

impl<I: Instrument, R> Instrument for SplitBench<I, R> {
    fn set_source_voltage(&mut self, volts: f64) -> QcResult<()> {
        self.instrument.set_source_voltage(volts)
    }

    fn read_current(&mut self) -> QcResult<f64> {
        self.instrument.read_current()
    }

    fn read_voltage(&mut self) -> QcResult<f64> {
        self.instrument.read_voltage()
    }
}

impl<I, R: Router> Router for SplitBench<I, R> {
    fn select(&mut self, channel: &ChannelId) -> QcResult<()> {
        self.router.select(channel)
    }
}

/// SCB-side error of one simulated channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScbChannelError {
    /// Relative gain error on the temperature seen by the SCB.
    pub gain: f64,
    /// Temperature offset seen by the SCB (°C).
    pub offset_c: f64,
}

/// Voltage tolerance for matching scripted faults (V).
const FAULT_MATCH_TOL_V: f64 = 1e-9;

/// Simulated source, meters and multiplexer.
pub struct SyntheticRig {
    calibration: Calibration,
    curve: RtdCurve,
    sweep_start_v: f64,
    sweep_end_v: f64,
    temp_start_c: f64,
    temp_end_c: f64,
    current_noise_ua: f64,
    voltage_noise_v: f64,
    fault_probability: f64,
    faulty_voltages: Vec<f64>,
    channel_errors: BTreeMap<ChannelId, ScbChannelError>,
    open_channels: BTreeSet<ChannelId>,
    unroutable: BTreeSet<ChannelId>,
    selected: Option<ChannelId>,
    source_v: Option<f64>,
    selections: Vec<ChannelId>,
    rng: StdRng,
}

impl SyntheticRig {
    /// Noise-free rig whose temperature ramps from 0 °C to 100 °C across the sweep.
    pub fn new(calibration: Calibration, curve: RtdCurve, sweep: &SweepParams) -> Self {
        Self {
            calibration,
            curve,
            sweep_start_v: sweep.start_v,
            sweep_end_v: sweep.end_v,
            temp_start_c: 0.0,
            temp_end_c: 100.0,
            current_noise_ua: 0.0,
            voltage_noise_v: 0.0,
            fault_probability: 0.0,
            faulty_voltages: Vec::new(),
            channel_errors: BTreeMap::new(),
            open_channels: BTreeSet::new(),
            unroutable: BTreeSet::new(),
            selected: None,
            source_v: None,
            selections: Vec::new(),
            rng: StdRng::seed_from_u64(0x5CB0_0C0F),
        }
    }

    pub fn with_temperature_ramp(mut self, start_c: f64, end_c: f64) -> Self {
        self.temp_start_c = start_c;
        self.temp_end_c = end_c;
        self
    }

    /// Gaussian reading noise (1σ).
    pub fn with_noise(mut self, current_ua: f64, voltage_v: f64) -> Self {
        self.current_noise_ua = current_ua.abs();
        self.voltage_noise_v = voltage_v.abs();
        self
    }

    /// Chance that any single read fails.
    pub fn with_fault_probability(mut self, p: f64) -> Self {
        self.fault_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Reads always fail while the source sits at `volts`.
    pub fn with_faulty_voltage(mut self, volts: f64) -> Self {
        self.faulty_voltages.push(volts);
        self
    }

    pub fn with_channel_error(mut self, channel: ChannelId, error: ScbChannelError) -> Self {
        self.channel_errors.insert(channel, error);
        self
    }

    /// The SCB output of `channel` is stuck at Vref, so it never yields a temperature.
    pub fn with_open_channel(mut self, channel: ChannelId) -> Self {
        self.open_channels.insert(channel);
        self
    }

    pub fn with_unroutable_channel(mut self, channel: ChannelId) -> Self {
        self.unroutable.insert(channel);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Every successful `select` call, in order.
    pub fn selections(&self) -> &[ChannelId] {
        &self.selections
    }

    /// True temperature at a source voltage (°C).
    pub fn true_temperature(&self, volts: f64) -> f64 {
        let span = self.sweep_end_v - self.sweep_start_v;
        let frac = if span > 0.0 {
            (volts - self.sweep_start_v) / span
        } else {
            0.0
        };
        self.temp_start_c + frac * (self.temp_end_c - self.temp_start_c)
    }

    fn gaussian(&mut self, sigma: f64) -> f64 {
        if sigma == 0.0 {
            return 0.0;
        }
        let z: f64 = self.rng.sample(StandardNormal);
        sigma * z
    }

    fn check_read(&mut self) -> QcResult<f64> {
        let Some(volts) = self.source_v else {
            return Err(QcError::MeasurementFault {
                voltage: f64::NAN,
                message: "source voltage not set".to_string(),
            });
        };
        if self
            .faulty_voltages
            .iter()
            .any(|v| (v - volts).abs() < FAULT_MATCH_TOL_V)
        {
            return Err(QcError::MeasurementFault {
                voltage: volts,
                message: "meter timeout".to_string(),
            });
        }
        if self.fault_probability > 0.0 && self.rng.gen_bool(self.fault_probability) {
            return Err(QcError::MeasurementFault {
                voltage: volts,
                message: "meter returned garbage".to_string(),
            });
        }
        Ok(volts)
    }
}

impl Instrument for SyntheticRig {
    fn set_source_voltage(&mut self, volts: f64) -> QcResult<()> {
        if !volts.is_finite() {
            return Err(QcError::MeasurementFault {
                voltage: volts,
                message: "source rejected non-finite setpoint".to_string(),
            });
        }
        self.source_v = Some(volts);
        Ok(())
    }

    fn read_current(&mut self) -> QcResult<f64> {
        let volts = self.check_read()?;
        let r = self.curve.resistance_at(self.true_temperature(volts));
        let current_ua = 1000.0 * self.calibration.vref_v / r * 1000.0;
        Ok(current_ua + self.gaussian(self.current_noise_ua))
    }

    fn read_voltage(&mut self) -> QcResult<f64> {
        let volts = self.check_read()?;
        let vref = self.calibration.vref_v;
        let channel = self.selected.clone();
        if channel.as_ref().is_some_and(|c| self.open_channels.contains(c)) {
            return Ok(vref);
        }
        let error = channel
            .as_ref()
            .and_then(|c| self.channel_errors.get(c).copied())
            .unwrap_or(ScbChannelError {
                gain: 0.0,
                offset_c: 0.0,
            });
        let seen_c = self.true_temperature(volts) * (1.0 + error.gain) + error.offset_c;
        let r = self.curve.resistance_at(seen_c);
        let v_scb = vref * (1.0 + self.calibration.rv_ohm / r);
        Ok(v_scb + self.gaussian(self.voltage_noise_v))
    }
}

impl Router for SyntheticRig {
    fn select(&mut self, channel: &ChannelId) -> QcResult<()> {
        if self.unroutable.contains(channel) {
            return Err(QcError::Routing {
                channel: channel.to_string(),
                message: "mux did not acknowledge".to_string(),
            });
        }
        self.selected = Some(channel.clone());
        self.selections.push(channel.clone());
        Ok(())
    }
}
