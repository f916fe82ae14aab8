// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Sweep Controller
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Voltage ramp over one already-routed channel.
//!
//! Setpoints are `start + i·step` (no accumulated rounding), end inclusive.
//! A faulted step is logged, recorded and skipped; it never ends the sweep.

use crate::converter::Converter;
use crate::instrument::Instrument;
use scbqc_types::config::SweepParams;
use scbqc_types::error::{QcError, QcResult};
use scbqc_types::state::{ChannelId, ChannelSeries, Sample, StepFault};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Series plus the steps that were dropped on the way.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub series: ChannelSeries,
    pub faults: Vec<StepFault>,
    pub elapsed: Duration,
}

impl SweepOutcome {
    /// Steps attempted, kept or not.
    pub fn attempted_steps(&self) -> usize {
        self.series.len() + self.faults.len()
    }
}

/// Setpoints visited by a sweep, produced lazily.
pub fn sweep_voltages(params: &SweepParams) -> impl Iterator<Item = f64> {
    let SweepParams { start_v, step_v, .. } = *params;
    (0..params.step_count()).map(move |i| start_v + i as f64 * step_v)
}

/// One step: command, settle, read current then voltage, convert.
fn measure_step<I: Instrument + ?Sized>(
    instrument: &mut I,
    converter: &Converter,
    volts: f64,
    settle: Duration,
) -> QcResult<Sample> {
    instrument.set_source_voltage(volts)?;
    if !settle.is_zero() {
        thread::sleep(settle);
    }
    let current = instrument.read_current()?;
    let voltage_scb = instrument.read_voltage()?;
    if !current.is_finite() || !voltage_scb.is_finite() {
        return Err(QcError::MeasurementFault {
            voltage: volts,
            message: format!("non-finite reading: current={current}, voltage={voltage_scb}"),
        });
    }

    let (temperature_scb, temperature_vrb) = converter.convert(current, voltage_scb);
    Ok(Sample {
        source_voltage: volts,
        measured_current: current,
        measured_voltage_scb: voltage_scb,
        temperature_scb,
        temperature_vrb,
    })
}

/// Ramp the source over `params` and collect one sample per healthy step.
///
/// The channel must already be routed. Only invalid sweep parameters are an
/// error; instrument faults end up in [`SweepOutcome::faults`].
pub fn sweep<I: Instrument + ?Sized>(
    channel: &ChannelId,
    params: &SweepParams,
    instrument: &mut I,
    converter: &Converter,
) -> QcResult<SweepOutcome> {
    params.validate()?;
    let settle = Duration::try_from_secs_f64(params.settle_s)
        .map_err(|e| QcError::ConfigError(format!("sweep settle_s: {e}")))?;
    let started = Instant::now();

    let mut series = ChannelSeries::new(channel.clone());
    let mut faults = Vec::new();

    for volts in sweep_voltages(params) {
        match measure_step(instrument, converter, volts, settle) {
            Ok(sample) => {
                debug!(
                    channel = %channel,
                    volts,
                    current_ua = sample.measured_current,
                    voltage_scb = sample.measured_voltage_scb,
                    temp_scb = ?sample.temperature_scb,
                    temp_vrb = ?sample.temperature_vrb,
                    "sample"
                );
                series.push(sample);
            }
            Err(err) => {
                warn!(channel = %channel, volts, error = %err, "skipping sweep step");
                faults.push(StepFault {
                    source_voltage: volts,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(SweepOutcome {
        series,
        faults,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{Router, SyntheticRig};
    use scbqc_types::config::{Calibration, RtdCurve};

    fn params(start: f64, end: f64, step: f64) -> SweepParams {
        SweepParams {
            start_v: start,
            end_v: end,
            step_v: step,
            settle_s: 0.0,
        }
    }

    fn rig(p: &SweepParams) -> SyntheticRig {
        SyntheticRig::new(Calibration::default(), RtdCurve::default(), p)
    }

    #[test]
    fn test_setpoints_are_exact_and_end_inclusive() {
        let v: Vec<f64> = sweep_voltages(&params(3.0, 4.0, 0.5)).collect();
        assert_eq!(v, vec![3.0, 3.5, 4.0]);
        let v: Vec<f64> = sweep_voltages(&params(0.0, 1.0, 0.1)).collect();
        assert_eq!(v.len(), 11);
        assert!((v[10] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_collects_every_step() {
        let p = params(3.0, 4.0, 0.5);
        let mut rig = rig(&p);
        let ch = ChannelId::from("PTA1");
        rig.select(&ch).unwrap();
        let out = sweep(&ch, &p, &mut rig, &Converter::default()).unwrap();
        let volts: Vec<f64> = out.series.samples.iter().map(|s| s.source_voltage).collect();
        assert_eq!(volts, vec![3.0, 3.5, 4.0]);
        assert!(out.faults.is_empty());
        assert!(out
            .series
            .samples
            .iter()
            .all(|s| s.temperature_scb.is_some() && s.temperature_vrb.is_some()));
    }

    #[test]
    fn test_faulted_step_is_dropped_not_zero_filled() {
        let p = params(3.0, 5.0, 0.5);
        let mut rig = rig(&p).with_faulty_voltage(4.0);
        let ch = ChannelId::from("PTB2");
        rig.select(&ch).unwrap();
        let out = sweep(&ch, &p, &mut rig, &Converter::default()).unwrap();
        let volts: Vec<f64> = out.series.samples.iter().map(|s| s.source_voltage).collect();
        assert_eq!(volts, vec![3.0, 3.5, 4.5, 5.0]);
        assert_eq!(out.faults.len(), 1);
        assert_eq!(out.faults[0].source_voltage, 4.0);
        assert!(out.faults[0].message.contains("meter timeout"));
        assert_eq!(out.attempted_steps(), 5);
    }

    #[test]
    fn test_every_step_faulting_still_returns() {
        let p = params(3.0, 4.0, 0.5);
        let mut rig = rig(&p).with_fault_probability(1.0);
        let ch = ChannelId::from("PTA3");
        let out = sweep(&ch, &p, &mut rig, &Converter::default()).unwrap();
        assert!(out.series.is_empty());
        assert_eq!(out.faults.len(), 3);
    }

    #[test]
    fn test_invalid_params_rejected_before_instrument_use() {
        let p = params(4.0, 3.0, 0.5);
        let mut rig = rig(&params(3.0, 4.0, 0.5));
        let ch = ChannelId::from("PTA1");
        let err = sweep(&ch, &p, &mut rig, &Converter::default()).unwrap_err();
        assert!(matches!(err, QcError::ConfigError(_)));
    }

    #[test]
    fn test_oversized_sweep_fails_before_instrument_use() {
        let mut rig = rig(&params(3.0, 4.0, 0.5));
        let ch = ChannelId::from("PTA1");
        for p in [
            params(0.0, 1e300, 1e-10),
            SweepParams {
                settle_s: 1e20,
                ..params(3.0, 4.0, 0.5)
            },
        ] {
            let err = sweep(&ch, &p, &mut rig, &Converter::default()).unwrap_err();
            assert!(matches!(err, QcError::ConfigError(_)));
        }
        // nothing was commanded: reading now still faults
        assert!(rig.read_current().is_err());
    }

    struct NanMeter;

    impl Instrument for NanMeter {
        fn set_source_voltage(&mut self, _volts: f64) -> QcResult<()> {
            Ok(())
        }
        fn read_current(&mut self) -> QcResult<f64> {
            Ok(f64::NAN)
        }
        fn read_voltage(&mut self) -> QcResult<f64> {
            Ok(0.88)
        }
    }

    #[test]
    fn test_non_finite_reading_is_a_fault() {
        let p = params(3.0, 3.0, 0.5);
        let ch = ChannelId::from("PTA1");
        let out = sweep(&ch, &p, &mut NanMeter, &Converter::default()).unwrap();
        assert!(out.series.is_empty());
        assert_eq!(out.faults.len(), 1);
    }
}
