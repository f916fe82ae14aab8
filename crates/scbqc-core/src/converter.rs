// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Channel Converter
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Raw (current, voltage) readings → (SCB, VRB) temperature estimates.
//!
//! VRB path: `r = (1000·Vref) / I[µA] · 1000`.
//! SCB path: `r = Rv / (V / Vref − 1)`.

use crate::rtd::RtdSolver;
use scbqc_types::config::{Calibration, RtdCurve};

/// Converts one sample pair using run-level calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    calibration: Calibration,
    solver: RtdSolver,
}

impl Default for Converter {
    fn default() -> Self {
        Converter::new(Calibration::default(), RtdCurve::default())
    }
}

impl Converter {
    pub fn new(calibration: Calibration, curve: RtdCurve) -> Self {
        Self {
            calibration,
            solver: RtdSolver::new(curve),
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn solver(&self) -> &RtdSolver {
        &self.solver
    }

    /// Reference-path resistance (Ω) from the loop current (µA).
    pub fn vrb_resistance(&self, current_ua: f64) -> Option<f64> {
        if current_ua == 0.0 || !current_ua.is_finite() {
            return None;
        }
        finite((1000.0 * self.calibration.vref_v) / current_ua * 1000.0)
    }

    /// SCB sensor resistance (Ω) from the divider voltage (V).
    pub fn scb_resistance(&self, voltage_scb: f64) -> Option<f64> {
        if !voltage_scb.is_finite() {
            return None;
        }
        let ratio = voltage_scb / self.calibration.vref_v - 1.0;
        if ratio == 0.0 {
            return None;
        }
        finite(self.calibration.rv_ohm / ratio)
    }

    /// Returns `(temperature_scb, temperature_vrb)` in °C.
    pub fn convert(&self, current_ua: f64, voltage_scb: f64) -> (Option<f64>, Option<f64>) {
        let temp_vrb = self
            .vrb_resistance(current_ua)
            .and_then(|r| self.solver.solve_temperature(r));
        let temp_scb = self
            .scb_resistance(voltage_scb)
            .and_then(|r| self.solver.solve_temperature(r));
        (temp_scb, temp_vrb)
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// [`Converter::convert`] as a free function.
pub fn convert(
    current_ua: f64,
    voltage_scb: f64,
    calibration: &Calibration,
    curve: &RtdCurve,
) -> (Option<f64>, Option<f64>) {
    Converter::new(*calibration, *curve).convert(current_ua, voltage_scb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_readings_are_zero_celsius() {
        let conv = Converter::default();
        let vref = conv.calibration().vref_v;
        // 1000·Vref/I·1000 = 10 kΩ  ⇔  I = Vref·100 µA
        let current = vref * 100.0;
        // Rv / (V/Vref − 1) = 10 kΩ  ⇔  V = 1.1·Vref
        let voltage = vref * 1.1;
        assert!((conv.vrb_resistance(current).unwrap() - 10_000.0).abs() < 1e-6);
        assert!((conv.scb_resistance(voltage).unwrap() - 10_000.0).abs() < 1e-6);
        let (scb, vrb) = conv.convert(current, voltage);
        assert!(scb.unwrap().abs() < 1e-6);
        assert!(vrb.unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_paths_are_independent() {
        let conv = Converter::default();
        let curve = RtdCurve::default();
        let vref = conv.calibration().vref_v;
        let r_vrb = curve.resistance_at(40.0);
        let r_scb = curve.resistance_at(38.5);
        let current = 1000.0 * vref / r_vrb * 1000.0;
        let voltage = vref * (1.0 + 1000.0 / r_scb);
        let (scb, vrb) = conv.convert(current, voltage);
        assert!((vrb.unwrap() - 40.0).abs() < 1e-6);
        assert!((scb.unwrap() - 38.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_current_is_absent() {
        let conv = Converter::default();
        let (scb, vrb) = conv.convert(0.0, 0.879);
        assert!(vrb.is_none());
        assert!(scb.is_some());
    }

    #[test]
    fn test_voltage_equal_to_vref_is_absent() {
        let conv = Converter::default();
        let vref = conv.calibration().vref_v;
        let (scb, vrb) = conv.convert(79.932, vref);
        assert!(scb.is_none());
        assert!(vrb.is_some());
    }

    #[test]
    fn test_voltage_below_vref_is_absent() {
        // Negative divider ratio → negative resistance → no temperature
        let conv = Converter::default();
        assert!(conv.scb_resistance(0.5).unwrap() < 0.0);
        assert!(conv.convert(79.932, 0.5).0.is_none());
    }

    #[test]
    fn test_non_finite_readings_are_absent() {
        let conv = Converter::default();
        assert_eq!(conv.convert(f64::NAN, f64::INFINITY), (None, None));
    }

    #[test]
    fn test_calibration_changes_result() {
        let curve = RtdCurve::default();
        let a = convert(80.0, 0.88, &Calibration::default(), &curve);
        let b = convert(
            80.0,
            0.88,
            &Calibration {
                rv_ohm: 1000.0,
                vref_v: 0.8,
            },
            &curve,
        );
        assert_ne!(a, b);
    }
}
