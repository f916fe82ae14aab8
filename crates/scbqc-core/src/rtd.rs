// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Resistance–Temperature Solver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inversion of the Callendar–Van Dusen curve of the PT10000 reference.
//!
//! Below `R0` the curve is the quartic
//! `C·R0·T⁴ − 100·C·R0·T³ + B·R0·T² + A·R0·T + (R0 − r) = 0`,
//! at or above `R0` the quadratic `B·R0·T² + A·R0·T + (R0 − r) = 0`.
//!
//! Both polynomials have spurious real roots far outside the sensor range
//! (around +1000 °C for the quartic, +6700 °C for the quadratic), where the
//! curve is already falling. The solver keeps only roots on the rising
//! branch (dR/dT > 0) and, among those, the one nearest the linear estimate
//! `(r − R0) / (A·R0)`.

use scbqc_math::poly::{eval_with_derivative, real_roots, REAL_ROOT_TOL};
use scbqc_types::config::RtdCurve;

/// Resistance → temperature inversion for one sensor curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RtdSolver {
    curve: RtdCurve,
}

impl Default for RtdSolver {
    fn default() -> Self {
        RtdSolver::new(RtdCurve::default())
    }
}

impl RtdSolver {
    pub fn new(curve: RtdCurve) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> &RtdCurve {
        &self.curve
    }

    /// Coefficients (highest degree first) of `R(T) − r` on the branch that `r` selects.
    pub fn branch_coefficients(&self, resistance: f64) -> Vec<f64> {
        let RtdCurve { r0, a, b, c } = self.curve;
        if resistance < r0 {
            vec![c * r0, -100.0 * c * r0, b * r0, a * r0, r0 - resistance]
        } else {
            vec![b * r0, a * r0, r0 - resistance]
        }
    }

    /// Every real root of the branch polynomial, ascending.
    pub fn candidate_temperatures(&self, resistance: f64) -> Vec<f64> {
        if !resistance.is_finite() {
            return Vec::new();
        }
        real_roots(&self.branch_coefficients(resistance), REAL_ROOT_TOL)
    }

    /// Temperature (°C) for a measured resistance (Ω).
    ///
    /// `None` when the resistance is non-finite or non-positive, or when the
    /// branch polynomial has no real root on the rising part of the curve.
    pub fn solve_temperature(&self, resistance: f64) -> Option<f64> {
        if !resistance.is_finite() || resistance <= 0.0 {
            return None;
        }
        let coeffs = self.branch_coefficients(resistance);
        let linear_guess = if self.curve.a != 0.0 {
            (resistance - self.curve.r0) / (self.curve.a * self.curve.r0)
        } else {
            0.0
        };

        real_roots(&coeffs, REAL_ROOT_TOL)
            .into_iter()
            .filter(|&t| eval_with_derivative(&coeffs, t).1 > 0.0)
            .min_by(|x, y| {
                (x - linear_guess)
                    .abs()
                    .total_cmp(&(y - linear_guess).abs())
            })
    }
}

/// [`RtdSolver::solve_temperature`] with the standard PT10000 curve.
pub fn solve_temperature(resistance: f64) -> Option<f64> {
    RtdSolver::default().solve_temperature(resistance)
}
