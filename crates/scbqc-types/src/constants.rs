// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Nominal resistance of the PT10000 reference sensor at 0 °C (Ω).
pub const RTD_R0: f64 = 10_000.0;

/// Callendar–Van Dusen coefficient A (1/°C).
pub const RTD_A: f64 = 3.9083e-3;

/// Callendar–Van Dusen coefficient B (1/°C²).
pub const RTD_B: f64 = -5.775e-7;

/// Callendar–Van Dusen coefficient C (1/°C⁴), only active below 0 °C.
pub const RTD_C: f64 = -4.183e-12;

/// Lower bound of the calibrated sensor range (°C).
pub const RTD_T_MIN: f64 = -200.0;

/// Upper bound of the calibrated sensor range (°C).
pub const RTD_T_MAX: f64 = 850.0;

/// Series resistor of the SCB excitation divider (Ω).
pub const DEFAULT_RV_OHM: f64 = 1000.0;

/// Reference voltage of the SCB front end and VRB gain (V).
/// NOTE: older bench scripts carried other values; this one matches the acquisition script.
pub const DEFAULT_VREF_V: f64 = 0.79932;

/// Sweep start (V).
pub const DEFAULT_SWEEP_START_V: f64 = 3.286;

/// Sweep end, inclusive (V).
pub const DEFAULT_SWEEP_END_V: f64 = 7.586;

/// Sweep increment (V).
pub const DEFAULT_SWEEP_STEP_V: f64 = 0.080;

/// Settle delay between commanding the source and reading (s).
pub const DEFAULT_SETTLE_S: f64 = 1.5;

/// Tolerance used when deciding whether the final sweep point is still inside the range (V).
pub const SWEEP_END_TOLERANCE_V: f64 = 1e-9;

/// Upper bound on the points of one channel sweep.
pub const MAX_SWEEP_POINTS: usize = 1_000_000;

/// File name of the cross-channel delta table inside a run directory.
pub const COMBINED_DELTAS_FILE: &str = "combined_deltas.csv";

/// File name of the run summary inside a run directory.
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";
