//! Mathematical primitives for the SCB QC rig.

pub mod poly;
pub mod stats;
