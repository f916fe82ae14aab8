//! Acquisition-to-verdict pipeline for SCB quality control.
//!
//! rtd → converter → sweep → metrics → run (combined table + artifacts)

pub mod artifacts;
pub mod channels;
pub mod combined;
pub mod converter;
pub mod instrument;
pub mod metrics;
pub mod rtd;
pub mod run;
pub mod sweep;
