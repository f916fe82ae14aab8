// ─────────────────────────────────────────────────────────────────────
// SCB QC Rig — Command-Line Runner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Runs the full QC pipeline over the 24-channel board on the synthetic rig.
//!
//! ```text
//! scbqc <test_name> <base_dir> <threshold_c>
//! scbqc --config <run.json>
//! ```
//!
//! `RUST_LOG` controls verbosity (default `info`).

use anyhow::{bail, Context, Result};
use scbqc_core::channels::ChannelMap;
use scbqc_core::instrument::{ScbChannelError, SyntheticRig};
use scbqc_core::run::{run_test, ChannelStatus, RunResult, RunSession};
use scbqc_types::config::RunConfig;
use scbqc_types::state::ChannelId;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: scbqc <test_name> <base_dir> <threshold_c>
       scbqc --config <run.json>";

fn parse_args(args: &[String]) -> Result<RunConfig> {
    match args {
        [flag, path] if flag == "--config" => RunConfig::from_file(path)
            .with_context(|| format!("loading run config from {path}")),
        [name, base, threshold] => {
            let threshold_c: f64 = threshold
                .parse()
                .with_context(|| format!("threshold '{threshold}' is not a number"))?;
            let mut config = RunConfig::new(name.as_str(), base.as_str(), threshold_c);
            // no hardware to settle
            config.sweep.settle_s = 0.0;
            config.validate()?;
            Ok(config)
        }
        _ => bail!("{USAGE}"),
    }
}

/// Synthetic bench with realistic noise and a few out-of-tolerance channels.
fn synthetic_bench(config: &RunConfig) -> SyntheticRig {
    SyntheticRig::new(config.calibration, config.curve, &config.sweep)
        .with_temperature_ramp(-10.0, 90.0)
        .with_noise(0.02, 5e-5)
        .with_channel_error(
            ChannelId::from("PTA7"),
            ScbChannelError {
                gain: 0.004,
                offset_c: 0.1,
            },
        )
        .with_channel_error(
            ChannelId::from("PTB11"),
            ScbChannelError {
                gain: 0.0,
                offset_c: -1.2,
            },
        )
        .with_fault_probability(0.002)
}

fn print_report(result: &RunResult) {
    println!();
    println!(
        "{:<8} {:<10} {:>7} {:>7} {:>9} {:>9} {:>7}",
        "Channel", "Status", "Samples", "Dropped", "Mean °C", "RMSE °C", "Verdict"
    );
    for record in result.records.values() {
        let status = match record.status() {
            ChannelStatus::Succeeded => "ok",
            ChannelStatus::Partial => "partial",
            ChannelStatus::Failed => "FAILED",
        };
        match record.metrics() {
            Some(m) => println!(
                "{:<8} {:<10} {:>7} {:>7} {:>9.3} {:>9.3} {:>7}",
                record.channel,
                status,
                record.series.len(),
                record.faults.len(),
                m.mean_error,
                m.rmse,
                m.verdict
            ),
            None => println!(
                "{:<8} {:<10} {:>7} {:>7} {:>9} {:>9} {:>7}",
                record.channel,
                status,
                record.series.len(),
                record.faults.len(),
                "-",
                "-",
                "-"
            ),
        }
    }
    println!();
    println!("Artifacts: {}", result.run_dir.display());
}

/// `RUST_LOG` directives when set and valid, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = parse_args(&args)?;

    let map = ChannelMap::standard();
    let channels = map.channels();
    let mut bench = synthetic_bench(&config);
    let session = RunSession::new();

    info!(channels = channels.len(), "starting synthetic run");
    let result = run_test(&session, &config, &channels, &mut bench)
        .with_context(|| format!("run '{}' failed", config.test_name))?;
    print_report(&result);

    if !result.all_passed() || !result.failed_channels().is_empty() {
        std::process::exit(2);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positional_args() {
        let cfg = parse_args(&args(&["lot7", "/tmp", "0.25"])).unwrap();
        assert_eq!(cfg.test_name, "lot7");
        assert_eq!(cfg.threshold_c, 0.25);
        assert_eq!(cfg.sweep.settle_s, 0.0);
    }

    #[test]
    fn test_log_filter_honours_env_level() {
        use tracing::level_filters::LevelFilter;
        let debug = log_filter(Some("debug".to_string()));
        assert_eq!(debug.max_level_hint(), Some(LevelFilter::DEBUG));
        let fallback = log_filter(None);
        assert_eq!(fallback.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_bad_args() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["lot7", "/tmp", "abc"])).is_err());
        assert!(parse_args(&args(&["lot7", "/tmp", "-1"])).is_err());
        assert!(parse_args(&args(&["--config", "/definitely/missing.json"])).is_err());
    }
}
