//! genesis-miner: build and mine proof-of-work genesis blocks.

mod cli;
mod report;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use genesis_core::hash::{hash_from_display_hex, hash_to_display_hex};
use genesis_core::{decode_compact, meets_target, Miner, TracingObserver};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Command, GenesisArgs};
use crate::report::{MinedReport, TargetReport, VerifyReport};

/// Exit code when the search ends without a block.
const EXIT_NOT_FOUND: u8 = 2;

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Success,
    /// `verify` found a block that fails its checks.
    Invalid,
    /// The nonce search was exhausted or ran out of time.
    NotFound,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Invalid => ExitCode::FAILURE,
            Status::NotFound => ExitCode::from(EXIT_NOT_FOUND),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let status = match &cli.command {
        Command::Mine { genesis, json } => run_mine(genesis, *json),
        Command::Verify {
            genesis,
            nonce,
            expect_hash,
            json,
        } => run_verify(genesis, *nonce, expect_hash.as_deref(), *json),
        Command::Target { bits, json } => run_target(*bits, *json),
    }?;

    Ok(status.into())
}

fn run_mine(args: &GenesisArgs, json: bool) -> Result<Status> {
    let config = args.resolve()?;
    let template = config.template().context("Failed to build genesis template")?;

    info!("Genesis message: {}", config.message);
    info!("Merkle root: {}", hash_to_display_hex(&template.header.merkle_root));

    let miner = Miner::from_config(&config).with_observer(Arc::new(TracingObserver));

    match miner.mine_with_stats(&template) {
        Ok((block, stats)) => {
            let report = MinedReport::new(&config, &block, &stats);
            if json {
                print_json(&report)?;
            } else {
                print!("{report}");
            }
            Ok(Status::Success)
        }
        Err(e) if e.is_recoverable() => {
            error!("{}", e);
            eprintln!("Failed to find a valid nonce. Try adjusting the timestamp or difficulty.");
            Ok(Status::NotFound)
        }
        Err(e) => Err(e).context("Mining failed"),
    }
}

fn run_verify(
    args: &GenesisArgs,
    nonce: u32,
    expect_hash: Option<&str>,
    json: bool,
) -> Result<Status> {
    let report = verify_block(args, nonce, expect_hash)?;

    if json {
        print_json(&report)?;
    } else {
        print!("{report}");
    }

    Ok(if report.is_valid() {
        Status::Success
    } else {
        Status::Invalid
    })
}

/// Rebuild the configured block with `nonce` and recompute its hash.
fn verify_block(args: &GenesisArgs, nonce: u32, expect_hash: Option<&str>) -> Result<VerifyReport> {
    let config = args.resolve()?;
    let template = config.template().context("Failed to build genesis template")?;

    let mut header = template.header;
    header.nonce = nonce;
    let hash = header.hash();

    let matches_expected = expect_hash
        .map(|expected| hash_from_display_hex(expected).map(|expected| expected == hash))
        .transpose()
        .context("Invalid --expect-hash")?;

    Ok(VerifyReport {
        hash: hash_to_display_hex(&hash),
        merkle_root: hash_to_display_hex(&header.merkle_root),
        nonce,
        target: template.target.to_hex(),
        meets_target: meets_target(&hash, &template.target),
        matches_expected,
    })
}

fn run_target(bits: u32, json: bool) -> Result<Status> {
    let target = decode_compact(bits).with_context(|| format!("Cannot decode {bits:#010x}"))?;
    let report = TargetReport::new(bits, &target);

    if json {
        print_json(&report)?;
    } else {
        print!("{report}");
    }
    Ok(Status::Success)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGTEST_HASH: &str = "42e10465f8a014b7dec6e1a784027aed35cc950517a6f2344e942abdea2698e0";

    fn regtest_args() -> GenesisArgs {
        GenesisArgs {
            network: Some(genesis_core::Network::Regtest),
            message: Some("test-genesis".into()),
            script: Some("6a".into()),
            timestamp: Some(1700000000),
            ..Default::default()
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(format!("{:?}", ExitCode::from(Status::Success)), format!("{:?}", ExitCode::SUCCESS));
        assert_eq!(format!("{:?}", ExitCode::from(Status::Invalid)), format!("{:?}", ExitCode::FAILURE));
        assert_eq!(
            format!("{:?}", ExitCode::from(Status::NotFound)),
            format!("{:?}", ExitCode::from(EXIT_NOT_FOUND))
        );
    }

    #[test]
    fn test_mine_unreachable_target_is_not_found() {
        let args = GenesisArgs {
            bits: Some(0x03000001),
            time_limit: Some(1),
            ..regtest_args()
        };
        assert_eq!(run_mine(&args, true).unwrap(), Status::NotFound);
    }

    #[test]
    fn test_mine_regtest() {
        assert_eq!(run_mine(&regtest_args(), true).unwrap(), Status::Success);
    }

    #[test]
    fn test_verify_known_nonce() {
        let report = verify_block(&regtest_args(), 2, Some(REGTEST_HASH)).unwrap();
        assert_eq!(report.hash, REGTEST_HASH);
        assert!(report.meets_target);
        assert_eq!(report.matches_expected, Some(true));
        assert_eq!(run_verify(&regtest_args(), 2, Some(REGTEST_HASH), false).unwrap(), Status::Success);
    }

    #[test]
    fn test_verify_rejects_wrong_nonce_or_hash() {
        // Nonces 0 and 1 miss the regtest target; 2 is the first hit.
        let report = verify_block(&regtest_args(), 1, None).unwrap();
        assert!(!report.meets_target);
        assert_eq!(report.matches_expected, None);
        assert_eq!(run_verify(&regtest_args(), 1, None, false).unwrap(), Status::Invalid);

        let wrong = "00".repeat(32);
        let report = verify_block(&regtest_args(), 2, Some(&wrong)).unwrap();
        assert!(report.meets_target);
        assert_eq!(report.matches_expected, Some(false));
        assert_eq!(run_verify(&regtest_args(), 2, Some(&wrong), true).unwrap(), Status::Invalid);
    }

    #[test]
    fn test_verify_malformed_expected_hash() {
        let err = verify_block(&regtest_args(), 2, Some("abcd")).unwrap_err();
        assert!(err.to_string().contains("--expect-hash"));
    }

    #[test]
    fn test_target_rejects_negative_bits() {
        assert!(run_target(0x04923456, false).is_err());
        assert_eq!(run_target(0x1d00ffff, true).unwrap(), Status::Success);
    }
}
