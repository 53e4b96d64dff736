//! Command-line arguments and configuration layering.
//!
//! Values are resolved as network preset < JSON config file < flags and
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use genesis_core::config::parse_compact;
use genesis_core::hash::hash_from_display_hex;
use genesis_core::{GenesisConfig, Network};

/// Top-level command line.
#[derive(Debug, Parser)]
#[command(
    name = "genesis-miner",
    version = env!("CARGO_PKG_VERSION"),
    about = "Build and mine a proof-of-work genesis block",
    long_about = "Builds the coinbase transaction, merkle root and header of a genesis block \
                  and searches the nonce space until the header hash meets the compact target"
)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(short = 'l', long, env = "GENESIS_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mine a genesis block and print its chain parameters
    Mine {
        #[command(flatten)]
        genesis: GenesisArgs,

        /// Print a JSON report instead of the chain-parameters snippet
        #[arg(long)]
        json: bool,
    },

    /// Rebuild a genesis block with a known nonce and check its proof of work
    Verify {
        #[command(flatten)]
        genesis: GenesisArgs,

        /// Nonce to check
        #[arg(long)]
        nonce: u32,

        /// Hash the block is expected to have (display byte order)
        #[arg(long, value_name = "HEX")]
        expect_hash: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Decode a compact target and show its difficulty
    Target {
        /// Compact value, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_bits)]
        bits: u32,

        #[arg(long)]
        json: bool,
    },
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Genesis parameters shared by `mine` and `verify`.
#[derive(Debug, Clone, Default, Args)]
pub struct GenesisArgs {
    /// JSON configuration file
    #[arg(short = 'c', long, env = "GENESIS_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Network preset for the target, pow limit and subsidy
    #[arg(short = 'n', long, env = "GENESIS_NETWORK")]
    pub network: Option<Network>,

    /// Message embedded in the coinbase
    #[arg(short = 'm', long, env = "GENESIS_MESSAGE")]
    pub message: Option<String>,

    /// Coinbase value in the smallest unit
    #[arg(long, env = "GENESIS_REWARD", allow_hyphen_values = true)]
    pub reward: Option<i64>,

    /// Coinbase output script
    #[arg(short = 's', long, env = "GENESIS_SCRIPT", value_name = "HEX")]
    pub script: Option<String>,

    /// Header timestamp (Unix time)
    #[arg(long, env = "GENESIS_TIMESTAMP")]
    pub timestamp: Option<u32>,

    /// Compact difficulty target
    #[arg(short = 'b', long, env = "GENESIS_BITS", value_parser = parse_bits)]
    pub bits: Option<u32>,

    /// Header version
    #[arg(long)]
    pub block_version: Option<i32>,

    /// Previous block hash (display byte order)
    #[arg(long, value_name = "HEX")]
    pub prev_hash: Option<String>,

    /// Raw scriptSig bytes placed before the message
    #[arg(long, value_name = "HEX")]
    pub extra_data: Option<String>,

    /// Worker threads, 0 for one per CPU
    #[arg(short = 't', long, env = "GENESIS_THREADS")]
    pub threads: Option<usize>,

    /// Give up after this many seconds
    #[arg(long, env = "GENESIS_TIME_LIMIT", value_name = "SECONDS")]
    pub time_limit: Option<u64>,

    /// Timestamp increments allowed once the nonce space is exhausted
    #[arg(long)]
    pub timestamp_rolls: Option<u32>,

    /// Override the network's proof-of-work limit (compact)
    #[arg(long, value_parser = parse_bits)]
    pub pow_limit: Option<u32>,

    /// Seconds between progress lines
    #[arg(long, value_name = "SECONDS")]
    pub progress_interval: Option<u64>,
}

impl GenesisArgs {
    /// Build the effective configuration.
    pub fn resolve(&self) -> Result<GenesisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = load_config_file(path)?;
                if let Some(network) = self.network {
                    config.network = network;
                }
                config
            }
            None => self.preset()?,
        };

        if let Some(message) = &self.message {
            config.message = message.clone();
        }
        if let Some(reward) = self.reward {
            config.reward = reward;
        }
        if let Some(script) = &self.script {
            config.reward_output_script = decode_hex("script", script)?;
        }
        if let Some(timestamp) = self.timestamp {
            config.timestamp = timestamp;
        }
        if let Some(bits) = self.bits {
            config.compact_target = bits;
        }
        if let Some(version) = self.block_version {
            config.version = version;
        }
        if let Some(prev_hash) = &self.prev_hash {
            config.previous_hash =
                hash_from_display_hex(prev_hash).context("Invalid --prev-hash")?;
        }
        if let Some(extra_data) = &self.extra_data {
            config.extra_data = Some(decode_hex("extra-data", extra_data)?);
        }
        if let Some(threads) = self.threads {
            config.thread_count = if threads == 0 { num_cpus::get() } else { threads };
        }
        if let Some(limit) = self.time_limit {
            config.time_limit_seconds = Some(limit);
        }
        if let Some(rolls) = self.timestamp_rolls {
            config.max_timestamp_rolls = rolls;
        }
        if let Some(limit) = self.pow_limit {
            config.pow_limit = Some(limit);
        }
        if let Some(interval) = self.progress_interval {
            config.progress_interval_seconds = interval;
        }

        config.validate().context("Invalid genesis configuration")?;
        Ok(config)
    }

    /// Defaults of the selected network, with the required fields from flags.
    fn preset(&self) -> Result<GenesisConfig> {
        let Some(message) = &self.message else {
            bail!("--message is required without --config");
        };
        let Some(script) = &self.script else {
            bail!("--script is required without --config");
        };
        let Some(timestamp) = self.timestamp else {
            bail!("--timestamp is required without --config");
        };

        Ok(GenesisConfig::for_network(
            self.network.unwrap_or_default(),
            message.clone(),
            decode_hex("script", script)?,
            timestamp,
        ))
    }
}

fn load_config_file(path: &Path) -> Result<GenesisConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(value).with_context(|| format!("Invalid hex in --{field}"))
}

fn parse_bits(value: &str) -> genesis_core::Result<u32> {
    parse_compact(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn genesis_args(cli: Cli) -> GenesisArgs {
        match cli.command {
            Command::Mine { genesis, .. } | Command::Verify { genesis, .. } => genesis,
            Command::Target { .. } => panic!("no genesis arguments"),
        }
    }

    #[test]
    fn test_preset_from_flags() {
        let cli = parse(&[
            "genesis-miner",
            "mine",
            "--network",
            "regtest",
            "--message",
            "test-genesis",
            "--script",
            "6a",
            "--timestamp",
            "1700000000",
        ]);
        let config = genesis_args(cli).resolve().unwrap();

        assert_eq!(config.network, Network::Regtest);
        assert_eq!(config.compact_target, 0x207fffff);
        assert_eq!(config.reward, 5_000_000_000);
        assert_eq!(config.reward_output_script, vec![0x6a]);
        assert_eq!(config.thread_count, 1);
    }

    #[test]
    fn test_preset_requires_message() {
        let cli = parse(&["genesis-miner", "mine", "--script", "6a", "--timestamp", "1"]);
        let err = genesis_args(cli).resolve().unwrap_err();
        assert!(err.to_string().contains("--message"));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "message": "from-file",
                "reward": 100,
                "rewardOutputScript": "51",
                "timestamp": 1600000000,
                "compactTarget": "0x207fffff",
                "threadCount": 2,
                "network": "regtest"
            }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = parse(&[
            "genesis-miner",
            "verify",
            "--config",
            path,
            "--nonce",
            "2",
            "--message",
            "from-flag",
            "--threads",
            "0",
            "--bits",
            "0x2000ffff",
        ]);
        let config = genesis_args(cli).resolve().unwrap();

        assert_eq!(config.message, "from-flag");
        assert_eq!(config.reward, 100);
        assert_eq!(config.reward_output_script, vec![0x51]);
        assert_eq!(config.timestamp, 1600000000);
        assert_eq!(config.compact_target, 0x2000ffff);
        assert_eq!(config.thread_count, num_cpus::get());
    }

    #[test]
    fn test_invalid_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let args = GenesisArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_rejects_target_above_network_limit() {
        let args = GenesisArgs {
            network: Some(Network::Main),
            message: Some("m".into()),
            script: Some("6a".into()),
            timestamp: Some(1),
            bits: Some(0x207fffff),
            ..Default::default()
        };
        assert!(args.resolve().is_err());
    }

    #[test]
    fn test_negative_reward_flag_is_accepted_by_parser() {
        let cli = parse(&["genesis-miner", "mine", "--reward", "-5"]);
        assert_eq!(genesis_args(cli).reward, Some(-5));
    }

    #[test]
    fn test_target_command() {
        let cli = parse(&["genesis-miner", "--log-level", "debug", "target", "0x1d00ffff"]);
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(cli.command, Command::Target { bits: 0x1d00ffff, json: false }));
        assert!(Cli::try_parse_from(["genesis-miner", "target", "0xzz"]).is_err());
    }
}
