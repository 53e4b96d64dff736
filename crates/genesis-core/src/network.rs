//! Network presets and consensus constants for genesis blocks.

use alloc::format;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::difficulty::Target;
use crate::error::Error;

/// Smallest-unit amount of one coin.
pub const COIN: u64 = 100_000_000;

/// Header version used by genesis blocks.
pub const GENESIS_BLOCK_VERSION: i32 = 1;

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Maximum size of the arbitrary payload in a coinbase scriptSig.
pub const MAX_COINBASE_SCRIPTSIG_SIZE: usize = 100;

/// Maximum size of an output script.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Network preset the genesis block is mined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production parameters.
    #[default]
    Main,
    /// Public test network, same limit as main.
    Test,
    /// Local regression testing with a trivially easy target.
    Regtest,
}

impl Network {
    /// Compact target a fresh genesis block is mined at.
    pub fn genesis_bits(&self) -> u32 {
        match self {
            Network::Main | Network::Test => 0x1d00ffff,
            Network::Regtest => 0x207fffff,
        }
    }

    /// Easiest target the network accepts.
    pub fn pow_limit(&self) -> Target {
        let mut limit = [0xffu8; 32];
        match self {
            Network::Main | Network::Test => limit[..4].fill(0),
            Network::Regtest => limit[0] = 0x7f,
        }
        Target::from_be_bytes(limit)
    }

    /// Coinbase value of the genesis block.
    pub fn genesis_subsidy(&self) -> u64 {
        50 * COIN
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(Error::config(format!("unknown network '{other}'"))),
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}
