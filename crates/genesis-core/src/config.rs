//! Genesis parameters as an explicit, serializable configuration record.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::block::GenesisTemplate;
use crate::coinbase::{genesis_extra_data, CoinbaseBuilder};
use crate::difficulty::{decode_compact, derive_target, Target};
use crate::error::{Error, Result};
use crate::hash::{DoubleSha256, PowHasher};
use crate::network::{Network, GENESIS_BLOCK_VERSION};

/// Every input of a genesis mining run.
///
/// Byte fields are hex strings in JSON; `previousHash` is in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenesisConfig {
    /// Message embedded in the coinbase scriptSig.
    pub message: String,
    /// Coinbase value in the smallest unit.
    pub reward: i64,
    /// Locking script of the coinbase output.
    #[serde(with = "hex_bytes")]
    pub reward_output_script: Vec<u8>,
    /// Header timestamp (Unix time).
    pub timestamp: u32,
    /// Compact difficulty target.
    #[serde(with = "compact")]
    pub compact_target: u32,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default, with = "display_hash")]
    pub previous_hash: [u8; 32],
    /// Worker threads for the nonce search.
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,
    #[serde(default)]
    pub time_limit_seconds: Option<u64>,
    /// Raw scriptSig bytes before the message; defaults to the genesis prefix.
    #[serde(default, with = "opt_hex_bytes", skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Vec<u8>>,
    /// Extended search: how many times the timestamp may be advanced.
    #[serde(default)]
    pub max_timestamp_rolls: u32,
    #[serde(default)]
    pub network: Network,
    /// Override of the network's proof-of-work limit, as a compact value.
    #[serde(default, with = "opt_compact", skip_serializing_if = "Option::is_none")]
    pub pow_limit: Option<u32>,
    #[serde(default = "default_progress_interval")]
    pub progress_interval_seconds: u64,
}

fn default_version() -> i32 {
    GENESIS_BLOCK_VERSION
}

fn default_thread_count() -> usize {
    1
}

fn default_progress_interval() -> u64 {
    10
}

impl GenesisConfig {
    /// A configuration using the preset values of `network`.
    pub fn for_network(
        network: Network,
        message: impl Into<String>,
        reward_output_script: Vec<u8>,
        timestamp: u32,
    ) -> Self {
        GenesisConfig {
            message: message.into(),
            reward: network.genesis_subsidy() as i64,
            reward_output_script,
            timestamp,
            compact_target: network.genesis_bits(),
            version: default_version(),
            previous_hash: [0u8; 32],
            thread_count: default_thread_count(),
            time_limit_seconds: None,
            extra_data: None,
            max_timestamp_rolls: 0,
            network,
            pow_limit: None,
            progress_interval_seconds: default_progress_interval(),
        }
    }

    /// The limit `compact_target` is checked against.
    pub fn pow_limit(&self) -> Result<Target> {
        match self.pow_limit {
            Some(bits) => decode_compact(bits),
            None => Ok(self.network.pow_limit()),
        }
    }

    /// The scriptSig prefix that will be used.
    pub fn effective_extra_data(&self) -> Vec<u8> {
        match &self.extra_data {
            Some(data) => data.clone(),
            None => genesis_extra_data(self.compact_target),
        }
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_seconds.map(Duration::from_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_seconds.max(1))
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<Target> {
        if self.thread_count == 0 {
            return Err(Error::config("threadCount must be at least 1"));
        }
        if self.time_limit_seconds == Some(0) {
            return Err(Error::config("timeLimitSeconds must be positive when set"));
        }
        derive_target(self.compact_target, &self.pow_limit()?)
    }

    pub fn coinbase_builder(&self) -> CoinbaseBuilder {
        CoinbaseBuilder::new(self.message.as_bytes(), self.reward_output_script.clone())
            .with_extra_data(self.effective_extra_data())
    }

    /// Validate and build the template with double SHA256.
    pub fn template(&self) -> Result<GenesisTemplate> {
        self.template_with(&DoubleSha256)
    }

    /// Validate and build the template with `hasher`.
    pub fn template_with<H: PowHasher>(&self, hasher: &H) -> Result<GenesisTemplate> {
        self.validate()?;
        let coinbase = self.coinbase_builder().build_with(hasher, self.reward)?;
        GenesisTemplate::with_prev_hash(
            hasher,
            coinbase,
            self.version,
            self.previous_hash,
            self.timestamp,
            self.compact_target,
        )
    }
}

/// Parse a compact value written as decimal or `0x`-prefixed hex.
pub fn parse_compact(s: &str) -> Result<u32> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| Error::config(format!("invalid compact target '{s}': {e}")))
}

mod hex_bytes {
    use alloc::string::String;
    use alloc::vec::Vec;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

mod opt_hex_bytes {
    use alloc::string::String;
    use alloc::vec::Vec;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => hex::decode(s.trim_start_matches("0x"))
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

mod display_hash {
    use alloc::string::String;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::hash::{hash_from_display_hex, hash_to_display_hex};

    pub fn serialize<S: Serializer>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hash_to_display_hex(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        hash_from_display_hex(&s).map_err(serde::de::Error::custom)
    }
}

mod compact {
    use alloc::format;
    use alloc::string::String;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum Repr {
        Number(u32),
        Text(String),
    }

    pub fn serialize<S: Serializer>(bits: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{bits:#010x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Repr::deserialize(deserializer)?.into_bits()
    }

    impl Repr {
        pub(super) fn into_bits<E: serde::de::Error>(self) -> Result<u32, E> {
            match self {
                Repr::Number(bits) => Ok(bits),
                Repr::Text(text) => super::parse_compact(&text).map_err(E::custom),
            }
        }
    }
}

mod opt_compact {
    use alloc::format;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::compact::Repr;

    pub fn serialize<S: Serializer>(bits: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        match bits {
            Some(bits) => serializer.serialize_some(&format!("{bits:#010x}")),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        Option::<Repr>::deserialize(deserializer)?
            .map(Repr::into_bits)
            .transpose()
    }
}
