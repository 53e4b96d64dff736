//! Output artifacts of the `mine`, `verify` and `target` commands.

use std::fmt;

use genesis_core::difficulty::{expected_hashes, format_difficulty};
use genesis_core::hash::hash_to_display_hex;
use genesis_core::{GenesisConfig, MinedBlock, SearchStats, Target};
use serde::Serialize;

/// Result of a successful `mine` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinedReport {
    pub network: String,
    pub message: String,
    pub hash: String,
    pub merkle_root: String,
    pub nonce: u32,
    pub time: u32,
    pub bits: String,
    pub version: i32,
    pub reward: u64,
    pub timestamp_rolls: u32,
    pub coinbase_txid: String,
    pub coinbase_hex: String,
    pub block_hex: String,
    pub hashes: u64,
    pub elapsed_seconds: f64,
    pub hash_rate: f64,
}

impl MinedReport {
    pub fn new(config: &GenesisConfig, block: &MinedBlock, stats: &SearchStats) -> Self {
        let header = block.header();
        MinedReport {
            network: config.network.name().to_string(),
            message: config.message.clone(),
            hash: block.hash_hex(),
            merkle_root: block.merkle_root_hex(),
            nonce: block.nonce(),
            time: header.timestamp,
            bits: format!("{:#010x}", header.bits),
            version: header.version,
            reward: block.coinbase().value,
            timestamp_rolls: block.timestamp_rolls(),
            coinbase_txid: hash_to_display_hex(&block.coinbase().txid),
            coinbase_hex: hex::encode(&block.coinbase().raw_tx),
            block_hex: block.serialize_block_hex(),
            hashes: stats.hashes,
            elapsed_seconds: stats.elapsed.as_secs_f64(),
            hash_rate: stats.hash_rate(),
        }
    }
}

/// Human readable summary followed by the values a node's chain parameters
/// need.
impl fmt::Display for MinedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== GENESIS BLOCK MINED ===")?;
        writeln!(f, "Block Hash:  {}", self.hash)?;
        writeln!(f, "Merkle Root: {}", self.merkle_root)?;
        writeln!(f, "Nonce:       {} ({:#x})", self.nonce, self.nonce)?;
        writeln!(f, "Time:        {}", self.time)?;
        writeln!(f, "Bits:        {}", self.bits)?;
        writeln!(f, "Version:     {}", self.version)?;
        if self.timestamp_rolls > 0 {
            writeln!(f, "Timestamp advanced {} time(s)", self.timestamp_rolls)?;
        }
        writeln!(f, "Hashes:      {} in {:.2}s", self.hashes, self.elapsed_seconds)?;
        writeln!(f)?;
        writeln!(f, "Chain parameters:")?;
        writeln!(
            f,
            "  genesis = CreateGenesisBlock({}, {}, {}, {}, {});",
            self.time, self.nonce, self.bits, self.version, self.reward
        )?;
        writeln!(f, "  consensus.hashGenesisBlock = uint256{{\"{}\"}};", self.hash)?;
        writeln!(f, "  assert(genesis.hashMerkleRoot == uint256{{\"{}\"}});", self.merkle_root)
    }
}

/// Result of a `verify` run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub hash: String,
    pub merkle_root: String,
    pub nonce: u32,
    pub target: String,
    pub meets_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_expected: Option<bool>,
}

impl VerifyReport {
    /// Proof of work holds and the expected hash, if any, matches.
    pub fn is_valid(&self) -> bool {
        self.meets_target && self.matches_expected != Some(false)
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block Hash:   {}", self.hash)?;
        writeln!(f, "Merkle Root:  {}", self.merkle_root)?;
        writeln!(f, "Nonce:        {}", self.nonce)?;
        writeln!(f, "Target:       {}", self.target)?;
        writeln!(f, "Meets target: {}", yes_no(self.meets_target))?;
        if let Some(matches) = self.matches_expected {
            writeln!(f, "Hash matches: {}", yes_no(matches))?;
        }
        Ok(())
    }
}

/// Decoded view of a compact target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub bits: String,
    pub target: String,
    /// Compact re-encoding of the decoded target.
    pub normalized_bits: String,
    pub difficulty: f64,
    pub expected_hashes: f64,
}

impl TargetReport {
    pub fn new(bits: u32, target: &Target) -> Self {
        TargetReport {
            bits: format!("{bits:#010x}"),
            target: target.to_hex(),
            normalized_bits: format!("{:#010x}", target.to_compact()),
            difficulty: target.difficulty(),
            expected_hashes: expected_hashes(target),
        }
    }
}

impl fmt::Display for TargetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bits:            {}", self.bits)?;
        writeln!(f, "Target:          {}", self.target)?;
        writeln!(f, "Normalized bits: {}", self.normalized_bits)?;
        writeln!(f, "Difficulty:      {}", format_difficulty(self.difficulty))?;
        writeln!(f, "Expected hashes: {:.0}", self.expected_hashes)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_core::{decode_compact, Miner, Network};

    #[test]
    fn test_mined_report() {
        let config =
            GenesisConfig::for_network(Network::Regtest, "test-genesis", vec![0x6a], 1700000000);
        let template = config.template().unwrap();
        let (block, stats) = Miner::from_config(&config).mine_with_stats(&template).unwrap();

        let report = MinedReport::new(&config, &block, &stats);
        assert_eq!(report.nonce, 2);
        assert_eq!(report.bits, "0x207fffff");
        assert_eq!(report.network, "regtest");
        assert_eq!(report.hashes, 3);

        let params = report.to_string();
        assert!(params.contains("CreateGenesisBlock(1700000000, 2, 0x207fffff, 1, 5000000000);"));
        assert!(params.contains(
            "uint256{\"42e10465f8a014b7dec6e1a784027aed35cc950517a6f2344e942abdea2698e0\"}"
        ));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["merkleRoot"], report.merkle_root.as_str());
        assert_eq!(json["timestampRolls"], 0);
    }

    #[test]
    fn test_target_report() {
        let report = TargetReport::new(0x1d00ffff, &decode_compact(0x1d00ffff).unwrap());
        assert_eq!(report.bits, "0x1d00ffff");
        assert_eq!(report.normalized_bits, "0x1d00ffff");
        assert_eq!(
            report.target,
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
        assert!((report.difficulty - 1.0).abs() < 1e-9);
        assert!(report.to_string().contains("Normalized bits: 0x1d00ffff"));
    }

    #[test]
    fn test_verify_report_validity() {
        let mut report = VerifyReport {
            hash: "00".repeat(32),
            merkle_root: "11".repeat(32),
            nonce: 7,
            target: "ff".repeat(32),
            meets_target: true,
            matches_expected: None,
        };
        assert!(report.is_valid());

        report.matches_expected = Some(false);
        assert!(!report.is_valid());
        assert!(report.to_string().contains("Hash matches: no"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["meetsTarget"], true);
        assert_eq!(json["matchesExpected"], false);
    }
}
