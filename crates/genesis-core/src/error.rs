//! Error types for genesis block construction and mining.

use alloc::string::String;
use core::time::Duration;
use thiserror::Error;

/// Result type alias for genesis operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Everything that can go wrong between a configuration record and a mined block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The coinbase message does not fit in the scriptSig payload region.
    #[error("coinbase message is {len} bytes, limit is {max}")]
    MessageTooLong { len: usize, max: usize },

    /// Rewards are unsigned amounts; zero is allowed.
    #[error("reward must be non-negative, got {0}")]
    NegativeReward(i64),

    /// The output script has a truncated push or is oversized.
    #[error("malformed output script at offset {offset}: {reason}")]
    MalformedScript { offset: usize, reason: &'static str },

    /// A 32-byte hash was expected.
    #[error("expected a 32-byte hash, got {0} bytes")]
    InvalidHashLength(usize),

    /// A block needs at least one transaction.
    #[error("merkle root requested for an empty transaction list")]
    EmptyTransactions,

    /// The sign bit of the compact mantissa is set.
    #[error("compact target {0:#010x} is negative")]
    NegativeTarget(u32),

    /// The compact value encodes a number wider than 256 bits.
    #[error("compact target {0:#010x} overflows 256 bits")]
    TargetOverflow(u32),

    /// A zero target can never be met.
    #[error("compact target {0:#010x} decodes to zero")]
    ZeroTarget(u32),

    /// The target is easier than the network allows.
    #[error("compact target {bits:#010x} is above the proof-of-work limit {limit:#010x}")]
    TargetAboveLimit { bits: u32, limit: u32 },

    /// Every nonce in the search space was tried without a hit.
    #[error("nonce space exhausted at timestamp {timestamp} after {hashes} hashes")]
    Exhausted { timestamp: u32, hashes: u64 },

    /// The time budget ran out before a hit.
    #[error("search timed out after {elapsed:?} ({hashes} hashes)")]
    TimedOut { elapsed: Duration, hashes: u64 },

    /// A configuration record could not be applied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the caller can widen the search and try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Exhausted { .. } | Error::TimedOut { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfig(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::Exhausted { timestamp: 1, hashes: 2 }.is_recoverable());
        assert!(Error::TimedOut { elapsed: Duration::from_secs(1), hashes: 0 }.is_recoverable());
        assert!(!Error::EmptyTransactions.is_recoverable());
        assert!(!Error::NegativeTarget(0x04923456).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::NegativeTarget(0x04923456).to_string(),
            "compact target 0x04923456 is negative"
        );
        assert_eq!(
            Error::MessageTooLong { len: 101, max: 100 }.to_string(),
            "coinbase message is 101 bytes, limit is 100"
        );
    }
}
