//! Genesis block construction and proof-of-work search.
//!
//! This crate provides pure Rust implementations of:
//! - Coinbase transaction building with an embedded message
//! - Merkle root computation over transaction ids
//! - Compact difficulty target encoding, decoding and comparison
//! - Parallel nonce search with timeout and timestamp rolling (`std` only)
//!
//! The pipeline runs `GenesisConfig` → `CoinbaseBuilder` → merkle root →
//! `GenesisTemplate` → `Miner` → `MinedBlock`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod coinbase;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod hash;
pub mod merkle;
#[cfg(feature = "std")]
pub mod miner;
pub mod network;

pub use block::{BlockHeader, GenesisTemplate, MinedBlock};
pub use coinbase::{build_coinbase, CoinbaseBuilder, CoinbaseTransaction};
pub use config::GenesisConfig;
pub use difficulty::{decode_compact, encode_compact, meets_target, Target};
pub use error::{Error, Result};
pub use hash::{double_sha256, DoubleSha256, PowHasher};
pub use merkle::{compute_merkle_root, compute_merkle_root_with};
#[cfg(feature = "std")]
pub use miner::{
    mine, Miner, Progress, ProgressObserver, SearchOutcome, SearchStats, TracingObserver,
};
pub use network::Network;
