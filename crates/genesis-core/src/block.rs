//! Block header serialization, the genesis template and the mined result.

use alloc::string::String;
use alloc::vec::Vec;

use crate::coinbase::{encode_varint, CoinbaseTransaction};
use crate::difficulty::{decode_compact, meets_target, Target};
use crate::error::{Error, Result};
use crate::hash::{count_leading_zeros, hash_to_display_hex, DoubleSha256, PowHasher};
use crate::merkle::compute_merkle_root_with;
use crate::network::BLOCK_HEADER_SIZE;

/// A block header (80 bytes on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version.
    pub version: i32,
    /// Hash of the previous block (internal byte order), zero for genesis.
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header with a zero nonce.
    pub fn new(
        version: i32,
        prev_block_hash: [u8; 32],
        merkle_root: [u8; 32],
        timestamp: u32,
        bits: u32,
    ) -> Self {
        BlockHeader {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce: 0,
        }
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[..76].copy_from_slice(&self.serialize_without_nonce());
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        header
    }

    /// Serialize the header without the nonce (76 bytes).
    ///
    /// The search loop only rewrites the last four bytes after this prefix.
    pub fn serialize_without_nonce(&self) -> [u8; 76] {
        let mut header = [0u8; 76];

        header[0..4].copy_from_slice(&self.version.to_le_bytes());
        header[4..36].copy_from_slice(&self.prev_block_hash);
        header[36..68].copy_from_slice(&self.merkle_root);
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());

        header
    }

    /// Compute the block hash (double SHA256).
    pub fn hash(&self) -> [u8; 32] {
        self.hash_with(&DoubleSha256)
    }

    /// Compute the block hash with `hasher`.
    pub fn hash_with<H: PowHasher>(&self, hasher: &H) -> [u8; 32] {
        hasher.hash(&self.serialize())
    }

    /// Decode the header's compact target.
    pub fn target(&self) -> Result<Target> {
        decode_compact(self.bits)
    }
}

/// Everything the miner needs: a header template, its coinbase and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisTemplate {
    /// Header with a zero nonce.
    pub header: BlockHeader,
    /// The single coinbase transaction.
    pub coinbase: CoinbaseTransaction,
    /// Decoded target of `header.bits`.
    pub target: Target,
}

impl GenesisTemplate {
    /// Assemble a genesis template with a zero previous hash.
    pub fn new(coinbase: CoinbaseTransaction, version: i32, timestamp: u32, bits: u32) -> Result<Self> {
        Self::with_prev_hash(&DoubleSha256, coinbase, version, [0u8; 32], timestamp, bits)
    }

    /// Assemble a template on top of `prev_block_hash`.
    ///
    /// Fails when `bits` is negative, overflows, or decodes to zero.
    pub fn with_prev_hash<H: PowHasher>(
        hasher: &H,
        coinbase: CoinbaseTransaction,
        version: i32,
        prev_block_hash: [u8; 32],
        timestamp: u32,
        bits: u32,
    ) -> Result<Self> {
        let target = decode_compact(bits)?;
        if target.is_zero() {
            return Err(Error::ZeroTarget(bits));
        }

        let merkle_root = compute_merkle_root_with(hasher, &[coinbase.txid])?;
        let header = BlockHeader::new(version, prev_block_hash, merkle_root, timestamp, bits);

        Ok(GenesisTemplate {
            header,
            coinbase,
            target,
        })
    }
}

/// A genesis block whose hash meets its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedBlock {
    header: BlockHeader,
    hash: [u8; 32],
    coinbase: CoinbaseTransaction,
    target: Target,
    timestamp_rolls: u32,
}

impl MinedBlock {
    #[cfg(feature = "std")]
    pub(crate) fn new(
        template: &GenesisTemplate,
        header: BlockHeader,
        hash: [u8; 32],
        timestamp_rolls: u32,
    ) -> Self {
        MinedBlock {
            header,
            hash,
            coinbase: template.coinbase.clone(),
            target: template.target,
            timestamp_rolls,
        }
    }

    /// Final header, including the winning nonce and timestamp.
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Block hash in internal byte order.
    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn merkle_root(&self) -> [u8; 32] {
        self.header.merkle_root
    }

    pub fn nonce(&self) -> u32 {
        self.header.nonce
    }

    pub fn coinbase(&self) -> &CoinbaseTransaction {
        &self.coinbase
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// How many times the timestamp was advanced past the template's.
    pub fn timestamp_rolls(&self) -> u32 {
        self.timestamp_rolls
    }

    /// Block hash in display byte order.
    pub fn hash_hex(&self) -> String {
        hash_to_display_hex(&self.hash)
    }

    /// Merkle root in display byte order.
    pub fn merkle_root_hex(&self) -> String {
        hash_to_display_hex(&self.header.merkle_root)
    }

    /// Serialized header as hex.
    pub fn header_hex(&self) -> String {
        hex::encode(self.header.serialize())
    }

    /// Leading zero bits of the displayed hash.
    pub fn leading_zero_bits(&self) -> u32 {
        count_leading_zeros(&self.hash)
    }

    /// Serialize the complete block: header, transaction count, coinbase.
    pub fn serialize_block(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(BLOCK_HEADER_SIZE + 1 + self.coinbase.raw_tx.len());
        block.extend_from_slice(&self.header.serialize());
        encode_varint(1, &mut block);
        block.extend_from_slice(&self.coinbase.raw_tx);
        block
    }

    /// Get the block as a hex string.
    pub fn serialize_block_hex(&self) -> String {
        hex::encode(self.serialize_block())
    }

    /// Recompute the header hash with `hasher` and check it against the target.
    pub fn verify_with<H: PowHasher>(&self, hasher: &H) -> bool {
        let hash = self.header.hash_with(hasher);
        hash == self.hash && meets_target(&hash, &self.target)
    }

    /// [`MinedBlock::verify_with`] using double SHA256.
    pub fn verify(&self) -> bool {
        self.verify_with(&DoubleSha256)
    }
}
