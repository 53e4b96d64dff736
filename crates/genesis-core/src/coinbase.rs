//! Coinbase transaction construction for genesis blocks.
//!
//! The genesis coinbase has one input with a null previous output and a
//! scriptSig of `extra_data || push(message)`, and one output paying the
//! reward to the given locking script. Without explicit extra data the
//! scriptSig starts with `push_int(bits) push_num(4)`, so the classic
//! Bitcoin genesis block is reproduced exactly.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::hash::{DoubleSha256, PowHasher};
use crate::network::{MAX_COINBASE_SCRIPTSIG_SIZE, MAX_SCRIPT_SIZE};

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1NEGATE: u8 = 0x4f;
const OP_1: u8 = 0x51;

/// Version of the coinbase transaction.
pub const COINBASE_TX_VERSION: i32 = 1;

/// Builder for the genesis coinbase transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseBuilder {
    /// Human-readable payload embedded in the scriptSig.
    message: Vec<u8>,
    /// Locking script of the single output.
    output_script: Vec<u8>,
    /// Bytes placed in front of the message push.
    extra_data: Vec<u8>,
    /// Transaction version.
    version: i32,
}

impl CoinbaseBuilder {
    /// Create a builder with empty extra data.
    pub fn new(message: impl Into<Vec<u8>>, output_script: impl Into<Vec<u8>>) -> Self {
        CoinbaseBuilder {
            message: message.into(),
            output_script: output_script.into(),
            extra_data: Vec::new(),
            version: COINBASE_TX_VERSION,
        }
    }

    /// Set the raw bytes that precede the message in the scriptSig.
    pub fn with_extra_data(mut self, extra_data: impl Into<Vec<u8>>) -> Self {
        self.extra_data = extra_data.into();
        self
    }

    /// Use the Bitcoin genesis prefix `push_int(bits) push_num(4)`.
    pub fn with_genesis_extra_data(self, bits: u32) -> Self {
        self.with_extra_data(genesis_extra_data(bits))
    }

    /// Set the transaction version.
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Build the coinbase, hashing its txid with double SHA256.
    pub fn build(&self, reward: i64) -> Result<CoinbaseTransaction> {
        self.build_with(&DoubleSha256, reward)
    }

    /// Build the coinbase, hashing its txid with `hasher`.
    ///
    /// Validation happens before anything is serialized.
    pub fn build_with<H: PowHasher>(&self, hasher: &H, reward: i64) -> Result<CoinbaseTransaction> {
        if self.message.len() > MAX_COINBASE_SCRIPTSIG_SIZE {
            return Err(Error::MessageTooLong {
                len: self.message.len(),
                max: MAX_COINBASE_SCRIPTSIG_SIZE,
            });
        }
        let value = u64::try_from(reward).map_err(|_| Error::NegativeReward(reward))?;
        validate_script(&self.output_script)?;

        let script_sig = self.build_script_sig();
        let raw_tx = self.serialize_transaction(&script_sig, value);
        let txid = hasher.hash(&raw_tx);

        Ok(CoinbaseTransaction {
            raw_tx,
            txid,
            script_sig,
            value,
            output_script: self.output_script.clone(),
        })
    }

    fn build_script_sig(&self) -> Vec<u8> {
        let mut script_sig = Vec::with_capacity(self.extra_data.len() + self.message.len() + 2);
        script_sig.extend_from_slice(&self.extra_data);
        push_data(&self.message, &mut script_sig);
        script_sig
    }

    fn serialize_transaction(&self, script_sig: &[u8], value: u64) -> Vec<u8> {
        let mut raw_tx = Vec::with_capacity(64 + script_sig.len() + self.output_script.len());

        // Version (4 bytes, little-endian)
        raw_tx.extend_from_slice(&self.version.to_le_bytes());

        // Input count, always 1
        raw_tx.push(0x01);

        // Null previous output
        raw_tx.extend_from_slice(&[0u8; 32]);
        raw_tx.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());

        encode_varint(script_sig.len() as u64, &mut raw_tx);
        raw_tx.extend_from_slice(script_sig);

        // Sequence
        raw_tx.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());

        // Output count, always 1
        raw_tx.push(0x01);
        raw_tx.extend_from_slice(&value.to_le_bytes());
        encode_varint(self.output_script.len() as u64, &mut raw_tx);
        raw_tx.extend_from_slice(&self.output_script);

        // Locktime
        raw_tx.extend_from_slice(&0u32.to_le_bytes());

        raw_tx
    }
}

/// Build a genesis coinbase in one call.
pub fn build_coinbase(
    message: &[u8],
    reward: i64,
    output_script: &[u8],
    extra_data: &[u8],
) -> Result<CoinbaseTransaction> {
    CoinbaseBuilder::new(message, output_script)
        .with_extra_data(extra_data)
        .build(reward)
}

/// A constructed coinbase transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseTransaction {
    /// Canonical serialization.
    pub raw_tx: Vec<u8>,
    /// Transaction id (double hash of `raw_tx`).
    pub txid: [u8; 32],
    /// The input's scriptSig.
    pub script_sig: Vec<u8>,
    /// Output value in the smallest unit.
    pub value: u64,
    /// Output locking script.
    pub output_script: Vec<u8>,
}

/// Default scriptSig prefix of a genesis coinbase.
pub fn genesis_extra_data(bits: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(8);
    push_int(bits as i64, &mut data);
    push_num(4, &mut data);
    data
}

/// Append a minimal data push of `data`.
pub fn push_data(data: &[u8], script: &mut Vec<u8>) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Append an integer, using the small-integer opcodes where they apply.
pub fn push_int(n: i64, script: &mut Vec<u8>) {
    match n {
        0 => script.push(OP_0),
        -1 => script.push(OP_1NEGATE),
        1..=16 => script.push(OP_1 + (n as u8) - 1),
        _ => push_data(&script_num(n), script),
    }
}

/// Append an integer as a script number data push.
pub fn push_num(n: i64, script: &mut Vec<u8>) {
    push_data(&script_num(n), script);
}

/// Minimal little-endian sign-magnitude encoding of a script number.
pub fn script_num(n: i64) -> Vec<u8> {
    if n == 0 {
        return vec![];
    }

    let negative = n < 0;
    let mut abs = n.unsigned_abs();
    let mut bytes = Vec::with_capacity(9);
    while abs > 0 {
        bytes.push((abs & 0xFF) as u8);
        abs >>= 8;
    }

    // The top bit of the last byte is the sign.
    if let Some(last) = bytes.last_mut() {
        if *last & 0x80 != 0 {
            bytes.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            *last |= 0x80;
        }
    }

    bytes
}

/// Check that every push in `script` stays within the script.
pub fn validate_script(script: &[u8]) -> Result<()> {
    if script.len() > MAX_SCRIPT_SIZE {
        return Err(Error::MalformedScript {
            offset: MAX_SCRIPT_SIZE,
            reason: "script exceeds maximum size",
        });
    }

    let mut pos = 0;
    while pos < script.len() {
        let opcode = script[pos];
        let start = pos;
        pos += 1;

        let (len_bytes, direct) = match opcode {
            0x01..=0x4b => (0, opcode as usize),
            OP_PUSHDATA1 => (1, 0),
            OP_PUSHDATA2 => (2, 0),
            OP_PUSHDATA4 => (4, 0),
            _ => continue,
        };

        let push_len = if len_bytes == 0 {
            direct
        } else {
            let field = script.get(pos..pos + len_bytes).ok_or(Error::MalformedScript {
                offset: start,
                reason: "truncated push length",
            })?;
            pos += len_bytes;
            let mut le = [0u8; 4];
            le[..len_bytes].copy_from_slice(field);
            u32::from_le_bytes(le) as usize
        };

        if script.len() - pos < push_len {
            return Err(Error::MalformedScript {
                offset: start,
                reason: "push runs past end of script",
            });
        }
        pos += push_len;
    }

    Ok(())
}

/// Encode a variable-length integer.
pub fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}
