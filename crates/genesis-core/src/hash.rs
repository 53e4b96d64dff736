//! Double-hash primitive and hash display helpers.

use alloc::format;
use alloc::string::String;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// The hash applied to headers, transactions and merkle nodes.
///
/// The pipeline only relies on this trait, so tests (or a network with a
/// different header hash) can plug in their own primitive.
pub trait PowHasher: Send + Sync {
    /// Hash `data` to 32 bytes in internal byte order.
    fn hash(&self, data: &[u8]) -> [u8; 32];
}

impl<H: PowHasher + ?Sized> PowHasher for &H {
    #[inline]
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        (**self).hash(data)
    }
}

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoubleSha256;

impl PowHasher for DoubleSha256 {
    #[inline]
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        double_sha256(data)
    }
}

/// SHA256(SHA256(data)).
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Reverse the byte order of a 32-byte array.
///
/// Hashes are displayed in reverse byte order.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> String {
    hex::encode(reverse_bytes(hash))
}

/// Parse a display-order hex hash back into internal byte order.
pub fn hash_from_display_hex(display: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(display.trim_start_matches("0x"))
        .map_err(|e| Error::config(format!("invalid hash hex: {e}")))?;

    if bytes.len() != 32 {
        return Err(Error::InvalidHashLength(bytes.len()));
    }

    let mut hash = [0u8; 32];
    for (dst, src) in hash.iter_mut().zip(bytes.iter().rev()) {
        *dst = *src;
    }
    Ok(hash)
}

/// Count leading zero bits in the displayed hash.
///
/// The displayed hash is byte-reversed, so its leading zeros are the
/// trailing bytes of the internal representation.
pub fn count_leading_zeros(hash: &[u8; 32]) -> u32 {
    let mut zeros = 0u32;
    for byte in hash.iter().rev() {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}
