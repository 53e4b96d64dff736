//! Compact "bits" target codec and proof-of-work comparison.
//!
//! The compact form is `[exponent (1 byte)][mantissa (3 bytes)]` and encodes
//! `mantissa * 256^(exponent - 3)`. Bit 23 of the mantissa is a sign bit and
//! is never set in a usable mining target.

use alloc::string::String;
use core::fmt;

use crate::error::{Error, Result};

/// Compact value of the "difficulty 1" target used as the difficulty baseline.
pub const DIFFICULTY_ONE_BITS: u32 = 0x1d00ffff;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// A 256-bit unsigned target, stored big-endian.
///
/// Ordering on the byte array is numeric ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Target([u8; 32]);

impl Target {
    /// The zero target.
    pub const ZERO: Target = Target([0u8; 32]);

    /// The largest representable 256-bit value.
    pub const MAX: Target = Target([0xffu8; 32]);

    /// Build a target from 32 big-endian bytes.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Target(bytes)
    }

    /// The target as 32 big-endian bytes.
    pub const fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Decode a compact value. See [`decode_compact`].
    pub fn from_compact(bits: u32) -> Result<Self> {
        decode_compact(bits)
    }

    /// Encode to the compact form. See [`encode_compact`].
    pub fn to_compact(&self) -> u32 {
        encode_compact(self)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Big-endian hex, the way targets are usually printed.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Difficulty relative to [`DIFFICULTY_ONE_BITS`].
    pub fn difficulty(&self) -> f64 {
        let current = target_to_f64(self);
        if current == 0.0 {
            return f64::INFINITY;
        }
        // 0x1d00ffff always decodes.
        let one = decode_compact(DIFFICULTY_ONE_BITS).unwrap_or(Target::MAX);
        target_to_f64(&one) / current
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", self.to_hex())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Convert a compact value to a 256-bit target.
///
/// Fails with [`Error::NegativeTarget`] when the sign bit is set and with
/// [`Error::TargetOverflow`] when the shifted mantissa does not fit in 256 bits.
pub fn decode_compact(bits: u32) -> Result<Target> {
    if bits & SIGN_BIT != 0 {
        return Err(Error::NegativeTarget(bits));
    }

    let exponent = (bits >> 24) as usize;
    let mantissa = bits & MANTISSA_MASK;
    let mut target = [0u8; 32];

    if exponent <= 3 {
        let value = mantissa >> (8 * (3 - exponent));
        target[29..].copy_from_slice(&value.to_be_bytes()[1..]);
    } else {
        let shift = exponent - 3;
        // Byte 0 is the least significant mantissa byte.
        for (i, byte) in mantissa.to_le_bytes()[..3].iter().enumerate() {
            if *byte == 0 {
                continue;
            }
            match 31usize.checked_sub(shift + i) {
                Some(pos) => target[pos] = *byte,
                None => return Err(Error::TargetOverflow(bits)),
            }
        }
    }

    Ok(Target(target))
}

/// Convert a 256-bit target to the compact form.
///
/// Picks the smallest exponent whose mantissa keeps the sign bit clear and
/// truncates the bits below the mantissa, so `encode(decode(c)) == c` for
/// every `c` produced here.
pub fn encode_compact(target: &Target) -> u32 {
    let bytes = &target.0;
    let first_nonzero = match bytes.iter().position(|b| *b != 0) {
        Some(pos) => pos,
        None => return 0,
    };

    let mut size = (32 - first_nonzero) as u32;
    let mut mantissa: u32 = 0;
    for i in 0..3 {
        mantissa <<= 8;
        if let Some(byte) = bytes.get(first_nonzero + i) {
            mantissa |= *byte as u32;
        }
    }

    if mantissa & SIGN_BIT != 0 {
        mantissa >>= 8;
        size += 1;
    }

    (size << 24) | mantissa
}

/// Check whether a hash satisfies a target.
///
/// The hash is in internal (little-endian) byte order; it meets the target
/// when its integer value is less than or equal to the target.
#[inline]
pub fn meets_target(hash: &[u8; 32], target: &Target) -> bool {
    for (h, t) in hash.iter().rev().zip(target.0.iter()) {
        if h < t {
            return true;
        }
        if h > t {
            return false;
        }
    }
    true
}

/// Decode `bits` and check it is usable under `pow_limit`.
///
/// Rejects negative, overflowing, zero and above-limit targets.
pub fn derive_target(bits: u32, pow_limit: &Target) -> Result<Target> {
    let target = decode_compact(bits)?;

    if target.is_zero() {
        return Err(Error::ZeroTarget(bits));
    }
    if target > *pow_limit {
        return Err(Error::TargetAboveLimit {
            bits,
            limit: pow_limit.to_compact(),
        });
    }

    Ok(target)
}

/// Full proof-of-work check of a header hash against its claimed `bits`.
pub fn check_proof_of_work(hash: &[u8; 32], bits: u32, pow_limit: &Target) -> bool {
    match derive_target(bits, pow_limit) {
        Ok(target) => meets_target(hash, &target),
        Err(_) => false,
    }
}

/// Difficulty of a compact value relative to [`DIFFICULTY_ONE_BITS`].
pub fn bits_to_difficulty(bits: u32) -> Result<f64> {
    Ok(decode_compact(bits)?.difficulty())
}

/// Convert a 256-bit target to an approximate f64 value.
fn target_to_f64(target: &Target) -> f64 {
    let bytes = &target.0;
    let first_nonzero = match bytes.iter().position(|b| *b != 0) {
        Some(pos) => pos,
        None => return 0.0,
    };

    // Take up to 8 bytes for precision
    let mut value: u64 = 0;
    let mut taken = 0;
    for byte in bytes[first_nonzero..].iter().take(8) {
        value = (value << 8) | (*byte as u64);
        taken += 1;
    }

    let remaining_bits = (32 - first_nonzero - taken) as i32 * 8;
    (value as f64) * pow2_f64(remaining_bits)
}

/// Compute 2^exp for f64 without libm.
fn pow2_f64(exp: i32) -> f64 {
    f64::from_bits(((exp + 1023) as u64) << 52)
}

/// Format difficulty for display (e.g., "1.23T" for trillion).
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        alloc::format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        alloc::format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        alloc::format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        alloc::format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        alloc::format!("{:.2}K", difficulty / 1e3)
    } else {
        alloc::format!("{:.2}", difficulty)
    }
}

/// Average number of hashes needed to meet `target`.
pub fn expected_hashes(target: &Target) -> f64 {
    let value = target_to_f64(target);
    if value == 0.0 {
        return f64::INFINITY;
    }
    pow2_f64(256) / (value + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn target_with(bytes: &[(usize, u8)]) -> Target {
        let mut raw = [0u8; 32];
        for (pos, byte) in bytes {
            raw[*pos] = *byte;
        }
        Target::from_be_bytes(raw)
    }

    #[test]
    fn test_decode_difficulty_one() {
        let target = decode_compact(0x1d00ffff).unwrap();
        assert_eq!(target, target_with(&[(4, 0xff), (5, 0xff)]));
        assert_eq!(
            target.to_hex(),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_decode_regtest_limit() {
        let target = decode_compact(0x207fffff).unwrap();
        assert_eq!(target, target_with(&[(0, 0x7f), (1, 0xff), (2, 0xff)]));
    }

    #[test]
    fn test_decode_small_exponents() {
        assert_eq!(decode_compact(0x01123456).unwrap(), target_with(&[(31, 0x12)]));
        assert_eq!(
            decode_compact(0x02123456).unwrap(),
            target_with(&[(30, 0x12), (31, 0x34)])
        );
        assert_eq!(
            decode_compact(0x03123456).unwrap(),
            target_with(&[(29, 0x12), (30, 0x34), (31, 0x56)])
        );
        assert!(decode_compact(0x00123456).unwrap().is_zero());
    }

    #[test]
    fn test_decode_negative() {
        assert_eq!(decode_compact(0x04923456), Err(Error::NegativeTarget(0x04923456)));
        assert_eq!(decode_compact(0x01fedcba), Err(Error::NegativeTarget(0x01fedcba)));
    }

    #[test]
    fn test_decode_overflow() {
        assert_eq!(decode_compact(0xff123456), Err(Error::TargetOverflow(0xff123456)));
        assert_eq!(decode_compact(0x21010000), Err(Error::TargetOverflow(0x21010000)));
        assert!(decode_compact(0x20010000).is_ok());
        assert!(decode_compact(0x22000001).is_ok());
        assert_eq!(decode_compact(0x23000001), Err(Error::TargetOverflow(0x23000001)));
        // A zero mantissa never overflows.
        assert!(decode_compact(0xff000000).unwrap().is_zero());
    }

    #[test]
    fn test_encode_known_values() {
        for bits in [0x1d00ffff, 0x207fffff, 0x17034219, 0x1b0404cb, 0x05009234, 0x01120000] {
            let target = decode_compact(bits).unwrap();
            assert_eq!(encode_compact(&target), bits, "bits {bits:08x}");
        }
        assert_eq!(encode_compact(&Target::ZERO), 0);
    }

    #[test]
    fn test_encode_normalizes() {
        // 0x80 at the top byte needs an extra exponent step.
        let target = target_with(&[(31, 0x80)]);
        assert_eq!(encode_compact(&target), 0x02008000);

        // Non-canonical mantissa 0x000fff decodes and re-encodes canonically.
        let target = decode_compact(0x04000fff).unwrap();
        assert_eq!(encode_compact(&target), 0x030fff00);

        assert_eq!(encode_compact(&Target::MAX), 0x2100ffff);
    }

    #[test]
    fn test_meets_target_boundary() {
        let target = decode_compact(0x1d00ffff).unwrap();
        let mut hash = target.to_be_bytes();
        hash.reverse();
        assert!(meets_target(&hash, &target));

        // One above the target
        hash[0] = 0x01;
        assert!(!meets_target(&hash, &target));

        assert!(meets_target(&[0u8; 32], &Target::ZERO));
        assert!(!meets_target(&[1u8; 32], &Target::ZERO));
    }

    #[test]
    fn test_genesis_hash_meets_target() {
        let hash = crate::hash::hash_from_display_hex(
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
        )
        .unwrap();
        let limit = decode_compact(0x1d00ffff).unwrap();

        assert!(check_proof_of_work(&hash, 0x1d00ffff, &limit));
        assert!(!check_proof_of_work(&hash, 0x1a00ffff, &limit));
    }

    #[test]
    fn test_derive_target_range_checks() {
        let limit = decode_compact(0x1d00ffff).unwrap();

        assert!(derive_target(0x1c00ffff, &limit).is_ok());
        assert_eq!(derive_target(0x1d00ffff, &limit), Ok(limit));
        assert_eq!(
            derive_target(0x1e00ffff, &limit),
            Err(Error::TargetAboveLimit { bits: 0x1e00ffff, limit: 0x1d00ffff })
        );
        assert_eq!(derive_target(0x1d000000, &limit), Err(Error::ZeroTarget(0x1d000000)));
        assert_eq!(derive_target(0x1d800001, &limit), Err(Error::NegativeTarget(0x1d800001)));
    }

    #[test]
    fn test_difficulty_calculation() {
        let genesis_diff = bits_to_difficulty(0x1d00ffff).unwrap();
        assert!((genesis_diff - 1.0).abs() < 1e-9);

        let higher = bits_to_difficulty(0x1c00ffff).unwrap();
        assert!((higher - 256.0).abs() < 1e-6);

        assert_eq!(format_difficulty(1.0), "1.00");
        assert_eq!(format_difficulty(2_500_000.0), "2.50M");
    }

    #[test]
    fn test_expected_hashes() {
        let easy = expected_hashes(&decode_compact(0x207fffff).unwrap());
        assert!((easy - 2.0).abs() < 1e-6);

        let one = expected_hashes(&decode_compact(0x1d00ffff).unwrap());
        assert!((one / 4_295_032_833.0 - 1.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_compact_roundtrip(bytes in any::<[u8; 32]>()) {
            let canonical = encode_compact(&Target::from_be_bytes(bytes));
            let decoded = decode_compact(canonical).unwrap();
            prop_assert_eq!(encode_compact(&decoded), canonical);
            prop_assert!(decoded <= Target::from_be_bytes(bytes));
        }

        #[test]
        fn prop_meets_target_matches_integer_order(hash in any::<[u8; 32]>(), target in any::<[u8; 32]>()) {
            let target = Target::from_be_bytes(target);
            let mut be_hash = hash;
            be_hash.reverse();
            prop_assert_eq!(meets_target(&hash, &target), Target::from_be_bytes(be_hash) <= target);
        }
    }
}
