//! Merkle root computation over transaction ids.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::hash::{DoubleSha256, PowHasher};

/// Compute the merkle root of `txids` with double SHA256.
pub fn compute_merkle_root(txids: &[[u8; 32]]) -> Result<[u8; 32]> {
    compute_merkle_root_with(&DoubleSha256, txids)
}

/// Compute the merkle root of `txids` with an arbitrary hasher.
///
/// Adjacent pairs are hashed level by level; an odd level pairs its last
/// node with itself. A single transaction is its own root.
pub fn compute_merkle_root_with<H: PowHasher>(hasher: &H, txids: &[[u8; 32]]) -> Result<[u8; 32]> {
    merkle_root_and_mutation(hasher, txids).map(|(root, _)| root)
}

/// Compute the merkle root and whether the tree is mutated.
///
/// A tree is mutated when some level hashes two identical adjacent nodes
/// that were not produced by the odd-count duplication; such a transaction
/// list has the same root as a shorter one.
pub fn merkle_root_and_mutation<H: PowHasher>(
    hasher: &H,
    txids: &[[u8; 32]],
) -> Result<([u8; 32], bool)> {
    if txids.is_empty() {
        return Err(Error::EmptyTransactions);
    }

    let mut mutated = false;
    let mut current_level: Vec<[u8; 32]> = txids.to_vec();

    while current_level.len() > 1 {
        let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));

        for pair in current_level.chunks(2) {
            let left = pair[0];
            let right = match pair.get(1) {
                Some(right) => {
                    if *right == left {
                        mutated = true;
                    }
                    *right
                }
                None => left,
            };

            next_level.push(hash_pair(hasher, &left, &right));
        }

        current_level = next_level;
    }

    Ok((current_level[0], mutated))
}

/// Hash the concatenation of two nodes.
pub fn hash_pair<H: PowHasher>(hasher: &H, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut combined = [0u8; 64];
    combined[..32].copy_from_slice(left);
    combined[32..].copy_from_slice(right);
    hasher.hash(&combined)
}
