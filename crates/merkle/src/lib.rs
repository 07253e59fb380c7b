//! Binary Merkle trees over 32-byte nodes, as used by deposit proofs and
//! the historical accumulators.

use alloy_primitives::B256;
use ethereum_hashing::hash_fixed;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MerkleError {
    #[error("tree depth {depth} cannot hold {leaves} leaves")]
    DepthTooSmall { depth: u32, leaves: usize },

    #[error("leaf index {index} is outside a depth-{depth} tree")]
    IndexOutOfBounds { index: u64, depth: u32 },
}

pub fn hash_concat(left: &[u8], right: &[u8]) -> B256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(left);
    preimage[32..].copy_from_slice(right);
    B256::from(hash_fixed(&preimage))
}

fn index_bit(index: u64, position: u32) -> bool {
    (index >> position) & 1 == 1
}

/// Verify that ``leaf`` sits at ``index`` under ``root`` in a depth-``depth``
/// tree, walking the sibling ``branch`` from the bottom up.
pub fn is_valid_merkle_branch(
    leaf: B256,
    branch: &[B256],
    depth: u32,
    index: u64,
    root: B256,
) -> bool {
    if branch.len() < depth as usize {
        return false;
    }
    let mut value = leaf;
    for position in 0..depth {
        if index_bit(index, position) {
            value = hash_concat(branch[position as usize].as_slice(), value.as_slice());
        } else {
            value = hash_concat(value.as_slice(), branch[position as usize].as_slice());
        }
    }
    value == root
}

/// Roots of all-zero subtrees: ``zero_hashes(d)[i]`` is the root of a
/// depth-``i`` tree whose leaves are all ``B256::ZERO``.
pub fn zero_hashes(depth: u32) -> Vec<B256> {
    let mut hashes = vec![B256::ZERO];
    for level in 0..depth as usize {
        let next = hash_concat(hashes[level].as_slice(), hashes[level].as_slice());
        hashes.push(next);
    }
    hashes
}

/// Root of a depth-``depth`` tree holding ``leaves`` left-aligned and padded
/// with zero leaves. Works for sparse deep trees (the deposit tree is depth
/// 32) without materializing the padding.
pub fn padded_root(leaves: &[B256], depth: u32) -> Result<B256, MerkleError> {
    if (depth as usize) < 64 && leaves.len() > 1usize << depth {
        return Err(MerkleError::DepthTooSmall {
            depth,
            leaves: leaves.len(),
        });
    }
    let zeros = zero_hashes(depth);
    let mut level_nodes = leaves.to_vec();
    for level in 0..depth as usize {
        let mut next_level = Vec::with_capacity(level_nodes.len().div_ceil(2));
        for pair in level_nodes.chunks(2) {
            let right = pair.get(1).copied().unwrap_or(zeros[level]);
            next_level.push(hash_concat(pair[0].as_slice(), right.as_slice()));
        }
        if next_level.is_empty() {
            next_level.push(zeros[level + 1]);
        }
        level_nodes = next_level;
    }
    Ok(level_nodes[0])
}

/// Sibling branch for the leaf at ``index`` in the same padded tree as
/// [`padded_root`], bottom-up.
pub fn padded_proof(leaves: &[B256], depth: u32, index: u64) -> Result<Vec<B256>, MerkleError> {
    if (depth as usize) < 64 && index >= 1u64 << depth {
        return Err(MerkleError::IndexOutOfBounds { index, depth });
    }
    let zeros = zero_hashes(depth);
    let mut proof = Vec::with_capacity(depth as usize);
    let mut level_nodes = leaves.to_vec();
    let mut position = index as usize;
    for level in 0..depth as usize {
        let sibling = position ^ 1;
        proof.push(level_nodes.get(sibling).copied().unwrap_or(zeros[level]));

        let mut next_level = Vec::with_capacity(level_nodes.len().div_ceil(2));
        for pair in level_nodes.chunks(2) {
            let right = pair.get(1).copied().unwrap_or(zeros[level]);
            next_level.push(hash_concat(pair[0].as_slice(), right.as_slice()));
        }
        level_nodes = next_level;
        position /= 2;
    }
    Ok(proof)
}

/// Mix the leaf count into a list root, as the SSZ list scheme does.
pub fn mix_in_length(root: B256, length: u64) -> B256 {
    let mut length_chunk = [0u8; 32];
    length_chunk[..8].copy_from_slice(&length.to_le_bytes());
    hash_concat(root.as_slice(), &length_chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_roundtrip_small_tree() {
        let leaves = [
            B256::repeat_byte(0xaa),
            B256::repeat_byte(0xbb),
            B256::repeat_byte(0xcc),
        ];
        let depth = 2;
        let root = padded_root(&leaves, depth).unwrap();

        for (index, leaf) in leaves.iter().enumerate() {
            let proof = padded_proof(&leaves, depth, index as u64).unwrap();
            assert!(is_valid_merkle_branch(*leaf, &proof, depth, index as u64, root));
        }

        let bad_proof = padded_proof(&leaves, depth, 0).unwrap();
        assert!(!is_valid_merkle_branch(
            B256::repeat_byte(0xdd),
            &bad_proof,
            depth,
            0,
            root
        ));
    }

    #[test]
    fn padded_root_matches_explicit_padding() {
        let leaves = [B256::repeat_byte(1), B256::repeat_byte(2)];
        let explicit = {
            let left = hash_concat(leaves[0].as_slice(), leaves[1].as_slice());
            let right = hash_concat(B256::ZERO.as_slice(), B256::ZERO.as_slice());
            hash_concat(left.as_slice(), right.as_slice())
        };
        assert_eq!(padded_root(&leaves, 2).unwrap(), explicit);
    }

    #[test]
    fn deep_tree_proof_verifies() {
        let leaves = (0u8..5).map(B256::repeat_byte).collect::<Vec<_>>();
        let root = padded_root(&leaves, 32).unwrap();
        let proof = padded_proof(&leaves, 32, 3).unwrap();
        assert!(is_valid_merkle_branch(leaves[3], &proof, 32, 3, root));
    }
}
