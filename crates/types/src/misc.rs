use alloy_primitives::B256;
use tree_hash::TreeHash;

use crate::{
    fork_data::ForkData,
    preset::Preset,
    primitives::{Domain, DomainType, Epoch, Root, Slot, Timestamp, Version},
    signing_data::SigningData,
    spec::Spec,
};

/// Return the epoch number at ``slot``.
pub fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::slots_per_epoch()
}

/// Return the start slot of ``epoch``.
pub fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch * P::slots_per_epoch()
}

/// Return the epoch during which validator activations and exits initiated in
/// ``epoch`` take effect.
pub fn compute_activation_exit_epoch(spec: &Spec, epoch: Epoch) -> Epoch {
    epoch + 1 + spec.phase0.max_seed_lookahead
}

pub fn compute_timestamp_at_slot(spec: &Spec, genesis_time: Timestamp, slot: Slot) -> Timestamp {
    genesis_time + slot * spec.phase0.seconds_per_slot
}

/// Return the 32-byte fork data root for ``current_version`` and
/// ``genesis_validators_root``.
pub fn compute_fork_data_root(current_version: Version, genesis_validators_root: Root) -> Root {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .tree_hash_root()
}

/// Return the domain for ``domain_type``: four type bytes followed by the
/// first 28 bytes of the fork data root.
pub fn compute_domain(
    domain_type: DomainType,
    fork_version: Version,
    genesis_validators_root: Root,
) -> Domain {
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);
    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(domain_type.as_slice());
    domain[4..].copy_from_slice(&fork_data_root[..28]);
    B256::from(domain)
}

pub fn compute_signing_root<T: TreeHash>(object: &T, domain: Domain) -> Root {
    SigningData {
        object_root: object.tree_hash_root(),
        domain,
    }
    .tree_hash_root()
}

/// Largest ``x`` with ``x * x <= n``.
pub fn integer_squareroot(n: u64) -> u64 {
    let n = n as u128;
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x as u64
}

/// Return the integer deserialization of the first eight bytes of ``slice``,
/// little-endian.
pub fn bytes_to_int64(slice: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    let len = slice.len().min(8);
    bytes[..len].copy_from_slice(&slice[..len]);
    u64::from_le_bytes(bytes)
}

pub fn xor(a: &[u8], b: &[u8]) -> B256 {
    let mut out = [0u8; 32];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = a[i] ^ b[i];
    }
    B256::from(out)
}

pub fn is_sorted_and_unique(indices: &[u64]) -> bool {
    indices.windows(2).all(|pair| pair[0] < pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{Mainnet, Minimal};

    #[test]
    fn epoch_math() {
        assert_eq!(compute_epoch_at_slot::<Mainnet>(0), 0);
        assert_eq!(compute_epoch_at_slot::<Mainnet>(31), 0);
        assert_eq!(compute_epoch_at_slot::<Mainnet>(32), 1);
        assert_eq!(compute_start_slot_at_epoch::<Minimal>(3), 24);
    }

    #[test]
    fn integer_squareroot_rounds_down() {
        assert_eq!(integer_squareroot(0), 0);
        assert_eq!(integer_squareroot(1), 1);
        assert_eq!(integer_squareroot(24), 4);
        assert_eq!(integer_squareroot(25), 5);
        assert_eq!(integer_squareroot(26), 5);
        assert_eq!(integer_squareroot(u64::MAX), 4_294_967_295);
    }

    #[test]
    fn domain_starts_with_type_bytes() {
        let domain = compute_domain(
            crate::constants::DOMAIN_DEPOSIT,
            alloy_primitives::aliases::B32::new([0, 0, 0, 0]),
            B256::ZERO,
        );
        assert_eq!(&domain[..4], &[0x03, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn sortedness_check_rejects_duplicates() {
        assert!(is_sorted_and_unique(&[1, 2, 5]));
        assert!(!is_sorted_and_unique(&[1, 2, 2]));
        assert!(!is_sorted_and_unique(&[2, 1]));
        assert!(is_sorted_and_unique(&[]));
    }
}
