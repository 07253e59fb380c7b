use alloy_primitives::{Address, B256, aliases::B32};
use ssz_types::{FixedVector, typenum::U48};

pub type Slot = u64;
pub type Epoch = u64;
pub type ValidatorIndex = u64;
pub type CommitteeIndex = u64;
pub type Gwei = u64;
pub type Timestamp = u64;
pub type DepositIndex = u64;

pub type Root = B256;
pub type Domain = B256;
pub type Version = B32;
pub type DomainType = B32;

pub type ExecutionAddress = Address;
pub type ExecutionBlockHash = B256;

/// One byte per validator; bit ``i`` records timely participation flag ``i``.
pub type ParticipationFlags = u8;

pub type KzgCommitment = FixedVector<u8, U48>;
