//! Typed data model for the beacon chain: primitives, presets, runtime
//! configuration, and the SSZ containers of every supported fork.

pub mod attestation;
pub mod attestation_data;
pub mod attester_slashing;
pub mod beacon_block_header;
pub mod bls_to_execution_change;
pub mod checkpoint;
pub mod combined;
pub mod constants;
pub mod deposit;
pub mod errors;
pub mod eth_1_data;
pub mod fork;
pub mod fork_data;
pub mod historical;
pub mod indexed_attestation;
pub mod misc;
pub mod participation_flags;
pub mod pending_attestation;
pub mod preset;
pub mod primitives;
pub mod proposer_slashing;
pub mod signing_data;
pub mod spec;
pub mod sync_aggregate;
pub mod sync_committee;
pub mod validator;
pub mod voluntary_exit;
pub mod withdrawal;

pub mod altair;
pub mod bellatrix;
pub mod capella;
pub mod deneb;
pub mod phase0;

pub use attestation::Attestation;
pub use attestation_data::AttestationData;
pub use attester_slashing::AttesterSlashing;
pub use beacon_block_header::{BeaconBlockHeader, SignedBeaconBlockHeader};
pub use bls_to_execution_change::{BLSToExecutionChange, SignedBLSToExecutionChange};
pub use checkpoint::Checkpoint;
pub use combined::{BeaconState, SignedBeaconBlock};
pub use deposit::{Deposit, DepositData, DepositMessage};
pub use errors::StateError;
pub use eth_1_data::Eth1Data;
pub use fork::Fork;
pub use fork_data::ForkData;
pub use historical::{HistoricalBatch, HistoricalSummary};
pub use indexed_attestation::IndexedAttestation;
pub use pending_attestation::PendingAttestation;
pub use preset::{Mainnet, Minimal, Preset, PresetName};
pub use primitives::*;
pub use proposer_slashing::ProposerSlashing;
pub use signing_data::SigningData;
pub use spec::{
    AltairConfig, BellatrixConfig, CapellaConfig, DenebConfig, ForkName, Phase0Config, Spec,
};
pub use sync_aggregate::SyncAggregate;
pub use sync_committee::SyncCommittee;
pub use validator::Validator;
pub use voluntary_exit::{SignedVoluntaryExit, VoluntaryExit};
pub use withdrawal::Withdrawal;
