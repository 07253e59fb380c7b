use std::{
    fmt::{self, Debug},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use ssz_types::typenum::{
    U2, U4, U8, U16, U32, U64, U128, U256, U512, U1024, U2048, U4096, U8192, U65536, U1048576,
    U1073741824, U16777216, U1099511627776, Unsigned,
};

/// Identifies one of the compile-time presets defined here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    Mainnet,
    Minimal,
}

impl FromStr for PresetName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(PresetName::Mainnet),
            "minimal" => Ok(PresetName::Minimal),
            other => Err(format!("unknown preset: {other}")),
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetName::Mainnet => write!(f, "mainnet"),
            PresetName::Minimal => write!(f, "minimal"),
        }
    }
}

/// Structural lengths of the data model, fixed at compile time so that SSZ
/// limits and hash-tree-roots are part of each container's type.
pub trait Preset:
    'static + Default + Clone + Sync + Send + Debug + PartialEq + Eq
{
    /*
     * Time parameters and history
     */
    type SlotsPerEpoch: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type SlotsPerHistoricalRoot: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type EpochsPerHistoricalVector: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type EpochsPerSlashingsVector: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type HistoricalRootsLimit: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type ValidatorRegistryLimit: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type EpochsPerEth1VotingPeriod: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    /// Must equal `EpochsPerEth1VotingPeriod * SlotsPerEpoch`.
    type SlotsPerEth1VotingPeriod: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    /*
     * Committees and finality
     */
    type MaxValidatorsPerCommittee: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    /// Must equal `MaxAttestations * SlotsPerEpoch`.
    type MaxPendingAttestations: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type JustificationBitsLength: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq + Default;
    /*
     * Operation limits per block
     */
    type MaxProposerSlashings: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type MaxAttesterSlashings: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type MaxAttestations: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type MaxDeposits: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type MaxVoluntaryExits: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    /*
     * Altair
     */
    type SyncCommitteeSize: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    /*
     * Bellatrix
     */
    type MaxBytesPerTransaction: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type MaxTransactionsPerPayload: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type BytesPerLogsBloom: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type MaxExtraDataBytes: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    /*
     * Capella
     */
    type MaxBlsToExecutionChanges: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    type MaxWithdrawalsPerPayload: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;
    /*
     * Deneb
     */
    type MaxBlobCommitmentsPerBlock: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq;

    fn name() -> PresetName;

    fn slots_per_epoch() -> u64 {
        Self::SlotsPerEpoch::to_u64()
    }

    fn slots_per_historical_root() -> u64 {
        Self::SlotsPerHistoricalRoot::to_u64()
    }

    fn epochs_per_historical_vector() -> u64 {
        Self::EpochsPerHistoricalVector::to_u64()
    }

    fn epochs_per_slashings_vector() -> u64 {
        Self::EpochsPerSlashingsVector::to_u64()
    }

    fn epochs_per_eth1_voting_period() -> u64 {
        Self::EpochsPerEth1VotingPeriod::to_u64()
    }

    fn slots_per_eth1_voting_period() -> u64 {
        Self::SlotsPerEth1VotingPeriod::to_u64()
    }

    fn max_validators_per_committee() -> u64 {
        Self::MaxValidatorsPerCommittee::to_u64()
    }

    fn sync_committee_size() -> u64 {
        Self::SyncCommitteeSize::to_u64()
    }

    fn max_deposits() -> u64 {
        Self::MaxDeposits::to_u64()
    }

    fn max_withdrawals_per_payload() -> u64 {
        Self::MaxWithdrawalsPerPayload::to_u64()
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mainnet;

impl Preset for Mainnet {
    type SlotsPerEpoch = U32;
    type SlotsPerHistoricalRoot = U8192;
    type EpochsPerHistoricalVector = U65536;
    type EpochsPerSlashingsVector = U8192;
    type HistoricalRootsLimit = U16777216;
    type ValidatorRegistryLimit = U1099511627776;
    type EpochsPerEth1VotingPeriod = U64;
    type SlotsPerEth1VotingPeriod = U2048;
    type MaxValidatorsPerCommittee = U2048;
    type MaxPendingAttestations = U4096;
    type JustificationBitsLength = U4;
    type MaxProposerSlashings = U16;
    type MaxAttesterSlashings = U2;
    type MaxAttestations = U128;
    type MaxDeposits = U16;
    type MaxVoluntaryExits = U16;
    type SyncCommitteeSize = U512;
    type MaxBytesPerTransaction = U1073741824;
    type MaxTransactionsPerPayload = U1048576;
    type BytesPerLogsBloom = U256;
    type MaxExtraDataBytes = U32;
    type MaxBlsToExecutionChanges = U16;
    type MaxWithdrawalsPerPayload = U16;
    type MaxBlobCommitmentsPerBlock = U4096;

    fn name() -> PresetName {
        PresetName::Mainnet
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minimal;

impl Preset for Minimal {
    type SlotsPerEpoch = U8;
    type SlotsPerHistoricalRoot = U64;
    type EpochsPerHistoricalVector = U64;
    type EpochsPerSlashingsVector = U64;
    type HistoricalRootsLimit = U16777216;
    type ValidatorRegistryLimit = U1099511627776;
    type EpochsPerEth1VotingPeriod = U4;
    type SlotsPerEth1VotingPeriod = U32;
    type MaxValidatorsPerCommittee = U2048;
    type MaxPendingAttestations = U1024;
    type JustificationBitsLength = U4;
    type MaxProposerSlashings = U16;
    type MaxAttesterSlashings = U2;
    type MaxAttestations = U128;
    type MaxDeposits = U16;
    type MaxVoluntaryExits = U16;
    type SyncCommitteeSize = U32;
    type MaxBytesPerTransaction = U1073741824;
    type MaxTransactionsPerPayload = U1048576;
    type BytesPerLogsBloom = U256;
    type MaxExtraDataBytes = U32;
    type MaxBlsToExecutionChanges = U16;
    type MaxWithdrawalsPerPayload = U4;
    type MaxBlobCommitmentsPerBlock = U16;

    fn name() -> PresetName {
        PresetName::Minimal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_lengths_are_consistent() {
        assert_eq!(
            Mainnet::slots_per_eth1_voting_period(),
            Mainnet::epochs_per_eth1_voting_period() * Mainnet::slots_per_epoch()
        );
        assert_eq!(
            Minimal::slots_per_eth1_voting_period(),
            Minimal::epochs_per_eth1_voting_period() * Minimal::slots_per_epoch()
        );
        assert_eq!(
            <Mainnet as Preset>::MaxPendingAttestations::to_u64(),
            <Mainnet as Preset>::MaxAttestations::to_u64() * Mainnet::slots_per_epoch()
        );
        assert_eq!(
            <Minimal as Preset>::MaxPendingAttestations::to_u64(),
            <Minimal as Preset>::MaxAttestations::to_u64() * Minimal::slots_per_epoch()
        );
    }

    #[test]
    fn preset_names_parse() {
        assert_eq!("mainnet".parse::<PresetName>().unwrap(), PresetName::Mainnet);
        assert_eq!("minimal".parse::<PresetName>().unwrap(), PresetName::Minimal);
        assert!("testnet".parse::<PresetName>().is_err());
    }
}
