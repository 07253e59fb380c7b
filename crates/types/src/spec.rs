use std::{
    fmt::{self, Debug},
    str::FromStr,
};

use alloy_primitives::aliases::B32;
use serde::{Deserialize, Serialize};

use crate::{
    constants::GENESIS_EPOCH,
    preset::{Preset, PresetName},
    primitives::{Epoch, Gwei, Slot, Timestamp, Version},
};

/// The rule sets this library knows how to apply, in activation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkName {
    Phase0,
    Altair,
    Bellatrix,
    Capella,
    Deneb,
}

impl ForkName {
    pub const ALL: [ForkName; 5] = [
        ForkName::Phase0,
        ForkName::Altair,
        ForkName::Bellatrix,
        ForkName::Capella,
        ForkName::Deneb,
    ];

    pub fn next(self) -> Option<ForkName> {
        match self {
            ForkName::Phase0 => Some(ForkName::Altair),
            ForkName::Altair => Some(ForkName::Bellatrix),
            ForkName::Bellatrix => Some(ForkName::Capella),
            ForkName::Capella => Some(ForkName::Deneb),
            ForkName::Deneb => None,
        }
    }
}

impl fmt::Display for ForkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkName::Phase0 => write!(f, "phase0"),
            ForkName::Altair => write!(f, "altair"),
            ForkName::Bellatrix => write!(f, "bellatrix"),
            ForkName::Capella => write!(f, "capella"),
            ForkName::Deneb => write!(f, "deneb"),
        }
    }
}

impl FromStr for ForkName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phase0" => Ok(ForkName::Phase0),
            "altair" => Ok(ForkName::Altair),
            "bellatrix" => Ok(ForkName::Bellatrix),
            "capella" => Ok(ForkName::Capella),
            "deneb" => Ok(ForkName::Deneb),
            other => Err(format!("unknown fork: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Phase0Config {
    // Misc
    pub max_committees_per_slot: u64,
    pub target_committee_size: u64,
    pub shuffle_round_count: u8,
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,

    // Genesis
    pub min_genesis_active_validator_count: u64,
    pub min_genesis_time: Timestamp,
    pub genesis_delay: Timestamp,
    pub genesis_fork_version: Version,

    // Balance math
    pub hysteresis_quotient: u64,
    pub hysteresis_downward_multiplier: u64,
    pub hysteresis_upward_multiplier: u64,

    // Gwei values
    pub min_deposit_amount: Gwei,
    pub max_effective_balance: Gwei,
    pub ejection_balance: Gwei,
    pub effective_balance_increment: Gwei,

    // Time parameters
    pub seconds_per_slot: Timestamp,
    pub min_attestation_inclusion_delay: Slot,
    pub min_seed_lookahead: Epoch,
    pub max_seed_lookahead: Epoch,
    pub min_validator_withdrawability_delay: Epoch,
    pub shard_committee_period: Epoch,
    pub min_epochs_to_inactivity_penalty: Epoch,

    // Reward and penalty quotients
    pub base_reward_factor: u64,
    pub whistleblower_reward_quotient: u64,
    pub proposer_reward_quotient: u64,
    pub inactivity_penalty_quotient: u64,
    pub min_slashing_penalty_quotient: u64,
    pub proportional_slashing_multiplier: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AltairConfig {
    pub altair_fork_version: Version,
    pub altair_fork_epoch: Epoch,

    pub inactivity_penalty_quotient_altair: u64,
    pub min_slashing_penalty_quotient_altair: u64,
    pub proportional_slashing_multiplier_altair: u64,

    pub inactivity_score_bias: u64,
    pub inactivity_score_recovery_rate: u64,

    pub epochs_per_sync_committee_period: Epoch,
    pub min_sync_committee_participants: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BellatrixConfig {
    pub bellatrix_fork_version: Version,
    pub bellatrix_fork_epoch: Epoch,

    pub inactivity_penalty_quotient_bellatrix: u64,
    pub min_slashing_penalty_quotient_bellatrix: u64,
    pub proportional_slashing_multiplier_bellatrix: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapellaConfig {
    pub capella_fork_version: Version,
    pub capella_fork_epoch: Epoch,

    pub max_validators_per_withdrawals_sweep: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenebConfig {
    pub deneb_fork_version: Version,
    pub deneb_fork_epoch: Epoch,

    pub max_blobs_per_block: u64,
    pub max_per_epoch_activation_churn_limit: u64,
}

/// Flat view over the per-fork config blocks. Shared-read by any number of
/// states; every transition entry point takes it as an argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub preset_base: PresetName,

    #[serde(flatten)]
    pub phase0: Phase0Config,
    #[serde(flatten)]
    pub altair: AltairConfig,
    #[serde(flatten)]
    pub bellatrix: BellatrixConfig,
    #[serde(flatten)]
    pub capella: CapellaConfig,
    #[serde(flatten)]
    pub deneb: DenebConfig,
}

impl Spec {
    pub fn from_configs(
        preset_base: PresetName,
        phase0: Phase0Config,
        altair: AltairConfig,
        bellatrix: BellatrixConfig,
        capella: CapellaConfig,
        deneb: DenebConfig,
    ) -> Spec {
        Spec {
            preset_base,
            phase0,
            altair,
            bellatrix,
            capella,
            deneb,
        }
    }

    pub fn mainnet() -> Spec {
        Spec {
            preset_base: PresetName::Mainnet,
            phase0: Phase0Config {
                max_committees_per_slot: 64,
                target_committee_size: 128,
                shuffle_round_count: 90,
                min_per_epoch_churn_limit: 4,
                churn_limit_quotient: 1 << 16,
                min_genesis_active_validator_count: 1 << 14,
                min_genesis_time: 1_606_824_000,
                genesis_delay: 604_800,
                genesis_fork_version: B32::new([0x00, 0x00, 0x00, 0x00]),
                hysteresis_quotient: 4,
                hysteresis_downward_multiplier: 1,
                hysteresis_upward_multiplier: 5,
                min_deposit_amount: 1_000_000_000,
                max_effective_balance: 32_000_000_000,
                ejection_balance: 16_000_000_000,
                effective_balance_increment: 1_000_000_000,
                seconds_per_slot: 12,
                min_attestation_inclusion_delay: 1,
                min_seed_lookahead: 1,
                max_seed_lookahead: 4,
                min_validator_withdrawability_delay: 256,
                shard_committee_period: 256,
                min_epochs_to_inactivity_penalty: 4,
                base_reward_factor: 64,
                whistleblower_reward_quotient: 512,
                proposer_reward_quotient: 8,
                inactivity_penalty_quotient: 1 << 26,
                min_slashing_penalty_quotient: 128,
                proportional_slashing_multiplier: 1,
            },
            altair: AltairConfig {
                altair_fork_version: B32::new([0x01, 0x00, 0x00, 0x00]),
                altair_fork_epoch: 74_240,
                inactivity_penalty_quotient_altair: 3 * (1 << 24),
                min_slashing_penalty_quotient_altair: 64,
                proportional_slashing_multiplier_altair: 2,
                inactivity_score_bias: 4,
                inactivity_score_recovery_rate: 16,
                epochs_per_sync_committee_period: 256,
                min_sync_committee_participants: 1,
            },
            bellatrix: BellatrixConfig {
                bellatrix_fork_version: B32::new([0x02, 0x00, 0x00, 0x00]),
                bellatrix_fork_epoch: 144_896,
                inactivity_penalty_quotient_bellatrix: 1 << 24,
                min_slashing_penalty_quotient_bellatrix: 32,
                proportional_slashing_multiplier_bellatrix: 3,
            },
            capella: CapellaConfig {
                capella_fork_version: B32::new([0x03, 0x00, 0x00, 0x00]),
                capella_fork_epoch: 194_048,
                max_validators_per_withdrawals_sweep: 16_384,
            },
            deneb: DenebConfig {
                deneb_fork_version: B32::new([0x04, 0x00, 0x00, 0x00]),
                deneb_fork_epoch: 269_568,
                max_blobs_per_block: 6,
                max_per_epoch_activation_churn_limit: 8,
            },
        }
    }

    pub fn minimal() -> Spec {
        let mainnet = Spec::mainnet();
        Spec {
            preset_base: PresetName::Minimal,
            phase0: Phase0Config {
                max_committees_per_slot: 4,
                target_committee_size: 4,
                shuffle_round_count: 10,
                min_per_epoch_churn_limit: 2,
                churn_limit_quotient: 32,
                min_genesis_active_validator_count: 64,
                min_genesis_time: 1_578_009_600,
                genesis_delay: 300,
                genesis_fork_version: B32::new([0x00, 0x00, 0x00, 0x01]),
                seconds_per_slot: 6,
                ..mainnet.phase0
            },
            altair: AltairConfig {
                altair_fork_version: B32::new([0x01, 0x00, 0x00, 0x01]),
                altair_fork_epoch: u64::MAX,
                epochs_per_sync_committee_period: 8,
                ..mainnet.altair
            },
            bellatrix: BellatrixConfig {
                bellatrix_fork_version: B32::new([0x02, 0x00, 0x00, 0x01]),
                bellatrix_fork_epoch: u64::MAX,
                ..mainnet.bellatrix
            },
            capella: CapellaConfig {
                capella_fork_version: B32::new([0x03, 0x00, 0x00, 0x01]),
                capella_fork_epoch: u64::MAX,
                max_validators_per_withdrawals_sweep: 16,
            },
            deneb: DenebConfig {
                deneb_fork_version: B32::new([0x04, 0x00, 0x00, 0x01]),
                deneb_fork_epoch: u64::MAX,
                ..mainnet.deneb
            },
        }
    }

    /// The epoch at which ``fork`` activates; `u64::MAX` disables a fork.
    pub fn fork_epoch(&self, fork: ForkName) -> Epoch {
        match fork {
            ForkName::Phase0 => GENESIS_EPOCH,
            ForkName::Altair => self.altair.altair_fork_epoch,
            ForkName::Bellatrix => self.bellatrix.bellatrix_fork_epoch,
            ForkName::Capella => self.capella.capella_fork_epoch,
            ForkName::Deneb => self.deneb.deneb_fork_epoch,
        }
    }

    pub fn fork_version(&self, fork: ForkName) -> Version {
        match fork {
            ForkName::Phase0 => self.phase0.genesis_fork_version,
            ForkName::Altair => self.altair.altair_fork_version,
            ForkName::Bellatrix => self.bellatrix.bellatrix_fork_version,
            ForkName::Capella => self.capella.capella_fork_version,
            ForkName::Deneb => self.deneb.deneb_fork_version,
        }
    }

    /// The latest fork whose activation epoch is at or before ``epoch``.
    pub fn fork_name_at_epoch(&self, epoch: Epoch) -> ForkName {
        let mut selected = ForkName::Phase0;
        for fork in ForkName::ALL {
            if self.fork_epoch(fork) <= epoch {
                selected = fork;
            }
        }
        selected
    }

    pub fn fork_name_at_slot<P: Preset>(&self, slot: Slot) -> ForkName {
        self.fork_name_at_epoch(slot / P::slots_per_epoch())
    }

    pub fn inactivity_penalty_quotient_for(&self, fork: ForkName) -> u64 {
        match fork {
            ForkName::Phase0 => self.phase0.inactivity_penalty_quotient,
            ForkName::Altair => self.altair.inactivity_penalty_quotient_altair,
            _ => self.bellatrix.inactivity_penalty_quotient_bellatrix,
        }
    }

    pub fn min_slashing_penalty_quotient_for(&self, fork: ForkName) -> u64 {
        match fork {
            ForkName::Phase0 => self.phase0.min_slashing_penalty_quotient,
            ForkName::Altair => self.altair.min_slashing_penalty_quotient_altair,
            _ => self.bellatrix.min_slashing_penalty_quotient_bellatrix,
        }
    }

    pub fn proportional_slashing_multiplier_for(&self, fork: ForkName) -> u64 {
        match fork {
            ForkName::Phase0 => self.phase0.proportional_slashing_multiplier,
            ForkName::Altair => self.altair.proportional_slashing_multiplier_altair,
            _ => self.bellatrix.proportional_slashing_multiplier_bellatrix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_schedule_is_ordered_on_mainnet() {
        let spec = Spec::mainnet();
        let epochs = ForkName::ALL.map(|fork| spec.fork_epoch(fork));
        assert!(epochs.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn disabled_forks_never_selected() {
        let spec = Spec::minimal();
        assert_eq!(spec.fork_name_at_epoch(0), ForkName::Phase0);
        assert_eq!(spec.fork_name_at_epoch(u64::MAX - 1), ForkName::Phase0);
    }

    #[test]
    fn fork_selection_tracks_activation_epochs() {
        let mut spec = Spec::minimal();
        spec.altair.altair_fork_epoch = 2;
        spec.bellatrix.bellatrix_fork_epoch = 4;

        assert_eq!(spec.fork_name_at_epoch(1), ForkName::Phase0);
        assert_eq!(spec.fork_name_at_epoch(2), ForkName::Altair);
        assert_eq!(spec.fork_name_at_epoch(3), ForkName::Altair);
        assert_eq!(spec.fork_name_at_epoch(4), ForkName::Bellatrix);
        assert_eq!(spec.fork_name_at_epoch(9_999), ForkName::Bellatrix);
    }
}
