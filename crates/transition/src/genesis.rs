//! The genesis procedure: fold a deposit log into the first beacon state.

use cairn_merkle::{mix_in_length, padded_root};
use cairn_types::{
    BeaconState, Deposit, Eth1Data, Fork, Preset, Root, Spec, Timestamp,
    constants::{DEPOSIT_CONTRACT_TREE_DEPTH, GENESIS_EPOCH},
    phase0,
};
use ssz_types::FixedVector;
use tree_hash::TreeHash;

use crate::{Error, block::operations, epochs_context::EpochsContext};

/// Build the phase0 genesis state from an eth1 block and its deposit log.
/// The deposit root progresses with every deposit, mirroring how the
/// deposit contract accumulated them.
pub fn initialize_beacon_state_from_eth1<P: Preset>(
    spec: &Spec,
    eth1_block_hash: Root,
    eth1_timestamp: Timestamp,
    deposits: &[Deposit],
) -> Result<BeaconState<P>, Error> {
    let fork = Fork {
        previous_version: spec.phase0.genesis_fork_version,
        current_version: spec.phase0.genesis_fork_version,
        epoch: GENESIS_EPOCH,
    };
    let empty_body_root = phase0::BeaconBlockBody::<P>::default().tree_hash_root();

    let mut state = BeaconState::Phase0(phase0::BeaconState::<P> {
        genesis_time: eth1_timestamp + spec.phase0.genesis_delay,
        genesis_validators_root: Root::ZERO,
        slot: 0,
        fork,
        latest_block_header: cairn_types::BeaconBlockHeader {
            body_root: empty_body_root,
            ..Default::default()
        },
        block_roots: Default::default(),
        state_roots: Default::default(),
        historical_roots: Default::default(),
        eth1_data: Eth1Data {
            deposit_root: Root::ZERO,
            deposit_count: deposits.len() as u64,
            block_hash: eth1_block_hash,
        },
        eth1_data_votes: Default::default(),
        eth1_deposit_index: 0,
        validators: Default::default(),
        balances: Default::default(),
        randao_mixes: FixedVector::from(vec![
            eth1_block_hash;
            P::epochs_per_historical_vector() as usize
        ]),
        slashings: Default::default(),
        previous_epoch_attestations: Default::default(),
        current_epoch_attestations: Default::default(),
        justification_bits: Default::default(),
        previous_justified_checkpoint: Default::default(),
        current_justified_checkpoint: Default::default(),
        finalized_checkpoint: Default::default(),
    });

    // A fresh context over the empty registry; deposits grow it in step.
    let mut epc = EpochsContext::new(spec, &state)?;

    // Process deposits against the progressively grown deposit tree.
    let leaves = deposits
        .iter()
        .map(|deposit| deposit.data.tree_hash_root())
        .collect::<Vec<_>>();
    for (index, deposit) in deposits.iter().enumerate() {
        let partial_root = padded_root(&leaves[..=index], DEPOSIT_CONTRACT_TREE_DEPTH)
            .map_err(|err| Error::Internal(err.to_string()))?;
        state.eth1_data_mut().deposit_root = mix_in_length(partial_root, index as u64 + 1);
        operations::process_deposit(spec, &mut epc, &mut state, deposit)?;
    }

    // Process activations
    for index in 0..state.validators().len() {
        let balance = state.balances()[index];
        let increment = spec.phase0.effective_balance_increment;
        let validator = &mut state.validators_mut()[index];
        validator.effective_balance =
            (balance - balance % increment).min(spec.phase0.max_effective_balance);
        if validator.effective_balance == spec.phase0.max_effective_balance {
            validator.activation_eligibility_epoch = GENESIS_EPOCH;
            validator.activation_epoch = GENESIS_EPOCH;
        }
    }

    // Seal the registry into the genesis root
    let validators_root = state.validators().tree_hash_root();
    *state.genesis_validators_root_mut() = validators_root;

    Ok(state)
}

pub fn is_valid_genesis_state<P: Preset>(spec: &Spec, state: &BeaconState<P>) -> bool {
    if state.genesis_time() < spec.phase0.min_genesis_time {
        return false;
    }
    state.get_active_validator_indices(GENESIS_EPOCH).len() as u64
        >= spec.phase0.min_genesis_active_validator_count
}
