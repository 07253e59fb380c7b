//! End-to-end scenarios driving the public entry points the way a consensus
//! client would.

mod common;

use cairn_transition::{
    Cancel, EpochsContext, Error, VerifySignatures,
    block::operations,
    interop, process_slots,
};
use cairn_types::{
    Attestation, AttestationData, BeaconBlockHeader, Checkpoint, Eth1Data, Minimal, Preset,
    ProposerSlashing, Root, SignedBeaconBlockHeader, SignedVoluntaryExit, VoluntaryExit,
    constants::FAR_FUTURE_EPOCH,
    misc::{compute_activation_exit_epoch, integer_squareroot},
};
use cairn_merkle::{mix_in_length, padded_root};
use ssz_types::BitList;
use tree_hash::TreeHash;

use common::{GWEI_PER_ETH, build_empty_block, quick_genesis, test_spec};

#[test]
fn genesis_chain_advances_with_one_proposer_per_slot() {
    let spec = test_spec();
    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();

    assert!(cairn_transition::is_valid_genesis_state(&spec, &state));
    assert_eq!(state.validators().len(), 32);
    assert_eq!(state.get_active_validator_indices(0).len(), 32);

    for target_slot in 1..=32 {
        let proposer = epc
            .get_beacon_proposer::<Minimal>(state.slot())
            .expect("every slot has exactly one proposer");
        assert!((proposer as usize) < state.validators().len());
        process_slots(&spec, &mut epc, &mut state, target_slot, &cancel).unwrap();
    }

    assert_eq!(state.slot(), 32);
    assert_eq!(state.finalized_checkpoint().epoch, 0);
}

#[test]
fn empty_blocks_apply_and_commit_their_state_root() {
    let spec = test_spec();
    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();

    for slot in 1..=3 {
        let block = build_empty_block(&spec, &state, slot).unwrap();
        cairn_transition::state_transition(
            &spec,
            &mut epc,
            &mut state,
            &block,
            true,
            &cairn_transition::NullExecutionEngine,
            VerifySignatures::True,
            &cancel,
        )
        .unwrap();
        assert_eq!(state.slot(), slot);
    }
}

#[test]
fn attestation_rewards_the_inclusion_proposer() {
    let mut spec = test_spec();
    // One committee of eight per slot.
    spec.phase0.target_committee_size = 8;
    let (mut state, mut epc) = quick_genesis(&spec, 64);
    let cancel = Cancel::never();

    process_slots(&spec, &mut epc, &mut state, 2, &cancel).unwrap();

    let attestation_slot = 1;
    let committee = epc
        .get_beacon_committee::<Minimal>(attestation_slot, 0)
        .unwrap()
        .to_vec();
    assert_eq!(committee.len(), 8);

    let inclusion_proposer = epc.get_beacon_proposer::<Minimal>(state.slot()).unwrap();

    // Aim for committee positions {2, 5, 7}; dodge the inclusion proposer so
    // the reward accounting below stays isolated.
    let mut positions: Vec<usize> = [2usize, 5, 7]
        .into_iter()
        .filter(|&position| committee[position] != inclusion_proposer)
        .collect();
    for position in 0..committee.len() {
        if positions.len() == 3 {
            break;
        }
        if !positions.contains(&position) && committee[position] != inclusion_proposer {
            positions.push(position);
        }
    }
    positions.sort_unstable();
    assert_eq!(positions.len(), 3);

    let data = AttestationData {
        slot: attestation_slot,
        index: 0,
        beacon_block_root: state.get_block_root_at_slot(attestation_slot).unwrap(),
        source: state.current_justified_checkpoint(),
        target: Checkpoint {
            epoch: 0,
            root: state.get_block_root(0).unwrap(),
        },
    };

    let mut aggregation_bits =
        BitList::<<Minimal as Preset>::MaxValidatorsPerCommittee>::with_capacity(committee.len())
            .unwrap();
    let mut attesters = Vec::new();
    for &position in &positions {
        aggregation_bits.set(position, true).unwrap();
        attesters.push(committee[position]);
    }

    let signature = interop::sign_attestation_data(&state, &data, &attesters).unwrap();
    let attestation = Attestation::<Minimal> {
        aggregation_bits,
        data,
        signature,
    };

    let state_without = state.clone();
    operations::process_attestation(&spec, &epc, &mut state, &attestation, VerifySignatures::True)
        .unwrap();

    let pending = state.current_epoch_attestations().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].inclusion_delay, 1);
    assert_eq!(pending[0].proposer_index, inclusion_proposer);

    // Advance both timelines through the epoch that pays attestation
    // rewards and compare the proposer's balance.
    let mut with = state.clone();
    let mut with_epc = EpochsContext::new(&spec, &with).unwrap();
    process_slots(&spec, &mut with_epc, &mut with, 16, &cancel).unwrap();

    let mut without = state_without;
    let mut without_epc = EpochsContext::new(&spec, &without).unwrap();
    process_slots(&spec, &mut without_epc, &mut without, 16, &cancel).unwrap();

    let previous_total_active = 64 * 32 * GWEI_PER_ETH;
    let base_reward = 32 * GWEI_PER_ETH * spec.phase0.base_reward_factor
        / integer_squareroot(previous_total_active)
        / cairn_types::constants::BASE_REWARDS_PER_EPOCH;
    let expected_bonus = 3 * (base_reward / spec.phase0.proposer_reward_quotient);

    let with_balance = with.balances()[inclusion_proposer as usize];
    let without_balance = without.balances()[inclusion_proposer as usize];
    assert_eq!(with_balance - without_balance, expected_bonus);
}

#[test]
fn proposer_slashing_burns_and_schedules_the_exit() {
    let spec = test_spec();
    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();

    process_slots(&spec, &mut epc, &mut state, 10, &cancel).unwrap();
    let slot_proposer = epc.get_beacon_proposer::<Minimal>(10).unwrap();
    let target: u64 = if slot_proposer == 3 { 4 } else { 3 };

    let header = |body_root: Root| BeaconBlockHeader {
        slot: 10,
        proposer_index: target,
        parent_root: Root::repeat_byte(0x22),
        state_root: Root::repeat_byte(0x33),
        body_root,
    };
    let header_1 = header(Root::repeat_byte(0x44));
    let header_2 = header(Root::repeat_byte(0x55));

    let slashing = ProposerSlashing {
        signed_header_1: SignedBeaconBlockHeader {
            signature: interop::sign_block_header(&state, &header_1).unwrap(),
            message: header_1,
        },
        signed_header_2: SignedBeaconBlockHeader {
            signature: interop::sign_block_header(&state, &header_2).unwrap(),
            message: header_2,
        },
    };

    let effective_balance = state.validators()[target as usize].effective_balance;
    let slashings_before: u64 = state.slashings().iter().sum();
    let target_balance_before = state.balances()[target as usize];
    let proposer_balance_before = state.balances()[slot_proposer as usize];

    operations::process_proposer_slashing(&spec, &epc, &mut state, &slashing, VerifySignatures::True)
        .unwrap();

    let slashed = &state.validators()[target as usize];
    assert!(slashed.slashed);
    assert_eq!(
        slashed.exit_epoch,
        compute_activation_exit_epoch(&spec, state.current_epoch())
    );
    assert_eq!(
        slashed.withdrawable_epoch,
        slashed.exit_epoch + spec.phase0.min_validator_withdrawability_delay
    );

    let slashings_after: u64 = state.slashings().iter().sum();
    assert_eq!(slashings_after - slashings_before, effective_balance);
    assert_eq!(
        target_balance_before - state.balances()[target as usize],
        effective_balance / spec.phase0.min_slashing_penalty_quotient
    );
    // The proposer doubles as the whistleblower and keeps the whole reward.
    assert_eq!(
        state.balances()[slot_proposer as usize] - proposer_balance_before,
        effective_balance / spec.phase0.whistleblower_reward_quotient
    );

    // A second slashing of the same validator no longer finds it slashable.
    let err = operations::process_proposer_slashing(
        &spec,
        &epc,
        &mut state,
        &slashing,
        VerifySignatures::True,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Rule(_)));
}

#[test]
fn voluntary_exit_epochs_must_match_the_current_epoch() {
    let mut spec = test_spec();
    spec.phase0.shard_committee_period = 0;
    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();

    process_slots(&spec, &mut epc, &mut state, 16, &cancel).unwrap();
    assert_eq!(state.current_epoch(), 2);

    // Declared for a past epoch: rejected.
    let stale_exit = VoluntaryExit {
        epoch: 1,
        validator_index: 5,
    };
    let signed_stale = SignedVoluntaryExit {
        signature: interop::sign_voluntary_exit(&state, &stale_exit).unwrap(),
        message: stale_exit,
    };
    let err = operations::process_voluntary_exit(
        &spec,
        &mut state,
        &signed_stale,
        VerifySignatures::True,
    )
    .unwrap_err();
    match err {
        Error::Rule(message) => assert!(message.contains("past")),
        other => panic!("expected a rule rejection, got {other:?}"),
    }
    assert_eq!(state.validators()[5].exit_epoch, FAR_FUTURE_EPOCH);

    // Declared for the epoch being processed: accepted.
    let exit = VoluntaryExit {
        epoch: 2,
        validator_index: 5,
    };
    let signed = SignedVoluntaryExit {
        signature: interop::sign_voluntary_exit(&state, &exit).unwrap(),
        message: exit,
    };
    operations::process_voluntary_exit(&spec, &mut state, &signed, VerifySignatures::True).unwrap();

    let validator = &state.validators()[5];
    assert_eq!(
        validator.exit_epoch,
        compute_activation_exit_epoch(&spec, 2)
    );
    assert_eq!(
        validator.withdrawable_epoch,
        validator.exit_epoch + spec.phase0.min_validator_withdrawability_delay
    );
}

#[test]
fn deposits_tolerate_bad_signatures_only_for_known_keys() {
    let spec = test_spec();
    let (mut state, mut epc) = quick_genesis(&spec, 32);

    let amounts = vec![32 * GWEI_PER_ETH; 32];
    let mut leaves: Vec<Root> = interop::genesis_deposits(&spec, &amounts)
        .unwrap()
        .iter()
        .map(|deposit| deposit.data.tree_hash_root())
        .collect();

    // Top-up for validator 0 whose proof of possession is garbage.
    let mut top_up = interop::deposit_data(&spec, 0, 7 * GWEI_PER_ETH);
    top_up.signature = interop::keypair(9).0.sign(b"unrelated message").unwrap();
    leaves.push(top_up.tree_hash_root());

    *state.eth1_data_mut() = Eth1Data {
        deposit_root: mix_in_length(padded_root(&leaves, 32).unwrap(), leaves.len() as u64),
        deposit_count: leaves.len() as u64,
        block_hash: Root::repeat_byte(0x42),
    };

    let deposit =
        interop::deposit_with_proof(top_up, &leaves, 32, leaves.len() as u64).unwrap();
    let balance_before = state.balances()[0];

    operations::process_deposit(&spec, &mut epc, &mut state, &deposit).unwrap();

    assert_eq!(state.validators().len(), 32);
    assert_eq!(state.balances()[0] - balance_before, 7 * GWEI_PER_ETH);
    assert_eq!(state.eth1_deposit_index(), 33);

    // The same bad signature on a fresh key creates nothing, but the
    // deposit is still consumed.
    let mut fresh = interop::deposit_data(&spec, 40, 32 * GWEI_PER_ETH);
    fresh.signature = interop::keypair(9).0.sign(b"unrelated message").unwrap();
    leaves.push(fresh.tree_hash_root());
    *state.eth1_data_mut() = Eth1Data {
        deposit_root: mix_in_length(padded_root(&leaves, 32).unwrap(), leaves.len() as u64),
        deposit_count: leaves.len() as u64,
        block_hash: Root::repeat_byte(0x42),
    };
    let deposit = interop::deposit_with_proof(fresh, &leaves, 33, leaves.len() as u64).unwrap();

    operations::process_deposit(&spec, &mut epc, &mut state, &deposit).unwrap();
    assert_eq!(state.validators().len(), 32);
    assert_eq!(state.eth1_deposit_index(), 34);
}

#[test]
fn inactivity_leak_decays_balances_without_finalizing() {
    let spec = test_spec();
    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();

    let initial_balance = state.balances()[0];
    let mut last_balance = initial_balance;

    for epoch in 1..=48u64 {
        process_slots(
            &spec,
            &mut epc,
            &mut state,
            epoch * Minimal::slots_per_epoch(),
            &cancel,
        )
        .unwrap();

        let balance = state.balances()[0];
        assert!(balance <= last_balance, "balances must not grow in a leak");
        last_balance = balance;
    }

    assert_eq!(state.finalized_checkpoint().epoch, 0);
    assert_eq!(state.current_justified_checkpoint().epoch, 0);
    assert!(last_balance < initial_balance);
}
