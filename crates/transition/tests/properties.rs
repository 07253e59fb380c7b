//! Cross-cutting properties: canonical encoding round-trips, hash
//! determinism, cache coherence, failure atomicity, cancellation, fork
//! upgrades, and arithmetic safety on a large registry.

mod common;

use cairn_bls::{BlsSignature, PubKey};
use cairn_transition::{
    Cancel, EpochsContext, Error, NullExecutionEngine, VerifySignatures, interop, process_slots,
    state_transition,
};
use cairn_types::{
    BeaconState, Eth1Data, Fork, Minimal, Preset, Root, SignedBeaconBlock, Spec, SyncAggregate,
    altair, phase0,
    constants::{DOMAIN_BEACON_PROPOSER, DOMAIN_RANDAO, FAR_FUTURE_EPOCH},
    misc::compute_signing_root,
    spec::ForkName,
};
use ssz::{Decode, Encode};
use ssz_types::{BitList, FixedVector, VariableList, typenum::{U4, U8}};
use tree_hash::TreeHash;

use common::{GWEI_PER_ETH, build_empty_block, quick_genesis, test_spec};

#[test]
fn state_and_block_encodings_round_trip() {
    let spec = test_spec();
    let (state, _) = quick_genesis(&spec, 32);

    let bytes = state.as_ssz_bytes();
    let decoded = BeaconState::<Minimal>::from_ssz_bytes(&bytes, ForkName::Phase0).unwrap();
    assert_eq!(decoded, state);
    assert_eq!(decoded.tree_hash_root(), state.tree_hash_root());

    // Trailing bytes are not canonical.
    let mut padded = bytes.clone();
    padded.push(0);
    assert!(BeaconState::<Minimal>::from_ssz_bytes(&padded, ForkName::Phase0).is_err());

    let block = build_empty_block(&spec, &state, 1).unwrap();
    let block_bytes = block.as_ssz_bytes();
    let decoded_block =
        SignedBeaconBlock::<Minimal>::from_ssz_bytes(&block_bytes, ForkName::Phase0).unwrap();
    assert_eq!(decoded_block, block);
}

#[test]
fn list_limits_are_enforced_on_construction_and_decode() {
    assert!(VariableList::<u64, U4>::new(vec![0; 5]).is_err());

    let oversized = VariableList::<u64, U8>::new(vec![7; 5]).unwrap();
    let bytes = oversized.as_ssz_bytes();
    assert!(VariableList::<u64, U4>::from_ssz_bytes(&bytes).is_err());
    assert!(VariableList::<u64, U8>::from_ssz_bytes(&bytes).is_ok());

    assert!(BitList::<U4>::with_capacity(5).is_err());
}

#[test]
fn equal_states_hash_equally_regardless_of_history() {
    let spec = test_spec();
    let (state_a, _) = quick_genesis(&spec, 32);
    let (state_b, _) = quick_genesis(&spec, 32);

    assert_eq!(state_a, state_b);
    assert_eq!(state_a.tree_hash_root(), state_b.tree_hash_root());
    assert_eq!(state_a.clone().tree_hash_root(), state_a.tree_hash_root());
}

#[test]
fn block_application_is_deterministic_and_atomic() {
    let spec = test_spec();
    let (state, _) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();
    let block = build_empty_block(&spec, &state, 1).unwrap();

    let mut run_a = state.clone();
    let mut epc_a = EpochsContext::new(&spec, &run_a).unwrap();
    state_transition(
        &spec,
        &mut epc_a,
        &mut run_a,
        &block,
        true,
        &NullExecutionEngine,
        VerifySignatures::True,
        &cancel,
    )
    .unwrap();

    let mut run_b = state.clone();
    let mut epc_b = EpochsContext::new(&spec, &run_b).unwrap();
    state_transition(
        &spec,
        &mut epc_b,
        &mut run_b,
        &block,
        true,
        &NullExecutionEngine,
        VerifySignatures::True,
        &cancel,
    )
    .unwrap();

    assert_eq!(run_a, run_b);
    assert_eq!(run_a.tree_hash_root(), run_b.tree_hash_root());

    // A bad block fails the clone it was applied to; the committed state is
    // whatever the caller kept.
    let pre_root = state.tree_hash_root();
    let bad_block = {
        let SignedBeaconBlock::Phase0(mut inner) = block.clone() else {
            unreachable!();
        };
        inner.message.proposer_index += 1;
        SignedBeaconBlock::Phase0(inner)
    };
    let mut scratch = state.clone();
    let mut scratch_epc = EpochsContext::new(&spec, &scratch).unwrap();
    let err = state_transition(
        &spec,
        &mut scratch_epc,
        &mut scratch,
        &bad_block,
        true,
        &NullExecutionEngine,
        VerifySignatures::False,
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Rule(_)));
    assert_eq!(state.tree_hash_root(), pre_root);
}

#[test]
fn epochs_context_matches_a_fresh_recomputation() {
    let spec = test_spec();
    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();

    process_slots(&spec, &mut epc, &mut state, 20, &cancel).unwrap();

    let fresh = EpochsContext::new(&spec, &state).unwrap();
    assert_eq!(fresh.proposers, epc.proposers);
    assert_eq!(fresh.effective_balances, epc.effective_balances);
    assert_eq!(fresh.pubkey_to_index.len(), epc.pubkey_to_index.len());
    assert_eq!(fresh.current.epoch, epc.current.epoch);
    assert_eq!(fresh.current.shuffling, epc.current.shuffling);
    assert_eq!(fresh.previous.shuffling, epc.previous.shuffling);

    for slot in 16..20 {
        assert_eq!(
            fresh.get_beacon_committee::<Minimal>(slot, 0).unwrap(),
            epc.get_beacon_committee::<Minimal>(slot, 0).unwrap()
        );
    }
}

#[test]
fn cancellation_stops_before_any_slot_is_processed() {
    let spec = test_spec();
    let (mut state, mut epc) = quick_genesis(&spec, 32);

    let cancel = Cancel::never();
    cancel.trigger();

    let before = state.tree_hash_root();
    let err = process_slots(&spec, &mut epc, &mut state, 8, &cancel).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(state.slot(), 0);
    assert_eq!(state.tree_hash_root(), before);
}

#[test]
fn scheduled_forks_upgrade_the_state_in_sequence() {
    let mut spec = test_spec();
    spec.altair.altair_fork_epoch = 1;
    spec.bellatrix.bellatrix_fork_epoch = 2;
    spec.capella.capella_fork_epoch = 3;
    spec.deneb.deneb_fork_epoch = 4;

    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();
    let slots_per_epoch = Minimal::slots_per_epoch();

    process_slots(&spec, &mut epc, &mut state, slots_per_epoch, &cancel).unwrap();
    assert_eq!(state.fork_name(), ForkName::Altair);
    assert_eq!(state.fork().current_version, spec.altair.altair_fork_version);
    assert_eq!(
        state.previous_epoch_participation().unwrap().len(),
        state.validators().len()
    );
    let committee = state.current_sync_committee().unwrap();
    assert_eq!(
        committee.pubkeys.len() as u64,
        Minimal::sync_committee_size()
    );
    assert_eq!(committee, state.next_sync_committee().unwrap());

    // An empty Altair block carries the infinity-signed empty aggregate.
    let altair_block = build_empty_altair_block(&spec, &state, slots_per_epoch + 1).unwrap();
    state_transition(
        &spec,
        &mut epc,
        &mut state,
        &altair_block,
        true,
        &NullExecutionEngine,
        VerifySignatures::True,
        &cancel,
    )
    .unwrap();

    process_slots(&spec, &mut epc, &mut state, 2 * slots_per_epoch, &cancel).unwrap();
    assert_eq!(state.fork_name(), ForkName::Bellatrix);

    process_slots(&spec, &mut epc, &mut state, 3 * slots_per_epoch, &cancel).unwrap();
    assert_eq!(state.fork_name(), ForkName::Capella);
    assert_eq!(*state.next_withdrawal_index().unwrap(), 0);

    process_slots(&spec, &mut epc, &mut state, 4 * slots_per_epoch, &cancel).unwrap();
    assert_eq!(state.fork_name(), ForkName::Deneb);
    assert_eq!(
        state.fork().previous_version,
        spec.capella.capella_fork_version
    );
}

fn build_empty_altair_block(
    spec: &Spec,
    state: &BeaconState<Minimal>,
    slot: u64,
) -> Result<SignedBeaconBlock<Minimal>, Error> {
    let cancel = Cancel::never();

    let mut scratch = state.clone();
    let mut scratch_epc = EpochsContext::new(spec, &scratch)?;
    if scratch.slot() < slot {
        process_slots(spec, &mut scratch_epc, &mut scratch, slot, &cancel)?;
    }
    let parent_root = scratch.latest_block_header().tree_hash_root();
    let proposer_index = scratch_epc.get_beacon_proposer::<Minimal>(slot)?;

    let epoch = scratch.current_epoch();
    let randao_domain = scratch.get_domain(DOMAIN_RANDAO, epoch);
    let randao_reveal = interop::keypair(proposer_index)
        .0
        .sign(compute_signing_root(&epoch, randao_domain).as_slice())?;

    let mut message = altair::BeaconBlock::<Minimal> {
        slot,
        proposer_index,
        parent_root,
        state_root: Root::ZERO,
        body: altair::BeaconBlockBody {
            randao_reveal,
            eth1_data: scratch.eth1_data().clone(),
            graffiti: Root::ZERO,
            proposer_slashings: Default::default(),
            attester_slashings: Default::default(),
            attestations: Default::default(),
            deposits: Default::default(),
            voluntary_exits: Default::default(),
            sync_aggregate: SyncAggregate::empty(),
        },
    };

    let mut post = state.clone();
    let mut post_epc = EpochsContext::new(spec, &post)?;
    state_transition(
        spec,
        &mut post_epc,
        &mut post,
        &SignedBeaconBlock::Altair(altair::SignedBeaconBlock {
            message: message.clone(),
            signature: BlsSignature::default(),
        }),
        false,
        &NullExecutionEngine,
        VerifySignatures::False,
        &cancel,
    )?;
    message.state_root = post.tree_hash_root();

    let proposer_domain = post.get_domain(DOMAIN_BEACON_PROPOSER, epoch);
    let signature = interop::keypair(proposer_index)
        .0
        .sign(compute_signing_root(&message, proposer_domain).as_slice())?;

    Ok(SignedBeaconBlock::Altair(altair::SignedBeaconBlock {
        message,
        signature,
    }))
}

#[test]
fn withdrawal_sweep_finds_full_and_partial_withdrawals() {
    let mut spec = test_spec();
    spec.altair.altair_fork_epoch = 1;
    spec.bellatrix.bellatrix_fork_epoch = 2;
    spec.capella.capella_fork_epoch = 3;

    let (mut state, mut epc) = quick_genesis(&spec, 32);
    let cancel = Cancel::never();
    process_slots(
        &spec,
        &mut epc,
        &mut state,
        3 * Minimal::slots_per_epoch(),
        &cancel,
    )
    .unwrap();
    assert_eq!(state.fork_name(), ForkName::Capella);

    let eth1_credentials = |address_byte: u8| {
        let mut credentials = [0u8; 32];
        credentials[0] = 0x01;
        credentials[12..].fill(address_byte);
        Root::from(credentials)
    };

    // Validator 0: balance above the cap, partially withdrawable.
    state.validators_mut()[0].withdrawal_credentials = eth1_credentials(0xaa);
    state.balances_mut()[0] = 40 * GWEI_PER_ETH;
    // Validator 1: past its withdrawable epoch, fully withdrawable.
    state.validators_mut()[1].withdrawal_credentials = eth1_credentials(0xbb);
    state.validators_mut()[1].withdrawable_epoch = 0;

    let withdrawals =
        cairn_transition::block::withdrawals::get_expected_withdrawals(&spec, &state).unwrap();
    assert_eq!(withdrawals.len(), 2);

    assert_eq!(withdrawals[0].index, 0);
    assert_eq!(withdrawals[0].validator_index, 0);
    assert_eq!(withdrawals[0].amount, 8 * GWEI_PER_ETH);

    assert_eq!(withdrawals[1].index, 1);
    assert_eq!(withdrawals[1].validator_index, 1);
    assert_eq!(withdrawals[1].amount, state.balances()[1]);
}

#[test]
fn epoch_processing_is_overflow_safe_on_a_large_registry() {
    let spec = Spec::minimal();
    let validator_count = 1usize << 20;
    let epoch = 3u64;
    let slot = epoch * Minimal::slots_per_epoch() + Minimal::slots_per_epoch() - 1;

    let mut validators = Vec::with_capacity(validator_count);
    let mut balances = Vec::with_capacity(validator_count);
    for index in 0..validator_count {
        // Synthetic unique keys; nothing in epoch processing decompresses
        // them.
        let mut key_bytes = vec![0u8; 48];
        key_bytes[..8].copy_from_slice(&(index as u64).to_le_bytes());
        let slashed = index % 1024 == 0;
        validators.push(cairn_types::Validator {
            pubkey: PubKey {
                inner: FixedVector::from(key_bytes),
            },
            withdrawal_credentials: Root::ZERO,
            effective_balance: 32 * GWEI_PER_ETH,
            slashed,
            activation_eligibility_epoch: 0,
            activation_epoch: 0,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: if slashed {
                epoch + Minimal::epochs_per_slashings_vector() / 2
            } else {
                FAR_FUTURE_EPOCH
            },
        });
        balances.push(32 * GWEI_PER_ETH);
    }

    let total_balance = 32 * GWEI_PER_ETH * validator_count as u64;
    let mut slashings = vec![0u64; Minimal::epochs_per_slashings_vector() as usize];
    slashings[0] = total_balance;

    let mut state = BeaconState::Phase0(phase0::BeaconState::<Minimal> {
        genesis_time: 0,
        genesis_validators_root: Root::ZERO,
        slot,
        fork: Fork::default(),
        latest_block_header: Default::default(),
        block_roots: Default::default(),
        state_roots: Default::default(),
        historical_roots: Default::default(),
        eth1_data: Eth1Data::default(),
        eth1_data_votes: Default::default(),
        eth1_deposit_index: validator_count as u64,
        validators: VariableList::new(validators).unwrap(),
        balances: VariableList::new(balances).unwrap(),
        randao_mixes: Default::default(),
        slashings: FixedVector::new(slashings).unwrap(),
        previous_epoch_attestations: Default::default(),
        current_epoch_attestations: Default::default(),
        justification_bits: Default::default(),
        previous_justified_checkpoint: Default::default(),
        current_justified_checkpoint: Default::default(),
        finalized_checkpoint: Default::default(),
    });

    let epc = EpochsContext::new(&spec, &state).unwrap();
    cairn_transition::epoch::process_epoch(&spec, &epc, &mut state, &Cancel::never()).unwrap();

    // An unslashed validator that attested nothing loses exactly the three
    // expected-duty base rewards.
    let previous_active_balance = total_balance;
    let base_reward = 32 * GWEI_PER_ETH * spec.phase0.base_reward_factor
        / cairn_types::misc::integer_squareroot(previous_active_balance)
        / cairn_types::constants::BASE_REWARDS_PER_EPOCH;
    assert_eq!(state.balances()[1], 32 * GWEI_PER_ETH - 3 * base_reward);

    // Slashed validators at the window midpoint additionally burn the whole
    // correlated penalty.
    assert!(state.balances()[0] < state.balances()[1]);
}
