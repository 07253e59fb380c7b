//! Operation processors. Each is a pure transformation of the state; within
//! a block they run in the fixed order proposer slashings, attester
//! slashings, attestations, deposits, voluntary exits, then (Capella
//! onwards) BLS-to-execution changes. The loops check for cancellation
//! between items.

use std::collections::HashSet;

use cairn_bls::{BlsSignature, PubKey};
use cairn_merkle::is_valid_merkle_branch;
use cairn_types::{
    Attestation, AttesterSlashing, BeaconState, Deposit, DepositMessage, IndexedAttestation,
    PendingAttestation, Preset, ProposerSlashing, Root, SignedBLSToExecutionChange,
    SignedBeaconBlock, SignedVoluntaryExit, Slot, Spec, ValidatorIndex,
    constants::{
        BLS_WITHDRAWAL_PREFIX, DEPOSIT_CONTRACT_TREE_DEPTH, DOMAIN_BEACON_ATTESTER,
        DOMAIN_BEACON_PROPOSER, DOMAIN_BLS_TO_EXECUTION_CHANGE, DOMAIN_DEPOSIT,
        DOMAIN_VOLUNTARY_EXIT, ETH1_ADDRESS_WITHDRAWAL_PREFIX, FAR_FUTURE_EPOCH,
        PARTICIPATION_FLAG_WEIGHTS, PROPOSER_WEIGHT, WEIGHT_DENOMINATOR,
    },
    misc::{
        compute_domain, compute_epoch_at_slot, compute_signing_root, integer_squareroot,
        is_sorted_and_unique,
    },
    participation_flags::{add_flag, has_flag},
    spec::ForkName,
};
use ethereum_hashing::hash;
use itertools::Itertools;
use ssz_types::VariableList;
use tree_hash::TreeHash;

use crate::{
    Cancel, Error, VerifySignatures,
    epoch::altair::base_reward_per_increment,
    epochs_context::EpochsContext,
    error::{ensure_rule, ensure_signature},
};

pub fn process_operations<P: Preset>(
    spec: &Spec,
    epc: &mut EpochsContext,
    state: &mut BeaconState<P>,
    block: &SignedBeaconBlock<P>,
    verify: VerifySignatures,
    cancel: &Cancel,
) -> Result<(), Error> {
    // Every pending eth1 deposit must be drained at the maximum rate.
    let expected_deposits = P::max_deposits().min(
        state
            .eth1_data()
            .deposit_count
            .saturating_sub(state.eth1_deposit_index()),
    );
    ensure_rule!(
        block.deposits().len() as u64 == expected_deposits,
        "block carries {} deposits, the state requires {expected_deposits}",
        block.deposits().len()
    );

    for proposer_slashing in block.proposer_slashings().iter() {
        cancel.check()?;
        process_proposer_slashing(spec, epc, state, proposer_slashing, verify)?;
    }
    for attester_slashing in block.attester_slashings().iter() {
        cancel.check()?;
        process_attester_slashing(spec, epc, state, attester_slashing, verify)?;
    }
    for attestation in block.attestations().iter() {
        cancel.check()?;
        process_attestation(spec, epc, state, attestation, verify)?;
    }
    for deposit in block.deposits().iter() {
        cancel.check()?;
        process_deposit(spec, epc, state, deposit)?;
    }
    for voluntary_exit in block.voluntary_exits().iter() {
        cancel.check()?;
        process_voluntary_exit(spec, state, voluntary_exit, verify)?;
    }
    if state.fork_name() >= ForkName::Capella {
        for address_change in block.bls_to_execution_changes()?.iter() {
            cancel.check()?;
            process_bls_to_execution_change(spec, state, address_change, verify)?;
        }
    }
    Ok(())
}

pub fn process_proposer_slashing<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    proposer_slashing: &ProposerSlashing,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let header_1 = &proposer_slashing.signed_header_1.message;
    let header_2 = &proposer_slashing.signed_header_2.message;

    // Verify header slots match
    ensure_rule!(header_1.slot == header_2.slot, "slashing headers name different slots");
    // Verify header proposer indices match
    ensure_rule!(
        header_1.proposer_index == header_2.proposer_index,
        "slashing headers name different proposers"
    );
    // Verify the headers are different
    ensure_rule!(header_1 != header_2, "slashing headers are identical");

    let proposer_index = header_1.proposer_index;
    let proposer = state
        .validators()
        .get(proposer_index as usize)
        .ok_or_else(|| Error::Rule(format!("unknown proposer {proposer_index}")))?;
    ensure_rule!(
        proposer.is_slashable_at(state.current_epoch()),
        "proposer {proposer_index} is not slashable"
    );

    if verify.is_true() {
        let pubkey = proposer.pubkey.clone();
        for signed_header in [
            &proposer_slashing.signed_header_1,
            &proposer_slashing.signed_header_2,
        ] {
            let domain = state.get_domain(
                DOMAIN_BEACON_PROPOSER,
                compute_epoch_at_slot::<P>(signed_header.message.slot),
            );
            let signing_root = compute_signing_root(&signed_header.message, domain);
            ensure_signature!(
                signed_header.signature.verify(&pubkey, signing_root.as_slice())?,
                "slashing header signature does not verify"
            );
        }
    }

    let slot_proposer = epc.get_beacon_proposer::<P>(state.slot())?;
    state.slash_validator(spec, proposer_index, None, slot_proposer)?;
    Ok(())
}

pub fn process_attester_slashing<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    attester_slashing: &AttesterSlashing<P>,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    // Double vote, or a surround vote in either direction
    ensure_rule!(
        attestation_1.data.is_slashable_with(&attestation_2.data)
            || attestation_2.data.is_slashable_with(&attestation_1.data),
        "attestations are not mutually slashable"
    );
    validate_indexed_attestation(state, attestation_1, verify)?;
    validate_indexed_attestation(state, attestation_2, verify)?;

    let current_epoch = state.current_epoch();
    let indices_1: HashSet<u64> = attestation_1.attesting_indices.iter().copied().collect();
    let indices_2: HashSet<u64> = attestation_2.attesting_indices.iter().copied().collect();
    let slot_proposer = epc.get_beacon_proposer::<P>(state.slot())?;

    let mut slashed_any = false;
    for &index in indices_1.intersection(&indices_2).sorted() {
        if state.validators()[index as usize].is_slashable_at(current_epoch) {
            state.slash_validator(spec, index, None, slot_proposer)?;
            slashed_any = true;
        }
    }
    ensure_rule!(slashed_any, "no validator in the intersection was slashable");
    Ok(())
}

/// Check an explicit signer set: non-empty, strictly ascending, within the
/// registry, and (when asked) carrying a valid aggregate signature.
pub fn validate_indexed_attestation<P: Preset>(
    state: &BeaconState<P>,
    indexed: &IndexedAttestation<P>,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let indices = &indexed.attesting_indices;
    ensure_rule!(!indices.is_empty(), "attestation has no attesting indices");
    ensure_rule!(
        is_sorted_and_unique(indices),
        "attesting indices are not sorted and unique"
    );
    // The last index bounds all the others.
    let last = indices[indices.len() - 1];
    ensure_rule!(
        state.is_valid_index(last),
        "attesting index {last} is out of range"
    );

    if verify.is_true() {
        let validators = state.validators();
        let pubkeys = indices
            .iter()
            .map(|&index| &validators[index as usize].pubkey)
            .collect::<Vec<_>>();
        let domain = state.get_domain(DOMAIN_BEACON_ATTESTER, indexed.data.target.epoch);
        let signing_root = compute_signing_root(&indexed.data, domain);
        ensure_signature!(
            indexed
                .signature
                .fast_aggregate_verify(&pubkeys, signing_root.as_slice())?,
            "indexed attestation aggregate signature does not verify"
        );
    }
    Ok(())
}

/// The committee members whose aggregation bit is set, in committee order.
pub fn get_attesting_indices<P: Preset>(
    epc: &EpochsContext,
    attestation: &Attestation<P>,
) -> Result<Vec<ValidatorIndex>, Error> {
    let committee = epc.get_beacon_committee::<P>(attestation.data.slot, attestation.data.index)?;
    ensure_rule!(
        attestation.aggregation_bits.len() == committee.len(),
        "aggregation bitfield length {} does not match committee size {}",
        attestation.aggregation_bits.len(),
        committee.len()
    );

    let mut attesting = Vec::new();
    for (position, &index) in committee.iter().enumerate() {
        if attestation
            .aggregation_bits
            .get(position)
            .map_err(|err| Error::Internal(format!("bitfield read failed: {err:?}")))?
        {
            attesting.push(index);
        }
    }
    Ok(attesting)
}

pub fn get_indexed_attestation<P: Preset>(
    epc: &EpochsContext,
    attestation: &Attestation<P>,
) -> Result<IndexedAttestation<P>, Error> {
    let attesting_indices = get_attesting_indices(epc, attestation)?
        .into_iter()
        .sorted()
        .collect::<Vec<_>>();
    Ok(IndexedAttestation {
        attesting_indices: VariableList::new(attesting_indices)
            .map_err(|_| Error::Internal("committee exceeds the attester limit".into()))?,
        data: attestation.data,
        signature: attestation.signature.clone(),
    })
}

pub fn process_attestation<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    attestation: &Attestation<P>,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let data = &attestation.data;
    let current_epoch = state.current_epoch();
    let previous_epoch = state.previous_epoch();

    ensure_rule!(
        data.target.epoch == previous_epoch || data.target.epoch == current_epoch,
        "attestation targets epoch {}, expected {previous_epoch} or {current_epoch}",
        data.target.epoch
    );
    ensure_rule!(
        data.target.epoch == compute_epoch_at_slot::<P>(data.slot),
        "attestation target epoch does not match its slot"
    );
    ensure_rule!(
        data.slot + spec.phase0.min_attestation_inclusion_delay <= state.slot(),
        "attestation for slot {} is included too early",
        data.slot
    );
    if state.fork_name() < ForkName::Deneb {
        ensure_rule!(
            state.slot() <= data.slot + P::slots_per_epoch(),
            "attestation for slot {} is included too late",
            data.slot
        );
    }
    ensure_rule!(
        data.index < epc.get_committee_count_per_slot::<P>(data.target.epoch)?,
        "committee index {} out of range",
        data.index
    );

    // Committee shape; also rejects bitfield length mismatches.
    let attesting_indices = get_attesting_indices(epc, attestation)?;

    if state.fork_name() == ForkName::Phase0 {
        process_attestation_phase0(epc, state, attestation, verify)
    } else {
        process_attestation_altair(spec, epc, state, attestation, &attesting_indices, verify)
    }
}

fn process_attestation_phase0<P: Preset>(
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    attestation: &Attestation<P>,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let data = &attestation.data;
    let (justified_checkpoint, is_current) = if data.target.epoch == state.current_epoch() {
        (state.current_justified_checkpoint(), true)
    } else {
        (state.previous_justified_checkpoint(), false)
    };
    ensure_rule!(
        data.source == justified_checkpoint,
        "attestation source does not match the justified checkpoint"
    );

    validate_indexed_attestation(state, &get_indexed_attestation(epc, attestation)?, verify)?;

    let pending = PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data: *data,
        inclusion_delay: state.slot() - data.slot,
        proposer_index: epc.get_beacon_proposer::<P>(state.slot())?,
    };
    let list = if is_current {
        state.current_epoch_attestations_mut()?
    } else {
        state.previous_epoch_attestations_mut()?
    };
    list.push(pending)
        .map_err(|_| Error::Internal("pending attestation list overflow".into()))?;
    Ok(())
}

fn process_attestation_altair<P: Preset>(
    spec: &Spec,
    epc: &EpochsContext,
    state: &mut BeaconState<P>,
    attestation: &Attestation<P>,
    attesting_indices: &[ValidatorIndex],
    verify: VerifySignatures,
) -> Result<(), Error> {
    let data = &attestation.data;
    let inclusion_delay = state.slot() - data.slot;
    let participation_flag_indices =
        get_attestation_participation_flag_indices(spec, state, data, inclusion_delay)?;

    validate_indexed_attestation(state, &get_indexed_attestation(epc, attestation)?, verify)?;

    let reward_per_increment = base_reward_per_increment(spec, state);
    let increment = spec.phase0.effective_balance_increment;
    let base_rewards = attesting_indices
        .iter()
        .map(|&index| {
            let effective_balance = epc
                .effective_balances
                .get(index as usize)
                .copied()
                .ok_or_else(|| {
                    Error::Internal(format!("no effective balance for validator {index}"))
                })?;
            Ok((index, effective_balance / increment * reward_per_increment))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let is_current = data.target.epoch == state.current_epoch();
    let epoch_participation = if is_current {
        state.current_epoch_participation_mut()?
    } else {
        state.previous_epoch_participation_mut()?
    };

    let mut proposer_reward_numerator: u64 = 0;
    for (index, base_reward) in base_rewards {
        let flags = epoch_participation
            .get_mut(index as usize)
            .ok_or(Error::Internal(format!(
                "validator {index} has no participation entry"
            )))?;
        for (flag_index, &weight) in PARTICIPATION_FLAG_WEIGHTS.iter().enumerate() {
            let flag_index = flag_index as u8;
            if participation_flag_indices.contains(&flag_index) && !has_flag(*flags, flag_index) {
                *flags = add_flag(*flags, flag_index);
                proposer_reward_numerator += base_reward * weight;
            }
        }
    }

    let proposer_reward_denominator =
        (WEIGHT_DENOMINATOR - PROPOSER_WEIGHT) * WEIGHT_DENOMINATOR / PROPOSER_WEIGHT;
    let proposer_reward = proposer_reward_numerator / proposer_reward_denominator;
    let proposer_index = epc.get_beacon_proposer::<P>(state.slot())?;
    state.increase_balance(proposer_index, proposer_reward)?;
    Ok(())
}

/// The timeliness flags an attestation earns, given its inclusion delay.
pub fn get_attestation_participation_flag_indices<P: Preset>(
    spec: &Spec,
    state: &BeaconState<P>,
    data: &cairn_types::AttestationData,
    inclusion_delay: Slot,
) -> Result<Vec<u8>, Error> {
    let justified_checkpoint = if data.target.epoch == state.current_epoch() {
        state.current_justified_checkpoint()
    } else {
        state.previous_justified_checkpoint()
    };

    let is_matching_source = data.source == justified_checkpoint;
    ensure_rule!(
        is_matching_source,
        "attestation source does not match the justified checkpoint"
    );
    let is_matching_target = data.target.root
        == state
            .get_block_root(data.target.epoch)
            .map_err(|_| Error::Rule("target epoch is outside the root window".into()))?;
    let is_matching_head = is_matching_target
        && data.beacon_block_root
            == state
                .get_block_root_at_slot(data.slot)
                .map_err(|_| Error::Rule("attestation slot is outside the root window".into()))?;

    let mut flag_indices = Vec::with_capacity(3);
    if inclusion_delay <= integer_squareroot(P::slots_per_epoch()) {
        flag_indices.push(cairn_types::constants::TIMELY_SOURCE_FLAG_INDEX);
    }
    let target_is_timely = if state.fork_name() >= ForkName::Deneb {
        // No upper inclusion bound from Deneb on
        true
    } else {
        inclusion_delay <= P::slots_per_epoch()
    };
    if is_matching_target && target_is_timely {
        flag_indices.push(cairn_types::constants::TIMELY_TARGET_FLAG_INDEX);
    }
    if is_matching_head && inclusion_delay == spec.phase0.min_attestation_inclusion_delay {
        flag_indices.push(cairn_types::constants::TIMELY_HEAD_FLAG_INDEX);
    }
    Ok(flag_indices)
}

pub fn process_deposit<P: Preset>(
    spec: &Spec,
    epc: &mut EpochsContext,
    state: &mut BeaconState<P>,
    deposit: &Deposit,
) -> Result<(), Error> {
    // Verify the Merkle branch
    let leaf = deposit.data.tree_hash_root();
    ensure_rule!(
        is_valid_merkle_branch(
            leaf,
            &deposit.proof,
            DEPOSIT_CONTRACT_TREE_DEPTH + 1,
            state.eth1_deposit_index(),
            state.eth1_data().deposit_root,
        ),
        "deposit {} has an invalid Merkle proof",
        state.eth1_deposit_index()
    );

    // Deposits must be processed in order
    *state.eth1_deposit_index_mut() += 1;

    apply_deposit(
        spec,
        epc,
        state,
        &deposit.data.pubkey,
        deposit.data.withdrawal_credentials,
        deposit.data.amount,
        &deposit.data.signature,
    )
}

pub(crate) fn apply_deposit<P: Preset>(
    spec: &Spec,
    epc: &mut EpochsContext,
    state: &mut BeaconState<P>,
    pubkey: &PubKey,
    withdrawal_credentials: Root,
    amount: u64,
    signature: &BlsSignature,
) -> Result<(), Error> {
    if let Some(index) = epc.validator_index(pubkey) {
        // Top-ups do not re-check the proof of possession.
        state.increase_balance(index, amount)?;
        return Ok(());
    }

    // New validators require a valid proof of possession; a bad one skips
    // the deposit without failing the block.
    if !is_valid_deposit_signature(spec, pubkey, withdrawal_credentials, amount, signature) {
        return Ok(());
    }

    state.add_validator_to_registry(spec, pubkey.clone(), withdrawal_credentials, amount)?;
    let effective_balance = state
        .validators()
        .last()
        .map(|validator| validator.effective_balance)
        .unwrap_or(0);
    epc.add_validator(pubkey.clone(), effective_balance);
    Ok(())
}

fn is_valid_deposit_signature(
    spec: &Spec,
    pubkey: &PubKey,
    withdrawal_credentials: Root,
    amount: u64,
    signature: &BlsSignature,
) -> bool {
    let message = DepositMessage {
        pubkey: pubkey.clone(),
        withdrawal_credentials,
        amount,
    };
    // Deposits predate the genesis validators root.
    let domain = compute_domain(DOMAIN_DEPOSIT, spec.phase0.genesis_fork_version, Root::ZERO);
    let signing_root = compute_signing_root(&message, domain);
    signature
        .verify(pubkey, signing_root.as_slice())
        .unwrap_or(false)
}

pub fn process_voluntary_exit<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
    signed_exit: &SignedVoluntaryExit,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let voluntary_exit = &signed_exit.message;
    let current_epoch = state.current_epoch();

    let validator = state
        .validators()
        .get(voluntary_exit.validator_index as usize)
        .ok_or_else(|| Error::Rule(format!("unknown validator {}", voluntary_exit.validator_index)))?;

    // Verify the validator is active
    ensure_rule!(
        validator.is_active_at(current_epoch),
        "validator {} is not active",
        voluntary_exit.validator_index
    );
    // Verify exit has not been initiated
    ensure_rule!(
        validator.exit_epoch == FAR_FUTURE_EPOCH,
        "validator {} is already exiting",
        voluntary_exit.validator_index
    );
    // The declared epoch must be the one being processed
    ensure_rule!(
        current_epoch >= voluntary_exit.epoch,
        "exit is not yet valid"
    );
    ensure_rule!(
        voluntary_exit.epoch >= current_epoch,
        "exit epoch in past is invalid"
    );
    // Verify the validator has been active long enough
    ensure_rule!(
        current_epoch >= validator.activation_epoch + spec.phase0.shard_committee_period,
        "validator {} has not been active long enough",
        voluntary_exit.validator_index
    );

    if verify.is_true() {
        // Fixed to the Capella fork version from Deneb on
        let domain = if state.fork_name() >= ForkName::Deneb {
            compute_domain(
                DOMAIN_VOLUNTARY_EXIT,
                spec.capella.capella_fork_version,
                state.genesis_validators_root(),
            )
        } else {
            state.get_domain(DOMAIN_VOLUNTARY_EXIT, voluntary_exit.epoch)
        };
        let signing_root = compute_signing_root(voluntary_exit, domain);
        ensure_signature!(
            signed_exit
                .signature
                .verify(&validator.pubkey, signing_root.as_slice())?,
            "voluntary exit signature does not verify"
        );
    }

    state.initiate_validator_exit(spec, voluntary_exit.validator_index)?;
    Ok(())
}

pub fn process_bls_to_execution_change<P: Preset>(
    spec: &Spec,
    state: &mut BeaconState<P>,
    signed_change: &SignedBLSToExecutionChange,
    verify: VerifySignatures,
) -> Result<(), Error> {
    let address_change = &signed_change.message;
    let index = address_change.validator_index;

    let validator = state
        .validators()
        .get(index as usize)
        .ok_or_else(|| Error::Rule(format!("unknown validator {index}")))?;

    ensure_rule!(
        validator.withdrawal_credentials[0] == BLS_WITHDRAWAL_PREFIX,
        "validator {index} does not have BLS withdrawal credentials"
    );
    ensure_rule!(
        validator.withdrawal_credentials[1..]
            == hash(address_change.from_bls_pubkey.to_bytes())[1..],
        "withdrawal credentials do not commit to the named BLS key"
    );

    if verify.is_true() {
        // Valid across forks: the domain binds only the genesis fork version
        let domain = compute_domain(
            DOMAIN_BLS_TO_EXECUTION_CHANGE,
            spec.phase0.genesis_fork_version,
            state.genesis_validators_root(),
        );
        let signing_root = compute_signing_root(address_change, domain);
        ensure_signature!(
            signed_change
                .signature
                .verify(&address_change.from_bls_pubkey, signing_root.as_slice())?,
            "BLS-to-execution change signature does not verify"
        );
    }

    let mut credentials = [0u8; 32];
    credentials[0] = ETH1_ADDRESS_WITHDRAWAL_PREFIX;
    credentials[12..].copy_from_slice(address_change.to_execution_address.as_slice());
    state.validators_mut()[index as usize].withdrawal_credentials = Root::from(credentials);
    Ok(())
}
