//! Deterministic keys and quick-start states for tests and local devnets.
//! The key for validator ``i`` is derived from ``i`` alone and is public
//! knowledge; never use these outside throwaway chains.

use cairn_bls::{BlsSignature, PrivateKey, PubKey};
use cairn_merkle::padded_proof;
use cairn_types::{
    AttestationData, BeaconState, Deposit, DepositData, DepositMessage, Gwei, Preset, Root, Spec,
    ValidatorIndex, VoluntaryExit,
    constants::{
        BLS_WITHDRAWAL_PREFIX, DEPOSIT_CONTRACT_TREE_DEPTH, DOMAIN_BEACON_ATTESTER,
        DOMAIN_DEPOSIT, DOMAIN_VOLUNTARY_EXIT,
    },
    misc::{compute_domain, compute_signing_root},
};
use ethereum_hashing::hash_fixed;
use ssz_types::FixedVector;
use tree_hash::TreeHash;

use crate::{Error, epochs_context::EpochsContext, genesis};

pub fn keypair(index: u64) -> (PrivateKey, PubKey) {
    let private_key = PrivateKey::deterministic(index);
    let pubkey = private_key
        .public_key()
        .expect("deterministic keys are valid scalars");
    (private_key, pubkey)
}

/// BLS-prefixed withdrawal credentials committing to the validator's key.
pub fn withdrawal_credentials(pubkey: &PubKey) -> Root {
    let mut credentials = hash_fixed(pubkey.to_bytes());
    credentials[0] = BLS_WITHDRAWAL_PREFIX;
    Root::from(credentials)
}

/// Signed deposit data for validator ``index`` with the given amount.
pub fn deposit_data(spec: &Spec, index: u64, amount: Gwei) -> DepositData {
    let (private_key, pubkey) = keypair(index);
    let credentials = withdrawal_credentials(&pubkey);
    let message = DepositMessage {
        pubkey: pubkey.clone(),
        withdrawal_credentials: credentials,
        amount,
    };
    let domain = compute_domain(DOMAIN_DEPOSIT, spec.phase0.genesis_fork_version, Root::ZERO);
    let signing_root = compute_signing_root(&message, domain);
    let signature = private_key
        .sign(signing_root.as_slice())
        .expect("deterministic keys can sign");

    DepositData {
        pubkey,
        withdrawal_credentials: credentials,
        amount,
        signature,
    }
}

/// Wrap ``data`` with a proof against the tree holding the first ``count``
/// of ``leaves``, ready for `process_deposit` at position ``index``.
pub fn deposit_with_proof(
    data: DepositData,
    leaves: &[Root],
    index: u64,
    count: u64,
) -> Result<Deposit, Error> {
    let mut proof = padded_proof(&leaves[..count as usize], DEPOSIT_CONTRACT_TREE_DEPTH, index)
        .map_err(|err| Error::Internal(err.to_string()))?;
    let mut length_chunk = [0u8; 32];
    length_chunk[..8].copy_from_slice(&count.to_le_bytes());
    proof.push(Root::from(length_chunk));

    Ok(Deposit {
        proof: FixedVector::new(proof)
            .map_err(|_| Error::Internal("deposit proof has the wrong depth".into()))?,
        data,
    })
}

/// The genesis deposit set: one deposit per validator, progressive proofs.
pub fn genesis_deposits(spec: &Spec, amounts: &[Gwei]) -> Result<Vec<Deposit>, Error> {
    let data = amounts
        .iter()
        .enumerate()
        .map(|(index, &amount)| deposit_data(spec, index as u64, amount))
        .collect::<Vec<_>>();
    let leaves = data.iter().map(|d| d.tree_hash_root()).collect::<Vec<_>>();

    data.into_iter()
        .enumerate()
        .map(|(index, data)| {
            deposit_with_proof(data, &leaves, index as u64, index as u64 + 1)
        })
        .collect()
}

/// A genesis state of ``validator_count`` interop validators, each holding
/// ``balance`` Gwei, with its epochs context.
pub fn genesis_state<P: Preset>(
    spec: &Spec,
    validator_count: u64,
    balance: Gwei,
) -> Result<(BeaconState<P>, EpochsContext), Error> {
    let amounts = vec![balance; validator_count as usize];
    let deposits = genesis_deposits(spec, &amounts)?;
    let state = genesis::initialize_beacon_state_from_eth1::<P>(
        spec,
        Root::repeat_byte(0x42),
        spec.phase0.min_genesis_time,
        &deposits,
    )?;
    let epc = EpochsContext::new(spec, &state)?;
    Ok((state, epc))
}

/// Aggregate signature over ``data`` by the named validators, signed with
/// their interop keys under the attester domain of ``state``.
pub fn sign_attestation_data<P: Preset>(
    state: &BeaconState<P>,
    data: &AttestationData,
    attesters: &[ValidatorIndex],
) -> Result<BlsSignature, Error> {
    let domain = state.get_domain(DOMAIN_BEACON_ATTESTER, data.target.epoch);
    let signing_root = compute_signing_root(data, domain);

    let signatures = attesters
        .iter()
        .map(|&index| keypair(index).0.sign(signing_root.as_slice()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BlsSignature::aggregate(
        &signatures.iter().collect::<Vec<_>>(),
    )?)
}

/// Interop-signed block header, for building slashable header pairs.
pub fn sign_block_header<P: Preset>(
    state: &BeaconState<P>,
    header: &cairn_types::BeaconBlockHeader,
) -> Result<BlsSignature, Error> {
    let domain = state.get_domain(
        cairn_types::constants::DOMAIN_BEACON_PROPOSER,
        cairn_types::misc::compute_epoch_at_slot::<P>(header.slot),
    );
    let signing_root = compute_signing_root(header, domain);
    Ok(keypair(header.proposer_index)
        .0
        .sign(signing_root.as_slice())?)
}

pub fn sign_voluntary_exit<P: Preset>(
    state: &BeaconState<P>,
    exit: &VoluntaryExit,
) -> Result<BlsSignature, Error> {
    let domain = state.get_domain(DOMAIN_VOLUNTARY_EXIT, exit.epoch);
    let signing_root = compute_signing_root(exit, domain);
    Ok(keypair(exit.validator_index).0.sign(signing_root.as_slice())?)
}
