//! Shared scaffolding for the transition tests: a minimal-preset spec with
//! a 32-validator genesis, and an empty-block builder that produces fully
//! valid signed blocks.

use cairn_bls::BlsSignature;
use cairn_transition::{
    Cancel, EpochsContext, Error, NullExecutionEngine, VerifySignatures, interop, process_slots,
    state_transition,
};
use cairn_types::{
    BeaconState, Minimal, Root, SignedBeaconBlock, Slot, Spec, phase0,
    constants::{DOMAIN_BEACON_PROPOSER, DOMAIN_RANDAO},
    misc::compute_signing_root,
};

pub const GWEI_PER_ETH: u64 = 1_000_000_000;

pub fn test_spec() -> Spec {
    let mut spec = Spec::minimal();
    spec.phase0.min_genesis_active_validator_count = 32;
    spec
}

pub fn quick_genesis(
    spec: &Spec,
    validator_count: u64,
) -> (BeaconState<Minimal>, EpochsContext) {
    interop::genesis_state::<Minimal>(spec, validator_count, 32 * GWEI_PER_ETH)
        .expect("interop genesis is well-formed")
}

/// A fully valid empty block at ``slot``: correct proposer, randao reveal,
/// state root and proposer signature.
pub fn build_empty_block(
    spec: &Spec,
    state: &BeaconState<Minimal>,
    slot: Slot,
) -> Result<SignedBeaconBlock<Minimal>, Error> {
    let cancel = Cancel::never();

    // Advance a scratch copy to the block slot to learn the parent root and
    // the proposer.
    let mut scratch = state.clone();
    let mut scratch_epc = EpochsContext::new(spec, &scratch)?;
    if scratch.slot() < slot {
        process_slots(spec, &mut scratch_epc, &mut scratch, slot, &cancel)?;
    }
    let parent_root = {
        use tree_hash::TreeHash;
        scratch.latest_block_header().tree_hash_root()
    };
    let proposer_index = scratch_epc.get_beacon_proposer::<Minimal>(slot)?;

    let epoch = scratch.current_epoch();
    let randao_domain = scratch.get_domain(DOMAIN_RANDAO, epoch);
    let randao_reveal = interop::keypair(proposer_index)
        .0
        .sign(compute_signing_root(&epoch, randao_domain).as_slice())?;

    let mut message = phase0::BeaconBlock::<Minimal> {
        slot,
        proposer_index,
        parent_root,
        state_root: Root::ZERO,
        body: phase0::BeaconBlockBody {
            randao_reveal,
            eth1_data: scratch.eth1_data().clone(),
            ..Default::default()
        },
    };

    // Fill in the post-state root by applying the unsigned block.
    let mut post = state.clone();
    let mut post_epc = EpochsContext::new(spec, &post)?;
    state_transition(
        spec,
        &mut post_epc,
        &mut post,
        &SignedBeaconBlock::Phase0(phase0::SignedBeaconBlock {
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

    Ok(SignedBeaconBlock::Phase0(phase0::SignedBeaconBlock {
        message,
        signature,
    }))
}
