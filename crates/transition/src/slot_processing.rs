//! Slot advancement: root caching every slot, epoch processing at
//! boundaries, scheduled fork upgrades, and the atomic rotation of the
//! epochs context.

use cairn_types::{BeaconState, Preset, Root, Slot, Spec};
use tree_hash::TreeHash;

use crate::{
    Cancel, Error, epoch, epochs_context::EpochsContext, error::ensure_rule, upgrade,
};

/// Advance ``state`` to ``slot``, running the epoch transition at every
/// boundary crossed. The target must be strictly beyond the current slot.
pub fn process_slots<P: Preset>(
    spec: &Spec,
    epc: &mut EpochsContext,
    state: &mut BeaconState<P>,
    slot: Slot,
    cancel: &Cancel,
) -> Result<(), Error> {
    ensure_rule!(
        state.slot() < slot,
        "target slot {slot} is not beyond the state slot {}",
        state.slot()
    );

    while state.slot() < slot {
        cancel.check()?;
        process_slot(state);

        if (state.slot() + 1) % P::slots_per_epoch() == 0 {
            epoch::process_epoch(spec, epc, state, cancel)?;
        }
        *state.slot_mut() += 1;

        // The context only ever describes the epoch the state is in; both
        // change together at the boundary.
        if state.slot() % P::slots_per_epoch() == 0 {
            upgrade::apply_scheduled_upgrades(spec, epc, state)?;
            epc.rotate_epoch(spec, state)?;
        }
    }
    Ok(())
}

/// Cache the previous state root and block root for the slot being left.
fn process_slot<P: Preset>(state: &mut BeaconState<P>) {
    let previous_state_root = state.tree_hash_root();
    let position = (state.slot() % P::slots_per_historical_root()) as usize;
    state.state_roots_mut()[position] = previous_state_root;

    if state.latest_block_header().state_root == Root::ZERO {
        state.latest_block_header_mut().state_root = previous_state_root;
    }

    let block_root = state.latest_block_header().tree_hash_root();
    state.block_roots_mut()[position] = block_root;
}
