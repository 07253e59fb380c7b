//! The deterministic state-transition function over `cairn_types` states:
//! slot advancement, block application, and the epoch accounting between
//! them. Callers own the state and its epochs context; the `Spec` is
//! shared-read and injected into every entry point, so unrelated chains can
//! coexist in one process.
//!
//! Failure atomicity: every entry point aborts on the first error, and a
//! failed call may leave a partially mutated state behind. Callers that
//! need the pre-state on failure apply transitions to a clone and commit it
//! on success; see `state_transition`.

pub mod block;
pub mod cancel;
pub mod epoch;
pub mod epochs_context;
pub mod error;
pub mod execution_engine;
pub mod genesis;
pub mod interop;
pub mod shuffle;
pub mod slot_processing;
pub mod upgrade;

pub use cancel::Cancel;
pub use epochs_context::{EpochsContext, ShufflingEpoch};
pub use error::Error;
pub use execution_engine::{
    ExecutionEngine, MockExecutionEngine, NewPayloadRequest, NullExecutionEngine,
};
pub use genesis::{initialize_beacon_state_from_eth1, is_valid_genesis_state};
pub use slot_processing::process_slots;

use cairn_types::{BeaconState, Preset, SignedBeaconBlock, Spec};

use crate::error::ensure_rule;

/// Whether BLS checks run. Replaying blocks the network already attested to
/// can skip them; everything else verifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifySignatures {
    True,
    False,
}

impl VerifySignatures {
    pub fn is_true(self) -> bool {
        self == VerifySignatures::True
    }
}

/// Apply ``signed_block`` on top of ``state``: advance slots up to the block
/// slot, verify the proposer signature, process the block, and (unless the
/// caller opts out) require the resulting state root to match the block.
///
/// On error the state must be considered poisoned; apply to a clone when the
/// pre-state still matters.
#[allow(clippy::too_many_arguments)]
pub fn state_transition<P: Preset>(
    spec: &Spec,
    epc: &mut EpochsContext,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock<P>,
    verify_state_root: bool,
    engine: &dyn ExecutionEngine<P>,
    verify: VerifySignatures,
    cancel: &Cancel,
) -> Result<(), Error> {
    // Process slots (including those with no blocks) since the block
    if state.slot() < signed_block.slot() {
        process_slots(spec, epc, state, signed_block.slot(), cancel)?;
    }

    if verify.is_true() {
        block::verify_block_signature(state, signed_block)?;
    }

    block::process_block(spec, epc, state, signed_block, engine, verify, cancel)?;

    if verify_state_root {
        let state_root = state.tree_hash_root();
        ensure_rule!(
            signed_block.state_root() == state_root,
            "block state root {} does not match the post-state root {state_root}",
            signed_block.state_root()
        );
    }
    Ok(())
}
