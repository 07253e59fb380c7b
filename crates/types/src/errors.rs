use thiserror::Error;

use crate::primitives::{Epoch, Slot, ValidatorIndex};

/// Failures from state accessors and mutators. On rule-checked inputs these
/// indicate an internal inconsistency, and the transition layer reports them
/// as such.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    #[error("slot {slot} is outside the stored root window ending at {state_slot}")]
    SlotOutOfRange { slot: Slot, state_slot: Slot },

    #[error("unknown validator index {0}")]
    UnknownValidator(ValidatorIndex),

    #[error("epoch {0} is neither the previous nor the current epoch")]
    EpochOutOfRange(Epoch),

    #[error("state list limit reached: {0}")]
    ListLimitReached(&'static str),

    #[error("state fork does not carry {0}")]
    IncompatibleFork(&'static str),
}
