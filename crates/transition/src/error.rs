use cairn_bls::BlsError;
use cairn_types::StateError;
use thiserror::Error;

/// Transition failures, tagged by kind. No variant is ever fatal to the
/// process; the caller decides what to do with a rejected input.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed binary input: bad offsets, over-limit list, trailing bytes.
    #[error("decode: {0}")]
    Decode(String),

    /// Accepting the input would break a data-model invariant.
    #[error("invariant: {0}")]
    Invariant(String),

    /// BLS verification failed, or signature material was malformed.
    #[error("signature: {0}")]
    Signature(String),

    /// A protocol rule rejected the operation.
    #[error("rule: {0}")]
    Rule(String),

    /// Cooperative cancellation was signaled mid-transition.
    #[error("transition cancelled")]
    Cancelled,

    /// A condition that cannot occur for well-formed input. Indicates a bug.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<StateError> for Error {
    fn from(err: StateError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<ssz::DecodeError> for Error {
    fn from(err: ssz::DecodeError) -> Self {
        Error::Decode(format!("{err:?}"))
    }
}

impl From<BlsError> for Error {
    fn from(err: BlsError) -> Self {
        Error::Signature(err.to_string())
    }
}

macro_rules! ensure_rule {
    ($condition:expr, $($message:tt)+) => {
        if !$condition {
            return Err($crate::Error::Rule(format!($($message)+)));
        }
    };
}

macro_rules! ensure_signature {
    ($condition:expr, $($message:tt)+) => {
        if !$condition {
            return Err($crate::Error::Signature(format!($($message)+)));
        }
    };
}

pub(crate) use {ensure_rule, ensure_signature};
