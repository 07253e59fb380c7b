use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlsError {
    #[error("invalid public key bytes")]
    InvalidPublicKey,

    #[error("invalid signature bytes")]
    InvalidSignature,

    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid hex string")]
    InvalidHexString,

    #[error("invalid byte length")]
    InvalidByteLength,

    #[error("blst error: {0:?}")]
    Blst(blst::BLST_ERROR),
}
