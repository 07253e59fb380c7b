pub mod errors;
pub mod private_key;
pub mod pubkey;
pub mod signature;

pub use errors::BlsError;
pub use private_key::PrivateKey;
pub use pubkey::PubKey;
pub use signature::BlsSignature;

/// Domain separation tag for the proof-of-possession signature scheme.
pub(crate) const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";
