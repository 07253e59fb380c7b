//! The injected execution-layer capability. The transition only needs to ask
//! whether a payload is valid and to signal fork-choice updates; everything
//! else about the engine lives with the caller.

use std::sync::atomic::{AtomicBool, Ordering};

use cairn_types::{ExecutionBlockHash, Preset, Root, bellatrix, capella, deneb};
use ethereum_hashing::hash_fixed;

use crate::Error;

/// Prefix of a versioned blob hash.
const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

pub enum NewPayloadRequest<'a, P: Preset> {
    Bellatrix(&'a bellatrix::ExecutionPayload<P>),
    Capella(&'a capella::ExecutionPayload<P>),
    Deneb {
        payload: &'a deneb::ExecutionPayload<P>,
        versioned_hashes: Vec<Root>,
    },
}

pub trait ExecutionEngine<P: Preset> {
    /// Whether the execution layer accepts the payload. `Err` means the
    /// engine could not answer, not that the payload is invalid.
    fn notify_new_payload(&self, request: NewPayloadRequest<'_, P>) -> Result<bool, Error>;

    fn notify_forkchoice_updated(
        &self,
        head_block_hash: ExecutionBlockHash,
        safe_block_hash: ExecutionBlockHash,
        finalized_block_hash: ExecutionBlockHash,
    ) -> Result<(), Error>;
}

/// Accepts every payload. Stands in before Bellatrix and for replaying
/// blocks already attested by the network.
pub struct NullExecutionEngine;

impl<P: Preset> ExecutionEngine<P> for NullExecutionEngine {
    fn notify_new_payload(&self, _request: NewPayloadRequest<'_, P>) -> Result<bool, Error> {
        Ok(true)
    }

    fn notify_forkchoice_updated(
        &self,
        _head_block_hash: ExecutionBlockHash,
        _safe_block_hash: ExecutionBlockHash,
        _finalized_block_hash: ExecutionBlockHash,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Test engine whose verdict can be flipped at runtime.
#[derive(Default)]
pub struct MockExecutionEngine {
    reject: AtomicBool,
}

impl MockExecutionEngine {
    pub fn new() -> Self {
        MockExecutionEngine::default()
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::Relaxed);
    }
}

impl<P: Preset> ExecutionEngine<P> for MockExecutionEngine {
    fn notify_new_payload(&self, _request: NewPayloadRequest<'_, P>) -> Result<bool, Error> {
        Ok(!self.reject.load(Ordering::Relaxed))
    }

    fn notify_forkchoice_updated(
        &self,
        _head_block_hash: ExecutionBlockHash,
        _safe_block_hash: ExecutionBlockHash,
        _finalized_block_hash: ExecutionBlockHash,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Versioned hash committing to a blob KZG commitment.
pub fn kzg_commitment_to_versioned_hash(commitment: &[u8]) -> Root {
    let mut digest = hash_fixed(commitment);
    digest[0] = VERSIONED_HASH_VERSION_KZG;
    Root::from(digest)
}
