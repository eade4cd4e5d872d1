//! Reversing the move-stream byte encoding into a game tree.
//!
//! Decoding is best-effort: a mid-game error yields the partial tree plus
//! the error, so the caller can log the record and move on. Nothing in
//! here validates chess legality. The stream is trusted, and the only
//! failures are the ones that desynchronize the shadow state.

use thiserror::Error;

use crate::model::mailbox::CatalogFault;

pub mod annot;
pub mod moves;
pub mod opcodes;
pub mod startpos;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// An opcode names a slot with no live man in it.
    #[error("{0} {1} not in catalog")]
    NotInCatalog(&'static str, u8),
    /// The shadow state has diverged from the producer's.
    #[error("desync: {0}")]
    Desync(String),
    #[error("illegal opcode 0x{0:02x}")]
    IllegalOpcode(u8),
    #[error("move stream ends before the end-of-game marker")]
    TruncatedStream,
    #[error("variation push/pop markers are unbalanced")]
    UnbalancedVariation,
    #[error("invalid start position: {0}")]
    InvalidStartPosition(String),
}

impl From<CatalogFault> for DecodeError {
    fn from(fault: CatalogFault) -> Self {
        match fault {
            CatalogFault::Missing(ech, slot) => Self::NotInCatalog(ech, slot),
            other => Self::Desync(other.to_string()),
        }
    }
}
