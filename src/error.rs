//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by handshake and transport operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("missing pattern")]
    MissingPattern,
    #[error("missing local static key")]
    MissingLocalStatic,
    #[error("missing remote static key")]
    MissingRemoteStatic,
    #[error("key not used by this pattern")]
    UnexpectedKey,
    #[error("key has the wrong length")]
    InvalidKeyLength,
    #[error("pre-shared key count does not match the pattern modifiers")]
    PskCountMismatch,
    #[error("modifier cannot be applied to this pattern")]
    ForbiddenModifier,

    #[error("handshake already finished")]
    Finished,
    #[error("handshake not ready to split")]
    NotReady,
    #[error("not our turn to write")]
    NotOurTurn,
    #[error("handshake failed and must be abandoned")]
    Failed,
    #[error("invalid handshake message")]
    InvalidMessage,
    #[error("message exceeds the maximum message length")]
    MessageTooLong,
    #[error("output buffer too small")]
    BufferTooSmall,
    #[error("fallback not permitted in this state")]
    InvalidFallback,
    #[error("transport direction not allowed")]
    DirectionNotAllowed,

    #[error("decryption failed")]
    Decryption,
    #[error("DH failed")]
    Dh,
    #[error("nonce exhausted")]
    NonceExhausted,
}
