//! Error types for the payment verifier.

use crate::extract::ExtractError;
use crate::types::B256;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of a rejection.
///
/// Every rejection is terminal for the call that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Grammar violation or undecodable input.
    MalformedInput,
    /// Recomputed identifier or provider hash does not match.
    SchemaMismatch,
    /// Bad witness signatures, wrong caller or non-owner administration.
    AuthorizationFailure,
    /// Amount, timestamp, recipient or currency failed the matching rule.
    PaymentMismatch,
    /// Nullifier already consumed.
    ReplayDetected,
    /// Invalid configuration or administrative misuse.
    Configuration,
}

/// Errors that can occur while verifying a payment proof.
#[derive(Debug, Error)]
pub enum Error {
    /// Context text violated the restricted grammar.
    #[error("malformed context: {0}")]
    Extract(#[from] ExtractError),

    /// The proof or witness data could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A string field could not be converted to a number, hash or timestamp.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field being converted.
        field: &'static str,
        /// Why conversion failed.
        reason: String,
    },

    /// `claim.identifier` is not the hash of the claim info.
    #[error("claim identifier mismatch: expected {expected}, got {actual}")]
    IdentifierMismatch {
        /// Recomputed hash of the claim info.
        expected: B256,
        /// Identifier carried by the signed claim.
        actual: B256,
    },

    /// Provider hash in the context is not an approved template.
    #[error("provider hash not approved: {0}")]
    UnknownProviderHash(B256),

    /// Extracted fields do not fit the expected layout.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// Signed claim carries no signatures.
    #[error("no witness signatures")]
    NoSignatures,

    /// Fewer distinct authorized witnesses signed than required.
    #[error("insufficient valid signatures: {valid} of {required} required")]
    InsufficientSignatures {
        /// Distinct authorized signers recovered.
        valid: usize,
        /// Threshold.
        required: usize,
    },

    /// Caller is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Payment fields failed a matching rule.
    #[error("payment mismatch: {0}")]
    PaymentMismatch(String),

    /// The payment was already used to release funds.
    #[error("nullifier already used: {0}")]
    NullifierUsed(B256),

    /// Signing or key handling failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Configuration error or administrative misuse.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extract(_) | Self::Decode(_) | Self::InvalidField { .. } => {
                ErrorKind::MalformedInput
            }
            Self::IdentifierMismatch { .. } | Self::UnknownProviderHash(_) | Self::Schema(_) => {
                ErrorKind::SchemaMismatch
            }
            Self::NoSignatures | Self::InsufficientSignatures { .. } | Self::Unauthorized(_) => {
                ErrorKind::AuthorizationFailure
            }
            Self::PaymentMismatch(_) => ErrorKind::PaymentMismatch,
            Self::NullifierUsed(_) => ErrorKind::ReplayDetected,
            Self::Crypto(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Configuration,
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
