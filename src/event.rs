//! Verifier event system.

use crate::types::B256;
use tokio::sync::broadcast;

/// Events emitted by verifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierEvent {
    /// Provider hash approved.
    ProviderHashAdded {
        /// Approved hash.
        provider_hash: B256,
    },

    /// Provider hash withdrawn.
    ProviderHashRemoved {
        /// Withdrawn hash.
        provider_hash: B256,
    },

    /// Currency supported.
    CurrencyAdded {
        /// Hashed currency code.
        currency: B256,
    },

    /// Currency no longer supported.
    CurrencyRemoved {
        /// Hashed currency code.
        currency: B256,
    },

    /// Timestamp buffer changed.
    TimestampBufferUpdated {
        /// New buffer in seconds.
        timestamp_buffer_secs: u64,
    },

    /// A payment was accepted.
    PaymentVerified {
        /// Payment method name.
        method: String,
        /// Nullifier consumed.
        nullifier: B256,
        /// Linkage hash returned to the escrow.
        linkage_hash: B256,
    },

    /// OTP secret hash registered for a deposit.
    SecretHashRegistered {
        /// Payee details hash.
        payee_details: B256,
        /// Registered secret hash.
        secret_hash: B256,
    },

    /// OTP secret hash cleared.
    SecretHashCleared {
        /// Payee details hash.
        payee_details: B256,
        /// Cleared secret hash.
        secret_hash: B256,
    },
}

/// Channel for receiving verifier events.
pub type VerifierEventsChannel = broadcast::Receiver<VerifierEvent>;

/// Sender for verifier events.
pub type VerifierEventsSender = broadcast::Sender<VerifierEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (VerifierEventsSender, VerifierEventsChannel) {
    broadcast::channel(256)
}
