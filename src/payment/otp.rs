//! Shared-secret (OTP) payments.
//!
//! The depositor hands the taker a one-time secret out of band once the
//! fiat payment arrives. At deposit creation the escrow registers
//! `keccak256(secret ‖ payee_details)`; verification recomputes it from the
//! submitted secret. No witnesses or provider templates are involved.

use crate::config::VerifierConfig;
use crate::error::{Error, Result};
use crate::event::{
    create_event_channel, VerifierEvent, VerifierEventsChannel, VerifierEventsSender,
};
use crate::payment::intent::{VerificationOutcome, VerifyPaymentRequest};
use crate::payment::nullifier::NullifierRegistry;
use crate::payment::strategy::PaymentVerification;
use crate::types::{keccak256_concat, Address, B256};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

/// Nullifier domain for OTP payments.
pub const OTP_METHOD: &str = "otp";

/// Hash registered for `secret` and `payee_details`.
#[must_use]
pub fn hash_secret(secret: &[u8], payee_details: &B256) -> B256 {
    keccak256_concat(&[secret, payee_details.as_bytes()])
}

/// Verifier for shared-secret payments.
///
/// Secret hashes are registered per deposit, so one payee may have several
/// open deposits at once.
pub struct OtpVerifier {
    address: Address,
    escrow: Address,
    nullifiers: Arc<dyn NullifierRegistry>,
    /// Secret hash to the payee it was registered for.
    secret_hashes: Mutex<HashMap<B256, B256>>,
    events_tx: VerifierEventsSender,
}

impl OtpVerifier {
    /// Build from the `address` and `escrow` of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn from_config(
        config: &VerifierConfig,
        nullifiers: Arc<dyn NullifierRegistry>,
    ) -> Result<Self> {
        config.validate()?;
        let (events_tx, _) = create_event_channel();
        info!("OTP verifier initialized (escrow={})", config.escrow);
        Ok(Self {
            address: config.address,
            escrow: config.escrow,
            nullifiers,
            secret_hashes: Mutex::new(HashMap::new()),
            events_tx,
        })
    }

    /// Subscribe to verifier events.
    #[must_use]
    pub fn subscribe_events(&self) -> VerifierEventsChannel {
        self.events_tx.subscribe()
    }

    fn ensure_escrow(&self, caller: &Address) -> Result<()> {
        if *caller == self.escrow {
            Ok(())
        } else {
            warn!("Rejected OTP call from {caller}: not the escrow");
            Err(Error::Unauthorized(format!("{caller} is not the escrow")))
        }
    }

    /// Register the secret hash of a new deposit paying `payee_details`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] unless `caller` is the escrow and
    /// [`Error::Config`] if `secret_hash` is already registered.
    pub fn register_secret_hash(
        &self,
        caller: &Address,
        payee_details: B256,
        secret_hash: B256,
    ) -> Result<()> {
        self.ensure_escrow(caller)?;
        let mut hashes = self.secret_hashes.lock();
        if hashes.contains_key(&secret_hash) {
            return Err(Error::Config(format!(
                "secret hash {secret_hash} already registered"
            )));
        }
        hashes.insert(secret_hash, payee_details);
        debug!("Secret hash {secret_hash} registered for {payee_details}");
        let _ = self.events_tx.send(VerifierEvent::SecretHashRegistered {
            payee_details,
            secret_hash,
        });
        Ok(())
    }

    /// Forget the secret hash of a closed deposit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] unless `caller` is the escrow and
    /// [`Error::Config`] if `secret_hash` is not registered for
    /// `payee_details`.
    pub fn clear_secret_hash(
        &self,
        caller: &Address,
        payee_details: &B256,
        secret_hash: &B256,
    ) -> Result<()> {
        self.ensure_escrow(caller)?;
        let mut hashes = self.secret_hashes.lock();
        if hashes.get(secret_hash) != Some(payee_details) {
            return Err(Error::Config(format!(
                "secret hash {secret_hash} not registered for {payee_details}"
            )));
        }
        hashes.remove(secret_hash);
        debug!("Secret hash {secret_hash} cleared for {payee_details}");
        let _ = self.events_tx.send(VerifierEvent::SecretHashCleared {
            payee_details: *payee_details,
            secret_hash: *secret_hash,
        });
        Ok(())
    }

    /// Whether `secret_hash` is registered for `payee_details`.
    #[must_use]
    pub fn is_secret_hash(&self, payee_details: &B256, secret_hash: &B256) -> bool {
        self.secret_hashes.lock().get(secret_hash) == Some(payee_details)
    }

    /// Secret hashes registered for `payee_details`, in no particular order.
    #[must_use]
    pub fn secret_hashes(&self, payee_details: &B256) -> Vec<B256> {
        self.secret_hashes
            .lock()
            .iter()
            .filter(|(_, payee)| *payee == payee_details)
            .map(|(hash, _)| *hash)
            .collect()
    }

    /// Check the secret in `request.payment_proof` and consume its nullifier.
    ///
    /// Only `payee_details` of the intent is consulted; amount, time and
    /// currency are the escrow's concern for this method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for a wrong caller or secret,
    /// [`Error::Decode`] for an empty secret and [`Error::NullifierUsed`] on
    /// replay.
    pub fn verify_payment(
        &self,
        caller: &Address,
        request: &VerifyPaymentRequest,
    ) -> Result<VerificationOutcome> {
        let hashes = self.secret_hashes.lock();
        self.ensure_escrow(caller)?;

        let secret = &request.payment_proof;
        if secret.is_empty() {
            return Err(Error::Decode("empty OTP secret".to_string()));
        }

        let payee_details = request.intent.payee_details;
        let secret_hash = hash_secret(secret, &payee_details);
        let registered_payee = hashes.get(&secret_hash).ok_or_else(|| {
            warn!("OTP secret mismatch for {payee_details}");
            Error::Unauthorized("OTP secret mismatch".to_string())
        })?;
        if !bool::from(registered_payee.as_bytes()[..].ct_eq(&payee_details.as_bytes()[..])) {
            warn!("OTP secret registered for a different payee than {payee_details}");
            return Err(Error::Unauthorized("OTP secret mismatch".to_string()));
        }

        let nullifier = keccak256_concat(&[OTP_METHOD.as_bytes(), b":", secret_hash.as_bytes()]);
        self.nullifiers.add_nullifier(&self.address, nullifier)?;

        info!("OTP payment verified (nullifier={})", hex::encode(nullifier));
        let _ = self.events_tx.send(VerifierEvent::PaymentVerified {
            method: OTP_METHOD.to_string(),
            nullifier,
            linkage_hash: secret_hash,
        });

        Ok(VerificationOutcome {
            verified: true,
            linkage_hash: secret_hash,
            nullifier,
        })
    }
}

impl PaymentVerification for OtpVerifier {
    fn method_name(&self) -> &str {
        OTP_METHOD
    }

    fn verify_payment(
        &self,
        caller: &Address,
        request: &VerifyPaymentRequest,
    ) -> Result<VerificationOutcome> {
        Self::verify_payment(self, caller, request)
    }
}
