//! Test harness that sets up verifiers and witnesses.
//!
//! The `TestHarness` owns a deterministic set of witness keys, a shared
//! nullifier registry and a verifier configuration, and builds signed
//! proofs the way an attestor would.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use k256::ecdsa::SigningKey;
use p2p_payment_verifier::payment::PRECISE_UNIT;
use p2p_payment_verifier::signature::{address_from_key, sign_digest};
use p2p_payment_verifier::{
    currency_code, encode_payment_proof, encode_witnesses, keccak256, Address, Claim, ClaimInfo,
    InMemoryNullifierRegistry, OtpVerifier, PaymentIntentParams, PaymentMethod, PaymentProof,
    PaymentVerifier, Proof, SignedClaim, TokenConfig, VerifierConfig, VerifyPaymentRequest, B256,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Verifier administrator.
pub const OWNER: Address = Address([0x01; 20]);
/// Escrow, the only caller allowed to verify.
pub const ESCROW: Address = Address([0x02; 20]);
/// Identity verifiers use to write nullifiers.
pub const VERIFIER: Address = Address([0x03; 20]);
/// A 6-decimal stablecoin.
pub const USDC: Address = Address([0x04; 20]);
/// Approved provider hash for payment proofs.
pub const PROVIDER_HASH: B256 = B256([0x14; 32]);
/// Approved provider hash for identity proofs.
pub const IDENTITY_PROVIDER_HASH: B256 = B256([0x15; 32]);
/// Intent creation time used across tests (2024-10-03T00:16:40Z).
pub const INTENT_TIME: u64 = 1_727_914_600;

/// Install a tracing subscriber once. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Test environment shared by a group of verifiers.
pub struct TestHarness {
    /// Configuration handed to every verifier.
    pub config: VerifierConfig,
    /// Registry shared by every verifier.
    pub nullifiers: InMemoryNullifierRegistry,
    witnesses: Vec<SigningKey>,
}

impl TestHarness {
    /// One witness, threshold one.
    #[must_use]
    pub fn setup() -> Self {
        Self::setup_with_witnesses(1, 1)
    }

    /// `count` witnesses with keys seeded `1..=count`, threshold `min`.
    #[must_use]
    pub fn setup_with_witnesses(count: u8, min: usize) -> Self {
        let witnesses = (1..=count)
            .map(|seed| SigningKey::from_slice(&[seed; 32]).expect("valid scalar"))
            .collect();

        let config = VerifierConfig {
            address: VERIFIER,
            owner: OWNER,
            escrow: ESCROW,
            min_witness_signatures: min,
            provider_hashes: vec![PROVIDER_HASH, IDENTITY_PROVIDER_HASH],
            currencies: vec!["USD".to_string(), "EUR".to_string(), "GBP".to_string()],
            tokens: vec![TokenConfig {
                address: USDC,
                decimals: 6,
            }],
            ..VerifierConfig::default()
        };
        init_tracing(&config.log_level);

        let nullifiers = InMemoryNullifierRegistry::new(OWNER);
        nullifiers.add_write_permission(&OWNER, VERIFIER).unwrap();

        info!("Test harness ready with {count} witnesses, threshold {min}");
        Self {
            config,
            nullifiers,
            witnesses,
        }
    }

    /// Verifier for `method` backed by the shared registry.
    #[must_use]
    pub fn verifier(&self, method: &PaymentMethod) -> PaymentVerifier {
        PaymentVerifier::from_config(method, &self.config, Arc::new(self.nullifiers.clone()))
            .expect("verifier")
    }

    /// OTP verifier backed by the shared registry.
    #[must_use]
    pub fn otp_verifier(&self) -> OtpVerifier {
        OtpVerifier::from_config(&self.config, Arc::new(self.nullifiers.clone())).expect("verifier")
    }

    /// Addresses of all witnesses.
    #[must_use]
    pub fn witness_addresses(&self) -> Vec<Address> {
        self.witnesses
            .iter()
            .map(|key| address_from_key(key.verifying_key()))
            .collect()
    }

    /// Encoded witness list for requests.
    #[must_use]
    pub fn witness_data(&self) -> Vec<u8> {
        encode_witnesses(&self.witness_addresses()).unwrap()
    }

    /// Proof over `context` signed by every witness.
    #[must_use]
    pub fn sign_proof(&self, context: String) -> Proof {
        let all: Vec<usize> = (0..self.witnesses.len()).collect();
        self.sign_proof_with(context, &all)
    }

    /// Proof over `context` signed by the witnesses at `signers`, in order.
    #[must_use]
    pub fn sign_proof_with(&self, context: String, signers: &[usize]) -> Proof {
        let claim_info = ClaimInfo {
            provider: "http".to_string(),
            parameters: r#"{"method":"GET","url":"https://example.com/api/payments"}"#.to_string(),
            context,
        };
        let claim = Claim {
            identifier: claim_info.hash(),
            owner: Address([0x0a; 20]),
            timestamp_s: 1_727_914_700,
            epoch: 1,
        };
        let mut proof = Proof {
            claim_info,
            signed_claim: SignedClaim {
                claim,
                signatures: Vec::new(),
            },
        };
        self.resign(&mut proof, signers);
        proof
    }

    /// Replace the signatures of `proof` with fresh ones from `signers`.
    pub fn resign(&self, proof: &mut Proof, signers: &[usize]) {
        let digest = proof.signed_claim.claim.signing_digest();
        proof.signed_claim.signatures = signers
            .iter()
            .map(|i| sign_digest(&self.witnesses[*i], &digest).unwrap())
            .collect();
    }

    /// Request carrying `proof` for `intent`.
    #[must_use]
    pub fn request(
        &self,
        proof: &PaymentProof,
        intent: PaymentIntentParams,
    ) -> VerifyPaymentRequest {
        VerifyPaymentRequest {
            payment_proof: encode_payment_proof(proof).unwrap(),
            intent,
            data: self.witness_data(),
        }
    }
}

/// Intent for `amount` USDC base units at a 1:1 rate, paid to `payee` in
/// `currency`, created at [`INTENT_TIME`].
#[must_use]
pub fn intent(amount: u128, payee: &str, currency: &str) -> PaymentIntentParams {
    PaymentIntentParams {
        deposit_token: USDC,
        intent_amount: amount,
        intent_timestamp: INTENT_TIME,
        payee_details: keccak256(payee.as_bytes()),
        fiat_currency: currency_code(currency),
        conversion_rate: PRECISE_UNIT,
    }
}

fn params(fields: &[(&str, &str)]) -> String {
    let pairs: Vec<String> = fields
        .iter()
        .map(|(k, v)| format!(r#""{k}":"{v}""#))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

/// Context with leading `contextAddress`/`contextMessage`.
#[must_use]
pub fn context_first(message: &str, fields: &[(&str, &str)], provider_hash: B256) -> String {
    format!(
        r#"{{"contextAddress":"0x0","contextMessage":"{message}","extractedParameters":{},"providerHash":"{provider_hash}"}}"#,
        params(fields)
    )
}

/// Context with trailing `intentHash`.
#[must_use]
pub fn parameters_first(fields: &[(&str, &str)], intent_hash: &str, provider_hash: B256) -> String {
    format!(
        r#"{{"extractedParameters":{},"intentHash":"{intent_hash}","providerHash":"{provider_hash}"}}"#,
        params(fields)
    )
}
