//! Verification requests and outcomes exchanged with the escrow.

use crate::types::{Address, B256};

/// Parameters of the pending intent a proof is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentParams {
    /// Token locked in the deposit.
    pub deposit_token: Address,
    /// Token amount claimed, in base units.
    pub intent_amount: u128,
    /// Intent creation time in Unix seconds.
    pub intent_timestamp: u64,
    /// Hash of the depositor's payee identifier.
    pub payee_details: B256,
    /// Hash of the fiat currency code.
    pub fiat_currency: B256,
    /// Fiat per token, scaled by 1e18.
    pub conversion_rate: u128,
}

/// One `verify_payment` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyPaymentRequest {
    /// Encoded [`PaymentProof`](crate::proof::PaymentProof), or the raw
    /// secret for OTP payments.
    pub payment_proof: Vec<u8>,
    /// Intent the proof must satisfy.
    pub intent: PaymentIntentParams,
    /// Encoded witness list.
    pub data: Vec<u8>,
}

/// Result of an accepted verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationOutcome {
    /// Always `true`; rejections are errors.
    pub verified: bool,
    /// Value tying the payment to the pending intent.
    pub linkage_hash: B256,
    /// Nullifier consumed by this payment.
    pub nullifier: B256,
}
