//! Venmo E2E tests.
//!
//! Venmo contexts lead with `contextAddress`/`contextMessage`; the message
//! carries the intent hash as a decimal integer and amounts are USD.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::harness::{context_first, intent, TestHarness, ESCROW, OWNER, PROVIDER_HASH};
use p2p_payment_verifier::{
    derive_nullifier, Address, ErrorKind, NullifierRegistry, PaymentMethod, PaymentProof,
    VerifierEvent, B256,
};

const PAYMENT_ID: &str = "4170368513012150718";
const RECEIVER: &str = "645716473020416186";
const INTENT_HASH: &str =
    "3255272855445122854259407670991079284015086279635495324568586132056928581139";

fn context(amount: &str, date: &str, payment_id: &str) -> String {
    context_first(
        INTENT_HASH,
        &[
            ("amount", amount),
            ("date", date),
            ("paymentId", payment_id),
            ("receiverId", RECEIVER),
        ],
        PROVIDER_HASH,
    )
}

fn valid_context() -> String {
    context("5.00", "2024-10-03T00:17:47", PAYMENT_ID)
}

/// Test 1: a matching payment is accepted and linked to the intent hash.
#[test]
fn test_venmo_payment_accepted() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    let outcome = verifier
        .verify_payment(&ESCROW, &harness.request(&proof, intent(5_000_000, RECEIVER, "USD")))
        .unwrap();

    assert!(outcome.verified);
    assert_eq!(outcome.linkage_hash, B256::from_uint_str(INTENT_HASH).unwrap());
    assert_eq!(outcome.nullifier, derive_nullifier("venmo", PAYMENT_ID));
    assert!(harness.nullifiers.is_nullified(&outcome.nullifier));
}

/// Test 2: resubmitting the same proof is a replay.
#[test]
fn test_venmo_replay_rejected() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));
    let request = harness.request(&proof, intent(5_000_000, RECEIVER, "USD"));

    verifier.verify_payment(&ESCROW, &request).unwrap();
    let err = verifier.verify_payment(&ESCROW, &request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReplayDetected);
    assert_eq!(harness.nullifiers.stats().additions, 1);
}

/// Test 3: a different proof of the same payment is also a replay.
#[test]
fn test_venmo_same_payment_id_rejected() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);

    let first = PaymentProof::Single(harness.sign_proof(valid_context()));
    verifier
        .verify_payment(&ESCROW, &harness.request(&first, intent(5_000_000, RECEIVER, "USD")))
        .unwrap();

    let second = PaymentProof::Single(harness.sign_proof(context(
        "7.00",
        "2024-10-03T00:20:00",
        PAYMENT_ID,
    )));
    let err = verifier
        .verify_payment(&ESCROW, &harness.request(&second, intent(7_000_000, RECEIVER, "USD")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReplayDetected);
}

/// Test 4: a mutated identifier is a schema mismatch even when re-signed.
#[test]
fn test_venmo_mutated_identifier_rejected() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);

    let mut proof = harness.sign_proof(valid_context());
    proof.signed_claim.claim.identifier.0[31] ^= 0x01;
    harness.resign(&mut proof, &[0]);

    let err = verifier
        .verify_payment(
            &ESCROW,
            &harness.request(&PaymentProof::Single(proof), intent(5_000_000, RECEIVER, "USD")),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}

/// Test 5: tampering with the context after signing breaks the identifier.
#[test]
fn test_venmo_tampered_context_rejected() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);

    let mut proof = harness.sign_proof(valid_context());
    proof.claim_info.context = context("500.00", "2024-10-03T00:17:47", PAYMENT_ID);

    let err = verifier
        .verify_payment(
            &ESCROW,
            &harness.request(&PaymentProof::Single(proof), intent(500_000_000, RECEIVER, "USD")),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}

/// Test 6: an underpayment is rejected and leaves the payment id unused.
#[test]
fn test_venmo_underpayment_rejected_without_side_effects() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    let err = verifier
        .verify_payment(&ESCROW, &harness.request(&proof, intent(5_000_001, RECEIVER, "USD")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentMismatch);
    assert!(harness.nullifiers.is_empty());

    verifier
        .verify_payment(&ESCROW, &harness.request(&proof, intent(5_000_000, RECEIVER, "USD")))
        .unwrap();
}

/// Test 7: conversion rates scale the required amount.
#[test]
fn test_venmo_conversion_rate_applied() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    // 4.50 USDC at 1.12 USD each needs 5.04 USD.
    let mut params = intent(4_500_000, RECEIVER, "USD");
    params.conversion_rate = 1_120_000_000_000_000_000;
    let err = verifier
        .verify_payment(&ESCROW, &harness.request(&proof, params.clone()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentMismatch);

    // At 1.11 it needs 4.995 USD.
    params.conversion_rate = 1_110_000_000_000_000_000;
    verifier
        .verify_payment(&ESCROW, &harness.request(&proof, params))
        .unwrap();
}

/// Test 8: payments older than the intent minus the buffer are rejected.
#[test]
fn test_venmo_timestamp_buffer() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    // 2024-10-03T00:16:00 is 40s before the intent; the default buffer is 30s.
    let proof = PaymentProof::Single(harness.sign_proof(context(
        "5.00",
        "2024-10-03T00:16:00",
        PAYMENT_ID,
    )));
    let request = harness.request(&proof, intent(5_000_000, RECEIVER, "USD"));

    let err = verifier.verify_payment(&ESCROW, &request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentMismatch);

    verifier.set_timestamp_buffer(&OWNER, 60).unwrap();
    verifier.verify_payment(&ESCROW, &request).unwrap();
}

/// Test 9: the payee hash must match the receiver.
#[test]
fn test_venmo_recipient_mismatch() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    let err = verifier
        .verify_payment(&ESCROW, &harness.request(&proof, intent(5_000_000, "someone-else", "USD")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentMismatch);
}

/// Test 10: Venmo settles in USD only.
#[test]
fn test_venmo_currency_mismatch() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    let err = verifier
        .verify_payment(&ESCROW, &harness.request(&proof, intent(5_000_000, RECEIVER, "EUR")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentMismatch);
}

/// Test 11: unknown deposit tokens are rejected.
#[test]
fn test_venmo_unknown_token() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    let mut params = intent(5_000_000, RECEIVER, "USD");
    params.deposit_token = Address([0xee; 20]);
    let err = verifier
        .verify_payment(&ESCROW, &harness.request(&proof, params))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PaymentMismatch);
}

/// Test 12: proofs without signatures or from unknown witnesses fail
/// authorization.
#[test]
fn test_venmo_signature_failures() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);

    let unsigned = harness.sign_proof_with(valid_context(), &[]);
    let err = verifier
        .verify_payment(
            &ESCROW,
            &harness.request(&PaymentProof::Single(unsigned), intent(5_000_000, RECEIVER, "USD")),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);

    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));
    let mut request = harness.request(&proof, intent(5_000_000, RECEIVER, "USD"));
    request.data = p2p_payment_verifier::encode_witnesses(&[Address([0x77; 20])]).unwrap();
    let err = verifier.verify_payment(&ESCROW, &request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);
}

/// Test 13: only the escrow may verify.
#[test]
fn test_venmo_wrong_caller() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    let err = verifier
        .verify_payment(&OWNER, &harness.request(&proof, intent(5_000_000, RECEIVER, "USD")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);
    assert!(harness.nullifiers.is_empty());
}

/// Test 14: accepted payments are broadcast.
#[tokio::test]
async fn test_venmo_payment_event() {
    let harness = TestHarness::setup();
    let verifier = harness.verifier(&PaymentMethod::Venmo);
    let mut events = verifier.subscribe_events();
    let proof = PaymentProof::Single(harness.sign_proof(valid_context()));

    let outcome = verifier
        .verify_payment(&ESCROW, &harness.request(&proof, intent(5_000_000, RECEIVER, "USD")))
        .unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        VerifierEvent::PaymentVerified {
            method: "venmo".to_string(),
            nullifier: outcome.nullifier,
            linkage_hash: outcome.linkage_hash,
        }
    );
}
