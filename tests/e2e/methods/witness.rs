//! Generic witness E2E tests.
//!
//! A deployment-defined layout, verified by a quorum of witnesses.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::harness::{intent, parameters_first, TestHarness, ESCROW, PROVIDER_HASH};
use p2p_payment_verifier::payment::{
    AmountSign, CurrencySource, FieldLayout, FieldRole, LinkageSource, TimestampFormat,
};
use p2p_payment_verifier::{ContextProfile, ErrorKind, MethodLayout, PaymentMethod, PaymentProof};

const CASHTAG: &str = "$dave";

fn cashapp() -> PaymentMethod {
    PaymentMethod::Witness(MethodLayout {
        name: "cashapp".to_string(),
        payment: FieldLayout {
            profile: ContextProfile::ParametersFirst,
            roles: vec![
                FieldRole::Amount,
                FieldRole::Ignored,
                FieldRole::PaymentId,
                FieldRole::Recipient,
                FieldRole::Timestamp,
            ],
            amount_sign: AmountSign::Positive,
            timestamp_format: TimestampFormat::UnixSeconds,
            currency: CurrencySource::Fixed("USD".to_string()),
            linkage: LinkageSource::ClaimIdentifier,
            required_status: None,
        },
        identity: None,
    })
}

fn context() -> String {
    parameters_first(
        &[
            ("amount", "1,250.00"),
            ("note", "rent"),
            ("paymentId", "cash_91ab"),
            ("cashtag", CASHTAG),
            ("timestamp", "1727914667"),
        ],
        "0x01",
        PROVIDER_HASH,
    )
}

/// Test 1: two of three witnesses are enough and the claim identifier is
/// the linkage hash.
#[test]
fn test_witness_quorum_accepted() {
    let harness = TestHarness::setup_with_witnesses(3, 2);
    let verifier = harness.verifier(&cashapp());
    let proof = harness.sign_proof_with(context(), &[2, 0]);
    let identifier = proof.signed_claim.claim.identifier;

    let outcome = verifier
        .verify_payment(
            &ESCROW,
            &harness.request(&PaymentProof::Single(proof), intent(1_250_000_000, CASHTAG, "USD")),
        )
        .unwrap();
    assert_eq!(outcome.linkage_hash, identifier);
}

/// Test 2: one witness signing twice does not make a quorum.
#[test]
fn test_witness_duplicate_signer_not_counted_twice() {
    let harness = TestHarness::setup_with_witnesses(3, 2);
    let verifier = harness.verifier(&cashapp());
    let proof = harness.sign_proof_with(context(), &[1, 1]);

    let err = verifier
        .verify_payment(
            &ESCROW,
            &harness.request(&PaymentProof::Single(proof), intent(1_250_000_000, CASHTAG, "USD")),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);
}

/// Test 3: fewer signatures than the threshold fail outright.
#[test]
fn test_witness_too_few_signatures() {
    let harness = TestHarness::setup_with_witnesses(3, 2);
    let verifier = harness.verifier(&cashapp());
    let proof = harness.sign_proof_with(context(), &[0]);

    let err = verifier
        .verify_payment(
            &ESCROW,
            &harness.request(&PaymentProof::Single(proof), intent(1_250_000_000, CASHTAG, "USD")),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthorizationFailure);
}

/// Test 4: a layout that cannot be verified is refused at construction.
#[test]
fn test_witness_invalid_layout_rejected() {
    let harness = TestHarness::setup();
    let PaymentMethod::Witness(mut layout) = cashapp() else {
        unreachable!()
    };
    layout.payment.roles.retain(|r| *r != FieldRole::Recipient);

    let result = p2p_payment_verifier::PaymentVerifier::from_config(
        &PaymentMethod::Witness(layout),
        &harness.config,
        std::sync::Arc::new(harness.nullifiers.clone()),
    );
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Configuration));
}
