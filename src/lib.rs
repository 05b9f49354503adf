//! # p2p-payment-verifier
//!
//! Payment-proof verification for peer-to-peer fiat-to-crypto escrow.
//!
//! Depositors lock tokens in an escrow; takers claim them by submitting a
//! witnessed capture of the fiat payment session they made to the depositor.
//! This crate decides whether such a proof releases the funds:
//!
//! - [`extract`]: single-pass extraction of string fields from the witnessed
//!   context text, under a restricted grammar.
//! - [`signature`]: recovery of witness identities and threshold checks.
//! - [`payment`]: the verification pipeline, per-method layouts, replay
//!   prevention and the OTP strategy.
//!
//! ## Example
//!
//! ```no_run
//! use p2p_payment_verifier::{
//!     InMemoryNullifierRegistry, PaymentMethod, PaymentVerifier, VerifierConfig,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> p2p_payment_verifier::Result<()> {
//! let config = VerifierConfig::from_file(Path::new("verifier.toml"))?;
//! let nullifiers = InMemoryNullifierRegistry::new(config.owner);
//! nullifiers.add_write_permission(&config.owner, config.address)?;
//!
//! let verifier =
//!     PaymentVerifier::from_config(&PaymentMethod::Venmo, &config, Arc::new(nullifiers))?;
//! println!("verifying {} payments", verifier.layout().name);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod payment;
pub mod proof;
pub mod signature;
pub mod types;

pub use config::{currency_code, TokenConfig, VerifierConfig};
pub use error::{Error, ErrorKind, Result};
pub use event::{create_event_channel, VerifierEvent, VerifierEventsChannel, VerifierEventsSender};
pub use extract::{
    extract_all_from_context, extract_all_values, extract_field_from_context,
    find_substring_end_index, ContextProfile, ExtractError, NOT_FOUND,
};
pub use payment::{
    derive_nullifier, hash_secret, InMemoryNullifierRegistry, MethodLayout, NullifierRegistry,
    OtpVerifier, PaymentIntentParams, PaymentMethod, PaymentVerification, PaymentVerifier,
    TokenMetadata, TokenRegistry, VerificationOutcome, VerifyPaymentRequest,
};
pub use proof::{
    decode_payment_proof, decode_witnesses, encode_payment_proof, encode_witnesses, Claim,
    ClaimInfo, PaymentProof, Proof, SignedClaim,
};
pub use signature::{recover_signer, verify_threshold};
pub use types::{keccak256, Address, B256};
