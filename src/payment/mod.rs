//! Payment verification for fiat-to-crypto escrow.
//!
//! Each payment method is a [`PaymentVerification`] strategy. Witnessed
//! methods (Venmo, Revolut, Zelle, Monzo, generic witnesses) share one
//! pipeline driven by a [`MethodLayout`]; OTP payments check a registered
//! secret hash instead.
//!
//! # Architecture
//!
//! ```text
//! verify_payment(caller, request)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ caller == escrow?   │──no──► AuthorizationFailure
//! └─────────┬───────────┘
//!           ▼
//! decode proof bundle + witness list
//!           │
//!           ▼
//! ┌─────────────────────┐   per proof: identifier, signatures,
//! │ check_proof         │   provider hash, field extraction
//! └─────────┬───────────┘
//!           ▼
//! link identity proof (dual-proof methods)
//!           │
//!           ▼
//! amount ≥ required, timestamp + buffer ≥ intent,
//! recipient, currency, status
//!           │
//!           ▼
//! linkage hash, nullifier ──► NullifierRegistry::add_nullifier
//!           │
//!           ▼
//!     VerificationOutcome
//! ```
//!
//! Nothing is written before the nullifier, so any rejection leaves no
//! trace.

pub mod amount;
mod intent;
pub mod method;
mod nullifier;
mod otp;
mod registry;
mod strategy;
mod token;
mod verifier;

pub use amount::{AmountSign, TimestampFormat, PRECISE_UNIT};
pub use intent::{PaymentIntentParams, VerificationOutcome, VerifyPaymentRequest};
pub use method::{
    CurrencySource, ExtractedPaymentFields, FieldLayout, FieldRole, IdentityLayout,
    LinkageSource, MethodLayout, PaymentMethod,
};
pub use nullifier::{derive_nullifier, InMemoryNullifierRegistry, NullifierRegistry, NullifierStats};
pub use otp::{hash_secret, OtpVerifier, OTP_METHOD};
pub use registry::AllowList;
pub use strategy::PaymentVerification;
pub use token::{TokenMetadata, TokenRegistry};
pub use verifier::PaymentVerifier;
