//! Common interface of payment verification strategies.

use crate::error::Result;
use crate::payment::intent::{VerificationOutcome, VerifyPaymentRequest};
use crate::types::Address;

/// A payment method the escrow can release funds against.
///
/// Implementations either accept the payment, consuming its nullifier, or
/// reject it with no state change.
pub trait PaymentVerification: Send + Sync {
    /// Name of the payment method.
    fn method_name(&self) -> &str;

    /// Verify `request` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Returns an error classified by [`Error::kind`](crate::Error::kind) for
    /// every rejection.
    fn verify_payment(
        &self,
        caller: &Address,
        request: &VerifyPaymentRequest,
    ) -> Result<VerificationOutcome>;
}
