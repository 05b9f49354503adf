//! Witnessed payment proofs and their wire format.
//!
//! A proof pairs the captured HTTP interaction ([`ClaimInfo`]) with the claim
//! witnesses signed over it ([`SignedClaim`]). Proofs travel as MessagePack
//! with structs encoded positionally:
//!
//! ```text
//! Proof = [ClaimInfo = [provider, parameters, context],
//!          SignedClaim = [Claim = [identifier, owner, timestampS, epoch], [signature, ...]]]
//! ```

use crate::error::{Error, Result};
use crate::signature::eth_signed_message_hash;
use crate::types::{keccak256_concat, Address, B256};
use serde::{Deserialize, Serialize};

/// The captured HTTP interaction and its extracted fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimInfo {
    /// Provider name.
    pub provider: String,
    /// Request parameters of the captured session.
    pub parameters: String,
    /// Context text holding `extractedParameters`.
    pub context: String,
}

impl ClaimInfo {
    /// `keccak256(provider ‖ "\n" ‖ parameters ‖ "\n" ‖ context)`.
    #[must_use]
    pub fn hash(&self) -> B256 {
        keccak256_concat(&[
            self.provider.as_bytes(),
            b"\n",
            self.parameters.as_bytes(),
            b"\n",
            self.context.as_bytes(),
        ])
    }
}

/// The tuple a witness signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Must equal the hash of the accompanying [`ClaimInfo`].
    pub identifier: B256,
    /// Account that requested the claim.
    pub owner: Address,
    /// Witness time in seconds.
    pub timestamp_s: u32,
    /// Witness epoch.
    pub epoch: u32,
}

impl Claim {
    /// Message witnesses sign: identifier, owner, timestamp and epoch on
    /// separate lines.
    #[must_use]
    pub fn serialise(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.identifier, self.owner, self.timestamp_s, self.epoch
        )
    }

    /// EIP-191 digest of [`Claim::serialise`].
    #[must_use]
    pub fn signing_digest(&self) -> B256 {
        eth_signed_message_hash(self.serialise().as_bytes())
    }
}

/// A claim and its witness signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedClaim {
    /// The signed claim.
    pub claim: Claim,
    /// Signature blobs, one per witness.
    pub signatures: Vec<Vec<u8>>,
}

/// A single witnessed proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Captured interaction.
    pub claim_info: ClaimInfo,
    /// Witness signatures over the claim.
    pub signed_claim: SignedClaim,
}

impl Proof {
    /// Check that the claim identifier is the hash of the claim info.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentifierMismatch`] otherwise.
    pub fn check_identifier(&self) -> Result<()> {
        let expected = self.claim_info.hash();
        let actual = self.signed_claim.claim.identifier;
        if expected == actual {
            Ok(())
        } else {
            Err(Error::IdentifierMismatch { expected, actual })
        }
    }

    /// Context text of the claim.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.claim_info.context
    }
}

/// What a taker submits: one proof, or a payment proof linked to an
/// identity proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentProof {
    /// A single payment proof.
    Single(Proof),
    /// A payment proof plus a proof tying the payee's account to an identity.
    Linked {
        /// Proof of the payment itself.
        payment: Proof,
        /// Proof of the payee account's identity.
        identity: Proof,
    },
}

impl PaymentProof {
    /// Whether this bundle carries a linked identity proof.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        matches!(self, Self::Linked { .. })
    }
}

/// Decode a submitted payment proof.
///
/// # Errors
///
/// Returns [`Error::Decode`] on empty or malformed input.
pub fn decode_payment_proof(bytes: &[u8]) -> Result<PaymentProof> {
    if bytes.is_empty() {
        return Err(Error::Decode("empty payment proof".to_string()));
    }
    rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(format!("payment proof: {e}")))
}

/// Encode a payment proof for submission.
///
/// # Errors
///
/// Returns [`Error::Decode`] if serialization fails.
pub fn encode_payment_proof(proof: &PaymentProof) -> Result<Vec<u8>> {
    rmp_serde::to_vec(proof).map_err(|e| Error::Decode(format!("payment proof: {e}")))
}

/// Decode the witness list passed alongside a proof.
///
/// # Errors
///
/// Returns [`Error::Decode`] on malformed input.
pub fn decode_witnesses(bytes: &[u8]) -> Result<Vec<Address>> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(format!("witness list: {e}")))
}

/// Encode a witness list.
///
/// # Errors
///
/// Returns [`Error::Decode`] if serialization fails.
pub fn encode_witnesses(witnesses: &[Address]) -> Result<Vec<u8>> {
    rmp_serde::to_vec(witnesses).map_err(|e| Error::Decode(format!("witness list: {e}")))
}
