//! Threshold verification of witness signatures.
//!
//! Witnesses sign claims with secp256k1 using the Ethereum personal-message
//! convention (EIP-191):
//!
//! ```text
//! digest = keccak256("\x19Ethereum Signed Message:\n" ‖ len(message) ‖ message)
//! ```
//!
//! A signature is the 65-byte `r ‖ s ‖ v` blob and a signer is identified by
//! the Ethereum address of the recovered public key.

use crate::error::{Error, Result};
use crate::types::{keccak256, keccak256_concat, Address, B256};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use tracing::{debug, warn};

/// Prefix for EIP-191 personal messages.
pub const ETH_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Recoverable secp256k1 signature size in bytes.
pub const SIGNATURE_SIZE: usize = 65;

/// EIP-191 digest of `message`.
#[must_use]
pub fn eth_signed_message_hash(message: &[u8]) -> B256 {
    let len = message.len().to_string();
    keccak256_concat(&[ETH_MESSAGE_PREFIX, len.as_bytes(), message])
}

/// Ethereum address of a secp256k1 public key.
#[must_use]
pub fn address_from_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash.0[12..]);
    Address(out)
}

/// Recover the signer of `digest`.
///
/// Returns `None` for blobs of the wrong size, an unknown `v` byte, high-`s`
/// signatures or values that do not recover to a point. `v` may be given as
/// `0/1` or `27/28`.
#[must_use]
pub fn recover_signer(digest: &B256, signature: &[u8]) -> Option<Address> {
    if signature.len() != SIGNATURE_SIZE {
        return None;
    }
    let recovery_byte = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return None,
    };
    let recovery_id = RecoveryId::from_byte(recovery_byte)?;
    let sig = Signature::from_slice(&signature[..64]).ok()?;
    let key = VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id).ok()?;
    Some(address_from_key(&key))
}

/// Sign `digest` the way witnesses do, producing `r ‖ s ‖ v` with `v` in
/// `27/28`.
///
/// # Errors
///
/// Returns an error if signing fails.
pub fn sign_digest(key: &SigningKey, digest: &B256) -> Result<Vec<u8>> {
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| Error::Crypto(format!("signing failed: {e}")))?;
    let mut out = sig.to_bytes().to_vec();
    out.push(27 + recovery_id.to_byte());
    Ok(out)
}

/// Check that at least `min_required` distinct authorized witnesses signed
/// `digest`.
///
/// Blobs that fail to recover, and signers outside `authorized_signers`,
/// are skipped. A signer appearing more than once is counted once. Returns
/// the number of distinct authorized signers found, stopping as soon as the
/// threshold is met.
///
/// # Errors
///
/// Returns [`Error::InsufficientSignatures`] when the threshold is not met,
/// without attempting recovery if fewer than `min_required` signatures were
/// supplied, and [`Error::Config`] if `min_required` is zero.
pub fn verify_threshold<S: AsRef<[u8]>>(
    digest: &B256,
    signatures: &[S],
    authorized_signers: &[Address],
    min_required: usize,
) -> Result<usize> {
    if min_required == 0 {
        return Err(Error::Config(
            "minimum witness signatures must be at least one".to_string(),
        ));
    }

    if min_required > signatures.len() {
        warn!(
            "Only {} signatures supplied, {} required",
            signatures.len(),
            min_required
        );
        return Err(Error::InsufficientSignatures {
            valid: 0,
            required: min_required,
        });
    }

    let mut matched: Vec<Address> = Vec::with_capacity(min_required);
    for (i, signature) in signatures.iter().enumerate() {
        let Some(signer) = recover_signer(digest, signature.as_ref()) else {
            debug!("Signature {i} did not recover, skipping");
            continue;
        };
        if !authorized_signers.contains(&signer) {
            debug!("Signature {i} from unauthorized signer {signer}");
            continue;
        }
        if matched.contains(&signer) {
            debug!("Duplicate signature from {signer}");
            continue;
        }
        matched.push(signer);
        if matched.len() >= min_required {
            debug!("Witness threshold {min_required} met");
            return Ok(matched.len());
        }
    }

    warn!(
        "Insufficient valid signatures for {}: {} of {}",
        hex::encode(digest),
        matched.len(),
        min_required
    );
    Err(Error::InsufficientSignatures {
        valid: matched.len(),
        required: min_required,
    })
}
