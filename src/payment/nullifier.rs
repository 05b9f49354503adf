//! Replay prevention for consumed payments.
//!
//! A nullifier is derived from the provider's payment id and recorded the
//! first time a payment releases funds. It is never removed.

use crate::error::{Error, Result};
use crate::types::{keccak256_concat, Address, B256};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Nullifier for `payment_id` under `domain`.
///
/// `keccak256(domain ‖ ":" ‖ payment_id)`; the domain keeps equal payment ids
/// from different providers apart.
#[must_use]
pub fn derive_nullifier(domain: &str, payment_id: &str) -> B256 {
    keccak256_concat(&[domain.as_bytes(), b":", payment_id.as_bytes()])
}

/// Store of consumed payment nullifiers.
pub trait NullifierRegistry: Send + Sync {
    /// Whether `id` has been consumed.
    fn is_nullified(&self, id: &B256) -> bool;

    /// Record `id` as consumed on behalf of `writer`.
    ///
    /// Check and insert are one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if `writer` lacks write permission and
    /// [`Error::NullifierUsed`] if `id` is already recorded.
    fn add_nullifier(&self, writer: &Address, id: B256) -> Result<()>;
}

/// Registry statistics.
#[derive(Debug, Default, Clone)]
pub struct NullifierStats {
    /// Nullifiers recorded.
    pub additions: u64,
    /// Inserts rejected as replays.
    pub replays: u64,
}

struct Inner {
    nullifiers: HashSet<B256>,
    writers: Vec<Address>,
}

/// In-memory [`NullifierRegistry`] with owner-managed write permissions.
///
/// Clones share state, so one registry can back several verifiers.
#[derive(Clone)]
pub struct InMemoryNullifierRegistry {
    owner: Address,
    inner: Arc<Mutex<Inner>>,
    stats: Arc<Mutex<NullifierStats>>,
}

impl InMemoryNullifierRegistry {
    /// Create an empty registry administered by `owner`.
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            inner: Arc::new(Mutex::new(Inner {
                nullifiers: HashSet::new(),
                writers: Vec::new(),
            })),
            stats: Arc::new(Mutex::new(NullifierStats::default())),
        }
    }

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "{caller} is not the nullifier registry owner"
            )))
        }
    }

    /// Grant `writer` permission to record nullifiers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if `caller` is not the owner and
    /// [`Error::Config`] if `writer` already has permission.
    pub fn add_write_permission(&self, caller: &Address, writer: Address) -> Result<()> {
        self.ensure_owner(caller)?;
        let mut inner = self.inner.lock();
        if inner.writers.contains(&writer) {
            return Err(Error::Config(format!("{writer} is already a writer")));
        }
        inner.writers.push(writer);
        info!("Granted nullifier write permission to {writer}");
        Ok(())
    }

    /// Revoke `writer`'s permission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if `caller` is not the owner and
    /// [`Error::Config`] if `writer` has no permission.
    pub fn remove_write_permission(&self, caller: &Address, writer: &Address) -> Result<()> {
        self.ensure_owner(caller)?;
        let mut inner = self.inner.lock();
        let index = inner
            .writers
            .iter()
            .position(|w| w == writer)
            .ok_or_else(|| Error::Config(format!("{writer} is not a writer")))?;
        inner.writers.remove(index);
        info!("Revoked nullifier write permission from {writer}");
        Ok(())
    }

    /// Whether `writer` may record nullifiers.
    #[must_use]
    pub fn is_writer(&self, writer: &Address) -> bool {
        self.inner.lock().writers.contains(writer)
    }

    /// Registry owner.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    /// Number of recorded nullifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().nullifiers.len()
    }

    /// Whether no nullifier has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().nullifiers.is_empty()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> NullifierStats {
        self.stats.lock().clone()
    }
}

impl NullifierRegistry for InMemoryNullifierRegistry {
    fn is_nullified(&self, id: &B256) -> bool {
        self.inner.lock().nullifiers.contains(id)
    }

    fn add_nullifier(&self, writer: &Address, id: B256) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.writers.contains(writer) {
            return Err(Error::Unauthorized(format!(
                "{writer} may not write nullifiers"
            )));
        }
        if !inner.nullifiers.insert(id) {
            self.stats.lock().replays += 1;
            warn!("Nullifier {} already used", hex::encode(id));
            return Err(Error::NullifierUsed(id));
        }
        self.stats.lock().additions += 1;
        debug!("Recorded nullifier {}", hex::encode(id));
        Ok(())
    }
}
