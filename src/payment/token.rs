//! Deposit token metadata.

use crate::types::Address;
use std::collections::HashMap;

/// Source of token decimal precision.
pub trait TokenMetadata: Send + Sync {
    /// Decimals of `token`, or `None` if the token is unknown.
    fn decimals(&self, token: &Address) -> Option<u8>;
}

/// In-memory [`TokenMetadata`].
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    decimals: HashMap<Address, u8>,
}

impl TokenRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update `token`.
    pub fn insert(&mut self, token: Address, decimals: u8) {
        self.decimals.insert(token, decimals);
    }

    /// Number of known tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decimals.len()
    }

    /// Whether no token is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decimals.is_empty()
    }
}

impl TokenMetadata for TokenRegistry {
    fn decimals(&self, token: &Address) -> Option<u8> {
        self.decimals.get(token).copied()
    }
}

impl FromIterator<(Address, u8)> for TokenRegistry {
    fn from_iter<I: IntoIterator<Item = (Address, u8)>>(iter: I) -> Self {
        Self {
            decimals: iter.into_iter().collect(),
        }
    }
}
