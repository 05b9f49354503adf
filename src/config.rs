//! Configuration for a payment verifier instance.

use crate::error::{Error, Result};
use crate::payment::TokenRegistry;
use crate::types::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest token precision whose scale factor fits in `u128`.
pub const MAX_TOKEN_DECIMALS: u8 = 38;

/// Hash of an ISO currency code, as carried in intents.
#[must_use]
pub fn currency_code(code: &str) -> B256 {
    keccak256(code.as_bytes())
}

/// A deposit token and its precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token address.
    pub address: Address,
    /// Decimal places of the token's base unit.
    pub decimals: u8,
}

/// Verifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// This verifier's own identity, used when writing nullifiers.
    #[serde(default)]
    pub address: Address,

    /// Administrator allowed to change provider hashes, currencies and the
    /// timestamp buffer.
    #[serde(default)]
    pub owner: Address,

    /// Escrow, the only caller allowed to verify payments.
    #[serde(default)]
    pub escrow: Address,

    /// Grace period between an intent's creation and an earlier payment
    /// timestamp, in seconds.
    #[serde(default = "default_timestamp_buffer")]
    pub timestamp_buffer_secs: u64,

    /// Distinct authorized witnesses that must sign each claim.
    #[serde(default = "default_min_witness_signatures")]
    pub min_witness_signatures: usize,

    /// Approved request-template hashes.
    #[serde(default)]
    pub provider_hashes: Vec<B256>,

    /// Supported ISO currency codes.
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,

    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Accepted deposit tokens.
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            address: Address::ZERO,
            owner: Address::ZERO,
            escrow: Address::ZERO,
            timestamp_buffer_secs: default_timestamp_buffer(),
            min_witness_signatures: default_min_witness_signatures(),
            provider_hashes: Vec::new(),
            currencies: default_currencies(),
            log_level: default_log_level(),
            tokens: Vec::new(),
        }
    }
}

const fn default_timestamp_buffer() -> u64 {
    30
}

const fn default_min_witness_signatures() -> usize {
    1
}

fn default_currencies() -> Vec<String> {
    vec!["USD".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl VerifierConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the configuration for values the verifier cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.min_witness_signatures == 0 {
            return Err(Error::Config(
                "min_witness_signatures must be at least 1".to_string(),
            ));
        }
        if self.escrow == Address::ZERO {
            return Err(Error::Config("escrow address is not set".to_string()));
        }
        if self.owner == Address::ZERO {
            return Err(Error::Config("owner address is not set".to_string()));
        }

        if self.log_level.trim().is_empty() {
            return Err(Error::Config("log_level is empty".to_string()));
        }

        for (i, hash) in self.provider_hashes.iter().enumerate() {
            if self.provider_hashes[..i].contains(hash) {
                return Err(Error::Config(format!("duplicate provider hash {hash}")));
            }
        }
        for (i, code) in self.currencies.iter().enumerate() {
            if code.is_empty() {
                return Err(Error::Config("empty currency code".to_string()));
            }
            if self.currencies[..i].contains(code) {
                return Err(Error::Config(format!("duplicate currency {code}")));
            }
        }
        for token in &self.tokens {
            if token.decimals > MAX_TOKEN_DECIMALS {
                return Err(Error::Config(format!(
                    "token {} has {} decimals, at most {MAX_TOKEN_DECIMALS} supported",
                    token.address, token.decimals
                )));
            }
        }
        Ok(())
    }

    /// Hashed currency codes, in configuration order.
    #[must_use]
    pub fn currency_codes(&self) -> Vec<B256> {
        self.currencies.iter().map(|c| currency_code(c)).collect()
    }

    /// Token precision table.
    #[must_use]
    pub fn token_registry(&self) -> TokenRegistry {
        self.tokens
            .iter()
            .map(|t| (t.address, t.decimals))
            .collect()
    }
}
