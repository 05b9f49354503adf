//! Field extraction from witnessed payment contexts.
//!
//! Witness contexts are attacker-controlled text. Instead of a general JSON
//! parser this module implements a restricted grammar: a flat object whose
//! keys and values are all strings, with no whitespace between tokens.
//!
//! ```text
//! {"contextAddress":"0x0","contextMessage":"42","extractedParameters":{"amount":"5.00",...},"providerHash":"0x.."}
//!  └──────── profile A leading fields ───────┘ └──────── flat object ────────┘ └── trailing ──┘
//! ```
//!
//! Every scan is a single forward pass: O(n) time, O(1) extra space apart
//! from the output vector, whose length is capped by `max_values`. Values are
//! returned as slices of the input and escape sequences are kept verbatim,
//! so `\"` comes back as two bytes.

mod context;
mod scanner;

pub use context::{
    extract_all_from_context, extract_field_from_context, find_substring_end_index,
    ContextProfile, NOT_FOUND,
};
pub use scanner::extract_all_values;

use thiserror::Error;

/// Grammar violations reported by the extractor.
///
/// Extraction is fail-closed: any of these aborts the parse and no partial
/// result is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Input was empty.
    #[error("empty input")]
    EmptyInput,

    /// `max_values` was zero.
    #[error("max values must be at least one")]
    ZeroMaxValues,

    /// Input does not start with `{`.
    #[error("input does not open with '{{'")]
    MissingOpenBrace,

    /// `{` not followed by `"` or `}`.
    #[error("expected key quote at byte {position}")]
    MissingKeyQuote {
        /// Byte offset of the offending character.
        position: usize,
    },

    /// Key not followed by `:"`.
    #[error("expected ':' and quote after key at byte {position}")]
    MissingColonQuote {
        /// Byte offset of the offending character.
        position: usize,
    },

    /// `,` not followed by `"`.
    #[error("expected quote after comma at byte {position}")]
    MissingQuoteAfterComma {
        /// Byte offset of the offending character.
        position: usize,
    },

    /// Value not followed by `,` or `}`.
    #[error("expected ',' or '}}' after value at byte {position}")]
    MissingCommaOrEnd {
        /// Byte offset of the offending character.
        position: usize,
    },

    /// Input ended inside a key or value.
    #[error("unterminated string at end of input")]
    UnterminatedValue,

    /// More values than the caller allowed.
    #[error("more than {max} values")]
    TooManyValues {
        /// Limit that was exceeded.
        max: usize,
    },

    /// Bytes remain after the closing brace.
    #[error("unexpected trailing data at byte {position}")]
    TrailingData {
        /// Byte offset of the first trailing byte.
        position: usize,
    },

    /// A required context field is absent or empty.
    #[error("malformed or empty {field}")]
    MalformedField {
        /// Name of the field.
        field: &'static str,
    },
}

/// Index of the first unescaped `"` in `bytes`.
///
/// A backslash always consumes itself and the following byte.
pub(crate) fn find_closing_quote(bytes: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}
