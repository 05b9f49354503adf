//! Substring search and schema-checked extraction from witness contexts.

use super::scanner::scan_object;
use super::{find_closing_quote, ExtractError};
use serde::{Deserialize, Serialize};

/// Sentinel returned by [`find_substring_end_index`] when there is no match.
pub const NOT_FOUND: usize = usize::MAX;

/// Layout of the context object surrounding `extractedParameters`.
///
/// The profile is chosen by the payment method, never detected from the
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextProfile {
    /// Profile A: `contextAddress`, `contextMessage`, `extractedParameters`,
    /// then `providerHash`.
    ContextFirst,
    /// Profile B: `extractedParameters`, then `intentHash` and
    /// `providerHash`.
    ParametersFirst,
}

impl ContextProfile {
    /// Fields expected after `extractedParameters` when linkage hashes are
    /// requested, in order.
    #[must_use]
    pub const fn trailing_fields(self) -> &'static [&'static str] {
        match self {
            Self::ContextFirst => &["providerHash"],
            Self::ParametersFirst => &["intentHash", "providerHash"],
        }
    }
}

/// Position just past the first occurrence of `target` in `data`.
///
/// Matching is case-sensitive and leftmost. Returns [`NOT_FOUND`] when
/// there is no match, including when `data` is shorter than `target`.
#[must_use]
pub fn find_substring_end_index(data: &str, target: &str) -> usize {
    if data.len() < target.len() {
        return NOT_FOUND;
    }
    data.find(target)
        .map_or(NOT_FOUND, |start| start + target.len())
}

/// Value that follows `marker`, up to the next unescaped quote.
///
/// `marker` normally ends with the opening quote, e.g. `"providerHash":"`.
/// A missing marker yields an empty string rather than an error; callers
/// decide whether an empty value is acceptable.
///
/// # Errors
///
/// Returns [`ExtractError::UnterminatedValue`] if the marker is found but no
/// closing quote follows.
pub fn extract_field_from_context<'a>(
    data: &'a str,
    marker: &str,
) -> Result<&'a str, ExtractError> {
    let start = find_substring_end_index(data, marker);
    if start == NOT_FOUND {
        return Ok("");
    }
    let len =
        find_closing_quote(&data.as_bytes()[start..]).ok_or(ExtractError::UnterminatedValue)?;
    Ok(&data[start..start + len])
}

/// Extract the `extractedParameters` values of a witness context.
///
/// The context must follow `profile` exactly. With `include_linkage_hashes`
/// the profile's trailing fields are required, appended to the output in
/// order, and the context must end right after them; without it nothing
/// after the parameters object is inspected. Profile A's leading fields are
/// validated but not returned.
///
/// # Errors
///
/// Returns [`ExtractError::MalformedField`] naming any expected field that
/// is absent or empty, or the scanner's error for the parameters object.
pub fn extract_all_from_context(
    context: &str,
    max_values: usize,
    include_linkage_hashes: bool,
    profile: ContextProfile,
) -> Result<Vec<&str>, ExtractError> {
    if max_values == 0 {
        return Err(ExtractError::ZeroMaxValues);
    }
    if context.is_empty() {
        return Err(ExtractError::EmptyInput);
    }

    let mut cursor = Cursor::new(context);
    if !cursor.eat("{") {
        return Err(ExtractError::MissingOpenBrace);
    }

    match profile {
        ContextProfile::ContextFirst => {
            cursor.expect_key("contextAddress", false)?;
            cursor.read_string("contextAddress")?;
            cursor.expect_key("contextMessage", true)?;
            cursor.read_string("contextMessage")?;
            cursor.expect_object_key("extractedParameters", true)?;
        }
        ContextProfile::ParametersFirst => {
            cursor.expect_object_key("extractedParameters", false)?;
        }
    }

    let (mut values, consumed) = scan_object(cursor.rest(), max_values)?;
    cursor.advance(consumed);

    if include_linkage_hashes {
        for field in profile.trailing_fields() {
            cursor.expect_key(field, true)?;
            values.push(cursor.read_string(field)?);
        }
        if !cursor.eat("}") || !cursor.rest().is_empty() {
            return Err(ExtractError::TrailingData {
                position: cursor.pos,
            });
        }
    }

    Ok(values)
}

/// Forward-only position in a context string.
struct Cursor<'a> {
    data: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a str) -> Self {
        Self { data, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        let data: &'a str = self.data;
        &data[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Consume `[,]"<key>":"`.
    fn expect_key(&mut self, key: &'static str, comma: bool) -> Result<(), ExtractError> {
        self.expect_key_prefix(key, comma)?;
        if self.eat(":\"") {
            Ok(())
        } else {
            Err(ExtractError::MalformedField { field: key })
        }
    }

    /// Consume `[,]"<key>":` ahead of an object value.
    fn expect_object_key(&mut self, key: &'static str, comma: bool) -> Result<(), ExtractError> {
        self.expect_key_prefix(key, comma)?;
        if self.eat(":") {
            Ok(())
        } else {
            Err(ExtractError::MalformedField { field: key })
        }
    }

    fn expect_key_prefix(&mut self, key: &'static str, comma: bool) -> Result<(), ExtractError> {
        let ok = (!comma || self.eat(",")) && self.eat("\"") && self.eat(key) && self.eat("\"");
        if ok {
            Ok(())
        } else {
            Err(ExtractError::MalformedField { field: key })
        }
    }

    /// Read a non-empty string value and its closing quote.
    fn read_string(&mut self, field: &'static str) -> Result<&'a str, ExtractError> {
        let rest = self.rest();
        let len = find_closing_quote(rest.as_bytes())
            .ok_or(ExtractError::MalformedField { field })?;
        if len == 0 {
            return Err(ExtractError::MalformedField { field });
        }
        self.pos += len + 1;
        Ok(&rest[..len])
    }
}
