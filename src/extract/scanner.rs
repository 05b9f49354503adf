//! Single-pass scanner for flat string-valued objects.

use super::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectOpenBrace,
    ExpectFirstKeyOrEnd,
    ExpectKeyQuote,
    InKey,
    ExpectColonQuote,
    InValue,
    ExpectCommaOrEnd,
}

/// Extract every value of a flat `{"k":"v",...}` object, in order.
///
/// Keys are scanned but discarded. The whole input must be the object: bytes
/// after the closing brace are rejected.
///
/// # Errors
///
/// Returns an [`ExtractError`] for any grammar violation, for more than
/// `max_values` values, and always for `max_values == 0`.
pub fn extract_all_values(data: &str, max_values: usize) -> Result<Vec<&str>, ExtractError> {
    let (values, end) = scan_object(data, max_values)?;
    if end != data.len() {
        return Err(ExtractError::TrailingData { position: end });
    }
    Ok(values)
}

/// Scan one object starting at the first byte of `data`.
///
/// Returns the values and the offset just past the closing brace, leaving
/// anything after it to the caller.
pub(crate) fn scan_object(
    data: &str,
    max_values: usize,
) -> Result<(Vec<&str>, usize), ExtractError> {
    if max_values == 0 {
        return Err(ExtractError::ZeroMaxValues);
    }
    let bytes = data.as_bytes();
    if bytes.is_empty() {
        return Err(ExtractError::EmptyInput);
    }

    let mut values = Vec::with_capacity(max_values.min(16));
    let mut state = State::ExpectOpenBrace;
    let mut value_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::ExpectOpenBrace => {
                if b != b'{' {
                    return Err(ExtractError::MissingOpenBrace);
                }
                state = State::ExpectFirstKeyOrEnd;
            }
            State::ExpectFirstKeyOrEnd => match b {
                b'"' => state = State::InKey,
                b'}' => return Ok((values, i + 1)),
                _ => return Err(ExtractError::MissingKeyQuote { position: i }),
            },
            State::ExpectKeyQuote => {
                if b != b'"' {
                    return Err(ExtractError::MissingQuoteAfterComma { position: i });
                }
                state = State::InKey;
            }
            State::InKey => match b {
                b'\\' => i += 1,
                b'"' => state = State::ExpectColonQuote,
                _ => {}
            },
            State::ExpectColonQuote => {
                if b != b':' || bytes.get(i + 1) != Some(&b'"') {
                    return Err(ExtractError::MissingColonQuote { position: i });
                }
                i += 1;
                value_start = i + 1;
                state = State::InValue;
            }
            State::InValue => match b {
                b'\\' => i += 1,
                b'"' => {
                    if values.len() == max_values {
                        return Err(ExtractError::TooManyValues { max: max_values });
                    }
                    values.push(&data[value_start..i]);
                    state = State::ExpectCommaOrEnd;
                }
                _ => {}
            },
            State::ExpectCommaOrEnd => match b {
                b',' => state = State::ExpectKeyQuote,
                b'}' => return Ok((values, i + 1)),
                _ => return Err(ExtractError::MissingCommaOrEnd { position: i }),
            },
        }
        i += 1;
    }

    let position = bytes.len();
    Err(match state {
        State::ExpectOpenBrace => ExtractError::MissingOpenBrace,
        State::ExpectFirstKeyOrEnd => ExtractError::MissingKeyQuote { position },
        State::ExpectKeyQuote => ExtractError::MissingQuoteAfterComma { position },
        State::ExpectColonQuote => ExtractError::MissingColonQuote { position },
        State::InKey | State::InValue => ExtractError::UnterminatedValue,
        State::ExpectCommaOrEnd => ExtractError::MissingCommaOrEnd { position },
    })
}
