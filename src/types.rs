//! Fixed-size byte types shared across the verifier.
//!
//! [`Address`] is a 20-byte account id and [`B256`] a 32-byte digest. Both
//! render as `0x`-prefixed lowercase hex, serialize as hex strings in
//! human-readable formats (TOML) and as raw bytes in binary formats
//! (MessagePack proofs).

use crate::error::{Error, Result};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Length in bytes.
            pub const LEN: usize = $len;

            /// All-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            /// Wrap raw bytes.
            #[must_use]
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Copy from a slice of exactly the right length.
            #[must_use]
            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }

            /// Borrow the raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(digits)
                    .map_err(|e| Error::invalid(stringify!($name), e.to_string()))?;
                Self::from_slice(&bytes).ok_or_else(|| {
                    Error::invalid(
                        stringify!($name),
                        format!("expected {} bytes, got {}", $len, bytes.len()),
                    )
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_string())
                } else {
                    serializer.serialize_bytes(&self.0)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                struct BytesVisitor;

                impl<'de> Visitor<'de> for BytesVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "{} bytes or a hex string", $len)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<$name, E> {
                        v.parse().map_err(E::custom)
                    }

                    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<$name, E> {
                        $name::from_slice(v).ok_or_else(|| E::invalid_length(v.len(), &self))
                    }

                    fn visit_seq<A: SeqAccess<'de>>(
                        self,
                        mut seq: A,
                    ) -> std::result::Result<$name, A::Error> {
                        let mut out = [0u8; $len];
                        for (i, byte) in out.iter_mut().enumerate() {
                            *byte = seq
                                .next_element()?
                                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                        }
                        if seq.next_element::<u8>()?.is_some() {
                            return Err(de::Error::invalid_length($len + 1, &self));
                        }
                        Ok($name(out))
                    }
                }

                if deserializer.is_human_readable() {
                    deserializer.deserialize_str(BytesVisitor)
                } else {
                    deserializer.deserialize_bytes(BytesVisitor)
                }
            }
        }
    };
}

fixed_bytes!(
    /// 20-byte account identifier (an Ethereum-style address).
    Address,
    20
);

fixed_bytes!(
    /// 32-byte digest, hash or currency code.
    B256,
    32
);

impl B256 {
    /// Parse an unsigned 256-bit integer given in decimal, or in hex with a
    /// `0x` prefix, into big-endian bytes.
    ///
    /// Intent hashes travel as decimal strings inside `contextMessage`.
    ///
    /// # Errors
    ///
    /// Returns an error on empty input, non-digit characters or overflow.
    pub fn from_uint_str(s: &str) -> Result<Self> {
        if let Some(digits) = s.strip_prefix("0x") {
            if digits.is_empty() || digits.len() > 64 {
                return Err(Error::invalid("uint256", format!("bad hex length in {s:?}")));
            }
            let bytes = hex::decode(format!("{digits:0>64}"))
                .map_err(|e| Error::invalid("uint256", e.to_string()))?;
            return Self::from_slice(&bytes)
                .ok_or_else(|| Error::invalid("uint256", "bad hex length"));
        }

        if s.is_empty() {
            return Err(Error::invalid("uint256", "empty string"));
        }

        let mut out = [0u8; 32];
        for c in s.bytes() {
            if !c.is_ascii_digit() {
                return Err(Error::invalid("uint256", format!("non-digit in {s:?}")));
            }
            let mut carry = u16::from(c - b'0');
            for byte in out.iter_mut().rev() {
                let v = u16::from(*byte) * 10 + carry;
                *byte = v.to_be_bytes()[1];
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(Error::invalid("uint256", "value exceeds 256 bits"));
            }
        }
        Ok(Self(out))
    }
}

/// Keccak-256 of `data`.
#[must_use]
pub fn keccak256(data: impl AsRef<[u8]>) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(data.as_ref());
    B256(hasher.finalize().into())
}

/// Keccak-256 of the concatenation of `parts`.
#[must_use]
pub fn keccak256_concat(parts: &[&[u8]]) -> B256 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    B256(hasher.finalize().into())
}
