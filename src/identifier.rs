//! Opaque 16-byte identifiers for buckets and metrics
//!
//! An [`Identifier`] renders like a UUID (`8-4-4-4-12` lower-case hex), and
//! [`Identifier::generate`] produces a random version 4 value. Parsing is
//! deliberately relaxed: any 32 hex digits are accepted regardless of the
//! version and variant bits, so the full 128 bits can be used as an opaque key.
//!
//! # Example
//!
//! ```rust
//! use kuba_dsl::identifier::Identifier;
//!
//! let id: Identifier = "12da0b4c-8f1e-4897-842f-3487849dfba6".parse().unwrap();
//! assert_eq!(id.to_string(), "12da0b4c-8f1e-4897-842f-3487849dfba6");
//!
//! // Not a valid RFC 4122 layout, but still a valid identifier
//! let raw: Identifier = "ffffffffffffffffffffffffffffffff".parse().unwrap();
//! assert_eq!(raw.as_bytes(), &[0xff; 16]);
//! ```

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use uuid::{Builder, Uuid};

use crate::error::{Error, Result};

/// Number of hex digits in the text form, hyphens excluded
const HEX_DIGITS: usize = 32;

/// Opaque 128-bit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier([u8; 16]);

impl Identifier {
    /// The all-zero identifier
    pub const fn nil() -> Self {
        Self([0; 16])
    }

    /// Wrap raw bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generate a random version 4 identifier from the OS secure random source
    ///
    /// # Errors
    ///
    /// Returns `Error::Entropy` when the random source cannot be read. This is
    /// an environment fault, not a caller error.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::Entropy(e.to_string()))?;

        // Builder forces version 4 and the RFC 4122 variant bits
        let uuid = Builder::from_random_bytes(bytes).into_uuid();
        Ok(Self(*uuid.as_bytes()))
    }

    /// Parse the text form
    ///
    /// All hyphens are removed before decoding, and the remaining text must be
    /// exactly 32 hex digits (either case).
    ///
    /// # Errors
    ///
    /// Returns `Error::Format` for non-hex input or a wrong length.
    pub fn parse(text: &str) -> Result<Self> {
        let digits: String = text.chars().filter(|&c| c != '-').collect();

        if digits.len() != HEX_DIGITS {
            return Err(Error::Format(format!(
                "identifier '{}' must contain {} hex digits, found {}",
                text,
                HEX_DIGITS,
                digits.len()
            )));
        }
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(Error::Format(format!(
                "identifier '{}' is not valid hex: unexpected '{}'",
                text, bad
            )));
        }

        // 32 hex digits is the "simple" uuid form, which does not check version bits
        let uuid = Uuid::try_parse(&digits)
            .map_err(|e| Error::Format(format!("identifier '{}': {}", text, e)))?;
        Ok(Self(*uuid.as_bytes()))
    }

    /// The raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // hyphenated() is lower-case 8-4-4-4-12
        write!(f, "{}", Uuid::from_bytes(self.0).hyphenated())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<[u8; 16]> for Identifier {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Identifier::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// List of identifiers with a few helpers for handler code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifiers(Vec<Identifier>);

impl Identifiers {
    /// Create an empty list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// The first identifier
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the list is empty.
    pub fn first(&self) -> Result<Identifier> {
        self.0.first().copied().ok_or_else(|| {
            Error::InvalidArgument("at least one identifier is required".to_string())
        })
    }

    /// Append `other` and return the combined list
    pub fn join(mut self, other: Identifiers) -> Self {
        self.0.extend(other.0);
        self
    }
}

impl Deref for Identifiers {
    type Target = [Identifier];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Identifier>> for Identifiers {
    fn from(ids: Vec<Identifier>) -> Self {
        Self(ids)
    }
}

impl FromIterator<Identifier> for Identifiers {
    fn from_iter<I: IntoIterator<Item = Identifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
