// crates/parcel-index-core/src/core/identifiers.rs
// ============================================================================
// Module: Parcel Index Identifiers
// Description: Canonical opaque identifiers for parcels and persisted artifacts.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the string-based identifiers used throughout the parcel
//! index. Identifiers are opaque and serialize as strings. Parcel numbers are
//! ordered so the master index iterates deterministically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Unique parcel number keying the master index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelNum(String);

impl ParcelNum {
    /// Creates a new parcel number.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the parcel number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the parcel number from a raw JSON value.
    ///
    /// Strings are taken verbatim and integers are stringified. Anything else
    /// cannot key the master index.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::new(text.as_str())),
            Value::Number(number) if number.is_i64() || number.is_u64() => {
                Some(Self::new(number.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ParcelNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ParcelNum {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ParcelNum {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Identifier carried by every persisted artifact (`id` field).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Creates a new artifact identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ArtifactId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArtifactId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
