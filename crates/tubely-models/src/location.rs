//! Stored object locations.
//!
//! A location is persisted as the single string `"{bucket},{key}"`. It is an
//! internal pointer, never a retrievable URL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationParseError {
    #[error("Location reference has no bucket/key separator: {0}")]
    MissingSeparator(String),
    #[error("Location reference has an empty bucket or key: {0}")]
    EmptyComponent(String),
}

/// A `(bucket, key)` pair in the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Encode as the persisted reference string.
    pub fn to_reference(&self) -> String {
        format!("{},{}", self.bucket, self.key)
    }

    /// Parse a persisted reference, splitting on the first comma.
    pub fn parse(reference: &str) -> Result<Self, LocationParseError> {
        let (bucket, key) = reference
            .split_once(',')
            .ok_or_else(|| LocationParseError::MissingSeparator(reference.to_string()))?;

        if bucket.is_empty() || key.is_empty() {
            return Err(LocationParseError::EmptyComponent(reference.to_string()));
        }

        Ok(Self::new(bucket, key))
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectLocation {
    type Err = LocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
