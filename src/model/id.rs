//! Opaque record identifiers.
//!
//! Identifiers use the 12-byte ObjectId layout the mobile clients already
//! store: a big-endian seconds timestamp, five random bytes and a rolling
//! counter. On the wire and in the database they are 24 lowercase hex
//! characters.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of an identifier in bytes.
pub const ID_LEN: usize = 12;

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Identifier parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("Invalid identifier {0:?}: expected 24 hex characters")]
    Malformed(String),
}

/// A 12-byte record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_LEN]);

impl ObjectId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let seconds = now.timestamp() as u32;

        let mut random = [0u8; 5];
        if getrandom::getrandom(&mut random).is_err() {
            // Entropy unavailable: fall back to sub-second clock noise.
            random[..4].copy_from_slice(&now.timestamp_subsec_nanos().to_be_bytes());
        }

        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Parse the 24-character hex form.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        if raw.len() != ID_LEN * 2 {
            return Err(IdError::Malformed(raw.to_string()));
        }

        let decoded = hex::decode(raw).map_err(|_| IdError::Malformed(raw.to_string()))?;

        let mut bytes = [0u8; ID_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Creation time embedded in the identifier (Unix seconds).
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl ToSql for ObjectId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_hex()))
    }
}

impl FromSql for ObjectId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Self::parse(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
