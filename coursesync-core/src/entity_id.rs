//! Entity identities.
//!
//! Every curriculum entity is identified either by a server identity (a
//! positive integer assigned by the backend) or by a temporary identity
//! handed out client-side while a course is being edited. The two regimes
//! are distinct variants, so a temporary id can never be mistaken for a
//! server one.
//!
//! On disk and in working copies the id is a single integer: server ids are
//! written as-is and temporary ids as their negated counter, so
//! `Temporary(1)` is stored as `-1`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when encoding or decoding an entity id.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("0 is not a valid entity id")]
    Zero,

    #[error("Entity id {0} is out of range")]
    OutOfRange(i64),

    #[error("Entity id {0} does not fit in a signed 64-bit integer")]
    Unencodable(EntityId),
}

/// Identity of a section, lesson, question or answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    /// Assigned by the backend; stable across sessions.
    Server(u64),
    /// Assigned during an editing session; unique among its siblings.
    Temporary(u64),
}

impl EntityId {
    /// Returns the server identity, if this is one.
    pub fn server(self) -> Option<u64> {
        match self {
            EntityId::Server(id) => Some(id),
            EntityId::Temporary(_) => None,
        }
    }

    pub fn is_temporary(self) -> bool {
        matches!(self, EntityId::Temporary(_))
    }

    /// The raw counter regardless of regime.
    pub fn number(self) -> u64 {
        match self {
            EntityId::Server(n) | EntityId::Temporary(n) => n,
        }
    }

    /// Encode as a signed integer (temporary ids are negative).
    ///
    /// Fails for counters above `i64::MAX`, which [`EntityId::from_wire`]
    /// could not read back.
    pub fn to_wire(self) -> Result<i64, EntityIdError> {
        let encoded = match self {
            EntityId::Server(n) => i64::try_from(n).ok(),
            EntityId::Temporary(n) => i64::try_from(n).ok().map(|v| -v),
        };
        encoded.ok_or(EntityIdError::Unencodable(self))
    }

    /// Decode from a signed integer.
    pub fn from_wire(value: i64) -> Result<Self, EntityIdError> {
        match value {
            0 => Err(EntityIdError::Zero),
            i64::MIN => Err(EntityIdError::OutOfRange(value)),
            v if v > 0 => Ok(EntityId::Server(v as u64)),
            v => Ok(EntityId::Temporary(v.unsigned_abs())),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Server(n) => write!(f, "{}", n),
            EntityId::Temporary(n) => write!(f, "new#{}", n),
        }
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.to_wire().map_err(serde::ser::Error::custom)?;
        serializer.serialize_i64(value)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        EntityId::from_wire(value).map_err(serde::de::Error::custom)
    }
}
