//! Revisions and revision types.

use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A totally ordered logical timestamp for one committed unit of work.
///
/// Allocated by the storage collaborator; the core never invents one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    pub fn number(self) -> u64 {
        self.0
    }

    pub fn to_value(self) -> Value {
        Value::Int(self.0 as i64)
    }
}

impl From<u64> for Revision {
    fn from(n: u64) -> Self {
        Revision(n)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of change a stored audit row describes.
///
/// Collection diffs only ever produce `Add` and `Del`; `Mod` is reserved
/// for entity-level rows (including "owner changed" markers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RevisionType {
    Add,
    Mod,
    Del,
}

impl RevisionType {
    /// Persisted discriminator
    pub fn code(self) -> i64 {
        match self {
            RevisionType::Add => 0,
            RevisionType::Mod => 1,
            RevisionType::Del => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RevisionType::Add),
            1 => Some(RevisionType::Mod),
            2 => Some(RevisionType::Del),
            _ => None,
        }
    }

    pub fn to_value(self) -> Value {
        Value::Int(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for rt in [RevisionType::Add, RevisionType::Mod, RevisionType::Del] {
            assert_eq!(RevisionType::from_code(rt.code()), Some(rt));
        }
        assert_eq!(RevisionType::from_code(9), None);
    }

    #[test]
    fn test_revisions_are_ordered() {
        assert!(Revision(2) < Revision(3));
        assert_eq!(Revision(7).to_value(), Value::Int(7));
    }
}
