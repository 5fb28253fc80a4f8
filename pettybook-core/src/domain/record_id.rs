//! Opaque record identifiers
//!
//! The ephemeral and embedded stores hand out sequential integers, the
//! document store hands out its native ObjectId in hex form. Callers treat
//! both as opaque and pass back whatever they were given.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a category or transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Key(String),
}

impl RecordId {
    /// Integer form, if this id has one
    ///
    /// A `Key` made only of digits (e.g. typed on the command line) counts.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RecordId::Int(n) => Some(*n),
            RecordId::Key(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Key(s) => f.write_str(s),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Key(trimmed.to_string()),
        })
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Key(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Key(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_digits_as_int() {
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::Int(42));
        assert_eq!(
            "65f1c0ffee".parse::<RecordId>().unwrap(),
            RecordId::Key("65f1c0ffee".to_string())
        );
    }

    #[test]
    fn test_as_int_accepts_numeric_keys() {
        assert_eq!(RecordId::Key("7".to_string()).as_int(), Some(7));
        assert_eq!(RecordId::Key("abc".to_string()).as_int(), None);
    }

    #[test]
    fn test_serializes_untagged() {
        assert_eq!(serde_json::to_string(&RecordId::Int(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&RecordId::from("ab12")).unwrap(), "\"ab12\"");
        let back: RecordId = serde_json::from_str("\"ab12\"").unwrap();
        assert_eq!(back, RecordId::from("ab12"));
    }
}
