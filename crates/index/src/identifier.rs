use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-assigned identifier: a JSON integer or a JSON string, kept as given.
///
/// `7` and `"7"` are different identifiers. Integers that fit `i64` always
/// land in `Int`; only those above `i64::MAX` become `UInt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    UInt(u64),
    Text(String),
}

impl Identifier {
    /// `0` and `""`. A blank video filter selects nothing and is ignored.
    pub fn is_blank(&self) -> bool {
        match self {
            Identifier::Int(n) => *n == 0,
            Identifier::UInt(n) => *n == 0,
            Identifier::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(n) => write!(f, "{n}"),
            Identifier::UInt(n) => write!(f, "{n}"),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Text(value)
    }
}
