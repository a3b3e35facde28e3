//! Fastflag values.
//!
//! Sober's `fflags` section is a flat JSON object of scalar values. Each value
//! is held as a [`FlagValue`]; edits arrive as raw text and are coerced to the
//! [`FlagKind`] of the value already stored for that key.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static INT_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("Invalid integer literal regex"));

static FLOAT_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(\d+\.\d*|\.\d+)$").expect("Invalid float literal regex")
});

/// A single fastflag value.
///
/// Variant order matters for deserialization: JSON integers land in `Int`,
/// anything with a fraction or exponent lands in `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Type tag of a [`FlagValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKind {
    Bool,
    Int,
    Float,
    String,
}

/// Raw text could not be converted to the kind of the existing value.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert {raw:?} to {expected}")]
pub struct CoercionError {
    pub expected: FlagKind,
    pub raw: String,
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::Int(_) => FlagKind::Int,
            FlagValue::Float(_) => FlagKind::Float,
            FlagValue::String(_) => FlagKind::String,
        }
    }

    /// Infer a value from a literal typed for a brand new flag.
    ///
    /// `true`/`false` (any case) become booleans, whole numbers become
    /// integers, decimal literals become floats, everything else stays text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.eq_ignore_ascii_case("true") {
            return FlagValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return FlagValue::Bool(false);
        }
        if INT_LITERAL.is_match(trimmed) {
            if let Ok(value) = trimmed.parse::<i64>() {
                return FlagValue::Int(value);
            }
        }
        if FLOAT_LITERAL.is_match(trimmed) {
            if let Ok(value) = trimmed.parse::<f64>() {
                return FlagValue::Float(value);
            }
        }

        FlagValue::String(raw.to_string())
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(value) => write!(f, "{}", value),
            FlagValue::Int(value) => write!(f, "{}", value),
            FlagValue::Float(value) => write!(f, "{:?}", value),
            FlagValue::String(value) => f.write_str(value),
        }
    }
}

impl FlagKind {
    /// Convert raw text into a value of this kind.
    pub fn coerce(self, raw: &str) -> Result<FlagValue, CoercionError> {
        let trimmed = raw.trim();
        let fail = || CoercionError {
            expected: self,
            raw: raw.to_string(),
        };

        match self {
            FlagKind::Bool => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(FlagValue::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(FlagValue::Bool(false))
                } else {
                    Err(fail())
                }
            }
            FlagKind::Int => trimmed.parse::<i64>().map(FlagValue::Int).map_err(|_| fail()),
            FlagKind::Float => match trimmed.parse::<f64>() {
                // JSON has no representation for NaN or infinities
                Ok(value) if value.is_finite() => Ok(FlagValue::Float(value)),
                _ => Err(fail()),
            },
            FlagKind::String => Ok(FlagValue::String(raw.to_string())),
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlagKind::Bool => "boolean",
            FlagKind::Int => "integer",
            FlagKind::Float => "float",
            FlagKind::String => "string",
        };
        f.write_str(name)
    }
}
