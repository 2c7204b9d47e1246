//! Validation mode shared by every decode, encode and validate call

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Validation mode for XSD validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationMode {
    /// The first violation aborts the whole operation
    #[default]
    Strict,
    /// Violations are recorded, the offending unit is skipped and processing continues
    Lax,
    /// Type and content checks are bypassed; values are only coerced lexically
    Skip,
}

impl ValidationMode {
    /// Get the mode as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Lax => "lax",
            ValidationMode::Skip => "skip",
        }
    }

    /// True when checks are performed at all
    pub fn checks(&self) -> bool {
        !matches!(self, ValidationMode::Skip)
    }
}

impl FromStr for ValidationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "strict" => Ok(ValidationMode::Strict),
            "lax" => Ok(ValidationMode::Lax),
            "skip" => Ok(ValidationMode::Skip),
            _ => Err(Error::Value(format!(
                "Invalid validation mode: '{}'. Must be 'strict', 'lax', or 'skip'",
                s
            ))),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
