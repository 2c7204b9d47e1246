//! Processing limits
//!
//! Limits are plain data passed with each schema build and each
//! decode/encode call. Nothing here is global.

use crate::error::{Error, Result};

/// Limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting walked by decode/encode
    pub max_xml_depth: usize,

    /// Maximum nesting of model groups accepted by the content model compiler
    pub max_model_depth: usize,

    /// Maximum number of errors collected in lax mode (`None` = unlimited)
    pub max_errors: Option<usize>,

    /// Maximum number of attributes per element
    pub max_attributes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_model_depth: 64,
            max_errors: None,
            max_attributes: 1000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_model_depth: 16,
            max_errors: Some(100),
            max_attributes: 100,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10000,
            max_model_depth: 512,
            max_errors: None,
            max_attributes: 10000,
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if a model group nesting level is within limits
    pub fn check_model_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_model_depth {
            Err(Error::LimitExceeded(format!(
                "model group nesting {} exceeds maximum {}",
                depth, self.max_model_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if the attribute count is within limits
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        if count > self.max_attributes {
            Err(Error::LimitExceeded(format!(
                "Attribute count {} exceeds maximum {}",
                count, self.max_attributes
            )))
        } else {
            Ok(())
        }
    }

    /// True once the collected error count reached the lax-mode cap
    pub fn errors_exhausted(&self, count: usize) -> bool {
        self.max_errors.map_or(false, |max| count >= max)
    }
}
