//! Validation context
//!
//! The mode-aware error sink threaded through every decode and encode call.
//! Nothing here is shared between calls: each operation builds its own
//! context from the caller's [`DecodeOptions`].

use crate::error::{CoercionError, Error, Result, ValidationError};
use crate::limits::Limits;

use super::base::ValidationMode;

/// Per-call options for decode, encode and validate
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// How violations are handled
    pub mode: ValidationMode,
    /// Depth and error-count limits
    pub limits: Limits,
    /// Fill in attribute and element defaults while decoding
    pub fill_defaults: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::strict()
    }
}

impl DecodeOptions {
    /// Options for the given mode with default limits
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            limits: Limits::default(),
            fill_defaults: true,
        }
    }

    /// Strict mode options
    pub fn strict() -> Self {
        Self::new(ValidationMode::Strict)
    }

    /// Lax mode options
    pub fn lax() -> Self {
        Self::new(ValidationMode::Lax)
    }

    /// Skip mode options
    pub fn skip() -> Self {
        Self::new(ValidationMode::Skip)
    }

    /// Replace the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Enable or disable default filling
    pub fn with_fill_defaults(mut self, fill: bool) -> Self {
        self.fill_defaults = fill;
        self
    }
}

/// Mutable state of a single decode/encode operation
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Current validation mode
    pub mode: ValidationMode,
    /// Errors collected in lax mode, in detection order
    pub errors: Vec<ValidationError>,
    /// Fill defaults while decoding
    pub fill_defaults: bool,
    limits: Limits,
    path: Vec<String>,
}

impl ValidationContext {
    /// Create a context for the given options
    pub fn new(options: &DecodeOptions) -> Self {
        Self {
            mode: options.mode,
            errors: Vec::new(),
            fill_defaults: options.fill_defaults,
            limits: options.limits.clone(),
            path: Vec::new(),
        }
    }

    /// Create a context with a specific mode and default limits
    pub fn with_mode(mode: ValidationMode) -> Self {
        Self::new(&DecodeOptions::new(mode))
    }

    /// A strict context sharing the current path, used to try alternatives
    pub fn trial(&self) -> Self {
        Self {
            mode: ValidationMode::Strict,
            errors: Vec::new(),
            fill_defaults: self.fill_defaults,
            limits: self.limits.clone(),
            path: self.path.clone(),
        }
    }

    /// Limits of this call
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// True unless running in skip mode
    pub fn checks(&self) -> bool {
        self.mode.checks()
    }

    /// Current element path, e.g. `/root/item[2]`
    pub fn path(&self) -> String {
        if self.path.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.path.join("/"))
        }
    }

    /// Enter a child element
    pub fn enter(&mut self, segment: impl Into<String>) -> Result<()> {
        self.path.push(segment.into());
        self.limits.check_xml_depth(self.path.len())
    }

    /// Leave the current element
    pub fn leave(&mut self) {
        self.path.pop();
    }

    /// Raise or collect an error based on validation mode
    pub fn raise_or_collect(&mut self, error: ValidationError) -> Result<()> {
        let error = error.or_path(|| self.path());
        match self.mode {
            ValidationMode::Strict => Err(Error::Validation(error)),
            ValidationMode::Lax => {
                tracing::debug!(path = ?error.path, "collected validation error: {}", error.message);
                self.errors.push(error);
                if self.limits.errors_exhausted(self.errors.len()) {
                    Err(Error::LimitExceeded(format!(
                        "stopped after {} validation errors",
                        self.errors.len()
                    )))
                } else {
                    Ok(())
                }
            }
            ValidationMode::Skip => Ok(()),
        }
    }

    /// Report a value that could not be coerced at all.
    ///
    /// In lax mode the error is only recorded when the caller can drop the
    /// offending unit (a list item); a standalone value is raised.
    pub fn coercion_failed(&mut self, error: CoercionError, droppable: bool) -> Result<()> {
        match self.mode {
            ValidationMode::Lax if droppable => self.raise_or_collect(error.into()),
            ValidationMode::Skip => Ok(()),
            _ => Err(Error::Coercion(error)),
        }
    }

    /// Report a lossless representation change (e.g. float `100.0` to an integer type)
    pub fn coerced(&mut self, error: CoercionError) -> Result<()> {
        match self.mode {
            ValidationMode::Strict => Err(Error::Coercion(error)),
            ValidationMode::Lax => self.raise_or_collect(error.into()),
            ValidationMode::Skip => Ok(()),
        }
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Take the collected errors
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_or_collect_strict() {
        let mut ctx = ValidationContext::with_mode(ValidationMode::Strict);
        let result = ctx.raise_or_collect(ValidationError::new("bad"));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_raise_or_collect_lax_records_path() {
        let mut ctx = ValidationContext::with_mode(ValidationMode::Lax);
        ctx.enter("root").unwrap();
        ctx.enter("item[1]").unwrap();
        ctx.raise_or_collect(ValidationError::new("bad")).unwrap();
        ctx.leave();
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors[0].path.as_deref(), Some("/root/item[1]"));
        assert_eq!(ctx.path(), "/root");
    }

    #[test]
    fn test_raise_or_collect_skip_suppresses() {
        let mut ctx = ValidationContext::with_mode(ValidationMode::Skip);
        ctx.raise_or_collect(ValidationError::new("bad")).unwrap();
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_lax_error_cap() {
        let limits = Limits {
            max_errors: Some(2),
            ..Limits::default()
        };
        let mut ctx = ValidationContext::new(&DecodeOptions::lax().with_limits(limits));
        assert!(ctx.raise_or_collect(ValidationError::new("one")).is_ok());
        assert!(matches!(
            ctx.raise_or_collect(ValidationError::new("two")),
            Err(Error::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_coercion_policy() {
        let err = || CoercionError::new("not a boolean", "xs:boolean");

        let mut lax = ValidationContext::with_mode(ValidationMode::Lax);
        assert!(lax.coercion_failed(err(), true).is_ok());
        assert!(lax.errors[0].is_coercion());
        assert!(matches!(lax.coercion_failed(err(), false), Err(Error::Coercion(_))));
        assert!(lax.coerced(err()).is_ok());
        assert_eq!(lax.errors.len(), 2);

        let mut strict = ValidationContext::with_mode(ValidationMode::Strict);
        assert!(strict.coerced(err()).is_err());

        let mut skip = ValidationContext::with_mode(ValidationMode::Skip);
        assert!(skip.coercion_failed(err(), false).is_ok());
        assert!(!skip.has_errors());
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_xml_depth: 1,
            ..Limits::default()
        };
        let mut ctx = ValidationContext::new(&DecodeOptions::strict().with_limits(limits));
        assert!(ctx.enter("a").is_ok());
        assert!(ctx.enter("b").is_err());
    }
}
