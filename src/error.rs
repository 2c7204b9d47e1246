//! Error types for xmlschema-core
//!
//! Three classes of failure are kept apart:
//!
//! - [`SchemaError`]: a schema component could not be compiled (bad derivation,
//!   malformed occurrence bounds, illegal open content). Never policy-gated.
//! - [`CoercionError`]: a native value has a representation that cannot be read
//!   in the target type's lexical space at all.
//! - [`ValidationError`]: a well-formed value or element breaks a content-model,
//!   cardinality, facet or wildcard constraint. Gated by the validation mode.

use std::fmt;
use thiserror::Error;

/// Result type alias using the crate [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlschema-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Instance validation error
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Native value cannot be represented in the target type
    #[error("coercion error: {0}")]
    Coercion(#[from] CoercionError),

    /// Schema component compilation error
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Several schema components failed to compile
    #[error("{0}")]
    SchemaErrors(#[from] SchemaErrors),

    /// XSD or XML document syntax error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Value error (invalid argument value)
    #[error("value error: {0}")]
    Value(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML reader/writer error
    #[error("XML error: {0}")]
    Xml(String),
}

impl Error {
    /// True for instance validation failures
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for representation failures of native values
    pub fn is_coercion(&self) -> bool {
        matches!(self, Error::Coercion(_))
    }

    /// True for schema compilation failures
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema(_) | Error::SchemaErrors(_))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

/// Class of a collected instance error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorKind {
    /// Content, cardinality, facet or wildcard violation
    #[default]
    Validation,
    /// Wrong representation of a native value, recorded instead of raised
    Coercion,
}

/// Instance validation error with context
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Path of the element (or particle position) that failed validation
    pub path: Option<String>,
    /// Identity of the schema component that caused the error
    pub schema_component: Option<String>,
    /// Offending instance text
    pub instance: Option<String>,
    /// Underlying reason
    pub reason: Option<String>,
    /// Whether this records a validation or a coercion failure
    pub kind: ErrorKind,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            schema_component: None,
            instance: None,
            reason: None,
            kind: ErrorKind::Validation,
        }
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the schema component
    pub fn with_schema_component(mut self, component: impl Into<String>) -> Self {
        self.schema_component = Some(component.into());
        self
    }

    /// Set the instance snippet
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Path is only filled in when not already set by a deeper frame
    pub fn or_path(mut self, path: impl FnOnce() -> String) -> Self {
        if self.path.is_none() {
            self.path = Some(path());
        }
        self
    }

    /// True when this entry records a coercion failure
    pub fn is_coercion(&self) -> bool {
        self.kind == ErrorKind::Coercion
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        if let Some(ref schema) = self.schema_component {
            write!(f, "\n\nSchema component: {}", schema)?;
        }

        if let Some(ref instance) = self.instance {
            write!(f, "\n\nInstance: {}", instance)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl From<CoercionError> for ValidationError {
    fn from(err: CoercionError) -> Self {
        let mut entry = ValidationError::new(err.message).with_schema_component(err.type_name);
        entry.instance = err.value;
        entry.kind = ErrorKind::Coercion;
        entry
    }
}

/// A native value whose representation does not fit the target type
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionError {
    /// Error message
    pub message: String,
    /// Name of the target type
    pub type_name: String,
    /// Literal form of the offending value
    pub value: Option<String>,
}

impl CoercionError {
    /// Create a new coercion error for the given target type
    pub fn new(message: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            type_name: type_name.into(),
            value: None,
        }
    }

    /// Set the offending literal
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (type {})", self.message, self.type_name)?;
        if let Some(ref value) = self.value {
            write!(f, ": {:?}", value)?;
        }
        Ok(())
    }
}

impl std::error::Error for CoercionError {}

/// Schema compilation error
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaError {
    /// Error message
    pub message: String,
    /// Identity of the offending component (type, element or group name)
    pub component: Option<String>,
    /// Particle position inside the component, e.g. `sequence/choice[1]/element[0]`
    pub position: Option<String>,
}

impl SchemaError {
    /// Create a new schema error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            component: None,
            position: None,
        }
    }

    /// Set the component identity (only if not already set)
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        if self.component.is_none() {
            self.component = Some(component.into());
        }
        self
    }

    /// Set the particle position
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref component) = self.component {
            write!(f, "{}: ", component)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(ref position) = self.position {
            write!(f, " (at {})", position)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// All the schema errors collected while compiling a schema
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaErrors(pub Vec<SchemaError>);

impl SchemaErrors {
    /// Iterate over the collected errors
    pub fn iter(&self) -> std::slice::Iter<'_, SchemaError> {
        self.0.iter()
    }

    /// Number of collected errors
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing was collected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// XML or XSD syntax error
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Location in the source document
    pub location: Option<String>,
    /// Source snippet that caused the error
    pub source: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        if let Some(ref src) = self.source {
            write!(f, "\n\nSource:\n{}", src)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("Unexpected child with tag 'foo'")
            .with_reason("Tag 'bar' expected")
            .with_path("/root/foo")
            .with_schema_component("{ns}rootType");

        let msg = format!("{}", err);
        assert!(msg.contains("Unexpected child with tag 'foo'"));
        assert!(msg.contains("Reason:"));
        assert!(msg.contains("Path: /root/foo"));
        assert!(msg.contains("Schema component: {ns}rootType"));
    }

    #[test]
    fn test_or_path_keeps_inner_path() {
        let err = ValidationError::new("bad").with_path("/a/b");
        let err = err.or_path(|| "/a".to_string());
        assert_eq!(err.path.as_deref(), Some("/a/b"));

        let err = ValidationError::new("bad").or_path(|| "/a".to_string());
        assert_eq!(err.path.as_deref(), Some("/a"));
    }

    #[test]
    fn test_coercion_error_becomes_recorded_entry() {
        let err = CoercionError::new("not a boolean", "xs:boolean").with_value("40.0");
        let entry: ValidationError = err.into();
        assert!(entry.is_coercion());
        assert_eq!(entry.instance.as_deref(), Some("40.0"));
        assert_eq!(entry.schema_component.as_deref(), Some("xs:boolean"));
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::new("maxOccurs must not be lower than minOccurs")
            .with_component("{tns}itemType")
            .with_position("sequence/element[1]");
        assert_eq!(
            err.to_string(),
            "{tns}itemType: maxOccurs must not be lower than minOccurs (at sequence/element[1])"
        );
    }

    #[test]
    fn test_error_classes() {
        let err: Error = ValidationError::new("test").into();
        assert!(err.is_validation());
        let err: Error = CoercionError::new("test", "xs:int").into();
        assert!(err.is_coercion());
        let err: Error = SchemaError::new("test").into();
        assert!(err.is_schema());
        let err: Error = SchemaErrors(vec![SchemaError::new("a")]).into();
        assert!(err.is_schema());
    }
}
