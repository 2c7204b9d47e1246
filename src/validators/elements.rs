//! XSD element declarations
//!
//! Element declarations are plain data: a name, a type id and the value
//! constraints. Decoding and encoding of element instances live in
//! [`super::decoding`] and [`super::encoding`].

use crate::error::SchemaError;
use crate::namespaces::QName;

use super::globals::TypeId;

/// XSD element declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    /// Element name
    pub name: QName,
    /// Declared type
    pub type_id: TypeId,
    /// `xsi:nil="true"` is accepted
    pub nillable: bool,
    /// Default value of simple content
    pub default: Option<String>,
    /// Fixed value of simple content
    pub fixed: Option<String>,
    /// Instances must use a substitutable declaration or `xsi:type`
    pub abstract_: bool,
}

impl ElementDecl {
    /// Create a new element declaration
    pub fn new(name: QName, type_id: TypeId) -> Self {
        Self {
            name,
            type_id,
            nillable: false,
            default: None,
            fixed: None,
            abstract_: false,
        }
    }

    /// Builder: set nillable
    pub fn nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Builder: set abstract
    pub fn abstract_(mut self, abstract_: bool) -> Self {
        self.abstract_ = abstract_;
        self
    }

    /// Set the value constraint; `default` and `fixed` are mutually exclusive
    pub fn with_value_constraint(
        mut self,
        default: Option<String>,
        fixed: Option<String>,
    ) -> Result<Self, SchemaError> {
        if default.is_some() && fixed.is_some() {
            return Err(SchemaError::new("'default' and 'fixed' attributes are mutually exclusive")
                .with_component(self.name.to_string()));
        }
        self.default = default;
        self.fixed = fixed;
        Ok(self)
    }

    /// Text used for empty simple content
    pub fn value_constraint(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.default.as_deref())
    }
}
