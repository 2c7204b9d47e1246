//! XML Schema validators
//!
//! The type system and the content-model engine. Components are compiled
//! into an [`XsdGlobals`] registry by [`SchemaBuilder`] (or by the XSD
//! reader in [`parsing`]) and used through [`Schema`].

// Foundation
pub mod base;
pub mod helpers;
pub mod validation;
pub mod values;

// Type system
pub mod facets;
pub mod builtins;
pub mod simple_types;
pub mod attributes;

// Complex structures
pub mod wildcards;
pub mod particles;
pub mod groups;
pub mod open_content;
pub mod models;
pub mod complex_types;
pub mod elements;
pub mod globals;

// Instance processing
pub mod decoding;
pub mod encoding;

// Schemas
pub mod builders;
pub mod parsing;
pub mod schemas;

// Re-exports
pub use base::ValidationMode;
pub use builders::{
    AttributeDef, AttributeUseDef, ComplexTypeDef, ContentSpec, ElementDef, ParticleDef, SchemaBuilder,
    SimpleTypeDef, TypeDef, TypeRef,
};
pub use builtins::XsdValue;
pub use complex_types::{ComplexType, ContentType, DerivationMethod};
pub use elements::ElementDecl;
pub use globals::{TypeId, XsdGlobals, XsdType};
pub use models::ContentModel;
pub use open_content::{DefaultOpenContent, OpenContent, OpenContentMode};
pub use particles::Occurs;
pub use schemas::{Decoded, Schema};
pub use simple_types::{FacetDef, SimpleType};
pub use validation::DecodeOptions;
pub use values::{ContentItem, ElementData, NativeValue};
pub use wildcards::{NamespaceConstraint, ProcessContents, QNameExclusion, Wildcard};
