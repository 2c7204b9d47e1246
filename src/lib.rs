//! # xmlschema-core
//!
//! The XML Schema (XSD 1.1) type system and content-model engine: type
//! derivation checks, wildcards and open content, and mode-aware decoding
//! and encoding of element trees.
//!
//! ## Features
//!
//! - Simple types with facets, lists and unions over the XSD built-ins
//! - Complex types derived by extension and restriction, with the
//!   derivation rules checked at compile time
//! - Element and attribute wildcards with `notNamespace` and `notQName`
//! - `openContent` and `defaultOpenContent` in interleave and suffix mode
//! - Decoding and encoding in strict, lax and skip mode
//! - JSON conversion of decoded values
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmlschema_core::{DecodeOptions, Schema};
//!
//! let schema = Schema::from_file("path/to/schema.xsd")?;
//! let decoded = schema.decode_str(&xml, &DecodeOptions::lax())?;
//! for error in &decoded.errors {
//!     eprintln!("{}", error);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Names and element trees
pub mod namespaces;
pub mod names;
pub mod documents;

// Type system and content models
pub mod validators;

// Data conversion
pub mod converters;

// Re-exports for convenience
pub use converters::{from_json, to_json, ConverterConfig};
pub use documents::Element;
pub use error::{CoercionError, Error, Result, SchemaError, SchemaErrors, ValidationError};
pub use limits::Limits;
pub use namespaces::{NamespaceContext, QName};
pub use validators::{
    Decoded, DecodeOptions, ElementData, NativeValue, Schema, SchemaBuilder, ValidationMode, XsdValue,
};

/// Version of the xmlschema-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD namespace
pub const XSD_1_0_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace (`xsi:type`, `xsi:nil`)
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
