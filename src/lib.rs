//! Structural type model for HCL2-style configuration: primitives, lists,
//! maps, objects, unions and discriminated unions, with assignability, a
//! three-valued conversion lattice, unification and traversal.
pub mod cli;
pub mod conversion;
pub mod diag;
pub mod error;
pub mod model;
pub mod schema;
pub mod traversal;

pub use conversion::ConversionKind;
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, SourceRange};
pub use error::{ModelError, Result};
pub use model::{Ty, TypeArena, TypeId, Unified};
pub use schema::{Model, Schema};
pub use traversal::{Traverser, parse_path};
