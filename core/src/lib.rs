//! Core types for model-driven command-line interfaces.
//!
//! This crate defines the metadata that the `model-cli` transformations
//! operate on:
//!
//! - [`TypeExpr`]: tagged type-expression tree (scalars, optionals, unions,
//!   collections, structured models, refined types, annotations).
//! - [`ParamInfo`]: per-parameter CLI metadata (option or argument,
//!   declarations, help text).
//! - [`Parameter`] / [`Signature`]: ordered parameter lists.
//! - [`ModelType`] / [`FieldDescriptor`]: structured models with nested
//!   fields, defaults and descriptions.
//!
//! Merging ([`nest`], [`deep_merge`]) rebuilds nested values from flat
//! path/value pairs. Validation ([`validate_signature`]) catches malformed
//! parameter lists before they reach a parser.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use model_cli_core::*;
//!
//! let user = ModelType::new("User")
//!     .field(FieldDescriptor::new("id", TypeExpr::Int))
//!     .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"));
//!
//! let signature = Signature::new()
//!     .with(Parameter::new("num", TypeExpr::Int))
//!     .with(Parameter::new("user", TypeExpr::Model(Arc::new(user))));
//!
//! assert_eq!(signature.names(), vec!["num", "user"]);
//! assert!(signature.get("user").unwrap().ty.as_model().is_some());
//! assert!(validate_signature(&signature).is_empty());
//! ```

mod merge;
mod model;
mod signature;
mod types;
mod validate;

pub use merge::{deep_merge, nest};
pub use model::{FieldDescriptor, FieldError, Model, ModelError, ModelType};
pub use signature::{ParamDefault, Parameter, Signature};
pub use types::*;
pub use validate::{SignatureError, validate_signature};
