//! Validation engine for model-driven CLI parameters.
//!
//! The engine turns a raw value (parsed command-line text or an already
//! structured JSON value) into the canonical value for a [`TypeExpr`], or
//! reports what is wrong with it. It is the collaborator the coercion
//! adapter in `model-cli` calls for every type the CLI parser cannot handle
//! on its own.
//!
//! - [`ValidationEngine`]: builds a reusable [`TypeAdapter`] for a type,
//!   or reports [`SchemaError::NotUnderstood`].
//! - [`TypeAdapter`]: two entry points: [`validate_value`] for structured
//!   input and [`validate_strings`] for text input.
//! - [`LaxEngine`]: the bundled implementation.
//!
//! The two entry points differ for unions. Structured input picks the
//! alternative whose kind matches exactly; text input tries alternatives
//! left to right and keeps the first that parses.
//!
//! # Example
//!
//! ```
//! use model_cli_core::TypeExpr;
//! use model_cli_engine::{LaxEngine, ValidationEngine};
//! use serde_json::json;
//!
//! let ty = TypeExpr::union([TypeExpr::Bool, TypeExpr::Int, TypeExpr::Float, TypeExpr::Str]);
//! let adapter = LaxEngine::new().adapter(&ty).unwrap();
//!
//! assert_eq!(adapter.validate_strings(&json!("1")).unwrap(), json!(true));
//! assert_eq!(adapter.validate_value(&json!("1")).unwrap(), json!("1"));
//! ```
//!
//! [`validate_value`]: TypeAdapter::validate_value
//! [`validate_strings`]: TypeAdapter::validate_strings
//! [`TypeExpr`]: model_cli_core::TypeExpr

mod constraint;
mod error;
mod lax;
mod scalar;

use std::fmt::Debug;
use std::sync::Arc;

use model_cli_core::TypeExpr;
use serde_json::Value;

pub use error::{ErrorDetail, SchemaError, ValidationErrors};
pub use lax::LaxEngine;

/// Builds validators for types.
pub trait ValidationEngine: Debug + Send + Sync {
    /// Returns a reusable validator for `ty`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::NotUnderstood`] when the engine has no rules for the
    /// type; callers probing the engine are expected to tolerate it.
    fn adapter(&self, ty: &TypeExpr) -> Result<Arc<dyn TypeAdapter>, SchemaError>;
}

/// A validator bound to one type.
pub trait TypeAdapter: Debug + Send + Sync {
    /// Validates an already-structured value (nested arrays, objects).
    fn validate_value(&self, raw: &Value) -> Result<Value, ValidationErrors>;

    /// Validates input whose string leaves are raw command-line text.
    fn validate_strings(&self, raw: &Value) -> Result<Value, ValidationErrors>;
}
