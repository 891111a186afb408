//! Signature validation.
//!
//! Catches structural problems in a parameter list before it is handed to
//! the CLI parser: empty or duplicate parameter names, malformed option
//! declarations and option declarations claimed twice.
//!
//! # Examples
//!
//! ```
//! use model_cli_core::*;
//!
//! let ok = Signature::new()
//!     .with(Parameter::new("num", TypeExpr::Int))
//!     .with(Parameter::new("name", TypeExpr::Str.with_cli(ParamInfo::option().with_decl("-n"))));
//! assert!(validate_signature(&ok).is_empty());
//!
//! // Invalid: short declaration missing its leading dash
//! let bad = Signature::new()
//!     .with(Parameter::new("name", TypeExpr::Str.with_cli(ParamInfo::option().with_decl("n"))));
//! assert!(!validate_signature(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::Signature;

/// Signature-shape errors.
///
/// The first group is found by [`validate_signature`]; the second group is
/// reported while a parser derives its own metadata from a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// A parameter name is empty or whitespace-only.
    #[error("parameter name cannot be empty")]
    EmptyParameterName,
    /// Two parameters share a name.
    #[error("duplicate parameter: {0}")]
    DuplicateParameter(String),
    /// Short declaration is not a single dash and one character.
    #[error("invalid short option declaration: {0}")]
    InvalidShortDecl(String),
    /// Long declaration does not start with `--` or is too short.
    #[error("invalid long option declaration: {0}")]
    InvalidLongDecl(String),
    /// Two options claim the same declaration.
    #[error("duplicate option declaration: {0}")]
    DuplicateDecl(String),
    /// More than one piece of CLI metadata on one parameter.
    #[error("parameter '{0}' carries more than one CLI annotation")]
    MultipleCliAnnotations(String),
    /// A default given both on the CLI metadata and on the parameter.
    #[error("parameter '{0}' declares a default both in its CLI annotation and as its default value")]
    DefaultInBothPlaces(String),
    /// A structured-model parameter reached the parser without flattening.
    #[error("parameter '{0}' is a structured model that was not flattened")]
    UnflattenedModel(String),
}

/// Validates a signature.
///
/// Returns at most one error: validation stops at the first problem found.
pub fn validate_signature(signature: &Signature) -> Vec<SignatureError> {
    let mut errors = Vec::new();
    let mut names: HashSet<&str> = HashSet::new();
    let mut decls: HashSet<&str> = HashSet::new();

    for param in signature {
        let name = param.name.trim();
        if name.is_empty() {
            errors.push(SignatureError::EmptyParameterName);
            return errors;
        }
        if !names.insert(name) {
            errors.push(SignatureError::DuplicateParameter(name.to_string()));
            return errors;
        }

        for info in param.ty.cli_infos() {
            for decl in &info.decls {
                if let Some(error) = check_decl(decl) {
                    errors.push(error);
                    return errors;
                }
                if !decls.insert(decl.as_str()) {
                    errors.push(SignatureError::DuplicateDecl(decl.clone()));
                    return errors;
                }
            }
        }
    }

    errors
}

fn check_decl(decl: &str) -> Option<SignatureError> {
    if decl.starts_with("--") {
        if decl.len() < 3 || decl.contains(char::is_whitespace) {
            return Some(SignatureError::InvalidLongDecl(decl.to_string()));
        }
        return None;
    }
    if !decl.starts_with('-') || decl.chars().count() != 2 {
        return Some(SignatureError::InvalidShortDecl(decl.to_string()));
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::{ParamInfo, Parameter, TypeExpr};

    use super::*;

    fn option(name: &str, decl: &str) -> Parameter {
        Parameter::new(name, TypeExpr::Str.with_cli(ParamInfo::option().with_decl(decl)))
    }

    #[test]
    fn test_rejects_duplicate_parameter() {
        let signature = Signature::new()
            .with(Parameter::new("num", TypeExpr::Int))
            .with(Parameter::new("num", TypeExpr::Str));
        assert_eq!(
            validate_signature(&signature),
            vec![SignatureError::DuplicateParameter("num".to_string())]
        );
    }

    #[test]
    fn test_rejects_bad_long_decl() {
        let signature = Signature::new().with(option("name", "--"));
        assert_eq!(
            validate_signature(&signature),
            vec![SignatureError::InvalidLongDecl("--".to_string())]
        );
    }

    #[test]
    fn test_rejects_shared_decl() {
        let signature = Signature::new()
            .with(option("first", "--name"))
            .with(option("second", "--name"));
        assert_eq!(
            validate_signature(&signature),
            vec![SignatureError::DuplicateDecl("--name".to_string())]
        );
    }

    #[test]
    fn test_accepts_dotted_long_decl() {
        let signature = Signature::new()
            .with(option("_model_user_id", "--user.id"))
            .with(option("verbose", "-v"));
        assert!(validate_signature(&signature).is_empty());
    }
}
