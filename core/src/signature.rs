//! Ordered parameter lists.
//!
//! A [`Signature`] is first-class metadata for a command function: the
//! transformations in the `model-cli` crate take one signature and produce
//! another, never touching the function they describe.

use serde_json::Value;

use crate::types::{ParamInfo, TypeExpr};
use crate::validate::SignatureError;

/// Default value of a parameter or model field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamDefault {
    /// No default: the value must be supplied.
    #[default]
    Required,
    /// Declared default value.
    Value(Value),
}

impl ParamDefault {
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }

    /// The declared default, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Required => None,
            Self::Value(value) => Some(value),
        }
    }
}

/// A single named parameter.
///
/// # Examples
///
/// ```
/// use model_cli_core::{Parameter, TypeExpr};
///
/// let num = Parameter::new("num", TypeExpr::Int);
/// assert!(num.default.is_required());
///
/// let name = Parameter::new("name", TypeExpr::Str).with_default("Jane Doe");
/// assert_eq!(name.default.value(), Some(&serde_json::json!("Jane Doe")));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeExpr,
    pub default: ParamDefault,
}

impl Parameter {
    /// Creates a required parameter.
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: ParamDefault::Required,
        }
    }

    /// Declares a default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = ParamDefault::Value(default.into());
        self
    }

    /// Copy of this parameter with a different type.
    pub fn retyped(&self, ty: TypeExpr) -> Self {
        Self {
            name: self.name.clone(),
            ty,
            default: self.default.clone(),
        }
    }

    /// Splits the annotation into its base type and at most one piece of CLI
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::MultipleCliAnnotations`] when more than one
    /// [`ParamInfo`] is attached.
    pub fn split_cli(&self) -> Result<(&TypeExpr, Option<&ParamInfo>), SignatureError> {
        let infos = self.ty.cli_infos();
        if infos.len() > 1 {
            return Err(SignatureError::MultipleCliAnnotations(self.name.clone()));
        }
        Ok((self.ty.base(), infos.into_iter().next()))
    }
}

/// Ordered parameter list of a command function.
///
/// # Examples
///
/// ```
/// use model_cli_core::{Parameter, Signature, TypeExpr};
///
/// let signature = Signature::new()
///     .with(Parameter::new("num", TypeExpr::Int))
///     .with(Parameter::new("verbose", TypeExpr::Bool).with_default(false));
///
/// assert_eq!(signature.names(), vec!["num", "verbose"]);
/// assert!(signature.get("verbose").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter (builder form).
    pub fn with(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn push(&mut self, param: Parameter) {
        self.params.push(param);
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }
}

impl FromIterator<Parameter> for Signature {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Signature {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_cli_rejects_two_infos() {
        let param = Parameter::new(
            "num",
            TypeExpr::Int
                .with_cli(ParamInfo::option())
                .with_cli(ParamInfo::argument()),
        );
        assert_eq!(
            param.split_cli(),
            Err(SignatureError::MultipleCliAnnotations("num".to_string()))
        );
    }

    #[test]
    fn test_split_cli_without_metadata() {
        let param = Parameter::new("num", TypeExpr::Int);
        let (base, info) = param.split_cli().expect("no metadata is fine");
        assert_eq!(base, &TypeExpr::Int);
        assert!(info.is_none());
    }

    #[test]
    fn test_retyped_keeps_default() {
        let param = Parameter::new("value", TypeExpr::Int).with_default(1);
        let retyped = param.retyped(TypeExpr::Str);
        assert_eq!(retyped.ty, TypeExpr::Str);
        assert_eq!(retyped.default, param.default);
    }
}
