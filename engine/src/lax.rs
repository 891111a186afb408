//! The bundled validation engine.

use std::collections::HashMap;
use std::sync::Arc;

use model_cli_core::{Constraint, ModelType, TypeExpr};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::constraint;
use crate::error::{ErrorDetail, SchemaError, ValidationErrors};
use crate::scalar;
use crate::{TypeAdapter, ValidationEngine};

/// How a value is being interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Already-structured value; unions use smart matching.
    Value,
    /// String leaves come from command-line text; unions go left to right.
    Text,
    /// Exact JSON kind only.
    Strict,
}

/// Lax validation engine for [`TypeExpr`] trees.
///
/// Converts loosely typed input (command-line text, JSON values) into the
/// canonical JSON value for a type, checking refined-type constraints and
/// filling model defaults on the way.
///
/// # Examples
///
/// ```
/// use model_cli_core::{Constraint, RefinedType, TypeExpr};
/// use model_cli_engine::{LaxEngine, ValidationEngine};
/// use serde_json::json;
///
/// let even = TypeExpr::refined(
///     RefinedType::new("EvenInt", TypeExpr::Int).with(Constraint::MultipleOf(2.0)),
/// );
/// let adapter = LaxEngine::new().adapter(&even).unwrap();
///
/// assert_eq!(adapter.validate_strings(&json!("4")).unwrap(), json!(4));
/// let err = adapter.validate_strings(&json!("3")).unwrap_err();
/// assert_eq!(err.first_message(), "Input should be a multiple of 2");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LaxEngine;

impl LaxEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationEngine for LaxEngine {
    fn adapter(&self, ty: &TypeExpr) -> Result<Arc<dyn TypeAdapter>, SchemaError> {
        let mut patterns = HashMap::new();
        collect_patterns(ty, &mut patterns)?;
        debug!(ty = %ty, patterns = patterns.len(), "Built type adapter");
        Ok(Arc::new(LaxAdapter {
            ty: ty.clone(),
            patterns,
        }))
    }
}

/// Walks the tree, rejecting types with no validation rules and compiling
/// every pattern constraint once.
fn collect_patterns(ty: &TypeExpr, out: &mut HashMap<String, Regex>) -> Result<(), SchemaError> {
    match ty {
        TypeExpr::Context => Err(SchemaError::NotUnderstood(ty.to_string())),
        TypeExpr::Optional(inner) | TypeExpr::List(inner) | TypeExpr::Annotated(inner, _) => {
            collect_patterns(inner, out)
        }
        TypeExpr::Union(items) | TypeExpr::Tuple(items) => {
            items.iter().try_for_each(|item| collect_patterns(item, out))
        }
        TypeExpr::Model(model) => model
            .fields
            .iter()
            .try_for_each(|field| collect_patterns(&field.ty, out)),
        TypeExpr::Refined(refined) => {
            for constraint in &refined.constraints {
                if let Constraint::Pattern(pattern) = constraint {
                    if !out.contains_key(pattern) {
                        let regex = Regex::new(pattern).map_err(|source| {
                            SchemaError::InvalidPattern {
                                pattern: pattern.clone(),
                                source,
                            }
                        })?;
                        out.insert(pattern.clone(), regex);
                    }
                }
            }
            collect_patterns(&refined.base, out)
        }
        TypeExpr::Bool | TypeExpr::Int | TypeExpr::Float | TypeExpr::Str | TypeExpr::Path => {
            Ok(())
        }
    }
}

#[derive(Debug)]
struct LaxAdapter {
    ty: TypeExpr,
    patterns: HashMap<String, Regex>,
}

impl TypeAdapter for LaxAdapter {
    fn validate_value(&self, raw: &Value) -> Result<Value, ValidationErrors> {
        self.check(&self.ty, raw, Mode::Value)
    }

    fn validate_strings(&self, raw: &Value) -> Result<Value, ValidationErrors> {
        self.check(&self.ty, raw, Mode::Text)
    }
}

impl LaxAdapter {
    fn check(&self, ty: &TypeExpr, raw: &Value, mode: Mode) -> Result<Value, ValidationErrors> {
        let strict = mode == Mode::Strict;
        match ty {
            TypeExpr::Annotated(inner, _) => self.check(inner, raw, mode),
            TypeExpr::Bool => scalar::to_bool(raw, strict).map_err(ValidationErrors::single),
            TypeExpr::Int => scalar::to_int(raw, strict).map_err(ValidationErrors::single),
            TypeExpr::Float => scalar::to_float(raw, strict).map_err(ValidationErrors::single),
            TypeExpr::Str | TypeExpr::Path => scalar::to_str(raw).map_err(ValidationErrors::single),
            TypeExpr::Optional(inner) => match raw {
                Value::Null => Ok(Value::Null),
                _ => self.check(inner, raw, mode),
            },
            TypeExpr::Union(members) => self.check_union(members, raw, mode),
            TypeExpr::List(inner) => {
                let Value::Array(items) = raw else {
                    return Err(ValidationErrors::single("Input should be a valid list"));
                };
                self.check_items(items.iter().map(|item| (inner.as_ref(), item)), mode)
            }
            TypeExpr::Tuple(types) => {
                let Value::Array(items) = raw else {
                    return Err(ValidationErrors::single("Input should be a valid tuple"));
                };
                if items.len() != types.len() {
                    return Err(ValidationErrors::single(format!(
                        "Tuple should have {} items, not {}",
                        types.len(),
                        items.len()
                    )));
                }
                self.check_items(types.iter().zip(items), mode)
            }
            TypeExpr::Model(model) => self.check_model(model, raw, mode),
            TypeExpr::Refined(refined) => {
                let base = self.check(&refined.base, raw, mode)?;
                refined.constraints.iter().try_fold(base, |value, c| {
                    constraint::apply(c, value, &self.patterns).map_err(ValidationErrors::single)
                })
            }
            TypeExpr::Context => Err(ValidationErrors::single(
                "Input should be an execution context",
            )),
        }
    }

    /// Smart matching for structured values tries an exact-kind pass first;
    /// text input goes strictly left to right, so earlier alternatives win.
    fn check_union(
        &self,
        members: &[TypeExpr],
        raw: &Value,
        mode: Mode,
    ) -> Result<Value, ValidationErrors> {
        let from_text = mode == Mode::Text && raw.is_string();
        if !from_text && mode != Mode::Strict {
            if let Some(value) = members
                .iter()
                .find_map(|member| self.check(member, raw, Mode::Strict).ok())
            {
                return Ok(value);
            }
        }

        let mut details = Vec::new();
        for member in members {
            match self.check(member, raw, mode) {
                Ok(value) => return Ok(value),
                Err(errors) => details.extend(errors.at(member.to_string()).into_details()),
            }
        }
        Err(ValidationErrors::from_details(details))
    }

    fn check_items<'a>(
        &self,
        items: impl Iterator<Item = (&'a TypeExpr, &'a Value)>,
        mode: Mode,
    ) -> Result<Value, ValidationErrors> {
        let mut values = Vec::new();
        let mut details = Vec::new();
        for (index, (ty, item)) in items.enumerate() {
            match self.check(ty, item, mode) {
                Ok(value) => values.push(value),
                Err(errors) => details.extend(errors.at(index.to_string()).into_details()),
            }
        }
        if details.is_empty() {
            Ok(Value::Array(values))
        } else {
            Err(ValidationErrors::from_details(details))
        }
    }

    fn check_model(
        &self,
        model: &ModelType,
        raw: &Value,
        mode: Mode,
    ) -> Result<Value, ValidationErrors> {
        let Value::Object(fields) = raw else {
            return Err(ValidationErrors::single(format!(
                "Input should be a valid dictionary or instance of {}",
                model.name
            )));
        };

        let mut validated = Map::new();
        let mut details = Vec::new();
        for field in &model.fields {
            let Some(value) = fields.get(&field.name) else {
                continue;
            };
            match self.check(&field.ty, value, mode) {
                Ok(value) => {
                    validated.insert(field.name.clone(), value);
                }
                Err(errors) => details.extend(errors.at(field.name.clone()).into_details()),
            }
        }
        if !details.is_empty() {
            return Err(ValidationErrors::from_details(details));
        }

        model.construct(&validated).map_err(|err| {
            ValidationErrors::from_details(
                err.errors
                    .into_iter()
                    .map(|e| ErrorDetail {
                        loc: e.loc,
                        msg: e.msg,
                    })
                    .collect(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use model_cli_core::{FieldDescriptor, RefinedType};
    use serde_json::json;

    use super::*;

    fn scalar_union() -> TypeExpr {
        TypeExpr::union([TypeExpr::Bool, TypeExpr::Int, TypeExpr::Float, TypeExpr::Str])
    }

    fn adapter(ty: &TypeExpr) -> Arc<dyn TypeAdapter> {
        LaxEngine::new().adapter(ty).expect("type is understood")
    }

    #[test]
    fn test_text_union_prefers_left_alternatives() {
        let union = adapter(&scalar_union());
        assert_eq!(union.validate_strings(&json!("1")).unwrap(), json!(true));
        assert_eq!(union.validate_strings(&json!("2")).unwrap(), json!(2));
        assert_eq!(union.validate_strings(&json!("2.0")).unwrap(), json!(2));
        assert_eq!(union.validate_strings(&json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(union.validate_strings(&json!("hello")).unwrap(), json!("hello"));
    }

    #[test]
    fn test_value_union_prefers_exact_kind() {
        let union = adapter(&scalar_union());
        assert_eq!(union.validate_value(&json!("1")).unwrap(), json!("1"));
        assert_eq!(union.validate_value(&json!(1)).unwrap(), json!(1));
        assert_eq!(union.validate_value(&json!(true)).unwrap(), json!(true));
    }

    #[test]
    fn test_text_union_inside_list() {
        let list = adapter(&TypeExpr::list(scalar_union()));
        assert_eq!(
            list.validate_strings(&json!(["yes", "7", "x"])).unwrap(),
            json!([true, 7, "x"])
        );
    }

    #[test]
    fn test_union_failure_reports_first_member_first() {
        let union = adapter(&TypeExpr::union([TypeExpr::Int, TypeExpr::Float]));
        let err = union.validate_strings(&json!("abc")).unwrap_err();
        assert_eq!(err.len(), 2);
        assert_eq!(
            err.first_message(),
            "Input should be a valid integer, unable to parse string as an integer"
        );
    }

    #[test]
    fn test_list_errors_carry_indices() {
        let even = TypeExpr::refined(
            RefinedType::new("EvenInt", TypeExpr::Int).with(Constraint::MultipleOf(2.0)),
        );
        let list = adapter(&TypeExpr::list(even));
        let err = list.validate_value(&json!(["2", "3"])).unwrap_err();
        let detail = err.iter().next().expect("one error");
        assert_eq!(detail.loc, vec!["1".to_string()]);
        assert_eq!(detail.msg, "Input should be a multiple of 2");
    }

    #[test]
    fn test_fractional_multiple_from_text() {
        let tenth = adapter(&TypeExpr::refined(
            RefinedType::new("Tenth", TypeExpr::Float).with(Constraint::MultipleOf(0.1)),
        ));
        assert_eq!(tenth.validate_strings(&json!("0.3")).unwrap(), json!(0.3));
        assert_eq!(
            tenth.validate_strings(&json!("0.25")).unwrap_err().first_message(),
            "Input should be a multiple of 0.1"
        );
    }

    #[test]
    fn test_any_url_accepts_every_scheme() {
        let url = adapter(&TypeExpr::refined(RefinedType::any_url()));
        assert_eq!(
            url.validate_strings(&json!("FTP://Files.Example.com")).unwrap(),
            json!("ftp://files.example.com/")
        );
        assert_eq!(
            url.validate_strings(&json!("example.com")).unwrap_err().first_message(),
            "Input should be a valid URL, relative URL without a base"
        );
    }

    #[test]
    fn test_model_validation_fills_defaults() {
        let user = ModelType::new("User")
            .field(FieldDescriptor::new("id", TypeExpr::Int))
            .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"));
        let model = adapter(&TypeExpr::Model(Arc::new(user)));
        assert_eq!(
            model.validate_value(&json!({"id": "2"})).unwrap(),
            json!({"id": 2, "name": "Jane Doe"})
        );
        let err = model.validate_value(&json!({"name": "x"})).unwrap_err();
        assert_eq!(err.first_message(), "Field required");
    }

    #[test]
    fn test_context_is_not_understood() {
        let err = LaxEngine::new()
            .adapter(&TypeExpr::Context)
            .expect_err("context has no rules");
        assert!(matches!(err, SchemaError::NotUnderstood(_)));
    }

    #[test]
    fn test_bad_pattern_fails_adapter_build() {
        let ty = TypeExpr::refined(
            RefinedType::new("Broken", TypeExpr::Str).with(Constraint::Pattern("(".to_string())),
        );
        let err = LaxEngine::new().adapter(&ty).expect_err("pattern does not compile");
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }
}
