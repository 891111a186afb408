//! Structured model types.
//!
//! A [`ModelType`] is a named, ordered set of fields. Fields may themselves
//! be models, which is what the flattener walks. Model instances are carried
//! as JSON objects and turned into user structs through `serde`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::signature::ParamDefault;
use crate::types::{ParamInfo, TypeExpr};

/// A record type usable as a structured command parameter.
///
/// Implementors describe their fields once; values are rebuilt from parsed
/// command-line input and deserialized into `Self`.
///
/// # Examples
///
/// ```
/// use model_cli_core::{FieldDescriptor, Model, ModelType, TypeExpr};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Model for User {
///     fn model_type() -> ModelType {
///         ModelType::new("User")
///             .field(FieldDescriptor::new("id", TypeExpr::Int))
///             .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"))
///     }
/// }
///
/// assert_eq!(User::model_type().field_names(), vec!["id", "name"]);
/// ```
pub trait Model: Serialize + DeserializeOwned {
    fn model_type() -> ModelType;
}

/// One declared field of a [`ModelType`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Declared type; may carry CLI metadata as an annotation.
    pub ty: TypeExpr,
    pub default: ParamDefault,
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Creates a mandatory field.
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: ParamDefault::Required,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = ParamDefault::Value(default.into());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Attaches CLI metadata to the field's type.
    pub fn with_cli(mut self, info: ParamInfo) -> Self {
        self.ty = self.ty.with_cli(info);
        self
    }
}

/// A named record type with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelType {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    /// Appends a field (builder form).
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Builds an instance from a nested raw mapping.
    ///
    /// Nested model fields are constructed recursively, absent fields take
    /// their defaults, and keys that name no field are ignored. Leaf values
    /// are taken as given.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] listing every missing mandatory field and
    /// every nested model given a non-mapping value.
    ///
    /// # Examples
    ///
    /// ```
    /// use model_cli_core::{FieldDescriptor, ModelType, TypeExpr};
    /// use serde_json::json;
    ///
    /// let user = ModelType::new("User")
    ///     .field(FieldDescriptor::new("id", TypeExpr::Int))
    ///     .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"));
    ///
    /// let raw = json!({"id": 2});
    /// let built = user.construct(raw.as_object().unwrap()).unwrap();
    /// assert_eq!(built, json!({"id": 2, "name": "Jane Doe"}));
    ///
    /// let err = user.construct(&serde_json::Map::new()).unwrap_err();
    /// assert_eq!(err.errors[0].msg, "Field required");
    /// ```
    pub fn construct(&self, raw: &Map<String, Value>) -> Result<Value, ModelError> {
        let mut errors = Vec::new();
        let built = self.construct_at(raw, &mut Vec::new(), &mut errors);
        if errors.is_empty() {
            Ok(Value::Object(built))
        } else {
            Err(ModelError {
                model: self.name.clone(),
                errors,
            })
        }
    }

    fn construct_at(
        &self,
        raw: &Map<String, Value>,
        loc: &mut Vec<String>,
        errors: &mut Vec<FieldError>,
    ) -> Map<String, Value> {
        let mut built = Map::new();
        for field in &self.fields {
            loc.push(field.name.clone());
            match (raw.get(&field.name), field.ty.as_model()) {
                (Some(Value::Object(nested)), Some(model)) => {
                    let value = model.construct_at(nested, loc, errors);
                    built.insert(field.name.clone(), Value::Object(value));
                }
                (Some(Value::Null), Some(_)) if !field.default.is_required() => {
                    built.insert(field.name.clone(), Value::Null);
                }
                (Some(_), Some(model)) => errors.push(FieldError {
                    loc: loc.clone(),
                    msg: format!("Input should be a valid dictionary or instance of {}", model.name),
                }),
                (Some(value), None) => {
                    built.insert(field.name.clone(), value.clone());
                }
                (None, _) => match &field.default {
                    ParamDefault::Value(default) => {
                        built.insert(field.name.clone(), default.clone());
                    }
                    ParamDefault::Required => errors.push(FieldError {
                        loc: loc.clone(),
                        msg: "Field required".to_string(),
                    }),
                },
            }
            loc.pop();
        }
        built
    }
}

/// One failed field of a model construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of field names from the model root.
    pub loc: Vec<String>,
    pub msg: String,
}

/// Model construction failure, listing every failed field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_field_errors(.model, .errors))]
pub struct ModelError {
    pub model: String,
    pub errors: Vec<FieldError>,
}

fn render_field_errors(model: &str, errors: &[FieldError]) -> String {
    let plural = if errors.len() == 1 { "" } else { "s" };
    let mut rendered = format!("{} validation error{plural} for {model}", errors.len());
    for error in errors {
        rendered.push_str(&format!("\n{}\n  {}", error.loc.join("."), error.msg));
    }
    rendered
}
