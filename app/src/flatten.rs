//! Model Flattener.
//!
//! Replaces every structured-model parameter with one synthetic parameter
//! per leaf field and rebuilds the model from the leaf values when the
//! command runs.
//!
//! For `main(num: int, user: User)` with `User { id: int, name: str }`
//! the rewritten signature is
//!
//! ```text
//! num                       positional
//! _model_user_id   --user.id
//! _model_user_name --user.name
//! ```
//!
//! and on invocation `_model_user_id` / `_model_user_name` are folded back
//! into `user = {"id": .., "name": ..}` before the original body runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use model_cli_core::{
    Annotation, ModelType, ParamInfo, Parameter, QualifierPath, Signature, SignatureError,
    TypeExpr, deep_merge, nest,
};
use serde_json::Map;
use tracing::debug;

use crate::command::{Arguments, CommandFn};
use crate::config::AppConfig;
use crate::error::RegistrationError;

/// One generated leaf: its synthetic parameter name and qualifier path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Leaf {
    name: String,
    path: QualifierPath,
}

/// Flattens every structured-model parameter of `command`.
///
/// Leaves are appended after the pass-through parameters, in field order.
/// Each leaf's CLI metadata is the field's own, else the root parameter's
/// (immediate fields only), else a generated `--root.field` option.
///
/// # Errors
///
/// - [`RegistrationError::CollectionOfModels`] for a list or tuple of
///   models, as a parameter or as a field.
/// - [`RegistrationError::NameCollision`] when a synthetic name equals
///   another parameter's name.
/// - [`RegistrationError::Signature`] for a parameter or field carrying
///   more than one CLI annotation.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use model_cli::{AppConfig, CommandFn, enable_models};
/// use model_cli_core::*;
///
/// let user = ModelType::new("User")
///     .field(FieldDescriptor::new("id", TypeExpr::Int))
///     .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"));
/// let command = CommandFn::new(
///     Signature::new()
///         .with(Parameter::new("num", TypeExpr::Int))
///         .with(Parameter::new("user", TypeExpr::Model(Arc::new(user)))),
///     |_| Ok(()),
/// );
///
/// let flat = enable_models(command, &AppConfig::default()).unwrap();
/// assert_eq!(
///     flat.signature().names(),
///     vec!["num", "_model_user_id", "_model_user_name"]
/// );
/// let id = flat.signature().get("_model_user_id").unwrap();
/// assert_eq!(id.ty.cli_infos()[0].decls, vec!["--user.id".to_string()]);
/// ```
pub fn enable_models(command: CommandFn, config: &AppConfig) -> Result<CommandFn, RegistrationError> {
    let mut passthrough = Vec::new();
    let mut leaves = Vec::new();
    let mut generated = Vec::new();
    let mut roots: Vec<(String, Arc<ModelType>)> = Vec::new();

    for param in command.signature() {
        let (base, info) = param.split_cli()?;
        match base {
            TypeExpr::Model(model) => {
                let before = generated.len();
                let flattener = Flattener {
                    config,
                    root: &param.name,
                };
                flattener.walk(
                    model,
                    &mut vec![param.name.clone()],
                    info,
                    &mut generated,
                    &mut leaves,
                )?;
                debug!(
                    parameter = %param.name,
                    model = %model.name,
                    leaves = generated.len() - before,
                    "Flattened model parameter"
                );
                roots.push((param.name.clone(), Arc::clone(model)));
            }
            _ if param.ty.has_model_elements() => {
                return Err(RegistrationError::CollectionOfModels {
                    parameter: param.name.clone(),
                    ty: base.to_string(),
                });
            }
            _ => passthrough.push(param.clone()),
        }
    }

    if roots.is_empty() {
        return Ok(command);
    }

    let mut seen: HashSet<&str> = passthrough.iter().map(|p| p.name.as_str()).collect();
    for param in &generated {
        if !seen.insert(param.name.as_str()) {
            return Err(RegistrationError::NameCollision(param.name.clone()));
        }
    }

    let signature: Signature = passthrough.into_iter().chain(generated).collect();
    let by_name: BTreeMap<String, QualifierPath> = leaves
        .into_iter()
        .map(|leaf| (leaf.name, leaf.path))
        .collect();

    let inner = command.clone();
    Ok(command.rewrap(signature, move |args| {
        let mut forwarded = Arguments::new();
        let mut trees: BTreeMap<&str, Map<String, serde_json::Value>> = BTreeMap::new();

        for (name, value) in args {
            match by_name.get(&name) {
                Some(path) => {
                    if let Some((root, rest)) = path.split_first() {
                        deep_merge(trees.entry(root.as_str()).or_default(), nest(rest, value));
                    }
                }
                None => {
                    forwarded.insert(name, value);
                }
            }
        }

        for (root, model) in &roots {
            let tree = trees.remove(root.as_str()).unwrap_or_default();
            forwarded.insert(root.clone(), model.construct(&tree)?);
        }

        inner.call(forwarded)
    }))
}

struct Flattener<'a> {
    config: &'a AppConfig,
    root: &'a str,
}

impl Flattener<'_> {
    /// Emits one synthetic parameter per leaf of `model`.
    ///
    /// `inherited` is the enclosing parameter's own metadata; nested models
    /// are walked without it.
    fn walk(
        &self,
        model: &ModelType,
        path: &mut QualifierPath,
        inherited: Option<&ParamInfo>,
        out: &mut Vec<Parameter>,
        leaves: &mut Vec<Leaf>,
    ) -> Result<(), RegistrationError> {
        for field in &model.fields {
            path.push(field.name.clone());
            let (base, annotations) = field.ty.split();
            let own = field.ty.cli_infos();
            if own.len() > 1 {
                return Err(SignatureError::MultipleCliAnnotations(path.join(".")).into());
            }

            match base {
                TypeExpr::Model(nested) => self.walk(nested, path, None, out, leaves)?,
                _ if field.ty.has_model_elements() => {
                    return Err(RegistrationError::CollectionOfModels {
                        parameter: path.join("."),
                        ty: base.to_string(),
                    });
                }
                _ => {
                    let mut info = match (own.first(), inherited) {
                        (Some(own), _) => (*own).clone(),
                        (None, Some(parent)) => ParamInfo {
                            default: None,
                            ..parent.clone()
                        },
                        (None, None) => ParamInfo::option(),
                    };
                    if info.is_option() && !info.has_explicit_decls() {
                        info.decls
                            .push(format!("--{}", path.join(&self.config.field_separator)));
                    }
                    if info.help.is_none() {
                        info.help = field.description.clone();
                    }

                    let mut ty = base.clone();
                    for annotation in annotations {
                        if !matches!(annotation, Annotation::Cli(_)) {
                            ty = ty.annotated(annotation.clone());
                        }
                    }
                    let ty = ty
                        .with_cli(info)
                        .annotated(Annotation::Qualifier(path.clone()));

                    let name = format!("{}{}", self.config.synthetic_prefix, path.join("_"));
                    out.push(Parameter {
                        name: name.clone(),
                        ty,
                        default: field.default.clone(),
                    });
                    leaves.push(Leaf {
                        name,
                        path: path.clone(),
                    });
                }
            }
            path.pop();
        }
        debug!(root = self.root, model = %model.name, depth = path.len(), "Walked model fields");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use model_cli_core::{FieldDescriptor, ModelError};
    use serde_json::{Value, json};

    use super::*;
    use crate::error::CommandError;

    fn user() -> Arc<ModelType> {
        Arc::new(
            ModelType::new("User")
                .field(FieldDescriptor::new("id", TypeExpr::Int))
                .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe")),
        )
    }

    fn recording(signature: Signature) -> (CommandFn, Arc<Mutex<Option<Arguments>>>) {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let command = CommandFn::new(signature, move |args| {
            *sink.lock().expect("lock") = Some(args);
            Ok(())
        });
        (command, seen)
    }

    #[test]
    fn test_passthrough_only_is_unchanged() {
        let (command, _) = recording(Signature::new().with(Parameter::new("num", TypeExpr::Int)));
        let flat = enable_models(command, &AppConfig::default()).expect("flatten");
        assert_eq!(flat.signature().names(), vec!["num"]);
    }

    #[test]
    fn test_rebuilds_model_from_leaves() {
        let (command, seen) = recording(
            Signature::new()
                .with(Parameter::new("num", TypeExpr::Int))
                .with(Parameter::new("user", TypeExpr::Model(user()))),
        );
        let flat = enable_models(command, &AppConfig::default()).expect("flatten");

        let args: Arguments = [
            ("num".to_string(), json!(1)),
            ("_model_user_id".to_string(), json!(2)),
            ("_model_user_name".to_string(), json!("Jane Doe")),
        ]
        .into_iter()
        .collect();
        flat.call(args).expect("call");

        let received = seen.lock().expect("lock").take().expect("called");
        assert_eq!(received.raw("num"), Some(&json!(1)));
        assert_eq!(received.raw("user"), Some(&json!({"id": 2, "name": "Jane Doe"})));
    }

    #[test]
    fn test_model_error_propagates_unchanged() {
        let (command, seen) = recording(Signature::new().with(Parameter::new("user", TypeExpr::Model(user()))));
        let flat = enable_models(command, &AppConfig::default()).expect("flatten");

        let err = flat.call(Arguments::new()).expect_err("id missing");
        match err {
            CommandError::Model(ModelError { model, errors }) => {
                assert_eq!(model, "User");
                assert_eq!(errors[0].loc, vec!["id".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(seen.lock().expect("lock").is_none());
    }

    #[test]
    fn test_inherits_parent_metadata_one_level() {
        let address = Arc::new(
            ModelType::new("Address").field(FieldDescriptor::new("zip", TypeExpr::Str)),
        );
        let account = Arc::new(
            ModelType::new("Account")
                .field(FieldDescriptor::new("id", TypeExpr::Int))
                .field(FieldDescriptor::new("address", TypeExpr::Model(address))),
        );
        let (command, _) = recording(Signature::new().with(Parameter::new(
            "account",
            TypeExpr::Model(account).with_cli(ParamInfo::argument()),
        )));
        let flat = enable_models(command, &AppConfig::default()).expect("flatten");

        let id = flat.signature().get("_model_account_id").expect("id leaf");
        assert!(!id.ty.cli_infos()[0].is_option());

        let zip = flat.signature().get("_model_account_address_zip").expect("zip leaf");
        let info = zip.ty.cli_infos()[0];
        assert!(info.is_option());
        assert_eq!(info.decls, vec!["--account.address.zip".to_string()]);
        assert_eq!(
            zip.ty.qualifier(),
            Some(&["account".to_string(), "address".to_string(), "zip".to_string()][..])
        );
    }

    #[test]
    fn test_field_overrides_and_description() {
        let model = Arc::new(
            ModelType::new("Item")
                .field(
                    FieldDescriptor::new("sku", TypeExpr::Str)
                        .with_cli(ParamInfo::option().with_decl("--sku").with_decl("-s")),
                )
                .field(
                    FieldDescriptor::new("qty", TypeExpr::Int)
                        .with_default(1)
                        .with_description("How many to order"),
                ),
        );
        let (command, _) = recording(Signature::new().with(Parameter::new("item", TypeExpr::Model(model))));
        let flat = enable_models(command, &AppConfig::default()).expect("flatten");

        let sku = flat.signature().get("_model_item_sku").expect("sku");
        assert_eq!(sku.ty.cli_infos()[0].decls, vec!["--sku".to_string(), "-s".to_string()]);

        let qty = flat.signature().get("_model_item_qty").expect("qty");
        assert_eq!(qty.ty.cli_infos()[0].help.as_deref(), Some("How many to order"));
        assert_eq!(qty.default.value(), Some(&Value::from(1)));
    }

    #[test]
    fn test_list_of_models_fails_fast() {
        let (command, _) = recording(Signature::new().with(Parameter::new(
            "users",
            TypeExpr::list(TypeExpr::Model(user())),
        )));
        assert!(matches!(
            enable_models(command, &AppConfig::default()),
            Err(RegistrationError::CollectionOfModels { parameter, .. }) if parameter == "users"
        ));
    }

    #[test]
    fn test_synthetic_name_collision() {
        let (command, _) = recording(
            Signature::new()
                .with(Parameter::new("_model_user_id", TypeExpr::Int))
                .with(Parameter::new("user", TypeExpr::Model(user()))),
        );
        assert!(matches!(
            enable_models(command, &AppConfig::default()),
            Err(RegistrationError::NameCollision(name)) if name == "_model_user_id"
        ));
    }

    #[test]
    fn test_custom_separator() {
        let config = AppConfig {
            field_separator: "-".to_string(),
            ..AppConfig::default()
        };
        let (command, _) = recording(Signature::new().with(Parameter::new("user", TypeExpr::Model(user()))));
        let flat = enable_models(command, &config).expect("flatten");
        let id = flat.signature().get("_model_user_id").expect("id");
        assert_eq!(id.ty.cli_infos()[0].decls, vec!["--user-id".to_string()]);
    }
}
