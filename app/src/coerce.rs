//! Type Coercion Adapter.
//!
//! Parameters whose types the CLI parser cannot handle are retyped to a
//! string placeholder tagged with a [`CoercionMarker`]. When the command
//! runs, the parsed text is validated against the parameter's original
//! type and the converted value is what the wrapped body receives.
//!
//! | parser answer        | rewrite                                      | marker  |
//! |----------------------|----------------------------------------------|---------|
//! | `UnsupportedType(t)` | every occurrence of `t` becomes `str`        | `Value` |
//! | `UnsupportedUnion`   | the union becomes `str`, per element in lists | `Text`  |
//! | `UnsupportedCollection`, `UnflattenedModel` | none                  | -       |

use std::sync::Arc;

use model_cli_core::{Annotation, CoercionMarker, Signature, TypeExpr};
use model_cli_engine::{SchemaError, TypeAdapter, ValidationEngine};
use tracing::{debug, warn};

use crate::backend::{ParamSupport, Support};
use crate::command::CommandFn;
use crate::error::{CommandError, RegistrationError};

/// A parameter whose type was replaced.
#[derive(Debug, Clone)]
struct Coerced {
    name: String,
    hint: String,
    marker: CoercionMarker,
    /// `None` when the engine has no rules for the type; the raw value is
    /// then passed through.
    adapter: Option<Arc<dyn TypeAdapter>>,
}

/// Rewrites the parameters of `command` that `parser` cannot parse.
///
/// When the parser cannot derive metadata for the signature at all (an
/// unflattened model, conflicting annotations), the command is returned
/// unchanged and the parser's error surfaces at registration.
///
/// # Errors
///
/// [`RegistrationError::Schema`] when the engine rejects a type for any
/// reason other than not understanding it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use model_cli::{ClapBackend, CommandFn, enable_type_coercion};
/// use model_cli_core::*;
/// use model_cli_engine::LaxEngine;
///
/// let command = CommandFn::new(
///     Signature::new().with(Parameter::new(
///         "value",
///         TypeExpr::union([TypeExpr::Bool, TypeExpr::Int]),
///     )),
///     |args| {
///         assert_eq!(args.get::<bool>("value")?, true);
///         Ok(())
///     },
/// );
///
/// let coerced = enable_type_coercion(command, &ClapBackend::default(), Arc::new(LaxEngine::new())).unwrap();
/// let value = coerced.signature().get("value").unwrap();
/// assert_eq!(value.ty.base(), &TypeExpr::Str);
/// assert_eq!(value.ty.marker(), Some(CoercionMarker::Text));
///
/// let mut args = model_cli::Arguments::new();
/// args.insert("value", "1");
/// coerced.call(args).unwrap();
/// ```
pub fn enable_type_coercion(
    command: CommandFn,
    parser: &dyn ParamSupport,
    engine: Arc<dyn ValidationEngine>,
) -> Result<CommandFn, RegistrationError> {
    let derived = match parser.derive_params(command.signature()) {
        Ok(derived) => derived,
        Err(error) => {
            debug!(%error, "Parser rejected signature; skipping type coercion");
            return Ok(command);
        }
    };

    let mut signature = Signature::new();
    let mut coerced = Vec::new();

    for (param, derived) in command.signature().iter().zip(&derived) {
        if matches!(derived.base, TypeExpr::Context) {
            signature.push(param.clone());
            continue;
        }
        let Some((ty, marker)) = placeholder(parser, &param.ty) else {
            signature.push(param.clone());
            continue;
        };

        let adapter = match engine.adapter(&param.ty) {
            Ok(adapter) => Some(adapter),
            Err(SchemaError::NotUnderstood(name)) => {
                warn!(parameter = %param.name, ty = %name, "Validation engine does not understand type; passing raw value");
                None
            }
            Err(source) => {
                return Err(RegistrationError::Schema {
                    parameter: param.name.clone(),
                    source,
                });
            }
        };

        debug!(
            parameter = %param.name,
            from = %param.ty,
            to = %ty,
            marker = ?marker,
            "Substituted placeholder type"
        );
        signature.push(param.retyped(ty.annotated(Annotation::Coercion(marker))));
        coerced.push(Coerced {
            name: param.name.clone(),
            hint: derived.display_name(),
            marker,
            adapter,
        });
    }

    if coerced.is_empty() {
        return Ok(command);
    }

    let inner = command.clone();
    let original = command.signature().clone();
    Ok(command.rewrap(signature, move |args| {
        let mut bound = args.bind(&original)?;
        for param in &coerced {
            let (Some(adapter), Some(raw)) = (&param.adapter, bound.raw(&param.name)) else {
                continue;
            };
            let result = match param.marker {
                CoercionMarker::Value => adapter.validate_value(raw),
                CoercionMarker::Text => adapter.validate_strings(raw),
            };
            let value = result.map_err(|errors| CommandError::BadParameter {
                param_hint: param.hint.clone(),
                message: errors.first_message().to_string(),
            })?;
            bound.insert(param.name.clone(), value);
        }
        inner.call(bound)
    }))
}

/// Probes `ty` until the parser accepts it, substituting as it goes.
///
/// Returns `None` when no substitution was needed or none can help.
fn placeholder(parser: &dyn ParamSupport, original: &TypeExpr) -> Option<(TypeExpr, CoercionMarker)> {
    let mut ty = original.clone();
    let mut marker = None;
    loop {
        let next = match parser.support(&ty) {
            Support::Native => break,
            Support::UnsupportedType(target) => {
                marker.get_or_insert(CoercionMarker::Value);
                ty.substitute(&target, &TypeExpr::Str)
            }
            Support::UnsupportedUnion => {
                marker = Some(CoercionMarker::Text);
                ty.rewrite(&|node: &TypeExpr| match node {
                    TypeExpr::Union(members) if members.len() > 1 => Some(TypeExpr::Str),
                    _ => None,
                })
            }
            Support::UnsupportedCollection | Support::UnflattenedModel => return None,
        };
        if next == ty {
            return None;
        }
        ty = next;
    }
    marker.map(|marker| (ty, marker))
}
