//! CLI parser capability queries and the clap backend.
//!
//! The coercion adapter asks a [`ParamSupport`] whether it can parse a
//! type natively and, if not, why. The answer decides how the parameter is
//! rewritten.

mod clap_parser;
mod value_parser;

use model_cli_core::{ParamDefault, ParamInfo, ParamKind, Signature, SignatureError, TypeExpr};

pub use clap_parser::{ClapBackend, CommandSpec};
pub use value_parser::{ScalarKind, ScalarValueParser};

/// Whether a parser handles a type natively.
#[derive(Debug, Clone, PartialEq)]
pub enum Support {
    /// Parsed as-is.
    Native,
    /// This exact type is not parseable; a placeholder can stand in for it.
    UnsupportedType(TypeExpr),
    /// A union of several alternatives, which needs text-based coercion.
    UnsupportedUnion,
    /// Collections of collections or of models; no placeholder helps.
    UnsupportedCollection,
    /// A structured model outside the reach of flattening.
    UnflattenedModel,
}

/// Parameter metadata as the parser sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedParam {
    pub name: String,
    /// Annotation-free base type.
    pub base: TypeExpr,
    /// Effective CLI metadata.
    pub info: ParamInfo,
    /// Effective default, from the metadata or the parameter.
    pub default: ParamDefault,
    /// Qualifier path of a flattened model leaf.
    pub qualifier: Option<Vec<String>>,
}

impl DerivedParam {
    /// Name used when reporting problems with this parameter's value.
    pub fn display_name(&self) -> String {
        match &self.qualifier {
            Some(path) => path.join("."),
            None => self.name.clone(),
        }
    }
}

/// Capability queries a CLI parser answers for the coercion adapter.
pub trait ParamSupport {
    /// Derives the parser's own view of every parameter.
    ///
    /// # Errors
    ///
    /// Signature-shape errors: several CLI annotations on one parameter, a
    /// default in two places, or a model that was never flattened.
    fn derive_params(&self, signature: &Signature) -> Result<Vec<DerivedParam>, SignatureError>;

    /// Whether `ty` is parsed natively.
    fn support(&self, ty: &TypeExpr) -> Support;
}

/// Shared derivation used by parser backends.
///
/// Parameters without CLI metadata become positional arguments when they
/// have no default and named options otherwise.
pub fn derive_params(signature: &Signature) -> Result<Vec<DerivedParam>, SignatureError> {
    signature
        .iter()
        .map(|param| {
            let (base, info) = param.split_cli()?;
            if matches!(base, TypeExpr::Model(_)) {
                return Err(SignatureError::UnflattenedModel(param.name.clone()));
            }

            let default = match (info.and_then(|i| i.default.clone()), &param.default) {
                (Some(_), ParamDefault::Value(_)) => {
                    return Err(SignatureError::DefaultInBothPlaces(param.name.clone()));
                }
                (Some(value), ParamDefault::Required) => ParamDefault::Value(value),
                (None, declared) => declared.clone(),
            };

            let info = match info {
                Some(info) => info.clone(),
                None if default.is_required() => ParamInfo {
                    kind: ParamKind::Argument,
                    ..ParamInfo::default()
                },
                None => ParamInfo::option(),
            };

            Ok(DerivedParam {
                name: param.name.clone(),
                base: base.clone(),
                info,
                default,
                qualifier: param.ty.qualifier().map(<[String]>::to_vec),
            })
        })
        .collect()
}
