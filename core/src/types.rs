//! Type-expression tree and per-parameter CLI metadata.
//!
//! A [`TypeExpr`] describes what a command parameter (or a model field)
//! holds. It is an explicit tagged tree rather than a host-language type, so
//! the signature rewrites performed at registration time are plain recursive
//! functions over it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Model, ModelType};

/// Separator used to join a qualifier path into a generated option name.
pub const FIELD_SEPARATOR: &str = ".";

/// Prefix of the synthetic parameter names produced by flattening.
pub const SYNTHETIC_PREFIX: &str = "_model_";

/// Field names from a root structured parameter down to one leaf, root
/// parameter name first: `["user", "address", "zip"]`.
pub type QualifierPath = Vec<String>;

/// Which validation entry point reinterprets a substituted parameter.
///
/// Attached to a placeholder annotation by the coercion adapter and read back
/// at invocation time. The original command never sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoercionMarker {
    /// Validate the parsed value as already-structured data.
    Value,
    /// Validate every string leaf from its textual form.
    Text,
}

/// Whether a parameter is exposed as a named option or a positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParamKind {
    /// Named option (`--name VALUE`), the default.
    #[default]
    Option,
    /// Positional argument.
    Argument,
}

/// Presentation and parsing hints for a single CLI parameter.
///
/// This is independent of the value's type: it says how the value is
/// spelled on the command line, not what it is.
///
/// # Examples
///
/// ```
/// use model_cli_core::{ParamInfo, ParamKind};
///
/// let info = ParamInfo::option()
///     .with_decl("--user-id")
///     .with_decl("-u")
///     .with_help("The id of the user");
/// assert_eq!(info.kind, ParamKind::Option);
/// assert!(info.has_explicit_decls());
///
/// let arg = ParamInfo::argument().with_metavar("THE_ID");
/// assert!(!arg.is_option());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamInfo {
    /// Option or positional argument.
    pub kind: ParamKind,
    /// Explicit declarations such as `--name` or `-n`.
    #[serde(default)]
    pub decls: Vec<String>,
    /// Help text shown in `--help`.
    #[serde(default)]
    pub help: Option<String>,
    /// Placeholder shown for the value in usage lines.
    #[serde(default)]
    pub metavar: Option<String>,
    /// Default declared on the metadata itself.
    #[serde(default)]
    pub default: Option<Value>,
    /// Hide from help output.
    #[serde(default)]
    pub hidden: bool,
}

impl ParamInfo {
    /// Metadata for a named option without explicit declarations.
    pub fn option() -> Self {
        Self::default()
    }

    /// Metadata for a positional argument.
    pub fn argument() -> Self {
        Self {
            kind: ParamKind::Argument,
            ..Self::default()
        }
    }

    /// Adds an explicit declaration (`--long` or `-s`).
    pub fn with_decl(mut self, decl: &str) -> Self {
        self.decls.push(decl.to_string());
        self
    }

    /// Sets the help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Sets the value placeholder.
    pub fn with_metavar(mut self, metavar: &str) -> Self {
        self.metavar = Some(metavar.to_string());
        self
    }

    /// Declares a default on the metadata.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Hides the parameter from help output.
    pub fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Returns `true` for named options.
    pub fn is_option(&self) -> bool {
        self.kind == ParamKind::Option
    }

    /// Returns `true` when the caller named the option explicitly.
    pub fn has_explicit_decls(&self) -> bool {
        !self.decls.is_empty()
    }
}

/// A single check applied after a refined type's base type validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    MultipleOf(f64),
    Ge(f64),
    Gt(f64),
    Le(f64),
    Lt(f64),
    MinLength(usize),
    MaxLength(usize),
    /// Regular expression the whole string must match.
    Pattern(String),
    /// Absolute URL whose scheme is one of `schemes` (any scheme when empty).
    Url { schemes: Vec<String> },
}

/// A named constrained scalar or value object, e.g. an even integer or an
/// HTTP URL.
///
/// The CLI parser never handles these natively; they reach the command
/// through the coercion adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedType {
    pub name: String,
    pub base: TypeExpr,
    pub constraints: Vec<Constraint>,
}

impl RefinedType {
    /// Creates a refined type with no constraints yet.
    pub fn new(name: &str, base: TypeExpr) -> Self {
        Self {
            name: name.to_string(),
            base,
            constraints: Vec::new(),
        }
    }

    /// Appends a constraint.
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// An absolute `http`/`https` URL.
    pub fn http_url() -> Self {
        Self::new("HttpUrl", TypeExpr::Str).with(Constraint::Url {
            schemes: vec!["http".to_string(), "https".to_string()],
        })
    }

    /// An absolute URL with any scheme.
    pub fn any_url() -> Self {
        Self::new("AnyUrl", TypeExpr::Str).with(Constraint::Url {
            schemes: Vec::new(),
        })
    }
}

/// Auxiliary data carried on an annotated type.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// CLI metadata attached by the caller.
    Cli(ParamInfo),
    /// Placeholder marker attached by the coercion adapter.
    Coercion(CoercionMarker),
    /// Path from a root structured parameter to this leaf.
    Qualifier(QualifierPath),
    /// Human-readable description of a model field.
    Description(String),
}

/// Tagged type-expression tree.
///
/// # Examples
///
/// ```
/// use model_cli_core::TypeExpr;
///
/// let ty = TypeExpr::list(TypeExpr::union([TypeExpr::Bool, TypeExpr::Int]));
/// assert_eq!(ty.to_string(), "list[bool | int]");
/// assert!(ty.is_collection());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Bool,
    Int,
    Float,
    Str,
    Path,
    Optional(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    List(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Model(Arc<ModelType>),
    Refined(Arc<RefinedType>),
    /// Reserved execution-context value supplied by the framework.
    Context,
    Annotated(Box<TypeExpr>, Vec<Annotation>),
}

impl TypeExpr {
    pub fn optional(inner: TypeExpr) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn list(inner: TypeExpr) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn tuple(items: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    pub fn union(members: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    pub fn refined(refined: RefinedType) -> Self {
        Self::Refined(Arc::new(refined))
    }

    /// The structured model type described by `M`.
    pub fn model<M: Model>() -> Self {
        Self::Model(Arc::new(M::model_type()))
    }

    /// Attaches one more annotation, reusing an existing annotation layer.
    pub fn annotated(self, annotation: Annotation) -> Self {
        match self {
            Self::Annotated(inner, mut annotations) => {
                annotations.push(annotation);
                Self::Annotated(inner, annotations)
            }
            other => Self::Annotated(Box::new(other), vec![annotation]),
        }
    }

    /// Shorthand for attaching CLI metadata.
    pub fn with_cli(self, info: ParamInfo) -> Self {
        self.annotated(Annotation::Cli(info))
    }

    /// Splits off every annotation layer, returning the base type and the
    /// annotations outermost-last.
    pub fn split(&self) -> (&TypeExpr, Vec<&Annotation>) {
        let mut annotations = Vec::new();
        let mut current = self;
        while let Self::Annotated(inner, layer) = current {
            annotations.extend(layer.iter());
            current = inner;
        }
        (current, annotations)
    }

    /// The type with all annotation layers removed.
    pub fn base(&self) -> &TypeExpr {
        self.split().0
    }

    /// CLI metadata attached anywhere in the annotation layers.
    pub fn cli_infos(&self) -> Vec<&ParamInfo> {
        self.split()
            .1
            .into_iter()
            .filter_map(|annotation| match annotation {
                Annotation::Cli(info) => Some(info),
                _ => None,
            })
            .collect()
    }

    /// The coercion marker recorded on this annotation, if any.
    pub fn marker(&self) -> Option<CoercionMarker> {
        self.split().1.into_iter().find_map(|annotation| match annotation {
            Annotation::Coercion(marker) => Some(*marker),
            _ => None,
        })
    }

    /// The qualifier path recorded on a flattened leaf, if any.
    pub fn qualifier(&self) -> Option<&[String]> {
        self.split().1.into_iter().find_map(|annotation| match annotation {
            Annotation::Qualifier(path) => Some(path.as_slice()),
            _ => None,
        })
    }

    /// The field description recorded on this annotation, if any.
    pub fn description(&self) -> Option<&str> {
        self.split().1.into_iter().find_map(|annotation| match annotation {
            Annotation::Description(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// The model type, if the base type is a structured model.
    pub fn as_model(&self) -> Option<&Arc<ModelType>> {
        match self.base() {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }

    /// Returns `true` for `List` and `Tuple` base types.
    pub fn is_collection(&self) -> bool {
        matches!(self.base(), Self::List(_) | Self::Tuple(_))
    }

    /// For a collection base type, whether any element is a structured model.
    pub fn has_model_elements(&self) -> bool {
        match self.base() {
            Self::List(inner) => inner.as_model().is_some(),
            Self::Tuple(items) => items.iter().any(|item| item.as_model().is_some()),
            _ => false,
        }
    }

    /// Rebuilds the tree top-down, replacing every node for which `replace`
    /// returns a new type.
    ///
    /// Replacement is attempted on a node before descending into it, and a
    /// replaced node's children are not visited. Annotation layers are
    /// preserved, and model types are never entered.
    pub fn rewrite<F>(&self, replace: &F) -> TypeExpr
    where
        F: Fn(&TypeExpr) -> Option<TypeExpr>,
    {
        if let Some(replacement) = replace(self) {
            return replacement;
        }
        match self {
            Self::Optional(inner) => Self::Optional(Box::new(inner.rewrite(replace))),
            Self::List(inner) => Self::List(Box::new(inner.rewrite(replace))),
            Self::Tuple(items) => Self::Tuple(items.iter().map(|t| t.rewrite(replace)).collect()),
            Self::Union(members) => {
                Self::Union(members.iter().map(|t| t.rewrite(replace)).collect())
            }
            Self::Annotated(inner, annotations) => {
                Self::Annotated(Box::new(inner.rewrite(replace)), annotations.clone())
            }
            other => other.clone(),
        }
    }

    /// Replaces every occurrence of `target` with `replacement`.
    ///
    /// # Examples
    ///
    /// ```
    /// use model_cli_core::{RefinedType, TypeExpr};
    ///
    /// let url = TypeExpr::refined(RefinedType::http_url());
    /// let ty = TypeExpr::list(url.clone());
    /// assert_eq!(ty.substitute(&url, &TypeExpr::Str), TypeExpr::list(TypeExpr::Str));
    /// ```
    pub fn substitute(&self, target: &TypeExpr, replacement: &TypeExpr) -> TypeExpr {
        self.rewrite(&|node| (node == target).then(|| replacement.clone()))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |items: &[TypeExpr], sep: &str| {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(sep)
        };
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Path => f.write_str("path"),
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::Union(members) => f.write_str(&join(members, " | ")),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Tuple(items) => write!(f, "tuple[{}]", join(items, ", ")),
            Self::Model(model) => f.write_str(&model.name),
            Self::Refined(refined) => f.write_str(&refined.name),
            Self::Context => f.write_str("Context"),
            Self::Annotated(inner, _) => write!(f, "{inner}"),
        }
    }
}
