use std::collections::HashSet;

use clap::{Arg, ArgAction, ArgMatches, Command};
use model_cli_core::{ParamDefault, ParamKind, Signature, SignatureError, TypeExpr, validate_signature};
use serde_json::Value;
use tracing::debug;

use super::{DerivedParam, ParamSupport, ScalarKind, ScalarValueParser, Support};
use crate::command::{Arguments, CommandFn, InvocationContext};
use crate::config::AppConfig;
use crate::error::{CommandError, RegistrationError};

/// The clap builder API as the CLI parser.
///
/// # Examples
///
/// ```
/// use model_cli::{ClapBackend, ParamSupport, Support};
/// use model_cli_core::{RefinedType, TypeExpr};
///
/// let backend = ClapBackend::default();
/// assert_eq!(backend.support(&TypeExpr::list(TypeExpr::Int)), Support::Native);
/// assert_eq!(
///     backend.support(&TypeExpr::union([TypeExpr::Bool, TypeExpr::Int])),
///     Support::UnsupportedUnion
/// );
///
/// let url = TypeExpr::refined(RefinedType::http_url());
/// assert_eq!(
///     backend.support(&TypeExpr::list(url.clone())),
///     Support::UnsupportedType(url)
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ClapBackend {
    show_defaults: bool,
}

impl Default for ClapBackend {
    fn default() -> Self {
        Self {
            show_defaults: true,
        }
    }
}

impl ParamSupport for ClapBackend {
    fn derive_params(&self, signature: &Signature) -> Result<Vec<DerivedParam>, SignatureError> {
        super::derive_params(signature)
    }

    fn support(&self, ty: &TypeExpr) -> Support {
        match ty {
            TypeExpr::Annotated(inner, _) | TypeExpr::Optional(inner) => self.support(inner),
            TypeExpr::Bool
            | TypeExpr::Int
            | TypeExpr::Float
            | TypeExpr::Str
            | TypeExpr::Path
            | TypeExpr::Context => Support::Native,
            TypeExpr::Union(members) => match members.as_slice() {
                [single] => self.support(single),
                _ => Support::UnsupportedUnion,
            },
            TypeExpr::List(inner) => self.element_support(inner),
            TypeExpr::Tuple(items) => items
                .iter()
                .map(|item| self.element_support(item))
                .find(|support| *support != Support::Native)
                .unwrap_or(Support::Native),
            TypeExpr::Refined(_) => Support::UnsupportedType(ty.clone()),
            TypeExpr::Model(_) => Support::UnflattenedModel,
        }
    }
}

impl ClapBackend {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            show_defaults: config.show_defaults,
        }
    }

    fn element_support(&self, element: &TypeExpr) -> Support {
        match element.base() {
            TypeExpr::List(_) | TypeExpr::Tuple(_) | TypeExpr::Model(_) => {
                Support::UnsupportedCollection
            }
            TypeExpr::Context => Support::UnsupportedType(element.clone()),
            _ => self.support(element),
        }
    }

    /// Builds the clap argument for one parameter.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::UnsupportedType`] for any type without a
    /// command-line spelling, including types the coercion adapter left in
    /// place.
    pub fn native_param(&self, param: &DerivedParam) -> Result<Arg, RegistrationError> {
        let shape = self.shape(param)?;
        let kind = match &shape {
            Shape::Single(kind) | Shape::Many(kind) => *kind,
            Shape::Tuple(_) => ScalarKind::Str,
            Shape::Context => {
                return Err(RegistrationError::UnsupportedType {
                    parameter: param.name.clone(),
                    ty: param.base.to_string(),
                    reason: "the execution context is supplied by the framework".to_string(),
                });
            }
        };

        let info = &param.info;
        let mut arg = Arg::new(param.name.clone()).value_parser(ScalarValueParser::new(kind));

        match info.kind {
            ParamKind::Option => {
                let (longs, shorts) = flag_names(param);
                let mut longs = longs.into_iter();
                if let Some(long) = longs.next() {
                    arg = arg.long(long).visible_aliases(longs);
                }
                let mut shorts = shorts.into_iter();
                if let Some(short) = shorts.next() {
                    arg = arg.short(short).visible_short_aliases(shorts);
                }
                let value_name = info.metavar.clone().unwrap_or_else(|| kind.metavar().to_string());
                arg = arg.value_name(value_name);
            }
            ParamKind::Argument => {
                let value_name = info
                    .metavar
                    .clone()
                    .unwrap_or_else(|| param.display_name().to_uppercase());
                arg = arg.value_name(value_name);
            }
        }

        arg = match (&shape, info.kind) {
            (Shape::Single(ScalarKind::Bool), ParamKind::Option) => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .default_missing_value("true"),
            (Shape::Many(_), ParamKind::Option) => arg.action(ArgAction::Append),
            (Shape::Many(_), ParamKind::Argument) => arg.action(ArgAction::Append).num_args(1..),
            (Shape::Tuple(kinds), _) => arg.action(ArgAction::Set).num_args(kinds.len()),
            _ => arg.action(ArgAction::Set),
        };

        let mut help = info.help.clone().unwrap_or_default();
        if self.show_defaults {
            if let Some(default) = param.default.value().filter(|v| !v.is_null()) {
                let shown = match default {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                if !help.is_empty() {
                    help.push(' ');
                }
                help.push_str(&format!("[default: {shown}]"));
            }
        }
        if !help.is_empty() {
            arg = arg.help(help);
        }

        Ok(arg
            .required(param.default.is_required())
            .hide(info.hidden))
    }

    /// Builds the clap command for a registered command function.
    ///
    /// # Errors
    ///
    /// The first structural signature error, or the first parameter
    /// [`native_param`](Self::native_param) rejects.
    pub fn build(&self, name: &str, command: &CommandFn) -> Result<CommandSpec, RegistrationError> {
        let signature = command.signature();
        if let Some(error) = validate_signature(signature).into_iter().next() {
            return Err(error.into());
        }

        let mut clap_command = Command::new(name.to_string());
        if let Some(help) = command.help() {
            clap_command = clap_command.about(help.to_string());
        }

        let mut flags: HashSet<String> = RESERVED_FLAGS.iter().map(|flag| flag.to_string()).collect();
        let mut slots = Vec::new();
        for param in self.derive_params(signature)? {
            let shape = self.shape(&param)?;
            if shape != Shape::Context {
                if param.info.kind == ParamKind::Option {
                    let (longs, shorts) = flag_names(&param);
                    let spelled = longs
                        .into_iter()
                        .map(|long| format!("--{long}"))
                        .chain(shorts.into_iter().map(|short| format!("-{short}")));
                    for flag in spelled {
                        if !flags.insert(flag.clone()) {
                            return Err(SignatureError::DuplicateDecl(flag).into());
                        }
                    }
                }
                clap_command = clap_command.arg(self.native_param(&param)?);
            }
            slots.push(Slot {
                display: param.display_name(),
                name: param.name,
                default: param.default,
                shape,
            });
        }

        debug!(command = name, params = slots.len(), "Built clap command");
        Ok(CommandSpec {
            command: clap_command,
            slots,
        })
    }

    fn shape(&self, param: &DerivedParam) -> Result<Shape, RegistrationError> {
        Shape::of(&param.base).ok_or_else(|| RegistrationError::UnsupportedType {
            parameter: param.name.clone(),
            ty: param.base.to_string(),
            reason: self.reason(&param.base),
        })
    }

    fn reason(&self, ty: &TypeExpr) -> String {
        match self.support(ty) {
            Support::UnsupportedCollection => {
                "collections of collections or of models have no command-line form".to_string()
            }
            Support::UnflattenedModel => "structured model was not flattened".to_string(),
            Support::UnsupportedUnion => "unions need type coercion".to_string(),
            Support::UnsupportedType(inner) => format!("{inner} needs type coercion"),
            Support::Native => "no command-line form".to_string(),
        }
    }
}

/// Flags clap adds to every command.
const RESERVED_FLAGS: [&str; 2] = ["--help", "-h"];

fn default_long(name: &str) -> String {
    name.trim_start_matches('_').replace('_', "-")
}

/// Long names (without `--`) and short characters an option is spelled
/// with on the command line. Undeclared options get a long name derived
/// from the parameter name.
fn flag_names(param: &DerivedParam) -> (Vec<String>, Vec<char>) {
    let mut longs = Vec::new();
    let mut shorts = Vec::new();
    for decl in &param.info.decls {
        if let Some(long) = decl.strip_prefix("--") {
            longs.push(long.to_string());
        } else if let Some(short) = decl.strip_prefix('-').and_then(|s| s.chars().next()) {
            shorts.push(short);
        }
    }
    if longs.is_empty() && shorts.is_empty() {
        longs.push(default_long(&param.name));
    }
    (longs, shorts)
}

/// How parsed values for a parameter are read back from the matches.
#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Single(ScalarKind),
    Many(ScalarKind),
    Tuple(Vec<ScalarKind>),
    Context,
}

impl Shape {
    fn of(ty: &TypeExpr) -> Option<Self> {
        match unwrap_optional(ty) {
            TypeExpr::Context => Some(Self::Context),
            TypeExpr::List(inner) => ScalarKind::of(unwrap_optional(inner)).map(Self::Many),
            TypeExpr::Tuple(items) => items
                .iter()
                .map(|item| ScalarKind::of(unwrap_optional(item)))
                .collect::<Option<Vec<_>>>()
                .map(Self::Tuple),
            other => ScalarKind::of(other).map(Self::Single),
        }
    }
}

fn unwrap_optional(ty: &TypeExpr) -> &TypeExpr {
    match ty.base() {
        TypeExpr::Optional(inner) => unwrap_optional(inner),
        TypeExpr::Union(members) if members.len() == 1 => unwrap_optional(&members[0]),
        other => other,
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    display: String,
    default: ParamDefault,
    shape: Shape,
}

/// A clap command together with what is needed to read its matches back
/// into [`Arguments`].
#[derive(Debug, Clone)]
pub struct CommandSpec {
    command: Command,
    slots: Vec<Slot>,
}

impl CommandSpec {
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Reads parsed values back, filling declared defaults for absent
    /// parameters and binding the execution context.
    ///
    /// # Errors
    ///
    /// [`CommandError::BadParameter`] for a tuple position that does not
    /// parse as its element type.
    pub fn extract(
        &self,
        matches: &ArgMatches,
        context: &InvocationContext,
    ) -> Result<Arguments, CommandError> {
        let mut args = Arguments::new();
        for slot in &self.slots {
            let parsed = match &slot.shape {
                Shape::Context => Some(serde_json::to_value(context).map_err(|source| {
                    CommandError::Decode {
                        name: slot.name.clone(),
                        source,
                    }
                })?),
                Shape::Single(_) => matches.get_one::<Value>(&slot.name).cloned(),
                Shape::Many(_) => matches
                    .get_many::<Value>(&slot.name)
                    .map(|values| Value::Array(values.cloned().collect())),
                Shape::Tuple(kinds) => match matches.get_many::<Value>(&slot.name) {
                    Some(values) => Some(Value::Array(
                        values
                            .zip(kinds)
                            .map(|(value, kind)| {
                                kind.parse_text(value.as_str().unwrap_or_default())
                                    .map_err(|message| CommandError::BadParameter {
                                        param_hint: slot.display.clone(),
                                        message,
                                    })
                            })
                            .collect::<Result<Vec<_>, _>>()?,
                    )),
                    None => None,
                },
            };

            match (parsed, &slot.default) {
                (Some(value), _) => {
                    args.insert(slot.name.clone(), value);
                }
                (None, ParamDefault::Value(default)) => {
                    args.insert(slot.name.clone(), default.clone());
                }
                (None, ParamDefault::Required) => {}
            }
        }
        Ok(args)
    }
}
