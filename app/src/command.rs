//! Command functions and their arguments.
//!
//! A [`CommandFn`] pairs a [`Signature`] with a body. The transformations in
//! this crate consume one `CommandFn` and return another whose signature is
//! rewritten and whose body translates arguments before calling through.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use model_cli_core::{ParamDefault, Signature};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CommandError;

/// Shared, callable command body.
pub type Body = Arc<dyn Fn(Arguments) -> Result<(), CommandError> + Send + Sync>;

/// A command: an introspectable signature plus the code to run.
///
/// # Examples
///
/// ```
/// use model_cli::{Arguments, CommandFn};
/// use model_cli_core::{Parameter, Signature, TypeExpr};
///
/// let hello = CommandFn::new(
///     Signature::new().with(Parameter::new("name", TypeExpr::Str)),
///     |args| {
///         let name: String = args.get("name")?;
///         println!("Hello {name}");
///         Ok(())
///     },
/// );
///
/// let mut args = Arguments::new();
/// args.insert("name", "Jeff");
/// hello.call(args).unwrap();
/// ```
#[derive(Clone)]
pub struct CommandFn {
    signature: Signature,
    body: Body,
    help: Option<String>,
}

impl CommandFn {
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(Arguments) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        Self {
            signature,
            body: Arc::new(body),
            help: None,
        }
    }

    /// Sets the command description shown in help output.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Runs the body.
    pub fn call(&self, args: Arguments) -> Result<(), CommandError> {
        (self.body)(args)
    }

    /// A new command with `signature` whose body is `body`; help carries over.
    pub(crate) fn rewrap<F>(&self, signature: Signature, body: F) -> Self
    where
        F: Fn(Arguments) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        Self {
            signature,
            body: Arc::new(body),
            help: self.help.clone(),
        }
    }
}

impl fmt::Debug for CommandFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFn")
            .field("signature", &self.signature)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

/// Named argument values passed to a command body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The raw JSON value bound to `name`.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Decodes the value bound to `name`.
    ///
    /// # Errors
    ///
    /// [`CommandError::MissingArgument`] when nothing is bound, or
    /// [`CommandError::Decode`] when the value does not fit `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, CommandError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| CommandError::MissingArgument(name.to_string()))?;
        T::deserialize(value).map_err(|source| CommandError::Decode {
            name: name.to_string(),
            source,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks the values against `signature`, filling declared defaults.
    ///
    /// # Errors
    ///
    /// [`CommandError::UnexpectedArgument`] for a name the signature does not
    /// declare, [`CommandError::MissingArgument`] for a required parameter
    /// without a value.
    pub fn bind(mut self, signature: &Signature) -> Result<Self, CommandError> {
        if let Some(unknown) = self.values.keys().find(|name| !signature.contains(name)) {
            return Err(CommandError::UnexpectedArgument(unknown.clone()));
        }
        for param in signature {
            if self.values.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                ParamDefault::Value(default) => {
                    self.values.insert(param.name.clone(), default.clone());
                }
                ParamDefault::Required => {
                    return Err(CommandError::MissingArgument(param.name.clone()));
                }
            }
        }
        Ok(self)
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Arguments {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Value bound to parameters of type `TypeExpr::Context`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Name of the command being run.
    pub command: String,
    /// Raw command-line arguments, program name excluded.
    pub args: Vec<String>,
}
