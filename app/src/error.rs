//! Error types for command registration and invocation.
//!
//! Registration errors fire when a command is added to an [`App`], so a
//! broken command is never reachable. Invocation errors are what the end
//! user sees for bad input.
//!
//! [`App`]: crate::App

use model_cli_core::{ModelError, SignatureError};
use model_cli_engine::SchemaError;
use thiserror::Error;

/// Failures detected while registering a command.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A list or tuple of structured models; there is no flat spelling for
    /// repeated models.
    #[error("parameter '{parameter}' has type {ty}: collections of structured models are not supported")]
    CollectionOfModels { parameter: String, ty: String },

    /// A generated parameter name equals another parameter's name.
    #[error("generated parameter name '{0}' collides with another parameter")]
    NameCollision(String),

    /// Malformed signature.
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),

    /// The CLI parser cannot represent this parameter's type.
    #[error("parameter '{parameter}' has unsupported type {ty}: {reason}")]
    UnsupportedType {
        parameter: String,
        ty: String,
        reason: String,
    },

    /// The validation engine rejected a type outright.
    #[error("parameter '{parameter}': {source}")]
    Schema {
        parameter: String,
        #[source]
        source: SchemaError,
    },

    /// Two commands registered under one name.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),
}

/// Failures while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A value failed validation. Carries only the first message.
    #[error("Invalid value for {param_hint}: {message}")]
    BadParameter { param_hint: String, message: String },

    /// Rebuilding a structured model failed; shown in the model's own format.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A required parameter received no value.
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// A value for a name the signature does not declare.
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),

    /// A value that cannot be read as the type the command asked for.
    #[error("argument '{name}' cannot be decoded: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Command-line syntax errors, help and version requests.
    #[error(transparent)]
    Usage(#[from] clap::Error),

    /// Error raised by the command body itself.
    #[error("{0}")]
    Failed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl CommandError {
    /// Wraps an error raised inside a command body.
    pub fn failed(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Failed(error.into())
    }

    /// Process exit code for this error, following clap's conventions
    /// (usage errors exit 2, help and version exit 0).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(err) => err.exit_code(),
            Self::BadParameter { .. } | Self::MissingArgument(_) | Self::UnexpectedArgument(_) => 2,
            Self::Model(_) | Self::Decode { .. } | Self::Failed(_) => 1,
        }
    }
}

/// Any failure from building or running an application.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A setting with an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
