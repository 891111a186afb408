//! Structured models and validated types as clap command parameters.
//!
//! A command is a [`CommandFn`]: a [`Signature`] plus a body taking
//! [`Arguments`]. Registering it on an [`App`] runs two rewrites before
//! clap ever sees it:
//!
//! 1. [`enable_models`] replaces each structured-model parameter with one
//!    option per leaf field (`--user.address.zip`) and rebuilds the model
//!    when the command runs.
//! 2. [`enable_type_coercion`] retypes parameters clap cannot parse
//!    (unions, refined types such as URLs or even integers) to a string
//!    placeholder, and validates the text against the original type with a
//!    [`ValidationEngine`] before calling the body.
//!
//! # Example
//!
//! ```
//! use model_cli::{App, CommandFn};
//! use model_cli_core::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Model for User {
//!     fn model_type() -> ModelType {
//!         ModelType::new("User")
//!             .field(FieldDescriptor::new("id", TypeExpr::Int))
//!             .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"))
//!     }
//! }
//!
//! let main = CommandFn::new(
//!     Signature::new()
//!         .with(Parameter::new("num", TypeExpr::Int))
//!         .with(Parameter::new("user", TypeExpr::model::<User>())),
//!     |args| {
//!         let user: User = args.get("user")?;
//!         assert_eq!(args.get::<i64>("num")?, 1);
//!         assert_eq!(user, User { id: 2, name: "Jane Doe".to_string() });
//!         Ok(())
//!     },
//! );
//!
//! let mut app = App::new();
//! app.command("main", main).unwrap();
//! app.try_run_from(["main", "1", "--user.id", "2"]).unwrap();
//! ```
//!
//! [`Signature`]: model_cli_core::Signature
//! [`ValidationEngine`]: model_cli_engine::ValidationEngine

mod backend;
mod coerce;
mod command;
mod config;
mod error;
mod flatten;
mod registrar;

pub use backend::{
    ClapBackend, CommandSpec, DerivedParam, ParamSupport, ScalarKind, ScalarValueParser, Support,
    derive_params,
};
pub use coerce::enable_type_coercion;
pub use command::{Arguments, Body, CommandFn, InvocationContext};
pub use config::AppConfig;
pub use error::{CommandError, ConfigError, Error, RegistrationError};
pub use flatten::enable_models;
pub use registrar::{App, run, try_run_from};
