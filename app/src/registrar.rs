//! Command Registrar.
//!
//! Every command goes through the same pipeline when it is registered:
//! flatten structured models, coerce what the parser cannot handle, then
//! build the clap command. A command that survives registration is fully
//! runnable; nothing about its signature is re-checked per invocation.

use std::ffi::OsString;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::{ArgMatches, Command};
use model_cli_core::Signature;
use model_cli_engine::{LaxEngine, ValidationEngine};
use tracing::{debug, info};

use crate::backend::{ClapBackend, CommandSpec};
use crate::coerce::enable_type_coercion;
use crate::command::{CommandFn, InvocationContext};
use crate::config::AppConfig;
use crate::error::{CommandError, Error, RegistrationError};
use crate::flatten::enable_models;

/// Name used for the top-level command when several are registered and
/// the configuration names none.
const DEFAULT_APP_NAME: &str = "app";

#[derive(Debug)]
struct Registered {
    name: String,
    command: CommandFn,
    spec: CommandSpec,
}

/// A set of registered commands.
///
/// With one command the program is that command; with several, each is a
/// subcommand.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use model_cli::{App, CommandFn};
/// use model_cli_core::*;
///
/// let user = ModelType::new("User")
///     .field(FieldDescriptor::new("id", TypeExpr::Int))
///     .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"));
///
/// let main = CommandFn::new(
///     Signature::new()
///         .with(Parameter::new("num", TypeExpr::Int))
///         .with(Parameter::new("user", TypeExpr::Model(Arc::new(user)))),
///     |args| {
///         assert_eq!(args.get::<i64>("num")?, 1);
///         assert_eq!(args.raw("user").unwrap()["id"], 2);
///         Ok(())
///     },
/// );
///
/// let mut app = App::new();
/// app.command("main", main).unwrap();
/// app.try_run_from(["main", "1", "--user.id", "2"]).unwrap();
/// ```
#[derive(Debug)]
pub struct App {
    config: AppConfig,
    engine: Arc<dyn ValidationEngine>,
    commands: Vec<Registered>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// An empty application with default settings and the bundled engine.
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            engine: Arc::new(LaxEngine::new()),
            commands: Vec::new(),
        }
    }

    /// Replaces the settings; applies to commands registered afterwards.
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the validation engine used for coerced parameters.
    pub fn with_engine(mut self, engine: Arc<dyn ValidationEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registers `command` under `name`.
    ///
    /// # Errors
    ///
    /// Any [`RegistrationError`]: a duplicate name, a collection of models,
    /// a synthetic-name collision, a malformed signature or a type the
    /// parser cannot represent even after coercion.
    pub fn command(&mut self, name: &str, command: CommandFn) -> Result<&mut Self, RegistrationError> {
        if self.commands.iter().any(|registered| registered.name == name) {
            return Err(RegistrationError::DuplicateCommand(name.to_string()));
        }

        let backend = ClapBackend::from_config(&self.config);
        let command = enable_models(command, &self.config)?;
        let command = enable_type_coercion(command, &backend, Arc::clone(&self.engine))?;
        let spec = backend.build(name, &command)?;

        info!(
            command = name,
            params = command.signature().len(),
            "Registered command"
        );
        self.commands.push(Registered {
            name: name.to_string(),
            command,
            spec,
        });
        Ok(self)
    }

    /// Names of the registered commands, in registration order.
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|r| r.name.as_str()).collect()
    }

    /// The rewritten signature of a registered command.
    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.commands
            .iter()
            .find(|registered| registered.name == name)
            .map(|registered| registered.command.signature())
    }

    /// The clap command for the whole program.
    pub fn cli(&self) -> Command {
        let mut cli = match self.commands.as_slice() {
            [single] => {
                let name = self.config.name.clone().unwrap_or_else(|| single.name.clone());
                single.spec.command().clone().name(name)
            }
            many => {
                let name = self
                    .config
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());
                Command::new(name)
                    .subcommand_required(true)
                    .arg_required_else_help(true)
                    .subcommands(many.iter().map(|r| r.spec.command().clone()))
            }
        };
        if let Some(about) = &self.config.about {
            cli = cli.about(about.clone());
        }
        if let Some(version) = &self.config.version {
            cli = cli.version(version.clone());
        }
        if self.config.no_args_is_help {
            cli = cli.arg_required_else_help(true);
        }
        cli
    }

    /// Rendered `--help` output for the whole program.
    pub fn render_help(&self) -> String {
        self.cli().render_help().to_string()
    }

    /// Parses `args` (program name first) and runs the selected command.
    ///
    /// # Errors
    ///
    /// [`CommandError::Usage`] for syntax errors and for help or version
    /// requests (check [`CommandError::exit_code`]), otherwise whatever the
    /// command pipeline or body returns.
    pub fn try_run_from<I, T>(&self, args: I) -> Result<(), CommandError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let argv: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let matches = self.cli().try_get_matches_from(&argv)?;

        let (registered, matches) = self.select(&matches)?;
        let context = InvocationContext {
            command: registered.name.clone(),
            args: argv
                .iter()
                .skip(1)
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect(),
        };
        let arguments = registered.spec.extract(matches, &context)?;
        debug!(command = %registered.name, args = arguments.len(), "Invoking command");
        registered.command.call(arguments)
    }

    /// Runs with the process arguments and exits on failure.
    ///
    /// Help and version output exit with status 0, usage errors with 2,
    /// invalid values with 2 and command failures with 1.
    pub fn run(&self) {
        self.run_from(std::env::args_os());
    }

    /// Like [`run`](Self::run) with explicit arguments, program name first.
    pub fn run_from<I, T>(&self, args: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        if let Err(err) = self.try_run_from(args) {
            exit_with(err);
        }
    }

    fn select<'m>(&self, matches: &'m ArgMatches) -> Result<(&Registered, &'m ArgMatches), CommandError> {
        if let [single] = self.commands.as_slice() {
            return Ok((single, matches));
        }
        matches
            .subcommand()
            .and_then(|(name, sub)| {
                self.commands
                    .iter()
                    .find(|registered| registered.name == name)
                    .map(|registered| (registered, sub))
            })
            .ok_or_else(|| {
                CommandError::Usage(
                    self.cli()
                        .error(ErrorKind::MissingSubcommand, "a subcommand is required"),
                )
            })
    }
}

fn exit_with(err: CommandError) -> ! {
    match err {
        CommandError::Usage(err) => err.exit(),
        err => {
            eprintln!("Error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

/// Registers `command` as the whole program and runs it with the process
/// arguments.
///
/// Registration errors are reported and exit with status 1.
pub fn run(command: CommandFn) {
    let mut app = App::new();
    if let Err(err) = app.command("main", command) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
    app.run();
}

/// Registers `command` as the whole program and runs it with `args`.
///
/// # Errors
///
/// [`Error::Registration`] when the command cannot be registered,
/// otherwise [`Error::Command`] from the run.
pub fn try_run_from<I, T>(command: CommandFn, args: I) -> Result<(), Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut app = App::new();
    app.command("main", command)?;
    app.try_run_from(args)?;
    Ok(())
}
