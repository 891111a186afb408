use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use model_cli::{App, AppConfig, Arguments, CommandError, CommandFn};
use model_cli_core::{
    Constraint, FieldDescriptor, Model, ModelType, ParamInfo, Parameter, RefinedType, Signature,
    TypeExpr,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PROGRAM: &str = "model-cli-demo";

/// Environment variable holding the log filter (`debug`, `model_cli=trace`).
const LOG_ENV: &str = "MODEL_CLI_LOG";

#[derive(Debug, Parser)]
#[command(name = "model-cli-demo")]
#[command(about = "Structured models as command-line parameters, by example")]
struct Cli {
    /// YAML file with model-cli settings.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: DemoCommand,
}

#[derive(Debug, Subcommand)]
enum DemoCommand {
    /// Run one of the demo commands; everything after it is passed through.
    Run(RunArgs),
    /// Print the rewritten parameter list of every demo command.
    Signatures,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Demo command and its arguments (try `register --help`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    args: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
}

impl Model for User {
    fn model_type() -> ModelType {
        ModelType::new("User")
            .field(FieldDescriptor::new("id", TypeExpr::Int).with_description("Numeric user id"))
            .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Pet {
    name: String,
    species: String,
}

impl Model for Pet {
    fn model_type() -> ModelType {
        ModelType::new("Pet")
            .field(FieldDescriptor::new("name", TypeExpr::Str))
            .field(FieldDescriptor::new("species", TypeExpr::Str))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Person {
    name: String,
    age: Option<f64>,
    pet: Pet,
}

impl Model for Person {
    fn model_type() -> ModelType {
        ModelType::new("Person")
            .field(FieldDescriptor::new("name", TypeExpr::Str))
            .field(
                FieldDescriptor::new("age", TypeExpr::optional(TypeExpr::Float))
                    .with_default(serde_json::Value::Null),
            )
            .field(FieldDescriptor::new("pet", TypeExpr::model::<Pet>()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Order {
    sku: String,
    quantity: i64,
}

impl Model for Order {
    fn model_type() -> ModelType {
        let pairs = RefinedType::new("EvenInt", TypeExpr::Int)
            .with(Constraint::MultipleOf(2.0))
            .with(Constraint::Gt(0.0));
        ModelType::new("Order")
            .field(
                FieldDescriptor::new("sku", TypeExpr::Str)
                    .with_cli(ParamInfo::option().with_decl("--sku").with_decl("-s")),
            )
            .field(
                FieldDescriptor::new("quantity", TypeExpr::refined(pairs))
                    .with_default(2)
                    .with_description("Units to order, in pairs"),
            )
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        DemoCommand::Run(args) => run_demo(cli.config.as_deref(), args),
        DemoCommand::Signatures => show_signatures(cli.config.as_deref()),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_demo(config: Option<&Path>, args: RunArgs) -> Result<(), String> {
    let app = build_app(config)?;
    debug!(args = ?args.args, "Running demo command");
    app.run_from(std::iter::once(PROGRAM.to_string()).chain(args.args));
    Ok(())
}

fn show_signatures(config: Option<&Path>) -> Result<(), String> {
    let app = build_app(config)?;
    for name in app.command_names() {
        println!("{name}");
        let Some(signature) = app.signature(name) else {
            continue;
        };
        for param in signature {
            let decls = param
                .ty
                .cli_infos()
                .first()
                .map(|info| info.decls.join(", "))
                .unwrap_or_default();
            let marker = param
                .ty
                .marker()
                .map(|marker| format!(" (coerced from text as {marker:?})"))
                .unwrap_or_default();
            println!("  {:<28} {:<12} {decls}{marker}", param.name, param.ty.to_string());
        }
    }
    Ok(())
}

fn build_app(config: Option<&Path>) -> Result<App, String> {
    let mut config = match config {
        Some(path) => AppConfig::load(path).map_err(|e| format!("{}: {e}", path.display()))?,
        None => AppConfig::default(),
    };
    if config.name.is_none() {
        config.name = Some(PROGRAM.to_string());
    }

    let mut app = App::new().with_config(config);
    for (name, command) in demo_commands() {
        app.command(name, command).map_err(|e| format!("{name}: {e}"))?;
    }
    Ok(app)
}

fn demo_commands() -> Vec<(&'static str, CommandFn)> {
    vec![
        ("register", register()),
        ("adopt", adopt()),
        ("order", order()),
        ("fetch", fetch()),
        ("parse", parse()),
    ]
}

fn emit(value: &impl Serialize) -> Result<(), CommandError> {
    let text = serde_json::to_string(value).map_err(CommandError::failed)?;
    println!("{text}");
    Ok(())
}

fn register() -> CommandFn {
    CommandFn::new(
        Signature::new()
            .with(Parameter::new("num", TypeExpr::Int))
            .with(Parameter::new("user", TypeExpr::model::<User>())),
        |args: Arguments| {
            let num: i64 = args.get("num")?;
            let user: User = args.get("user")?;
            emit(&json!({ "num": num, "user": user }))
        },
    )
    .with_help("Register a user under a number")
}

fn adopt() -> CommandFn {
    CommandFn::new(
        Signature::new().with(Parameter::new("person", TypeExpr::model::<Person>())),
        |args: Arguments| {
            let person: Person = args.get("person")?;
            emit(&person)
        },
    )
    .with_help("Record a person and their pet")
}

fn order() -> CommandFn {
    CommandFn::new(
        Signature::new().with(Parameter::new("order", TypeExpr::model::<Order>())),
        |args: Arguments| {
            let order: Order = args.get("order")?;
            emit(&order)
        },
    )
    .with_help("Place an order; quantities come in pairs")
}

fn fetch() -> CommandFn {
    CommandFn::new(
        Signature::new().with(Parameter::new(
            "url",
            TypeExpr::list(TypeExpr::refined(RefinedType::http_url()))
                .with_cli(ParamInfo::option().with_decl("--url").with_help("Address to fetch")),
        )),
        |args: Arguments| {
            let urls: Vec<String> = args.get("url")?;
            emit(&urls)
        },
    )
    .with_help("Validate one or more http(s) URLs")
}

fn parse() -> CommandFn {
    CommandFn::new(
        Signature::new()
            .with(Parameter::new("ctx", TypeExpr::Context))
            .with(Parameter::new(
                "value",
                TypeExpr::union([TypeExpr::Bool, TypeExpr::Int, TypeExpr::Float, TypeExpr::Str]),
            )),
        |args: Arguments| {
            let context: model_cli::InvocationContext = args.get("ctx")?;
            let value = args.raw("value").cloned().unwrap_or_default();
            emit(&json!({ "command": context.command, "value": value }))
        },
    )
    .with_help("Show which union alternative a value parses as")
}
