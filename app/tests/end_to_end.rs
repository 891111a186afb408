use std::sync::{Arc, Mutex};

use model_cli::{App, Arguments, CommandError, CommandFn, RegistrationError};
use model_cli_core::{
    Constraint, FieldDescriptor, Model, ModelType, ParamInfo, Parameter, RefinedType, Signature,
    SignatureError, TypeExpr,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
}

impl Model for User {
    fn model_type() -> ModelType {
        ModelType::new("User")
            .field(FieldDescriptor::new("id", TypeExpr::Int))
            .field(FieldDescriptor::new("name", TypeExpr::Str).with_default("Jane Doe"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

/// Command whose body records the arguments it was called with.
fn recording(signature: Signature) -> (CommandFn, Arc<Mutex<Vec<Arguments>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let command = CommandFn::new(signature, move |args| {
        sink.lock().expect("lock").push(args);
        Ok(())
    });
    (command, calls)
}

fn single(command: CommandFn) -> App {
    let mut app = App::new();
    app.command("main", command).expect("registration");
    app
}

fn last(calls: &Mutex<Vec<Arguments>>) -> Arguments {
    calls.lock().expect("lock").last().cloned().expect("command was called")
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

#[test]
fn positional_and_flattened_model() {
    let (command, calls) = recording(
        Signature::new()
            .with(Parameter::new("num", TypeExpr::Int))
            .with(Parameter::new("user", TypeExpr::model::<User>())),
    );
    let app = single(command);

    app.try_run_from(["main", "1", "--user.id", "2"]).expect("run");

    let args = last(&calls);
    assert_eq!(args.get::<i64>("num").expect("num"), 1);
    assert_eq!(
        args.get::<User>("user").expect("user"),
        User {
            id: 2,
            name: "Jane Doe".to_string()
        }
    );
}

#[test]
fn nested_models_rebuild() {
    let (command, calls) = recording(Signature::new().with(Parameter::new("person", TypeExpr::model::<Person>())));
    let app = single(command);

    app.try_run_from([
        "main",
        "--person.name",
        "Jeff",
        "--person.pet.name",
        "Lassie",
        "--person.pet.species",
        "dog",
    ])
    .expect("run");

    assert_eq!(
        last(&calls).get::<Person>("person").expect("person"),
        Person {
            name: "Jeff".to_string(),
            age: None,
            pet: Pet {
                name: "Lassie".to_string(),
                species: "dog".to_string(),
            },
        }
    );
}

#[test]
fn deep_option_name_and_description_help() {
    let address = ModelType::new("Address").field(
        FieldDescriptor::new("zip", TypeExpr::Str).with_description("Postal code of the address"),
    );
    let account = ModelType::new("Account")
        .field(FieldDescriptor::new("address", TypeExpr::Model(Arc::new(address))));
    let (command, _) = recording(Signature::new().with(Parameter::new(
        "user",
        TypeExpr::Model(Arc::new(account)),
    )));
    let app = single(command);

    let help = app.render_help();
    assert!(help.contains("--user.address.zip <TEXT>"), "help was:\n{help}");
    assert!(help.contains("Postal code of the address"), "help was:\n{help}");
}

#[test]
fn hidden_field_option_still_parses() {
    let job = ModelType::new("Job")
        .field(FieldDescriptor::new("name", TypeExpr::Str))
        .field(
            FieldDescriptor::new("token", TypeExpr::Str)
                .with_default("")
                .with_cli(ParamInfo::option().hide()),
        );
    let (command, calls) = recording(Signature::new().with(Parameter::new(
        "job",
        TypeExpr::Model(Arc::new(job)),
    )));
    let app = single(command);

    let help = app.render_help();
    assert!(help.contains("--job.name"), "help was:\n{help}");
    assert!(!help.contains("--job.token"), "help was:\n{help}");

    app.try_run_from(["main", "--job.name", "nightly", "--job.token", "s3cret"])
        .expect("run");
    assert_eq!(
        last(&calls).raw("job"),
        Some(&json!({"name": "nightly", "token": "s3cret"}))
    );
}

#[test]
fn argument_override_turns_leaves_positional() {
    let (command, calls) = recording(Signature::new().with(Parameter::new(
        "user",
        TypeExpr::model::<User>().with_cli(ParamInfo::argument()),
    )));
    let app = single(command);

    app.try_run_from(["main", "7", "Alice"]).expect("run");
    assert_eq!(
        last(&calls).get::<User>("user").expect("user"),
        User {
            id: 7,
            name: "Alice".to_string()
        }
    );
}

#[test]
fn list_of_models_fails_at_registration() {
    let (command, calls) = recording(Signature::new().with(Parameter::new(
        "people",
        TypeExpr::list(TypeExpr::model::<Person>()),
    )));
    let mut app = App::new();

    let err = app.command("main", command).expect_err("list of models");
    assert!(matches!(err, RegistrationError::CollectionOfModels { .. }));
    assert!(app.command_names().is_empty());
    assert!(calls.lock().expect("lock").is_empty());
}

#[test]
fn field_declaration_clashing_with_derived_option_fails_at_registration() {
    let account = ModelType::new("Account").field(
        FieldDescriptor::new("id", TypeExpr::Int).with_cli(ParamInfo::option().with_decl("--num")),
    );
    let (command, calls) = recording(
        Signature::new()
            .with(Parameter::new("num", TypeExpr::Int).with_default(1))
            .with(Parameter::new("account", TypeExpr::Model(Arc::new(account)))),
    );
    let mut app = App::new();

    let err = app.command("main", command).expect_err("--num declared twice");
    assert!(matches!(
        err,
        RegistrationError::Signature(SignatureError::DuplicateDecl(flag)) if flag == "--num"
    ));
    assert!(app.command_names().is_empty());
    assert!(calls.lock().expect("lock").is_empty());
}

#[test]
fn derived_option_names_that_coincide_fail_at_registration() {
    let (command, _) = recording(
        Signature::new()
            .with(Parameter::new("x", TypeExpr::Int).with_default(1))
            .with(Parameter::new("_x", TypeExpr::Int).with_default(2)),
    );
    let mut app = App::new();

    let err = app.command("main", command).expect_err("--x derived twice");
    assert!(matches!(
        err,
        RegistrationError::Signature(SignatureError::DuplicateDecl(flag)) if flag == "--x"
    ));
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

#[test]
fn union_precedence_from_command_line() {
    let (command, calls) = recording(Signature::new().with(Parameter::new(
        "value",
        TypeExpr::union([TypeExpr::Bool, TypeExpr::Int, TypeExpr::Float, TypeExpr::Str]),
    )));
    let app = single(command);

    for (raw, expected) in [
        ("1", json!(true)),
        ("2", json!(2)),
        ("2.5", json!(2.5)),
        ("hello", json!("hello")),
    ] {
        app.try_run_from(["main", raw]).expect("run");
        assert_eq!(last(&calls).raw("value"), Some(&expected), "input {raw}");
    }
}

#[test]
fn constrained_field_rejects_odd_value() {
    let even = TypeExpr::refined(RefinedType::new("EvenInt", TypeExpr::Int).with(Constraint::MultipleOf(2.0)));
    let order = ModelType::new("Order").field(FieldDescriptor::new("quantity", even));
    let (command, calls) = recording(Signature::new().with(Parameter::new(
        "order",
        TypeExpr::Model(Arc::new(order)),
    )));
    let app = single(command);

    let err = app
        .try_run_from(["main", "--order.quantity", "3"])
        .expect_err("odd quantity");
    assert_eq!(
        err.to_string(),
        "Invalid value for order.quantity: Input should be a multiple of 2"
    );
    assert_eq!(err.exit_code(), 2);
    assert!(calls.lock().expect("lock").is_empty());

    app.try_run_from(["main", "--order.quantity", "4"]).expect("even quantity");
    assert_eq!(last(&calls).raw("order"), Some(&json!({"quantity": 4})));
}

#[test]
fn repeated_url_option() {
    let (command, calls) = recording(Signature::new().with(Parameter::new(
        "url",
        TypeExpr::list(TypeExpr::refined(RefinedType::http_url())),
    )));
    let app = single(command);

    app.try_run_from(["main", "--url", "https://google.com", "--url", "http://example.com/a"])
        .expect("run");
    assert_eq!(
        last(&calls).raw("url"),
        Some(&json!(["https://google.com/", "http://example.com/a"]))
    );

    let err = app
        .try_run_from(["main", "--url", "ftp://example.com"])
        .expect_err("bad scheme");
    assert_eq!(
        err.to_string(),
        "Invalid value for url: URL scheme should be 'http' or 'https'"
    );
}

#[test]
fn help_needs_no_valid_input() {
    let even = TypeExpr::refined(RefinedType::new("EvenInt", TypeExpr::Int).with(Constraint::MultipleOf(2.0)));
    let (command, calls) = recording(
        Signature::new()
            .with(Parameter::new("num", even))
            .with(Parameter::new("user", TypeExpr::model::<User>())),
    );
    let app = single(command);

    let err = app.try_run_from(["main", "--help"]).expect_err("help");
    assert!(matches!(err, CommandError::Usage(_)));
    assert_eq!(err.exit_code(), 0);
    assert!(calls.lock().expect("lock").is_empty());
}

// ---------------------------------------------------------------------------
// Registrar
// ---------------------------------------------------------------------------

#[test]
fn several_commands_become_subcommands() {
    let (greet, greet_calls) = recording(Signature::new().with(Parameter::new("user", TypeExpr::model::<User>())));
    let (adopt, adopt_calls) = recording(Signature::new().with(Parameter::new("pet", TypeExpr::model::<Pet>())));
    let mut app = App::new();
    app.command("greet", greet)
        .expect("greet")
        .command("adopt", adopt)
        .expect("adopt");

    app.try_run_from(["app", "adopt", "--pet.name", "Rex", "--pet.species", "dog"])
        .expect("adopt runs");
    assert!(greet_calls.lock().expect("lock").is_empty());
    assert_eq!(
        last(&adopt_calls).get::<Pet>("pet").expect("pet"),
        Pet {
            name: "Rex".to_string(),
            species: "dog".to_string()
        }
    );

    let err = app.try_run_from(["app"]).expect_err("no subcommand");
    assert!(matches!(err, CommandError::Usage(_)));
}

#[test]
fn single_command_convenience() {
    let (command, calls) = recording(Signature::new().with(Parameter::new("num", TypeExpr::Int)));
    model_cli::try_run_from(command, ["main", "5"]).expect("run");
    assert_eq!(last(&calls).raw("num"), Some(&json!(5)));
}
