use std::ffi::OsStr;

use clap::builder::{
    BoolishValueParser, PathBufValueParser, StringValueParser, TypedValueParser,
};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, Command};
use model_cli_core::TypeExpr;
use serde_json::{Number, Value};

/// Scalar types clap parses natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Str,
    Path,
}

impl ScalarKind {
    /// The scalar kind of an annotation-free type, if it is one.
    pub fn of(ty: &TypeExpr) -> Option<Self> {
        match ty.base() {
            TypeExpr::Bool => Some(Self::Bool),
            TypeExpr::Int => Some(Self::Int),
            TypeExpr::Float => Some(Self::Float),
            TypeExpr::Str => Some(Self::Str),
            TypeExpr::Path => Some(Self::Path),
            _ => None,
        }
    }

    /// Placeholder shown for the value in usage lines.
    pub fn metavar(self) -> &'static str {
        match self {
            Self::Bool => "BOOLEAN",
            Self::Int => "INTEGER",
            Self::Float => "FLOAT",
            Self::Str => "TEXT",
            Self::Path => "PATH",
        }
    }

    /// Parses one command-line word.
    ///
    /// Used for tuple positions, where clap collects plain strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use model_cli::ScalarKind;
    /// use serde_json::json;
    ///
    /// assert_eq!(ScalarKind::Bool.parse_text("yes"), Ok(json!(true)));
    /// assert_eq!(ScalarKind::Int.parse_text("-4"), Ok(json!(-4)));
    /// assert!(ScalarKind::Float.parse_text("inf").is_err());
    /// ```
    pub fn parse_text(self, text: &str) -> Result<Value, String> {
        match self {
            Self::Bool => match text.to_ascii_lowercase().as_str() {
                "1" | "true" | "t" | "yes" | "y" | "on" => Ok(Value::Bool(true)),
                "0" | "false" | "f" | "no" | "n" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("'{text}' is not a valid boolean")),
            },
            Self::Int => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{text}' is not a valid integer")),
            Self::Float => text
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{text}' is not a valid float")),
            Self::Str | Self::Path => Ok(Value::String(text.to_string())),
        }
    }
}

/// Clap value parser producing JSON values for one [`ScalarKind`].
///
/// Delegates to clap's own parsers where one exists, so errors carry
/// clap's usual wording and usage line.
#[derive(Debug, Clone, Copy)]
pub struct ScalarValueParser {
    kind: ScalarKind,
}

impl ScalarValueParser {
    pub fn new(kind: ScalarKind) -> Self {
        Self { kind }
    }
}

impl TypedValueParser for ScalarValueParser {
    type Value = Value;

    fn parse_ref(
        &self,
        cmd: &Command,
        arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        match self.kind {
            ScalarKind::Bool => BoolishValueParser::new()
                .parse_ref(cmd, arg, value)
                .map(Value::Bool),
            ScalarKind::Int => clap::value_parser!(i64)
                .parse_ref(cmd, arg, value)
                .map(Value::from),
            ScalarKind::Str => StringValueParser::new()
                .parse_ref(cmd, arg, value)
                .map(Value::String),
            ScalarKind::Path => PathBufValueParser::new()
                .parse_ref(cmd, arg, value)
                .map(|path| Value::String(path.to_string_lossy().into_owned())),
            ScalarKind::Float => {
                let text = StringValueParser::new().parse_ref(cmd, arg, value)?;
                ScalarKind::Float
                    .parse_text(&text)
                    .map_err(|_| invalid_value(cmd, arg, &text))
            }
        }
    }
}

fn invalid_value(cmd: &Command, arg: Option<&Arg>, text: &str) -> clap::Error {
    let mut err = clap::Error::new(ErrorKind::ValueValidation).with_cmd(cmd);
    if let Some(arg) = arg {
        err.insert(
            ContextKind::InvalidArg,
            ContextValue::String(arg.to_string()),
        );
    }
    err.insert(
        ContextKind::InvalidValue,
        ContextValue::String(text.to_string()),
    );
    err
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(kind: ScalarKind, raw: &str) -> Result<Value, clap::Error> {
        let cmd = Command::new("test");
        let arg = Arg::new("value");
        ScalarValueParser::new(kind).parse_ref(&cmd, Some(&arg), OsStr::new(raw))
    }

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(parse(ScalarKind::Bool, "true").expect("bool"), json!(true));
        assert_eq!(parse(ScalarKind::Int, "42").expect("int"), json!(42));
        assert_eq!(parse(ScalarKind::Float, "2.5").expect("float"), json!(2.5));
        assert_eq!(parse(ScalarKind::Str, "hello").expect("str"), json!("hello"));
        assert_eq!(parse(ScalarKind::Path, "a/b.txt").expect("path"), json!("a/b.txt"));
    }

    #[test]
    fn test_invalid_values_are_usage_errors() {
        let err = parse(ScalarKind::Int, "two").expect_err("not an int");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = parse(ScalarKind::Float, "NaN").expect_err("not finite");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_of_strips_annotations() {
        let ty = TypeExpr::Int.with_cli(model_cli_core::ParamInfo::option());
        assert_eq!(ScalarKind::of(&ty), Some(ScalarKind::Int));
        assert_eq!(ScalarKind::of(&TypeExpr::list(TypeExpr::Int)), None);
    }
}
