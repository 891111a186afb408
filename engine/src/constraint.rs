//! Constraint checks applied after a refined type's base validated.

use std::collections::HashMap;
use std::sync::LazyLock;

use model_cli_core::Constraint;
use regex::Regex;
use serde_json::Value;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?P<host>[^/?#\s]+)(?P<rest>[/?#]\S*)?$")
        .expect("static regex must compile")
});

/// Applies one constraint, returning the (possibly normalized) value.
pub(crate) fn apply(
    constraint: &Constraint,
    value: Value,
    patterns: &HashMap<String, Regex>,
) -> Result<Value, String> {
    match constraint {
        Constraint::MultipleOf(step) => {
            let number = as_number(&value)?;
            if *step != 0.0 {
                // Float remainders land near zero or just under the step.
                let remainder = (number % step).abs();
                let tolerance = number.abs() / 1e9;
                if remainder > tolerance && (remainder - step.abs()).abs() > tolerance {
                    return Err(format!("Input should be a multiple of {step}"));
                }
            }
            Ok(value)
        }
        Constraint::Ge(bound) => bounded(value, |n| n >= *bound, || {
            format!("Input should be greater than or equal to {bound}")
        }),
        Constraint::Gt(bound) => bounded(value, |n| n > *bound, || {
            format!("Input should be greater than {bound}")
        }),
        Constraint::Le(bound) => bounded(value, |n| n <= *bound, || {
            format!("Input should be less than or equal to {bound}")
        }),
        Constraint::Lt(bound) => bounded(value, |n| n < *bound, || {
            format!("Input should be less than {bound}")
        }),
        Constraint::MinLength(min) => {
            let (kind, unit, len) = measure(&value)?;
            if len < *min {
                return Err(format!("{kind} should have at least {min} {}", plural(unit, *min)));
            }
            Ok(value)
        }
        Constraint::MaxLength(max) => {
            let (kind, unit, len) = measure(&value)?;
            if len > *max {
                return Err(format!("{kind} should have at most {max} {}", plural(unit, *max)));
            }
            Ok(value)
        }
        Constraint::Pattern(pattern) => {
            let text = value
                .as_str()
                .ok_or_else(|| "Input should be a valid string".to_string())?;
            // Patterns are compiled when the adapter is built.
            let matched = patterns
                .get(pattern)
                .is_some_and(|regex| regex.is_match(text));
            if !matched {
                return Err(format!("String should match pattern '{pattern}'"));
            }
            Ok(value)
        }
        Constraint::Url { schemes } => {
            let text = value
                .as_str()
                .ok_or_else(|| "URL input should be a string or URL".to_string())?;
            normalize_url(text, schemes).map(Value::String)
        }
    }
}

fn as_number(value: &Value) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| "Input should be a valid number".to_string())
}

fn bounded(
    value: Value,
    accept: impl Fn(f64) -> bool,
    message: impl Fn() -> String,
) -> Result<Value, String> {
    if accept(as_number(&value)?) {
        Ok(value)
    } else {
        Err(message())
    }
}

fn measure(value: &Value) -> Result<(&'static str, &'static str, usize), String> {
    match value {
        Value::String(text) => Ok(("String", "character", text.chars().count())),
        Value::Array(items) => Ok(("List", "item", items.len())),
        _ => Err("Input should have a length".to_string()),
    }
}

fn plural(unit: &str, count: usize) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

fn normalize_url(text: &str, schemes: &[String]) -> Result<String, String> {
    let captures = URL_RE
        .captures(text.trim())
        .ok_or_else(|| "Input should be a valid URL, relative URL without a base".to_string())?;
    let scheme = captures["scheme"].to_ascii_lowercase();
    if !schemes.is_empty() && !schemes.iter().any(|allowed| allowed == &scheme) {
        return Err(format!("URL scheme should be {}", quote_list(schemes)));
    }
    let host = captures["host"].to_ascii_lowercase();
    let rest = captures.name("rest").map_or("/", |m| m.as_str());
    let rest = if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    };
    Ok(format!("{scheme}://{host}{rest}"))
}

fn quote_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        _ => quoted.join(""),
    }
}
