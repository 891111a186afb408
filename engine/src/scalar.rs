//! Scalar conversions shared by both validation entry points.
//!
//! Lax conversions parse strings with the text rules below; strict
//! conversions accept only a value of exactly the target JSON kind and are
//! used for the first pass of smart union matching.

use serde_json::{Number, Value};

const BOOL_ERROR: &str = "Input should be a valid boolean, unable to interpret input";
const INT_PARSE_ERROR: &str = "Input should be a valid integer, unable to parse string as an integer";
const INT_FRACTION_ERROR: &str = "Input should be a valid integer, got a number with a fractional part";
const FLOAT_PARSE_ERROR: &str = "Input should be a valid number, unable to parse string as a number";

pub(crate) fn to_bool(raw: &Value, strict: bool) -> Result<Value, String> {
    match raw {
        Value::Bool(_) => Ok(raw.clone()),
        _ if strict => Err("Input should be a valid boolean".to_string()),
        Value::String(text) => parse_bool(text).map(Value::Bool),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(BOOL_ERROR.to_string()),
        },
        _ => Err("Input should be a valid boolean".to_string()),
    }
}

pub(crate) fn to_int(raw: &Value, strict: bool) -> Result<Value, String> {
    match raw {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Ok(Value::from(int));
            }
            if strict {
                return Err("Input should be a valid integer".to_string());
            }
            number
                .as_f64()
                .ok_or_else(|| "Input should be a valid integer".to_string())
                .and_then(float_to_int)
        }
        _ if strict => Err("Input should be a valid integer".to_string()),
        Value::String(text) => parse_int(text),
        Value::Bool(flag) => Ok(Value::from(i64::from(*flag))),
        _ => Err("Input should be a valid integer".to_string()),
    }
}

pub(crate) fn to_float(raw: &Value, strict: bool) -> Result<Value, String> {
    let parsed = match raw {
        Value::Number(number) if strict && !number.is_f64() => {
            return Err("Input should be a valid number".to_string());
        }
        Value::Number(number) => number.as_f64(),
        _ if strict => None,
        Value::String(text) => Some(
            text.trim()
                .parse::<f64>()
                .map_err(|_| FLOAT_PARSE_ERROR.to_string())?,
        ),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };
    let float = parsed.ok_or_else(|| "Input should be a valid number".to_string())?;
    Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(|| "Input should be a finite number".to_string())
}

pub(crate) fn to_str(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::String(_) => Ok(raw.clone()),
        _ => Err("Input should be a valid string".to_string()),
    }
}

fn parse_bool(text: &str) -> Result<bool, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(BOOL_ERROR.to_string()),
    }
}

fn parse_int(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(Value::from(int));
    }
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() => float_to_int(float),
        _ => Err(INT_PARSE_ERROR.to_string()),
    }
}

fn float_to_int(float: f64) -> Result<Value, String> {
    if float.fract() != 0.0 {
        return Err(INT_FRACTION_ERROR.to_string());
    }
    // i64::MAX rounds up to 2^63 as a float, which is already out of range.
    if float < i64::MIN as f64 || float >= i64::MAX as f64 {
        return Err(INT_PARSE_ERROR.to_string());
    }
    Ok(Value::from(float as i64))
}
