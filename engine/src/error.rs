//! Error types for the validation engine.

use thiserror::Error;

/// A type the engine cannot build a validator for.
///
/// Callers that merely probe the engine treat this as "skip", not as a
/// failure.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The type has no validation rules, e.g. the execution context.
    #[error("type not understood: {0}")]
    NotUnderstood(String),

    /// A pattern constraint that does not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One failed check, located by the path of fields/indices it occurred at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub loc: Vec<String>,
    pub msg: String,
}

/// One or more failed checks from a single validation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_details(.errors))]
pub struct ValidationErrors {
    errors: Vec<ErrorDetail>,
}

impl ValidationErrors {
    /// A single error at the root location.
    pub fn single(msg: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorDetail {
                loc: Vec::new(),
                msg: msg.into(),
            }],
        }
    }

    pub(crate) fn from_details(errors: Vec<ErrorDetail>) -> Self {
        Self { errors }
    }

    /// Prefixes every location with `segment`.
    pub fn at(mut self, segment: impl Into<String>) -> Self {
        let segment = segment.into();
        for error in &mut self.errors {
            error.loc.insert(0, segment.clone());
        }
        self
    }

    pub(crate) fn into_details(self) -> Vec<ErrorDetail> {
        self.errors
    }

    /// Message of the first reported error.
    pub fn first_message(&self) -> &str {
        self.errors
            .first()
            .map(|error| error.msg.as_str())
            .unwrap_or("validation failed")
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorDetail> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn render_details(errors: &[ErrorDetail]) -> String {
    let plural = if errors.len() == 1 { "" } else { "s" };
    let mut rendered = format!("{} validation error{plural}", errors.len());
    for error in errors {
        if error.loc.is_empty() {
            rendered.push_str(&format!("\n  {}", error.msg));
        } else {
            rendered.push_str(&format!("\n{}\n  {}", error.loc.join("."), error.msg));
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_prefixes_locations() {
        let errors = ValidationErrors::single("Field required").at("zip").at("address");
        let detail = errors.iter().next().expect("one error");
        assert_eq!(detail.loc, vec!["address".to_string(), "zip".to_string()]);
        assert_eq!(errors.first_message(), "Field required");
    }

    #[test]
    fn test_display_lists_every_error() {
        let errors = ValidationErrors::from_details(vec![
            ErrorDetail {
                loc: vec!["0".into()],
                msg: "Input should be a valid integer".into(),
            },
            ErrorDetail {
                loc: vec!["1".into()],
                msg: "Input should be a valid integer".into(),
            },
        ]);
        let rendered = errors.to_string();
        assert!(rendered.starts_with("2 validation errors"));
        assert!(rendered.contains("\n1\n  Input should be a valid integer"));
    }
}
