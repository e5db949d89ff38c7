//! Field level validation errors.
//!
//! Validation never stops at the first problem: every check contributes to a
//! [`FieldErrors`] collection so the user sees everything wrong with a command
//! line at once.

use std::fmt;

/// A single validation failure attached to one or more field paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Human readable message
    pub message: String,

    /// Field paths (flag names or resource paths) the message applies to
    pub paths: Vec<String>,

    /// Optional extra detail printed on its own line
    pub details: Option<String>,
}

impl FieldError {
    /// A required field is missing.
    pub fn missing_field(path: impl Into<String>) -> Self {
        Self {
            message: "missing field(s)".to_string(),
            paths: vec![path.into()],
            details: None,
        }
    }

    /// A field holds a value that could not be accepted.
    pub fn invalid_value(value: impl fmt::Display, path: impl Into<String>) -> Self {
        Self {
            message: format!("invalid value: {value}"),
            paths: vec![path.into()],
            details: None,
        }
    }

    /// An element of a repeatable field could not be accepted.
    pub fn invalid_array_value(value: impl fmt::Display, field: &str, index: usize) -> Self {
        Self::invalid_value(value, format!("{field}[{index}]"))
    }

    /// A field holds a value outside of an enumeration.
    pub fn enum_invalid_value(value: impl fmt::Display, path: impl Into<String>, allowed: &[&str]) -> Self {
        Self {
            details: Some(format!("expected one of: {}", allowed.join(", "))),
            ..Self::invalid_value(value, path)
        }
    }

    /// More than one of a set of mutually exclusive fields is set.
    pub fn multiple_one_of<S: AsRef<str>>(paths: &[S]) -> Self {
        Self {
            message: "expected exactly one, got both".to_string(),
            paths: paths.iter().map(|p| p.as_ref().to_string()).collect(),
            details: None,
        }
    }

    /// None of a set of mutually exclusive fields is set.
    pub fn missing_one_of<S: AsRef<str>>(paths: &[S]) -> Self {
        Self {
            message: "expected exactly one, got neither".to_string(),
            paths: paths.iter().map(|p| p.as_ref().to_string()).collect(),
            details: None,
        }
    }

    /// Free form message for a field.
    pub fn generic(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            paths: vec![path.into()],
            details: None,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.paths.is_empty() {
            write!(f, "{}", self.message)?;
        } else {
            write!(f, "{}: {}", self.message, self.paths.join(", "))?;
        }
        if let Some(details) = &self.details {
            write!(f, "\n{details}")?;
        }
        Ok(())
    }
}

/// An ordered collection of [`FieldError`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every error from `other`, returning the combined collection.
    #[must_use]
    pub fn also(mut self, other: impl Into<FieldErrors>) -> Self {
        self.0.extend(other.into().0);
        self
    }

    /// Append a single error in place.
    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    /// `true` when no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate the recorded errors.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Convert into a `Result`, failing when any error was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<FieldError> for FieldErrors {
    fn from(err: FieldError) -> Self {
        Self(vec![err])
    }
}

impl From<Vec<FieldError>> for FieldErrors {
    fn from(errs: Vec<FieldError>) -> Self {
        Self(errs)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_array_value_message() {
        let err = FieldError::invalid_array_value("FOO", "--env", 0);
        assert_eq!(err.to_string(), "invalid value: FOO: --env[0]");
    }

    #[test]
    fn test_enum_invalid_value_has_details() {
        let err = FieldError::enum_invalid_value("myFormat", "--output", &["json", "yaml", "yml"]);
        assert_eq!(
            err.to_string(),
            "invalid value: myFormat: --output\nexpected one of: json, yaml, yml"
        );
    }

    #[test]
    fn test_field_errors_accumulate() {
        let errs = FieldErrors::new()
            .also(FieldError::missing_field("--namespace"))
            .also(FieldErrors::new())
            .also(FieldError::multiple_one_of(&["--image", "--git-repo"]));

        assert_eq!(errs.len(), 2);
        assert_eq!(
            errs.to_string(),
            "missing field(s): --namespace\nexpected exactly one, got both: --image, --git-repo"
        );
        assert!(errs.into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
