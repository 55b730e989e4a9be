//! All errors that can occur in the contagion library.

use std::fmt;

pub type Result<T> = std::result::Result<T, ContagionError>;

#[derive(Clone, Debug, PartialEq)]
pub enum ContagionError {
    /// A malformed line in one of the text inputs. Lines are counted from 1.
    ParseError { line: usize, message: String },
    /// Structural problem that only shows after the whole input was read.
    ValidationError(String),
    LookupError(String),
    ConfigError(String),
    IoError(String),
}

impl ContagionError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        ContagionError::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Line number of a parse error, if this is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ContagionError::ParseError { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl fmt::Display for ContagionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContagionError::ParseError { line, message } => {
                write!(f, "ParseError: {} in line {}", message, line)
            }
            ContagionError::ValidationError(message) => {
                write!(f, "ValidationError: {}", message)
            }
            ContagionError::LookupError(message) => {
                write!(f, "LookupError: {}", message)
            }
            ContagionError::ConfigError(message) => {
                write!(f, "ConfigError: {}", message)
            }
            ContagionError::IoError(message) => {
                write!(f, "IoError: {}", message)
            }
        }
    }
}

impl std::error::Error for ContagionError {}

impl From<std::io::Error> for ContagionError {
    fn from(error: std::io::Error) -> Self {
        ContagionError::IoError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_line() {
        let error = ContagionError::parse(7, "missing colon delimiter");
        assert_eq!(error.line(), Some(7));
        assert_eq!(
            error.to_string(),
            "ParseError: missing colon delimiter in line 7"
        );
    }

    #[test]
    fn other_errors_have_no_line() {
        let error = ContagionError::ValidationError("no default".to_string());
        assert_eq!(error.line(), None);
    }
}
