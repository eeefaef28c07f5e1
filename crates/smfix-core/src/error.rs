//! Error handling for SMFix
//!
//! Provides the error taxonomy shared by the G-code model and the passes:
//! - G-Code errors (token/block parsing, address conversion, tool lookup)
//! - the idempotence guard
//! - I/O errors surfaced while ingesting or writing files
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// G-Code error type
///
/// Represents errors related to G-Code parsing, address conversion and
/// parameter lookup. Most of these are recovered locally by the passes;
/// only ingestion failures abort a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GcodeError {
    /// Blank line or empty token
    #[error("Empty input")]
    EmptyInput,

    /// Word letter outside `A`..=`Z`
    #[error("Invalid word {0:?}: expected an uppercase letter A-Z")]
    InvalidWord(char),

    /// Address is not a valid number
    #[error("Invalid syntax in address '{0}'")]
    ValueSyntax(String),

    /// Address is numeric but does not fit the requested integer type
    #[error("Value out of range in address '{0}'")]
    IntegerRange(String),

    /// Requested parameter is not present on the block
    #[error("Missing parameter '{0}'")]
    MissingParameter(char),

    /// Tool number lookup is not defined for this command
    #[error("Command '{0}' does not address a tool")]
    UnsupportedCommand(String),

    /// Input already carries the post-processing marker
    #[error("File has already been processed")]
    AlreadyProcessed,
}

/// Main error type for SMFix
#[derive(Error, Debug)]
pub enum Error {
    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is the idempotence guard firing
    pub fn is_already_processed(&self) -> bool {
        matches!(self, Error::Gcode(GcodeError::AlreadyProcessed))
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcode_error_display() {
        assert_eq!(GcodeError::EmptyInput.to_string(), "Empty input");
        assert_eq!(
            GcodeError::InvalidWord('g').to_string(),
            "Invalid word 'g': expected an uppercase letter A-Z"
        );
        assert_eq!(
            GcodeError::MissingParameter('T').to_string(),
            "Missing parameter 'T'"
        );
        assert_eq!(
            GcodeError::AlreadyProcessed.to_string(),
            "File has already been processed"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = GcodeError::AlreadyProcessed.into();
        assert!(err.is_already_processed());
        assert!(err.is_gcode_error());

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_gcode_error());
    }
}
