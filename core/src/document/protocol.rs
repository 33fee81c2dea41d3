//! Document protocol parser trait
//!
//! Abstraction over task document formats. `StandardDocumentParser` handles
//! the `## STAGE ##` / `## TASK ##` markup; the trait keeps the `plan` and
//! `run` commands independent of it.

use crate::document::types::Stage;
use crate::error::{ErrorCode, ParseError};

/// Implementations must be thread-safe (Send + Sync).
pub trait DocumentProtocolParser: Send + Sync {
    /// Returns the parser name (e.g., "standard")
    fn name(&self) -> &str;

    /// Parses a document (inclusions are resolved first) into stages.
    fn parse_stages(&self, input: &str) -> Result<Vec<Stage>, ParseError>;

    /// Validates the document without executing anything.
    ///
    /// Returns fatal errors and style warnings for the dry-run report.
    fn validate_format(&self, input: &str) -> FormatValidation;

    /// Returns a format identifier for auto-detection
    fn format_identifier(&self) -> &str;
}

/// Format validation result
///
/// Contains both hard errors (prevents parsing) and soft warnings (style issues).
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    pub is_valid: bool,
    pub warnings: Vec<FormatWarning>,
    pub errors: Vec<FormatError>,
}

impl FormatValidation {
    pub fn with_errors(errors: Vec<FormatError>) -> Self {
        Self {
            is_valid: false,
            warnings: vec![],
            errors,
        }
    }

    pub fn valid() -> Self {
        Self {
            is_valid: true,
            warnings: vec![],
            errors: vec![],
        }
    }

    pub fn with_warnings(warnings: Vec<FormatWarning>) -> Self {
        Self {
            is_valid: true,
            warnings,
            errors: vec![],
        }
    }
}

/// Format warning (non-fatal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatWarning {
    /// Stage the warning refers to, if any
    pub stage: Option<usize>,
    pub message: String,
    pub suggestion: Option<String>,
}

impl FormatWarning {
    pub fn new(stage: Option<usize>, message: String, suggestion: Option<String>) -> Self {
        Self {
            stage,
            message,
            suggestion,
        }
    }
}

/// Format error (fatal, prevents parsing)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    pub code: u16,
    pub message: String,
}

impl FormatError {
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code: code.as_u16(),
            message,
        }
    }

    pub fn parse_error(message: String) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    pub fn from_parse_error(err: &ParseError) -> Self {
        Self::new(err.error_code(), err.to_string())
    }
}
