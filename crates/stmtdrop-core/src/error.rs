//! Error types module
//!
//! Validation failures are never fatal: every variant here ends up as a visible,
//! dismissible notification. Network errors live in the API client crate.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Machine-readable reason a file was rejected before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    InvalidType,
    TooLarge,
    MultipleFiles,
    PasswordProtected,
    InvalidPdf,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::InvalidType => "INVALID_TYPE",
            ValidationCode::TooLarge => "TOO_LARGE",
            ValidationCode::MultipleFiles => "MULTIPLE_FILES",
            ValidationCode::PasswordProtected => "PASSWORD_PROTECTED",
            ValidationCode::InvalidPdf => "INVALID_PDF",
        }
    }
}

impl Display for ValidationCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A single-file validation failure: code plus the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FileValidationError {
    pub code: ValidationCode,
    pub message: String,
}

impl FileValidationError {
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_type() -> Self {
        Self::new(ValidationCode::InvalidType, "Only PDF files are allowed")
    }

    pub fn too_large(max_mb: u64) -> Self {
        Self::new(
            ValidationCode::TooLarge,
            format!("File size must be less than {}MB", max_mb),
        )
    }

    pub fn multiple_files() -> Self {
        Self::new(
            ValidationCode::MultipleFiles,
            "Only one file at a time is allowed",
        )
    }

    pub fn no_file() -> Self {
        Self::new(ValidationCode::InvalidPdf, "No file selected")
    }

    pub fn password_protected() -> Self {
        Self::new(
            ValidationCode::PasswordProtected,
            "Password-protected PDFs are not allowed",
        )
    }
}

/// Rejection of a whole batch on the multi-file upload path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchValidationError {
    #[error("You must select at least one file")]
    NoFiles,

    #[error("A maximum of {max} files is allowed")]
    TooManyFiles { max: usize },

    /// One line per rejected file, already prefixed with the file name.
    #[error("{}", .0.join("\n"))]
    Rejected(Vec<String>),
}

impl BatchValidationError {
    pub fn code(&self) -> ValidationCode {
        match self {
            BatchValidationError::NoFiles => ValidationCode::InvalidPdf,
            BatchValidationError::TooManyFiles { .. } => ValidationCode::MultipleFiles,
            BatchValidationError::Rejected(_) => ValidationCode::InvalidPdf,
        }
    }
}
