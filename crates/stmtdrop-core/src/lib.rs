//! stmtdrop Core Library
//!
//! This crate provides the domain models, PDF validation rules, configuration and
//! error types shared by the API client, the upload worker and the drop pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{Credentials, DropConfig};
pub use error::{BatchValidationError, FileValidationError, ValidationCode};
pub use models::{
    FileSource, Project, Toast, ToastStatus, ToastUpdate, UploadFile, UploadStatementsResponse,
    PDF_MIME,
};
pub use validation::{PdfValidator, ValidationProfile};
