//! Validation modules

pub mod pdf;

pub use pdf::{
    EncryptionMarkers, PdfValidator, ValidationProfile, BATCH_MAX_FILES, BATCH_MAX_FILE_SIZE,
    DROP_MAX_FILE_SIZE,
};
