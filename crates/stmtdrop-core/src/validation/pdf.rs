//! PDF statement validation.
//!
//! Two entry points upload statements and each keeps its own limits: the global
//! drop handler accepts a single file of up to 5MB, the in-page "add file" button
//! accepts batches of up to 12 files of 10MB each. Both reject non-PDF types and
//! run a heuristic scan of the file head for encryption dictionaries. The scan does
//! not parse the PDF, so an encrypted file whose trailer sits past the scanned
//! prefix is accepted.

use regex::bytes::Regex;
use std::sync::LazyLock;

use crate::error::{BatchValidationError, FileValidationError};
use crate::models::{UploadFile, PDF_MIME};

const BYTES_IN_KB: u64 = 1024;
const BYTES_IN_MB: u64 = BYTES_IN_KB * BYTES_IN_KB;

pub const DROP_MAX_FILE_SIZE: u64 = 5 * BYTES_IN_MB;
pub const BATCH_MAX_FILE_SIZE: u64 = 10 * BYTES_IN_MB;
pub const BATCH_MAX_FILES: usize = 12;

const DROP_SCAN_BYTES: usize = 1024;
const BATCH_SCAN_BYTES: usize = 256 * 1024;

const DICTIONARY_MARKERS: [&[u8]; 4] = [b"/Encrypt", b"/Filter/Standard", b"/U ", b"/O "];

static ENCRYPT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Encrypt(?-u:\b)").expect("static regex"));

/// Which byte patterns count as evidence of encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMarkers {
    /// Any of `/Encrypt`, `/Filter/Standard`, `/U `, `/O `.
    DictionaryKeys,
    /// `/Encrypt` as a whole keyword.
    EncryptKeyword,
}

impl EncryptionMarkers {
    pub fn matches(&self, head: &[u8]) -> bool {
        match self {
            EncryptionMarkers::DictionaryKeys => DICTIONARY_MARKERS
                .iter()
                .any(|marker| head.windows(marker.len()).any(|w| w == *marker)),
            EncryptionMarkers::EncryptKeyword => ENCRYPT_KEYWORD.is_match(head),
        }
    }
}

/// Limits applied by one upload entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationProfile {
    pub max_file_size: u64,
    pub max_files: usize,
    pub scan_bytes: usize,
    pub markers: EncryptionMarkers,
}

impl ValidationProfile {
    /// Global drag-and-drop: one file, 5MB, 1KB head scan.
    pub const GLOBAL_DROP: ValidationProfile = ValidationProfile {
        max_file_size: DROP_MAX_FILE_SIZE,
        max_files: 1,
        scan_bytes: DROP_SCAN_BYTES,
        markers: EncryptionMarkers::DictionaryKeys,
    };

    /// In-page batch upload: up to 12 files, 10MB each, 256KB head scan.
    pub const BATCH: ValidationProfile = ValidationProfile {
        max_file_size: BATCH_MAX_FILE_SIZE,
        max_files: BATCH_MAX_FILES,
        scan_bytes: BATCH_SCAN_BYTES,
        markers: EncryptionMarkers::EncryptKeyword,
    };

    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / BYTES_IN_MB
    }
}

/// PDF file validator for one entry point.
#[derive(Debug, Clone, Copy)]
pub struct PdfValidator {
    profile: ValidationProfile,
}

impl PdfValidator {
    pub fn new(profile: ValidationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ValidationProfile {
        &self.profile
    }

    /// Type and size checks; no I/O.
    pub fn check_basic(&self, file: &UploadFile) -> Result<(), FileValidationError> {
        if file.content_type != PDF_MIME {
            return Err(FileValidationError::invalid_type());
        }

        if file.size > self.profile.max_file_size {
            return Err(FileValidationError::too_large(self.profile.max_file_size_mb()));
        }

        Ok(())
    }

    /// Scan the file head for encryption markers.
    pub async fn is_password_protected(&self, file: &UploadFile) -> std::io::Result<bool> {
        if file.content_type != PDF_MIME {
            return Ok(false);
        }
        let head = file.read_head(self.profile.scan_bytes).await?;
        Ok(self.profile.markers.matches(&head))
    }

    /// Full single-file validation: type, size, then the encryption scan.
    ///
    /// A file whose head cannot be read is treated as possibly protected.
    pub async fn validate_file(&self, file: &UploadFile) -> Result<(), FileValidationError> {
        self.check_basic(file)?;

        match self.is_password_protected(file).await {
            Ok(true) => Err(FileValidationError::password_protected()),
            Ok(false) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    file = %file.name,
                    error = %e,
                    "Could not read file for PDF validation, assuming protected"
                );
                Err(FileValidationError::password_protected())
            }
        }
    }

    /// Validate a drop. The count check runs before any file is inspected.
    pub async fn validate_drop<'a>(
        &self,
        files: &'a [UploadFile],
    ) -> Result<&'a UploadFile, FileValidationError> {
        if files.len() > self.profile.max_files {
            return Err(FileValidationError::multiple_files());
        }
        let file = files.first().ok_or_else(FileValidationError::no_file)?;
        self.validate_file(file).await?;
        Ok(file)
    }

    /// Validate a batch, collecting one message per rejected file.
    pub async fn validate_batch(&self, files: &[UploadFile]) -> Result<(), BatchValidationError> {
        if files.is_empty() {
            return Err(BatchValidationError::NoFiles);
        }
        if files.len() > self.profile.max_files {
            return Err(BatchValidationError::TooManyFiles {
                max: self.profile.max_files,
            });
        }

        let mut errors = Vec::new();
        for file in files {
            if file.content_type != PDF_MIME {
                errors.push(format!("{}: only PDF files are allowed", file.name));
                continue;
            }
            if file.size > self.profile.max_file_size {
                errors.push(format!(
                    "{}: exceeds {}MB ({:.2}MB)",
                    file.name,
                    self.profile.max_file_size_mb(),
                    file.size as f64 / BYTES_IN_MB as f64
                ));
                continue;
            }
            match self.is_password_protected(file).await {
                Ok(true) => errors.push(format!("{}: the PDF is password protected", file.name)),
                Ok(false) => {}
                Err(e) => errors.push(format!("{}: could not be read ({})", file.name, e)),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BatchValidationError::Rejected(errors))
        }
    }
}
