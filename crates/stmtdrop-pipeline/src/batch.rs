//! In-page "add file" uploads: several statements at once into a known project.
//!
//! Unlike the global drop path there is no worker and no dialog; the batch is
//! validated with the batch profile and posted as one multipart request. Progress is
//! shown as a single toast that settles to a summary message.

use stmtdrop_api_client::{ApiClient, ApiError};
use stmtdrop_core::{
    BatchValidationError, PdfValidator, ToastStatus, ToastUpdate, UploadFile,
    UploadStatementsResponse, ValidationProfile,
};

use crate::toast_store::ToastStore;

/// Names listed in the pending label before collapsing into "+N more".
pub const PREVIEW_LIMIT: usize = 4;

const UPLOAD_FAILED_FALLBACK: &str = "Failed to upload files";

#[derive(Debug, thiserror::Error)]
pub enum BatchUploadError {
    #[error(transparent)]
    Validation(#[from] BatchValidationError),
    #[error("{}", api_error_message(.0))]
    Api(#[from] ApiError),
}

/// Server-provided `detail`/`message` for rejected requests, or a generic message.
fn api_error_message(error: &ApiError) -> String {
    match error {
        ApiError::Status { .. } => error
            .server_detail()
            .unwrap_or_else(|| UPLOAD_FAILED_FALLBACK.to_string()),
        other => other.to_string(),
    }
}

pub struct BatchUploader {
    client: ApiClient,
    project_id: String,
    validator: PdfValidator,
}

impl BatchUploader {
    pub fn new(client: ApiClient, project_id: impl Into<String>) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            validator: PdfValidator::new(ValidationProfile::BATCH),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Validate every file, then post them all in one request.
    #[tracing::instrument(
        skip(self, files),
        fields(project_id = %self.project_id, file_count = files.len())
    )]
    pub async fn upload(
        &self,
        files: &[UploadFile],
    ) -> Result<UploadStatementsResponse, BatchUploadError> {
        self.validator.validate_batch(files).await?;
        let response = self.client.upload_statements(&self.project_id, files).await?;
        tracing::info!(status = %response.status, "Batch uploaded");
        Ok(response)
    }

    /// [`upload`](Self::upload) with a pending toast that settles to the outcome.
    pub async fn upload_with_toast(
        &self,
        store: &ToastStore,
        files: &[UploadFile],
    ) -> Result<UploadStatementsResponse, BatchUploadError> {
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        let toast_id = store.add_toast(pending_label(&names), ToastStatus::Pending, None);

        let result = self.upload(files).await;
        let update = match &result {
            Ok(response) => ToastUpdate::status(ToastStatus::Completed, success_message(response)),
            Err(e) => {
                tracing::warn!(error = %e, "Batch upload failed");
                ToastUpdate::status(ToastStatus::Failed, rejection_message(e))
            }
        };
        store.update_toast(&toast_id, update);
        store.auto_remove_toast(&toast_id);
        result
    }
}

pub fn success_message(response: &UploadStatementsResponse) -> String {
    if let Some(message) = response.message.as_deref().filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    if response.status == "success" {
        "Files uploaded successfully".to_string()
    } else {
        "Upload finished with warnings".to_string()
    }
}

/// Multi-line failures become a bulleted list.
pub fn rejection_message(error: &BatchUploadError) -> String {
    let message = error.to_string();
    let lines: Vec<&str> = message.lines().collect();
    if lines.len() > 1 {
        let items: Vec<&str> = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
        return format!("Some files were rejected:\n- {}", items.join("\n- "));
    }
    match lines.first() {
        Some(line) if !line.is_empty() => line.to_string(),
        _ => "Upload failed".to_string(),
    }
}

pub fn pending_label(names: &[&str]) -> String {
    let count = names.len();
    let mut label = format!("Uploading {} file{}...", count, if count > 1 { "s" } else { "" });
    if count == 0 {
        return label;
    }

    let shown = &names[..count.min(PREVIEW_LIMIT)];
    label.push(' ');
    label.push_str(&shown.join(", "));
    if count > shown.len() {
        label.push_str(&format!(" +{} more", count - shown.len()));
    }
    label
}
