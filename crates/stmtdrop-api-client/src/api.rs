//! Domain methods for the ingestion API client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use stmtdrop_core::{Project, UploadFile, UploadStatementsResponse};

use crate::{ApiClient, ApiError, ApiResult};

/// Multipart field the ingestion endpoint reads statements from.
pub const STATEMENT_FIELD: &str = "files";

pub fn statements_path(project_id: &str) -> String {
    format!("/projects/{}/statements", project_id)
}

/// Source of the organization's project list.
#[async_trait]
pub trait ProjectProvider: Send + Sync {
    async fn projects(&self) -> ApiResult<Vec<Project>>;
}

impl ApiClient {
    /// List the projects of the client's organization.
    pub async fn list_projects(&self) -> ApiResult<Vec<Project>> {
        self.get("/projects").await
    }

    /// Upload one statement into a project.
    pub async fn upload_statement(
        &self,
        project_id: &str,
        file: &UploadFile,
    ) -> ApiResult<UploadStatementsResponse> {
        self.upload_statements(project_id, std::slice::from_ref(file))
            .await
    }

    /// Upload several statements in a single request, one `files` part each.
    pub async fn upload_statements(
        &self,
        project_id: &str,
        files: &[UploadFile],
    ) -> ApiResult<UploadStatementsResponse> {
        let mut form = Form::new();
        for file in files {
            form = form.part(STATEMENT_FIELD, statement_part(file).await?);
        }

        tracing::debug!(
            project_id = %project_id,
            file_count = files.len(),
            "Uploading statements"
        );

        self.post_multipart(&statements_path(project_id), form).await
    }
}

async fn statement_part(file: &UploadFile) -> ApiResult<Part> {
    let data = file.read_all().await.map_err(|source| ApiError::ReadFile {
        name: file.name.clone(),
        source,
    })?;

    Part::bytes(Vec::<u8>::from(data))
        .file_name(file.name.clone())
        .mime_str(&file.content_type)
        .map_err(|source| ApiError::InvalidPart {
            name: file.name.clone(),
            source,
        })
}

#[async_trait]
impl ProjectProvider for ApiClient {
    /// A rejected list request is treated as "no projects" so the page still renders.
    async fn projects(&self) -> ApiResult<Vec<Project>> {
        match self.list_projects().await {
            Ok(projects) => Ok(projects),
            Err(e @ ApiError::Status { .. }) => {
                tracing::warn!(error = %e, "Project list request rejected, using empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
