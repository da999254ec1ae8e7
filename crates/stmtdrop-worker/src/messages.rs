//! Message contract between the drop handler and the upload worker.
//!
//! The handler never shares memory with a running job: it sends [`WorkerCommand`]s
//! and receives [`WorkerEvent`]s. Events serialize to the `{type, payload}` shape
//! used on the wire between the page and its worker.

use serde::Serialize;

use stmtdrop_core::{ToastStatus, UploadFile};

/// Everything a job needs to upload one statement.
#[derive(Debug, Clone)]
pub struct StartUpload {
    pub file: UploadFile,
    pub project_id: String,
    pub organization_id: String,
    pub api_key: String,
    pub base_url: String,
    /// Toast that tracks this upload; every event for the job carries it.
    pub toast_id: String,
}

/// Handler → worker.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    StartUpload(Box<StartUpload>),
    /// Cancel the most recently started job.
    CancelUpload,
}

/// Worker → handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerEvent {
    #[serde(rename_all = "camelCase")]
    UploadProgress {
        toast_id: String,
        status: ToastStatus,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    StatusUpdate {
        toast_id: String,
        status: ToastStatus,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    UploadError { toast_id: String, error: String },
}

impl WorkerEvent {
    pub fn toast_id(&self) -> &str {
        match self {
            WorkerEvent::UploadProgress { toast_id, .. }
            | WorkerEvent::StatusUpdate { toast_id, .. }
            | WorkerEvent::UploadError { toast_id, .. } => toast_id,
        }
    }
}
