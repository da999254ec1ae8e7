//! Upload worker: one long-lived tokio task per drop handler.
//!
//! The worker receives [`WorkerCommand`]s, runs each upload as its own job and
//! reports progress as [`WorkerEvent`]s. A job moves through
//! idle → preparing → uploading → processing → {completed | failed} and emits its
//! events in that order. Cancellation is cooperative through a
//! [`CancellationToken`]: the token is checked before every emitted event and is
//! raced against the in-flight request, so a cancelled job aborts its request and
//! goes silent.
//!
//! Shutdown: dropping the [`UploadWorker`] handle (or calling
//! [`UploadWorker::terminate`]) stops the task and aborts any running jobs.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use stmtdrop_api_client::{ApiClient, ApiError};
use stmtdrop_core::{DropConfig, ToastStatus};

use crate::messages::{StartUpload, WorkerCommand, WorkerEvent};

pub const PREPARING_MESSAGE: &str = "Preparing upload...";
pub const PROCESSING_MESSAGE: &str = "Processing document...";
pub const COMPLETED_MESSAGE: &str = "Document uploaded successfully!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub api_prefix: String,
    /// Stand-in for a real ingestion-finished signal: how long after the statement is
    /// accepted the job reports completion.
    pub completion_delay: Duration,
    pub http_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/py-api".to_string(),
            completion_delay: Duration::from_millis(2000),
            http_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&DropConfig> for WorkerConfig {
    fn from(config: &DropConfig) -> Self {
        Self {
            api_prefix: config.api_prefix.clone(),
            completion_delay: config.completion_delay,
            http_timeout: config.http_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Preparing,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl Display for UploadState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadState::Idle => write!(f, "idle"),
            UploadState::Preparing => write!(f, "preparing"),
            UploadState::Uploading => write!(f, "uploading"),
            UploadState::Processing => write!(f, "processing"),
            UploadState::Completed => write!(f, "completed"),
            UploadState::Failed => write!(f, "failed"),
        }
    }
}

/// The worker task has exited and no longer accepts commands.
#[derive(Debug, thiserror::Error)]
#[error("upload worker is not running")]
pub struct WorkerClosed;

/// Handle to a running upload worker.
pub struct UploadWorker {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    task: JoinHandle<()>,
}

impl UploadWorker {
    /// Spawn the worker. Returns the handle and the receiving end of its event channel.
    pub fn spawn(config: WorkerConfig) -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(Self::run(config, commands_rx, events_tx));

        (
            Self {
                commands: commands_tx,
                task,
            },
            events_rx,
        )
    }

    pub fn start_upload(&self, request: StartUpload) -> Result<(), WorkerClosed> {
        self.send(WorkerCommand::StartUpload(Box::new(request)))
    }

    pub fn cancel_upload(&self) -> Result<(), WorkerClosed> {
        self.send(WorkerCommand::CancelUpload)
    }

    pub fn send(&self, command: WorkerCommand) -> Result<(), WorkerClosed> {
        self.commands.send(command).map_err(|_| WorkerClosed)
    }

    /// Stop the worker immediately, aborting running jobs.
    pub fn terminate(self) {
        drop(self);
    }

    async fn run(
        config: WorkerConfig,
        mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) {
        tracing::debug!(
            completion_delay_ms = config.completion_delay.as_millis() as u64,
            "Upload worker started"
        );

        let mut jobs = JoinSet::new();
        let mut current: Option<CancellationToken> = None;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(WorkerCommand::StartUpload(request)) => {
                        let cancel = CancellationToken::new();
                        current = Some(cancel.clone());
                        let job = UploadJob {
                            request: *request,
                            config: config.clone(),
                            cancel,
                            events: events.clone(),
                            state: UploadState::Idle,
                        };
                        jobs.spawn(job.run());
                    }
                    Some(WorkerCommand::CancelUpload) => {
                        if let Some(cancel) = current.take() {
                            tracing::info!("Cancelling current upload");
                            cancel.cancel();
                        }
                    }
                    None => break,
                },
                Some(joined) = jobs.join_next(), if !jobs.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Upload job panicked");
                        }
                    }
                }
            }
        }

        tracing::debug!(running_jobs = jobs.len(), "Upload worker stopped");
        jobs.abort_all();
    }
}

impl Drop for UploadWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Render an upload failure the way the handler shows it to the user.
pub fn upload_error_message(error: &ApiError) -> String {
    format!("Upload failed: {}", error)
}

struct UploadJob {
    request: StartUpload,
    config: WorkerConfig,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<WorkerEvent>,
    state: UploadState,
}

impl UploadJob {
    fn transition(&mut self, next: UploadState) {
        tracing::debug!(from = %self.state, to = %next, "Upload state change");
        self.state = next;
    }

    /// Emit unless the job was cancelled. Returns false when the job should stop.
    fn emit(&self, event: WorkerEvent) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!("Upload cancelled, suppressing event");
            return false;
        }
        if self.events.send(event).is_err() {
            tracing::trace!("Event receiver dropped");
        }
        true
    }

    fn progress(&self, status: ToastStatus, message: &str) -> WorkerEvent {
        WorkerEvent::UploadProgress {
            toast_id: self.request.toast_id.clone(),
            status,
            message: message.to_string(),
        }
    }

    fn fail(&mut self, error: String) {
        self.transition(UploadState::Failed);
        tracing::warn!(error = %error, "Upload failed");
        self.emit(WorkerEvent::UploadError {
            toast_id: self.request.toast_id.clone(),
            error,
        });
    }

    #[tracing::instrument(
        skip(self),
        fields(
            toast_id = %self.request.toast_id,
            project_id = %self.request.project_id,
            file = %self.request.file.name,
        )
    )]
    async fn run(mut self) {
        self.transition(UploadState::Preparing);
        if !self.emit(self.progress(ToastStatus::Pending, PREPARING_MESSAGE)) {
            return;
        }

        let client = match ApiClient::with_timeout(
            self.request.base_url.clone(),
            self.request.api_key.clone(),
            self.request.organization_id.clone(),
            self.config.http_timeout,
        ) {
            Ok(client) => client.with_prefix(self.config.api_prefix.clone()),
            Err(e) => {
                self.fail(upload_error_message(&e));
                return;
            }
        };

        self.transition(UploadState::Uploading);
        let result = tokio::select! {
            _ = self.cancel.cancelled() => {
                tracing::info!("Upload cancelled while request in flight");
                return;
            }
            result = client.upload_statement(
                &self.request.project_id,
                &self.request.file,
            ) => result,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                if self.cancel.is_cancelled() {
                    return;
                }
                self.fail(upload_error_message(&e));
                return;
            }
        };

        tracing::info!(status = %response.status, "Statement accepted for processing");
        self.transition(UploadState::Processing);
        if !self.emit(self.progress(ToastStatus::Processing, PROCESSING_MESSAGE)) {
            return;
        }

        tokio::select! {
            _ = self.cancel.cancelled() => return,
            _ = tokio::time::sleep(self.config.completion_delay) => {}
        }

        self.transition(UploadState::Completed);
        self.emit(WorkerEvent::StatusUpdate {
            toast_id: self.request.toast_id.clone(),
            status: ToastStatus::Completed,
            message: COMPLETED_MESSAGE.to_string(),
        });
    }
}
