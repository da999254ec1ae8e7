//! Page-wide drop handler.
//!
//! [`GlobalDropHandler`] owns the drag state, validates dropped files, works out the
//! target project (asking the user through a [`PendingDialog`] when it cannot) and
//! hands uploads to its [`UploadWorker`]. Worker events flow back into the
//! [`ToastStore`] through an event pump task spawned alongside the worker.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use stmtdrop_api_client::{ApiResult, ProjectProvider};
use stmtdrop_core::{
    Credentials, DropConfig, FileValidationError, PdfValidator, Project, ToastStatus, ToastUpdate,
    UploadFile, ValidationProfile,
};
use stmtdrop_worker::{StartUpload, UploadWorker, WorkerConfig, WorkerEvent};

use crate::target::{
    current_project_for_route, decide, resolve_drop_target, DropNode, TargetDecision,
};
use crate::toast_store::ToastStore;

const NO_PROJECT_HINT: &str = "Choose a project to upload to";

/// Enter/leave reference count. Nested elements fire enter and leave repeatedly
/// while the pointer moves, so the overlay only clears once every enter is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragState {
    depth: u32,
    dragging: bool,
}

impl DragState {
    pub fn enter(&mut self, has_files: bool) {
        self.depth += 1;
        if has_files {
            self.dragging = true;
        }
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.dragging = false;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}

/// A validated file waiting on the user.
#[derive(Debug, Clone)]
pub enum PendingDialog {
    /// No project could be inferred; the user picks one of `projects`.
    ProjectSelector { file: UploadFile, projects: Vec<Project> },
    /// The file was dropped on `target` while `current` is open.
    CrossProjectConfirmation {
        file: UploadFile,
        target: Project,
        current: Project,
    },
}

impl PendingDialog {
    pub fn file(&self) -> &UploadFile {
        match self {
            PendingDialog::ProjectSelector { file, .. }
            | PendingDialog::CrossProjectConfirmation { file, .. } => file,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("no dialog is open")]
    NotOpen,
    #[error("the open dialog does not accept this action")]
    WrongDialog,
    #[error("unknown project: {0}")]
    UnknownProject(String),
}

/// Result of handing files to the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Nothing to do (no files).
    Ignored,
    /// A failed toast was shown instead of uploading.
    Rejected { toast_id: String, message: String },
    UploadStarted { toast_id: String, project_id: String },
    /// A [`PendingDialog::ProjectSelector`] is open.
    AwaitingProjectSelection,
    /// A [`PendingDialog::CrossProjectConfirmation`] is open.
    AwaitingConfirmation,
}

pub struct GlobalDropHandler {
    projects: Vec<Project>,
    current_project: Option<Project>,
    credentials: Credentials,
    store: ToastStore,
    worker: UploadWorker,
    validator: PdfValidator,
    drag: DragState,
    dialog: Option<PendingDialog>,
    event_pump: JoinHandle<()>,
}

impl GlobalDropHandler {
    /// Mount a handler: spawns its upload worker and the event pump feeding `store`.
    pub fn new(config: &DropConfig, store: ToastStore, projects: Vec<Project>) -> Self {
        let (worker, events) = UploadWorker::spawn(WorkerConfig::from(config));
        Self::with_worker(config.credentials(), store, projects, worker, events)
    }

    /// Mount a handler around an already spawned worker.
    pub fn with_worker(
        credentials: Credentials,
        store: ToastStore,
        projects: Vec<Project>,
        worker: UploadWorker,
        events: UnboundedReceiver<WorkerEvent>,
    ) -> Self {
        let event_pump = spawn_event_pump(store.clone(), events);
        Self {
            projects,
            current_project: None,
            credentials,
            store,
            worker,
            validator: PdfValidator::new(ValidationProfile::GLOBAL_DROP),
            drag: DragState::default(),
            dialog: None,
            event_pump,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn set_projects(&mut self, projects: Vec<Project>) {
        self.projects = projects;
    }

    /// Reload the project list from `provider`.
    pub async fn refresh_projects(&mut self, provider: &dyn ProjectProvider) -> ApiResult<usize> {
        let projects = provider.projects().await?;
        tracing::debug!(count = projects.len(), "Project list refreshed");
        self.projects = projects;
        Ok(self.projects.len())
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.current_project.as_ref()
    }

    pub fn set_current_project(&mut self, project: Option<Project>) {
        self.current_project = project;
    }

    /// Derive the current project from the active route's project name.
    pub fn set_route(&mut self, route_name: Option<&str>) {
        self.current_project = current_project_for_route(&self.projects, route_name).cloned();
    }

    pub fn store(&self) -> &ToastStore {
        &self.store
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn pending_dialog(&self) -> Option<&PendingDialog> {
        self.dialog.as_ref()
    }

    /// Overlay text while dragging, `None` when the overlay is hidden.
    pub fn overlay_hint(&self) -> Option<String> {
        if !self.drag.is_dragging() {
            return None;
        }
        Some(match &self.current_project {
            Some(project) => format!("Upload to {}", project.name),
            None => NO_PROJECT_HINT.to_string(),
        })
    }

    pub fn drag_enter(&mut self, has_files: bool) {
        self.drag.enter(has_files);
    }

    pub fn drag_leave(&mut self) {
        self.drag.leave();
    }

    /// Dropping is always allowed.
    pub fn drag_over(&mut self) -> bool {
        true
    }

    /// Handle a drop on `target`.
    pub async fn drop_files<N: DropNode>(
        &mut self,
        files: Vec<UploadFile>,
        target: &N,
    ) -> DropOutcome {
        self.drag.reset();
        if files.is_empty() {
            return DropOutcome::Ignored;
        }

        let dropped = resolve_drop_target(target, &self.projects).cloned();
        self.handle_files_drop(files, dropped.as_ref()).await
    }

    /// Validate `files` and route the single accepted file to a project.
    pub async fn handle_files_drop(
        &mut self,
        files: Vec<UploadFile>,
        dropped_project: Option<&Project>,
    ) -> DropOutcome {
        let file = match self.validator.validate_drop(&files).await {
            Ok(file) => file.clone(),
            Err(e) if files.is_empty() => {
                tracing::trace!(error = %e, "Empty drop ignored");
                return DropOutcome::Ignored;
            }
            Err(e) => return self.reject(&files, e),
        };

        match decide(dropped_project, self.current_project.as_ref()) {
            TargetDecision::Upload(project) => self.start_upload(file, &project),
            TargetDecision::ConfirmCrossProject { target, current } => {
                tracing::debug!(
                    target_project = %target.id,
                    current_project = %current.id,
                    "Dropped onto another project, asking for confirmation"
                );
                self.dialog = Some(PendingDialog::CrossProjectConfirmation {
                    file,
                    target,
                    current,
                });
                DropOutcome::AwaitingConfirmation
            }
            TargetDecision::SelectProject => {
                self.dialog = Some(PendingDialog::ProjectSelector {
                    file,
                    projects: self.projects.clone(),
                });
                DropOutcome::AwaitingProjectSelection
            }
        }
    }

    fn reject(&self, files: &[UploadFile], error: FileValidationError) -> DropOutcome {
        tracing::info!(
            code = %error.code,
            file_count = files.len(),
            filename = files.first().map(|f| f.name.as_str()).unwrap_or_default(),
            "Dropped file rejected"
        );
        let toast_id = self
            .store
            .add_toast(error.message.clone(), ToastStatus::Failed, None);
        self.store.auto_remove_toast(&toast_id);
        DropOutcome::Rejected {
            toast_id,
            message: error.message,
        }
    }

    /// Upload the pending file to the chosen project.
    pub fn select_project(&mut self, project_id: &str) -> Result<DropOutcome, DialogError> {
        match self.dialog.take() {
            Some(PendingDialog::ProjectSelector { file, projects }) => {
                match Project::find_by_id(&projects, project_id).cloned() {
                    Some(project) => Ok(self.start_upload(file, &project)),
                    None => {
                        self.dialog = Some(PendingDialog::ProjectSelector { file, projects });
                        Err(DialogError::UnknownProject(project_id.to_string()))
                    }
                }
            }
            Some(other) => {
                self.dialog = Some(other);
                Err(DialogError::WrongDialog)
            }
            None => Err(DialogError::NotOpen),
        }
    }

    /// Upload the pending file to the project it was dropped on.
    pub fn confirm_cross_project(&mut self) -> Result<DropOutcome, DialogError> {
        match self.dialog.take() {
            Some(PendingDialog::CrossProjectConfirmation { file, target, .. }) => {
                Ok(self.start_upload(file, &target))
            }
            Some(other) => {
                self.dialog = Some(other);
                Err(DialogError::WrongDialog)
            }
            None => Err(DialogError::NotOpen),
        }
    }

    /// Close any open dialog and discard its file.
    pub fn cancel_dialog(&mut self) {
        if let Some(dialog) = self.dialog.take() {
            tracing::debug!(filename = %dialog.file().name, "Upload dialog cancelled");
        }
    }

    /// Show a pending toast and hand the file to the worker.
    pub fn start_upload(&self, file: UploadFile, project: &Project) -> DropOutcome {
        let toast_id = self.store.add_toast(
            format!("Uploading {}...", file.name),
            ToastStatus::Pending,
            Some(file.name.clone()),
        );

        tracing::info!(
            toast_id = %toast_id,
            project_id = %project.id,
            filename = %file.name,
            size = file.size,
            "Starting upload"
        );

        let request = StartUpload {
            file,
            project_id: project.id.clone(),
            organization_id: self.credentials.organization_id.clone(),
            api_key: self.credentials.api_key.clone(),
            base_url: self.credentials.base_url.clone(),
            toast_id: toast_id.clone(),
        };

        if let Err(e) = self.worker.start_upload(request) {
            tracing::error!(toast_id = %toast_id, error = %e, "Failed to dispatch upload");
            let message = format!("Upload failed: {}", e);
            self.store
                .update_toast(&toast_id, ToastUpdate::status(ToastStatus::Failed, message));
            self.store.auto_remove_toast(&toast_id);
        }

        DropOutcome::UploadStarted {
            toast_id,
            project_id: project.id.clone(),
        }
    }

    /// Cancel the most recently started upload. Its toast receives no further updates.
    pub fn cancel_upload(&self) {
        if let Err(e) = self.worker.cancel_upload() {
            tracing::warn!(error = %e, "Cancel requested but worker is gone");
        }
    }
}

impl Drop for GlobalDropHandler {
    fn drop(&mut self) {
        self.event_pump.abort();
    }
}

/// Apply every event from `events` to `store` until the worker goes away.
pub fn spawn_event_pump(
    store: ToastStore,
    mut events: UnboundedReceiver<WorkerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            apply_worker_event(&store, event);
        }
        tracing::debug!("Worker event channel closed");
    })
}

/// Reflect one worker event in the toast store. Terminal toasts are scheduled for removal.
pub fn apply_worker_event(store: &ToastStore, event: WorkerEvent) {
    match event {
        WorkerEvent::UploadProgress {
            toast_id,
            status,
            message,
        } => {
            store.update_toast(&toast_id, ToastUpdate::status(status, message));
        }
        WorkerEvent::StatusUpdate {
            toast_id,
            status,
            message,
        } => {
            let updated = store.update_toast(&toast_id, ToastUpdate::status(status, message));
            if updated && status.is_terminal() {
                store.auto_remove_toast(&toast_id);
            }
        }
        WorkerEvent::UploadError { toast_id, error } => {
            tracing::warn!(toast_id = %toast_id, error = %error, "Upload failed");
            if store.update_toast(&toast_id, ToastUpdate::status(ToastStatus::Failed, error)) {
                store.auto_remove_toast(&toast_id);
            }
        }
    }
}
