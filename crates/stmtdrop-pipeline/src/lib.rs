//! Global file-drop pipeline.
//!
//! Drag events → [`GlobalDropHandler`] → PDF validation → [`target`] resolution →
//! optional dialog → upload worker → worker events → [`ToastStore`] → observers.
//! The in-page multi-file path lives in [`batch`].

pub mod batch;
pub mod handler;
pub mod target;
pub mod toast_store;

pub use batch::{
    pending_label, rejection_message, success_message, BatchUploadError, BatchUploader,
};
pub use handler::{
    apply_worker_event, spawn_event_pump, DialogError, DragState, DropOutcome, GlobalDropHandler,
    PendingDialog,
};
pub use target::{
    closest_project_id, current_project_for_route, decide, resolve_drop_target, DropNode, Element,
    TargetDecision, PROJECT_ID_ATTRIBUTE,
};
pub use toast_store::{Subscription, ToastObserver, ToastStore, DEFAULT_TOAST_TTL};
