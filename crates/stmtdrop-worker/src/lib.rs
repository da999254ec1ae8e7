//! Background upload worker.
//!
//! Uploads run off the UI task so that page work never interrupts them; the drop
//! handler talks to the worker only through typed channels.

pub mod messages;
pub mod worker;

pub use messages::{StartUpload, WorkerCommand, WorkerEvent};
pub use worker::{upload_error_message, UploadState, UploadWorker, WorkerClosed, WorkerConfig};
