//! Test helpers: projects, PDF fixtures and a drop handler wired to a mock ingestion API.
//!
//! Run with `cargo test -p stmtdrop-pipeline`.

#![allow(dead_code)]

use chrono::Utc;
use std::time::Duration;

use stmtdrop_core::{DropConfig, Project, Toast, UploadFile, PDF_MIME};
use stmtdrop_pipeline::{GlobalDropHandler, ToastStore};

pub const API_KEY: &str = "test-api-key";
pub const ORGANIZATION_ID: &str = "org-test";

/// How long worker-driven tests wait before giving up.
const WAIT_LIMIT: Duration = Duration::from_secs(5);

pub fn project(id: &str, name: &str) -> Project {
    Project {
        id: id.to_string(),
        name: name.to_string(),
        color: "oklch(0.65 0.12 250)".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// P1 "Household", P2 "Business", P3 "Savings".
pub fn projects() -> Vec<Project> {
    vec![
        project("p1", "Household"),
        project("p2", "Business"),
        project("p3", "Savings"),
    ]
}

/// Unencrypted PDF of `size` bytes.
pub fn pdf_of_size(name: &str, size: usize) -> UploadFile {
    let mut data = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n".to_vec();
    data.resize(size.max(data.len()), b' ');
    UploadFile::from_bytes(name, PDF_MIME, data)
}

pub fn two_mb_pdf(name: &str) -> UploadFile {
    pdf_of_size(name, 2 * 1024 * 1024)
}

pub fn encrypted_pdf(name: &str) -> UploadFile {
    UploadFile::from_bytes(
        name,
        PDF_MIME,
        b"%PDF-1.4\ntrailer << /Root 1 0 R /Encrypt 4 0 R >>".to_vec(),
    )
}

pub fn config(server: &mockito::ServerGuard) -> DropConfig {
    let mut config = DropConfig::new(server.url(), API_KEY, ORGANIZATION_ID);
    config.completion_delay = Duration::from_millis(50);
    config.toast_ttl = Duration::from_millis(200);
    config
}

/// Mount a handler against `server`, viewing the project named `route`.
pub fn mount(
    server: &mockito::ServerGuard,
    route: Option<&str>,
) -> (GlobalDropHandler, ToastStore) {
    mount_with(&config(server), route)
}

pub fn mount_with(config: &DropConfig, route: Option<&str>) -> (GlobalDropHandler, ToastStore) {
    let store = ToastStore::with_ttl(config.toast_ttl);
    let mut handler = GlobalDropHandler::new(config, store.clone(), projects());
    handler.set_route(route);
    (handler, store)
}

/// Mock a successful statement upload into `project_id`.
pub async fn mock_upload_ok(server: &mut mockito::ServerGuard, project_id: &str) -> mockito::Mock {
    server
        .mock("POST", format!("/py-api/projects/{}/statements", project_id).as_str())
        .match_header("x-api-key", API_KEY)
        .match_header("x-organization-id", ORGANIZATION_ID)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "queued", "message": "Statement queued"}"#)
        .expect(1)
        .create_async()
        .await
}

/// Poll the store until the toast `id` satisfies `done`.
pub async fn wait_for_toast(
    store: &ToastStore,
    id: &str,
    done: impl Fn(Option<&Toast>) -> bool,
) -> Option<Toast> {
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let toast = store.get(id);
            if done(toast.as_ref()) {
                return toast;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("toast did not reach the expected state in time")
}
