//! End-to-end drop scenarios: handler → worker → mock API → toast store.
//!
//! Run with: `cargo test -p stmtdrop-pipeline --test drop_scenarios_test`

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use helpers::{
    config, encrypted_pdf, mock_upload_ok, mount, mount_with, pdf_of_size, two_mb_pdf,
    wait_for_toast,
};
use stmtdrop_core::{Toast, ToastStatus};
use stmtdrop_pipeline::{DialogError, DropOutcome, Element, PendingDialog};

fn body() -> Element {
    Element::new("body")
}

#[tokio::test]
async fn drop_on_other_project_tile_asks_for_confirmation() {
    let mut server = mockito::Server::new_async().await;
    let upload = mock_upload_ok(&mut server, "p1").await;
    let (mut handler, store) = mount(&server, Some("Business"));

    let tile = Arc::new(Element::project_tile("p1"));
    let label = Element::child_of(&tile, "span");
    let outcome = handler.drop_files(vec![two_mb_pdf("march.pdf")], &label).await;

    assert_eq!(outcome, DropOutcome::AwaitingConfirmation);
    match handler.pending_dialog() {
        Some(PendingDialog::CrossProjectConfirmation { file, target, current }) => {
            assert_eq!(file.name, "march.pdf");
            assert_eq!(target.id, "p1");
            assert_eq!(current.id, "p2");
        }
        other => panic!("expected cross-project confirmation, got {:?}", other),
    }
    assert!(store.is_empty(), "no toast before the user confirms");

    let outcome = handler.confirm_cross_project().unwrap();
    let DropOutcome::UploadStarted { toast_id, project_id } = outcome else {
        panic!("expected upload to start, got {:?}", outcome);
    };
    assert_eq!(project_id, "p1");
    assert!(handler.pending_dialog().is_none());

    let toast = wait_for_toast(&store, &toast_id, |t| {
        t.is_some_and(|t| t.status == ToastStatus::Completed)
    })
    .await
    .unwrap();
    assert_eq!(toast.message, "Document uploaded successfully!");
    assert_eq!(toast.filename.as_deref(), Some("march.pdf"));
    upload.assert_async().await;
}

#[tokio::test]
async fn untagged_drop_uploads_to_current_project() {
    let mut server = mockito::Server::new_async().await;
    let upload = mock_upload_ok(&mut server, "p1").await;
    let (mut handler, store) = mount(&server, Some("Household"));

    let statuses: Arc<Mutex<Vec<ToastStatus>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statuses);
    let _subscription = store.subscribe(move |toasts: &[Toast]| {
        if let Some(toast) = toasts.first() {
            let mut seen = sink.lock().unwrap();
            if seen.last() != Some(&toast.status) {
                seen.push(toast.status);
            }
        }
    });

    let outcome = handler.drop_files(vec![two_mb_pdf("april.pdf")], &body()).await;
    let DropOutcome::UploadStarted { toast_id, project_id } = outcome else {
        panic!("expected immediate upload, got {:?}", outcome);
    };
    assert_eq!(project_id, "p1");
    assert!(handler.pending_dialog().is_none());

    let pending = store.get(&toast_id).unwrap();
    assert_eq!(pending.message, "Uploading april.pdf...");
    assert_eq!(pending.status, ToastStatus::Pending);

    wait_for_toast(&store, &toast_id, |t| {
        t.is_some_and(|t| t.status == ToastStatus::Completed)
    })
    .await;
    assert_eq!(
        *statuses.lock().unwrap(),
        vec![ToastStatus::Pending, ToastStatus::Processing, ToastStatus::Completed]
    );
    upload.assert_async().await;

    wait_for_toast(&store, &toast_id, |t| t.is_none()).await;
}

#[tokio::test]
async fn drop_without_any_project_opens_selector() {
    let mut server = mockito::Server::new_async().await;
    let upload = mock_upload_ok(&mut server, "p3").await;
    let (mut handler, store) = mount(&server, None);

    let outcome = handler.drop_files(vec![two_mb_pdf("may.pdf")], &body()).await;
    assert_eq!(outcome, DropOutcome::AwaitingProjectSelection);

    match handler.pending_dialog() {
        Some(PendingDialog::ProjectSelector { projects, file }) => {
            let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
            assert_eq!(ids, vec!["p1", "p2", "p3"]);
            assert_eq!(file.name, "may.pdf");
        }
        other => panic!("expected project selector, got {:?}", other),
    }

    assert_eq!(
        handler.select_project("nope"),
        Err(DialogError::UnknownProject("nope".to_string()))
    );
    assert!(handler.pending_dialog().is_some(), "dialog stays open after a bad pick");

    let outcome = handler.select_project("p3").unwrap();
    let DropOutcome::UploadStarted { toast_id, project_id } = outcome else {
        panic!("expected upload to start");
    };
    assert_eq!(project_id, "p3");

    wait_for_toast(&store, &toast_id, |t| {
        t.is_some_and(|t| t.status == ToastStatus::Completed)
    })
    .await;
    upload.assert_async().await;
}

#[tokio::test]
async fn dropping_two_files_is_rejected_without_upload() {
    let mut server = mockito::Server::new_async().await;
    let never = server
        .mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let (mut handler, store) = mount(&server, Some("Household"));

    let outcome = handler
        .drop_files(vec![two_mb_pdf("a.pdf"), two_mb_pdf("b.pdf")], &body())
        .await;

    let DropOutcome::Rejected { toast_id, message } = outcome else {
        panic!("expected a rejection");
    };
    assert_eq!(message, "Only one file at a time is allowed");
    let toast = store.get(&toast_id).unwrap();
    assert_eq!(toast.status, ToastStatus::Failed);
    assert_eq!(toast.message, "Only one file at a time is allowed");
    assert_eq!(store.len(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    never.assert_async().await;
}

#[tokio::test]
async fn server_error_fails_toast_then_expires_it() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/py-api/projects/p1/statements")
        .with_status(500)
        .with_body("quota exceeded")
        .expect(1)
        .create_async()
        .await;
    let (mut handler, store) = mount(&server, Some("Household"));

    let DropOutcome::UploadStarted { toast_id, .. } =
        handler.drop_files(vec![two_mb_pdf("june.pdf")], &body()).await
    else {
        panic!("expected upload to start");
    };

    let toast = wait_for_toast(&store, &toast_id, |t| {
        t.is_some_and(|t| t.status == ToastStatus::Failed)
    })
    .await
    .unwrap();
    assert_eq!(toast.message, "Upload failed: 500 - quota exceeded");
    upload.assert_async().await;

    wait_for_toast(&store, &toast_id, |t| t.is_none()).await;
    assert!(store.is_empty());
}

#[tokio::test]
async fn cancelled_upload_stops_updating_its_toast() {
    let mut server = mockito::Server::new_async().await;
    let upload = mock_upload_ok(&mut server, "p1").await;
    let mut config = config(&server);
    config.completion_delay = Duration::from_millis(400);
    let (mut handler, store) = mount_with(&config, Some("Household"));

    let DropOutcome::UploadStarted { toast_id, .. } =
        handler.drop_files(vec![two_mb_pdf("august.pdf")], &body()).await
    else {
        panic!("expected upload to start");
    };

    wait_for_toast(&store, &toast_id, |t| {
        t.is_some_and(|t| t.status == ToastStatus::Processing)
    })
    .await;
    handler.cancel_upload();

    tokio::time::sleep(Duration::from_millis(600)).await;
    let toast = store.get(&toast_id).unwrap();
    assert_eq!(toast.status, ToastStatus::Processing);
    assert_eq!(toast.message, "Processing document...");
    upload.assert_async().await;
}

#[tokio::test]
async fn invalid_files_become_failed_toasts() {
    let server = mockito::Server::new_async().await;
    let (mut handler, store) = mount(&server, Some("Household"));

    let outcome = handler.drop_files(vec![encrypted_pdf("locked.pdf")], &body()).await;
    let DropOutcome::Rejected { message, .. } = outcome else {
        panic!("expected a rejection");
    };
    assert_eq!(message, "Password-protected PDFs are not allowed");

    let outcome = handler
        .drop_files(vec![pdf_of_size("huge.pdf", 6 * 1024 * 1024)], &body())
        .await;
    assert!(matches!(
        outcome,
        DropOutcome::Rejected { ref message, .. } if message == "File size must be less than 5MB"
    ));

    let statuses: Vec<ToastStatus> = store.toasts().into_iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![ToastStatus::Failed, ToastStatus::Failed]);
}

#[tokio::test]
async fn empty_drop_and_cancelled_dialog_leave_no_trace() {
    let server = mockito::Server::new_async().await;
    let (mut handler, store) = mount(&server, Some("Business"));

    assert_eq!(handler.drop_files(Vec::new(), &body()).await, DropOutcome::Ignored);

    let outcome = handler
        .drop_files(vec![two_mb_pdf("july.pdf")], &Element::project_tile("p3"))
        .await;
    assert_eq!(outcome, DropOutcome::AwaitingConfirmation);
    assert_eq!(handler.select_project("p3"), Err(DialogError::WrongDialog));

    handler.cancel_dialog();
    assert!(handler.pending_dialog().is_none());
    assert_eq!(handler.confirm_cross_project(), Err(DialogError::NotOpen));
    assert!(store.is_empty());
}

#[tokio::test]
async fn drag_lifecycle_drives_overlay() {
    let server = mockito::Server::new_async().await;
    let (mut handler, _store) = mount(&server, Some("Business"));

    assert_eq!(handler.overlay_hint(), None);
    handler.drag_enter(true);
    handler.drag_enter(true);
    assert!(handler.drag_over());
    handler.drag_leave();
    assert_eq!(handler.overlay_hint().as_deref(), Some("Upload to Business"));

    handler.set_route(None);
    assert_eq!(handler.overlay_hint().as_deref(), Some("Choose a project to upload to"));

    handler.drop_files(Vec::new(), &body()).await;
    assert!(!handler.is_dragging());
    assert_eq!(handler.drag_state().depth(), 0);
}
