//! stmtdrop CLI: upload PDF bank statements into projects.
//!
//! Set STMTDROP_API_KEY (or API_KEY), STMTDROP_ORGANIZATION_ID and STMTDROP_API_URL
//! (or API_URL). `drop` runs the same pipeline as dropping a file onto the page;
//! `add` uploads several statements into one project.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use stmtdrop_api_client::{ApiClient, ProjectProvider};
use stmtdrop_cli::{init_tracing, is_affirmative, parse_selection, truncate_string};
use stmtdrop_core::{DropConfig, Project, Toast, ToastStatus, UploadFile};
use stmtdrop_pipeline::{
    rejection_message, BatchUploader, DropOutcome, Element, GlobalDropHandler, PendingDialog,
    ToastStore, PROJECT_ID_ATTRIBUTE,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "stmtdrop", about = "Upload PDF bank statements into projects")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the organization's projects
    Projects {
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Upload one statement the way a page-wide drop does
    Drop {
        /// Path to the PDF statement
        file: PathBuf,
        /// Name of the project currently open
        #[arg(long)]
        project: Option<String>,
        /// ID of the project tile the file is dropped on
        #[arg(long)]
        target: Option<String>,
    },
    /// Upload up to 12 statements into a project in one request
    Add {
        /// Project ID
        project_id: String,
        /// Paths to the PDF statements
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = DropConfig::from_env().context(
        "Set STMTDROP_API_KEY and STMTDROP_ORGANIZATION_ID (and optionally STMTDROP_API_URL)",
    )?;
    config.validate()?;
    let client = ApiClient::from_config(&config).context("Failed to create API client")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Projects { format } => {
            let projects = client.projects().await?;
            match format.as_str() {
                "json" => print_json(&projects)?,
                _ => print_projects_table(&projects),
            }
        }
        Commands::Drop {
            file,
            project,
            target,
        } => {
            let toast = drop_file(&config, &client, file, project.as_deref(), target).await?;
            print_json(&toast)?;
            if toast.status == ToastStatus::Failed {
                bail!("{}", toast.message);
            }
        }
        Commands::Add { project_id, files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let file = UploadFile::from_path(path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                uploads.push(file);
            }

            let store = ToastStore::with_ttl(config.toast_ttl);
            let uploader = BatchUploader::new(client, project_id);
            match uploader.upload_with_toast(&store, &uploads).await {
                Ok(response) => print_json(&response)?,
                Err(e) => bail!("{}", rejection_message(&e)),
            }
        }
    }

    Ok(())
}

/// Drive a drop through the handler, answering dialogs on stdin, and wait for the
/// upload's toast to settle.
async fn drop_file(
    config: &DropConfig,
    client: &ApiClient,
    path: PathBuf,
    route: Option<&str>,
    target: Option<String>,
) -> anyhow::Result<Toast> {
    let file = UploadFile::from_path(&path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let store = ToastStore::with_ttl(config.toast_ttl);
    let _progress = store.subscribe(|toasts: &[Toast]| {
        for toast in toasts {
            eprintln!("[{}] {}", toast.status, toast.message);
        }
    });

    let mut handler = GlobalDropHandler::new(config, store.clone(), Vec::new());
    let count = handler.refresh_projects(client).await?;
    tracing::debug!(count, "Loaded projects");
    handler.set_route(route);
    if let (Some(name), None) = (route, handler.current_project()) {
        tracing::warn!(project = %name, "Current project not found, ignoring");
    }

    let body = Arc::new(Element::new("body"));
    let node = match target {
        Some(id) => Element::child_of(&body, "div").with_attribute(PROJECT_ID_ATTRIBUTE, id),
        None => Element::child_of(&body, "main"),
    };

    handler.drag_enter(true);
    handler.drag_over();
    let mut outcome = handler.drop_files(vec![file], &node).await;

    if let Some(dialog) = handler.pending_dialog().cloned() {
        outcome = match dialog {
            PendingDialog::ProjectSelector { projects, .. } => {
                if projects.is_empty() {
                    handler.cancel_dialog();
                    bail!("No projects available to upload to");
                }
                println!("Choose a project to upload to:");
                for (i, project) in projects.iter().enumerate() {
                    println!("  {:>2}. {}", i + 1, project.name);
                }
                let answer = prompt(&format!("Project [1-{}]: ", projects.len())).await?;
                match parse_selection(&answer, projects.len()) {
                    Some(index) => handler.select_project(&projects[index].id)?,
                    None => {
                        handler.cancel_dialog();
                        bail!("Upload cancelled");
                    }
                }
            }
            PendingDialog::CrossProjectConfirmation { target, current, .. } => {
                let answer = prompt(&format!(
                    "You are viewing \"{}\". Upload to \"{}\" instead? [y/N]: ",
                    current.name, target.name
                ))
                .await?;
                if is_affirmative(&answer) {
                    handler.confirm_cross_project()?
                } else {
                    handler.cancel_dialog();
                    bail!("Upload cancelled");
                }
            }
        };
    }

    let toast_id = match outcome {
        DropOutcome::UploadStarted { toast_id, .. } => toast_id,
        DropOutcome::Rejected { message, .. } => bail!("{}", message),
        other => bail!("Nothing was uploaded ({:?})", other),
    };

    wait_for_terminal(&store, &toast_id).await
}

async fn wait_for_terminal(store: &ToastStore, toast_id: &str) -> anyhow::Result<Toast> {
    loop {
        match store.get(toast_id) {
            Some(toast) if toast.status.is_terminal() => return Ok(toast),
            Some(_) => tokio::time::sleep(POLL_INTERVAL).await,
            None => bail!("Upload status for {} was lost", toast_id),
        }
    }
}

async fn prompt(question: &str) -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(question.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read answer")?;
    Ok(line)
}

fn print_projects_table(projects: &[Project]) {
    println!("\n=== Projects ===\n");

    if projects.is_empty() {
        println!("No projects found.");
        return;
    }

    println!("{:<36} {:<30} {:<24} {:>20}", "ID", "Name", "Color", "Updated At");
    println!("{}", "-".repeat(113));

    for project in projects {
        println!(
            "{:<36} {:<30} {:<24} {:>20}",
            truncate_string(&project.id, 36),
            truncate_string(&project.name, 30),
            truncate_string(&project.color, 24),
            project.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("\nTotal: {} projects", projects.len());
}
