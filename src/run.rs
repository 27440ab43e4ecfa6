use crate::cli;
use crate::config;
use crate::error::SyncError;
use crate::jira::client::JiraClient;
use crate::jira::sync::{self, SyncMode, SyncReport, Tracker};
use crate::locate;
use crate::markdown_parser;
use crate::output;
use crate::whoami;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(
    args: Vec<String>,
    mut stdout_additional: Option<&mut dyn std::io::Write>,
) -> anyhow::Result<()> {
    match cli::parser::parse_args(&args) {
        cli::parser::Command::Sync { todo, dry_run } => {
            let mode = if dry_run {
                SyncMode::DryRun
            } else {
                SyncMode::Apply
            };
            sync_todo(todo, mode, &mut stdout_additional).await?;
        }
        cli::parser::Command::Whoami => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let config = config::load(&cwd)?;
            let client = JiraClient::new(&config).context("Failed to create HTTP client")?;
            let text = client
                .myself()
                .await
                .with_context(|| format!("Failed to query {}", config.server))?;
            match whoami::extract_user_from_myself_response(&text) {
                Ok(user) => output::println(&user, &mut stdout_additional)?,
                Err(err) => return Err(anyhow::anyhow!(err)),
            }
        }
        cli::parser::Command::Help => {
            output::println(cli::parser::USAGE, &mut stdout_additional)?;
        }
        cli::parser::Command::Unknown(message) => {
            return Err(anyhow::anyhow!(
                "Invalid command or arguments: {message}. Use `help` for usage."
            ));
        }
    }
    Ok(())
}

fn resolve_todo_path(explicit: Option<PathBuf>, cwd: &Path) -> Result<PathBuf, SyncError> {
    match explicit {
        Some(path) if path.is_absolute() => Ok(path),
        Some(path) => Ok(cwd.join(path)),
        None => locate::find_todo_file(cwd).ok_or_else(|| {
            SyncError::Parse(format!(
                "no {} found in {} or its parent directories",
                locate::TODO_FILENAMES.join(" or "),
                cwd.display()
            ))
        }),
    }
}

async fn sync_todo(
    todo: Option<PathBuf>,
    mode: SyncMode,
    stdout_additional: &mut Option<&mut dyn std::io::Write>,
) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let todo_path = resolve_todo_path(todo, &cwd)?;
    let config_dir = todo_path.parent().unwrap_or(&cwd);

    let config = config::load(config_dir)?;
    info!(server = %config.server, parent = %config.parent_issue, "configuration loaded");

    let items = markdown_parser::parse_checklist_file(&todo_path)?;
    info!(count = items.len(), path = %todo_path.display(), "found checklist items");

    let client = JiraClient::new(&config).context("Failed to create HTTP client")?;
    let parent = client
        .fetch_issue(&config.parent_issue)
        .await
        .with_context(|| format!("Failed to fetch parent issue {}", config.parent_issue))?;
    info!(key = %parent.key, summary = %parent.summary, "parent issue found");
    if let Some(reporter) = &parent.reporter {
        info!(%reporter, "sub-tasks will be assigned to the parent's reporter");
    }

    let report = sync::reconcile(&client, &parent, &items, mode).await;
    print_report(&report, stdout_additional)
}

/// Prints one line per item and the summary; a run cut short by rejected
/// credentials still fails after printing.
fn print_report(
    report: &SyncReport,
    stdout_additional: &mut Option<&mut dyn std::io::Write>,
) -> anyhow::Result<()> {
    for item in &report.items {
        output::println(&item.to_string(), stdout_additional)?;
    }
    output::println(&report.summary_line(), stdout_additional)?;
    if let Some(reason) = &report.aborted {
        anyhow::bail!("Sync aborted: {reason}");
    }
    Ok(())
}
