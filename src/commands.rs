//! One-shot subcommands. Each prints plain text to stdout and returns errors with
//! context for `main` to report.

use crate::api::{ChatRequest, TaskApi};
use crate::cli::{Command, FilterArgs};
use crate::columns::Column;
use crate::markup::{sanitize_line, sanitize_text};
use crate::modal::TaskDetail;
use crate::task_list::{visible_indices, SortDirection, SortState, TaskRow};
use anyhow::{bail, Context};
use std::io::Write;

pub async fn run(api: &dyn TaskApi, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Tui(_) => bail!("the interactive client is not a one-shot command"),
        Command::List { filters, sort, desc } => list(api, &filters, sort, desc, out).await,
        Command::Show { id } => show(api, id, out).await,
        Command::Integrate { id } => integrate(api, id, out).await,
        Command::Chat {
            message,
            conversation,
        } => chat(api, message, conversation, out).await,
        Command::Projects => projects(api, out).await,
        Command::Refresh => refresh(api, out).await,
    }
}

async fn list(
    api: &dyn TaskApi,
    filters: &FilterArgs,
    column: Column,
    desc: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let tasks = api.list_tasks().await.context("failed to fetch tasks")?;
    let sort = SortState {
        column,
        direction: if desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        },
    };
    let visible = visible_indices(&tasks, &filters.to_filters(), sort);
    for index in &visible {
        let row = TaskRow::from_task(&tasks[*index]);
        writeln!(
            out,
            "#{:<6} {:<16} {:<18} {:<25} {:<18} {}",
            row.id,
            truncate(&row.status_label, 16),
            truncate(&row.project_label, 18),
            format!("{} → {}", row.start, row.end),
            truncate(&row.assigner, 18),
            row.title
        )?;
    }
    writeln!(out, "Shown {} of {}", visible.len(), tasks.len())?;
    Ok(())
}

async fn show(api: &dyn TaskApi, id: i64, out: &mut impl Write) -> anyhow::Result<()> {
    let task = api
        .get_task(id)
        .await
        .with_context(|| format!("failed to fetch task {id}"))?;
    let detail = TaskDetail::from_task(&task);
    writeln!(out, "{} (#{})", detail.title, detail.id)?;
    for (label, value) in [
        ("Status", &detail.status),
        ("Project", &detail.project),
        ("Assigner", &detail.assigner),
        ("Assignees", &detail.assignees),
        ("Priority", &detail.priority),
        ("Start", &detail.start),
        ("End", &detail.end),
    ] {
        writeln!(out, "{label:<10} {value}")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", detail.description)?;
    Ok(())
}

async fn integrate(api: &dyn TaskApi, id: i64, out: &mut impl Write) -> anyhow::Result<()> {
    let task = api
        .get_task(id)
        .await
        .with_context(|| format!("failed to fetch task {id}"))?;
    if task.is_completed() {
        bail!("task {id} is completed and cannot be linked to a conversation");
    }
    let conversation_id = api
        .integrate_task(id)
        .await
        .with_context(|| format!("failed to integrate task {id}"))?;
    writeln!(out, "Task #{id} linked to conversation {conversation_id}")?;
    Ok(())
}

async fn chat(
    api: &dyn TaskApi,
    message: String,
    conversation_id: Option<String>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let message = message.trim().to_owned();
    if message.is_empty() {
        bail!("message must not be empty");
    }
    let reply = api
        .send_message(&ChatRequest {
            message,
            conversation_id: conversation_id.clone(),
        })
        .await
        .context("failed to send message")?;
    writeln!(out, "{}", sanitize_text(&reply.message))?;
    if let Some(id) = reply.conversation_id.or(conversation_id) {
        writeln!(out, "(conversation {})", sanitize_line(&id))?;
    }
    Ok(())
}

async fn projects(api: &dyn TaskApi, out: &mut impl Write) -> anyhow::Result<()> {
    let projects = api.list_projects().await.context("failed to fetch projects")?;
    for project in projects {
        writeln!(out, "{:>8}  {}", project.id, project.name)?;
    }
    Ok(())
}

async fn refresh(api: &dyn TaskApi, out: &mut impl Write) -> anyhow::Result<()> {
    let response = api.force_refresh().await.context("failed to refresh task cache")?;
    writeln!(out, "Task cache refreshed")?;
    if !response.is_null() {
        writeln!(out, "{}", serde_json::to_string_pretty(&response)?)?;
    }
    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}
