use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::*;
use reqwest::Method;
use scan_console::Console;
use scan_console::api::TaskQuery;
use scan_console::polling::{TaskStatus, TrackedEntity};
use scan_console::transport::RequestDescriptor;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::cli::Commands;

/// How often `watch` redraws from the entity store.
const WATCH_REFRESH: Duration = Duration::from_millis(250);

pub async fn execute(console: &Console, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username, password } => login(console, &username, &password).await,
        Commands::Tasks {
            status,
            project,
            limit,
        } => list_tasks(console, status, project, limit).await,
        Commands::Watch { ids, run } => watch(console, &ids, run).await,
        Commands::Call { method, path, data } => call(console, &method, &path, data).await,
    }
}

async fn login(console: &Console, username: &str, password: &str) -> Result<()> {
    console
        .login(username, password)
        .await
        .context("Login failed")?;

    let pair = console
        .client()
        .store()
        .snapshot()
        .context("Login returned no session")?;
    println!("{}", serde_json::to_string_pretty(&pair)?);
    Ok(())
}

async fn list_tasks(
    console: &Console,
    status: Option<TaskStatus>,
    project: Option<i64>,
    limit: u32,
) -> Result<()> {
    let query = TaskQuery {
        status,
        project_id: project,
        ..TaskQuery::default().page(0, limit)
    };
    let tasks = console
        .api()
        .list_tasks(&query)
        .await
        .context("Failed to list tasks")?;

    if tasks.is_empty() {
        println!("{}", "No tasks found".yellow());
        return Ok(());
    }

    println!(
        "{:>6}  {:<10}  {:>5}  {}",
        "ID".bold(),
        "STATUS".bold(),
        "PROG".bold(),
        "NAME".bold()
    );
    for task in tasks {
        println!(
            "{:>6}  {:<10}  {:>4}%  {}",
            task.id,
            colored_status(task.status),
            task.progress,
            task.name
        );
    }
    Ok(())
}

async fn watch(console: &Console, ids: &[i64], run: bool) -> Result<()> {
    if run {
        for &id in ids {
            let task = console
                .api()
                .run_task(id)
                .await
                .with_context(|| format!("Failed to start task {id}"))?;
            info!(id, status = %task.status, "Task started");
        }
    }

    let scheduler = console.scheduler();
    let mut events = console.subscribe();
    for &id in ids {
        scheduler.start(id);
    }

    let mut last_seen: HashMap<i64, (TaskStatus, i32)> = HashMap::new();
    let mut ticker = tokio::time::interval(WATCH_REFRESH);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            event = events.recv() => match event {
                Ok(event) if event.is_sign_out() => {
                    scheduler.stop_all();
                    bail!("{}; log in again", event.description());
                }
                Ok(event) => debug!("{}", event.description()),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Session events lagged"),
                Err(RecvError::Closed) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                scheduler.stop_all();
                println!("{}", "Interrupted".yellow());
                return Ok(());
            }
        }

        for &id in ids {
            if let Some(entity) = console.entities().get(id) {
                let current = (entity.status(), entity.progress.progress);
                if last_seen.insert(id, current) != Some(current) {
                    print_entity(&entity);
                }
            }
        }

        if ids.iter().all(|&id| !scheduler.is_active(id)) {
            break;
        }
    }

    for &id in ids {
        if !last_seen.contains_key(&id) {
            println!("{:>6}  {}", id, "not found".red());
        }
    }
    Ok(())
}

async fn call(console: &Console, method: &str, path: &str, data: Option<String>) -> Result<()> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {method}"))?;

    let mut request = RequestDescriptor::new(method, path);
    if let Some(raw) = data {
        let body: serde_json::Value =
            serde_json::from_str(&raw).context("Request body is not valid JSON")?;
        request = request.json(&body)?;
    }

    let response = console.client().send(request).await?;
    let status = response.status;
    let status_line = if status.is_success() {
        status.to_string().green()
    } else {
        status.to_string().red()
    };
    eprintln!("{}", status_line);

    match response.json::<serde_json::Value>() {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{}", response.text()),
    }

    if !status.is_success() {
        bail!("Request failed with {}", status);
    }
    Ok(())
}

fn print_entity(entity: &TrackedEntity) {
    println!(
        "{:>6}  {:<10}  {:>4}%  {}",
        entity.id,
        colored_status(entity.status()),
        entity.progress.progress,
        entity.updated_at.format("%H:%M:%S").to_string().dimmed()
    );
}

fn colored_status(status: TaskStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        TaskStatus::Running => label.cyan(),
        TaskStatus::Completed => label.green(),
        TaskStatus::Failed => label.red(),
        TaskStatus::Stopped => label.yellow(),
        TaskStatus::Pending => label.normal(),
    }
}
