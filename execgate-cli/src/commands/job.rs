//! Job command handlers
//!
//! Handles upload, dispatch, status, cancellation and listing of jobs.

use anyhow::{Context, Result, anyhow};
use colored::*;
use execgate_core::domain::job::{JobStatus, Language};
use execgate_core::dto::job::{JobResponse, UploadCode};
use std::path::Path;
use std::time::Duration;

use crate::api::ApiClient;
use crate::id_resolver::resolve_job_id;
use crate::types::IdOrPrefix;

/// Interval between status polls while waiting for a job
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upload a source file
pub async fn upload(
    client: &ApiClient,
    file: &Path,
    project: String,
    language: Option<String>,
    description: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let code = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let language = match language {
        Some(language) => language,
        None => infer_language(file)?.to_string(),
    };

    let req = UploadCode {
        project,
        code,
        language,
        function_name: None,
        description,
        timeout_ms,
    };

    let job = client.upload(&req).await?;

    println!("{}", "✓ Code uploaded".green().bold());
    println!("  Job ID:   {}", job.job_id.to_string().cyan());
    println!("  Project:  {}", job.project);
    println!("  Language: {}", job.language);
    println!("  Code key: {}", job.code_key.dimmed());
    println!();
    println!(
        "{}",
        format!("Run it with: execgate execute {}", job.job_id).dimmed()
    );

    Ok(())
}

/// Dispatch a job, optionally waiting for its outcome
pub async fn execute(client: &ApiClient, id: &str, input: Option<String>, wait: bool) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;

    let job = client.execute(uuid, input.as_deref()).await?;
    println!(
        "{} Job {} is {}",
        "▸".cyan(),
        uuid.to_string().dimmed(),
        colorize_status(job.status)
    );

    if !wait {
        return Ok(());
    }

    loop {
        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        let job = client.status(uuid).await?;
        if job.status.is_terminal() {
            println!();
            print_job_details(&job);
            return Ok(());
        }
    }
}

/// Show the reconciled status of a job
pub async fn status(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.status(uuid).await?;

    print_job_details(&job);

    Ok(())
}

/// Show the stored job record
pub async fn show(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let job = client.get_job(uuid).await?;

    print_job_details(&job);

    Ok(())
}

/// Cancel a job
pub async fn cancel(client: &ApiClient, id: &str) -> Result<()> {
    let uuid = resolve_job_id(client, &IdOrPrefix::parse(id)).await?;
    let response = client.cancel(uuid).await?;

    println!("{}", format!("✓ Job {} cancelled", uuid).green().bold());
    if !response.engine_acknowledged {
        println!(
            "{}",
            "  Execution engine did not confirm the stop".yellow()
        );
    }

    Ok(())
}

/// List jobs
pub async fn list(client: &ApiClient, project: Option<&str>, limit: Option<i64>) -> Result<()> {
    let jobs = client.list_jobs(project, limit).await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Language implied by a source file's extension
fn infer_language(file: &Path) -> Result<Language> {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match extension {
        "py" => Ok(Language::Python),
        "js" | "mjs" | "cjs" => Ok(Language::Node),
        "java" => Ok(Language::Java),
        _ => Err(anyhow!(
            "Cannot infer language of {}, pass --language",
            file.display()
        )),
    }
}

/// Print a one-entry job summary
fn print_job_summary(job: &JobResponse) {
    println!("  {} Job {}", "▸".cyan(), job.job_id.to_string().dimmed());
    println!("    Project:  {}", job.project);
    println!("    Language: {}", job.language);
    println!("    Status:   {}", colorize_status(job.status));
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &JobResponse) {
    println!("{}", "Job Details:".bold());
    println!("  ID:          {}", job.job_id.to_string().cyan());
    println!("  Project:     {}", job.project);
    println!("  Language:    {}", job.language);
    println!("  Code key:    {}", job.code_key.dimmed());
    println!("  Status:      {}", colorize_status(job.status));
    println!("  Timeout:     {}ms", job.timeout_ms);
    println!(
        "  Created:     {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(started) = job.started_at {
        println!("  Started:     {}", started.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(completed) = job.completed_at {
        println!("  Completed:   {}", completed.format("%Y-%m-%d %H:%M:%S"));

        // Calculate duration
        if let Some(started) = job.started_at {
            let duration = completed.signed_duration_since(started);
            println!("  Duration:    {}ms", duration.num_milliseconds());
        }
    }

    if let Some(resource) = &job.resource {
        println!("\n{}", "Resources:".bold());
        if let Some(cpu) = resource.cpu_percent {
            println!("  CPU:         {:.1}%", cpu);
        }
        if let Some(memory) = resource.memory_mb {
            println!("  Memory:      {:.1} MB", memory);
        }
        if let Some(time) = resource.execution_time_ms {
            println!("  Exec time:   {:.0}ms", time);
        }
    }

    if let Some(log) = job.log_key.as_ref().or(job.logs_url.as_ref()) {
        println!("  Logs:        {}", log.dimmed());
    }

    if let Some(result) = &job.result {
        if !result.stdout.is_empty() {
            println!("\n{}", "Stdout:".bold());
            print!("{}", result.stdout);
            if !result.stdout.ends_with('\n') {
                println!();
            }
        }

        if !result.stderr.is_empty() {
            println!("\n{}", "Stderr:".bold());
            println!("{}", result.stderr.red());
        }

        if let Some(error) = &result.error_message {
            println!("\n{}", "Error:".bold());
            println!("{}", error.red());
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> colored::ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Success => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Timeout => status_str.red(),
        JobStatus::Cancelled => status_str.dimmed(),
    }
}
