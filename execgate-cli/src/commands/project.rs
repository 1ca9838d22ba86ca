//! Project command handlers

use anyhow::Result;
use colored::*;

use crate::api::ApiClient;

/// List all projects
pub async fn list(client: &ApiClient) -> Result<()> {
    let projects = client.list_projects().await?;

    if projects.is_empty() {
        println!("{}", "No projects found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} project(s):", projects.len()).bold());
    println!();
    for project in projects {
        println!("  {} {}", "▸".cyan(), project.project.bold());
        if let Some(description) = &project.description {
            println!("    {}", description);
        }
        println!(
            "    Created: {}",
            project
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .dimmed()
        );
    }

    Ok(())
}
