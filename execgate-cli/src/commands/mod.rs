//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod project;

use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

use crate::api::ApiClient;
use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Upload a source file and create a job
    Upload {
        /// Path to the source file
        file: PathBuf,

        /// Project the job belongs to
        #[arg(short, long)]
        project: String,

        /// Source language (python, node, java); inferred from the file extension if omitted
        #[arg(short, long)]
        language: Option<String>,

        /// Project description, used when the project is first created
        #[arg(short, long)]
        description: Option<String>,

        /// Execution budget in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Dispatch a job to the execution engine
    Execute {
        /// Job ID or unambiguous prefix
        id: String,

        /// Input passed to the program
        #[arg(short, long)]
        input: Option<String>,

        /// Wait until the job finishes
        #[arg(short, long)]
        wait: bool,
    },
    /// Show the current status of a job
    Status {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Show the stored job record
    Show {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// Cancel a job
    Cancel {
        /// Job ID or unambiguous prefix
        id: String,
    },
    /// List jobs, newest first
    List {
        /// Only list jobs of this project
        #[arg(short, long)]
        project: Option<String>,

        /// Maximum number of jobs
        #[arg(short, long)]
        limit: Option<i64>,
    },
    /// List projects
    Projects,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.gateway_url);

    match command {
        Commands::Upload {
            file,
            project,
            language,
            description,
            timeout_ms,
        } => job::upload(&client, &file, project, language, description, timeout_ms).await,
        Commands::Execute { id, input, wait } => job::execute(&client, &id, input, wait).await,
        Commands::Status { id } => job::status(&client, &id).await,
        Commands::Show { id } => job::show(&client, &id).await,
        Commands::Cancel { id } => job::cancel(&client, &id).await,
        Commands::List { project, limit } => job::list(&client, project.as_deref(), limit).await,
        Commands::Projects => project::list(&client).await,
    }
}
