//! ID resolver module
//!
//! Handles resolution of UUID prefixes to full UUIDs by querying the API.
//! This allows users to specify short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::types::IdOrPrefix;

/// Number of recent jobs searched when resolving a prefix
const RESOLVE_WINDOW: i64 = 1000;

/// Resolve a job ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, fetches the most recent jobs and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if:
/// - No job matches the prefix
/// - Multiple jobs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_job_id(client: &ApiClient, id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    // If it's already a full UUID, return it
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let jobs = client
        .list_jobs(None, Some(RESOLVE_WINDOW))
        .await
        .context("Failed to fetch jobs for ID resolution")?;

    match_prefix(&id_or_prefix.to_string(), jobs.iter().map(|j| j.job_id))
}

/// Picks the single id starting with `prefix`
fn match_prefix(prefix: &str, ids: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    let matches: Vec<Uuid> = ids.filter(|id| id.to_string().starts_with(prefix)).collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No job found with ID starting with '{}'", prefix)),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|id| id.to_string()).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple jobs: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}
