//! Postgres job store
//!
//! Handles all database operations related to jobs, projects and execution
//! attempts.

use async_trait::async_trait;
use execgate_core::domain::execution::ExecutionRecord;
use execgate_core::domain::job::{Job, JobResult, JobStatus, Language, ResourceMetrics};
use execgate_core::domain::project::Project;
use sqlx::PgPool;
use uuid::Uuid;

use super::{JobStore, StatusUpdate, StoreError, StoreResult};

/// Job store backed by a Postgres pool
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert_job(&self, job: &Job) -> StoreResult<()> {
        let result = job.result.as_ref().map(serde_json::to_value).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, project, code_key, language, status, created_at,
                              updated_at, started_at, completed_at, timeout_ms, result)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.job_id)
        .bind(&job.project)
        .bind(&job.code_key)
        .bind(job.language.as_str())
        .bind(job.status.as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(to_db_millis(job.timeout_ms))
        .bind(result)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> StoreResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT job_id, project, code_key, language, status, created_at, updated_at,
                   started_at, completed_at, timeout_ms, result
            FROM jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn compare_and_set_status(
        &self,
        job_id: Uuid,
        expected: JobStatus,
        update: StatusUpdate,
    ) -> StoreResult<bool> {
        let result = update.result.as_ref().map(serde_json::to_value).transpose()?;

        // The status predicate makes the write conditional on nobody having
        // moved the job since it was read
        let outcome = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1,
                updated_at = $2,
                started_at = CASE WHEN $3 THEN COALESCE(started_at, $2) ELSE started_at END,
                completed_at = CASE WHEN $4 THEN COALESCE(completed_at, $2) ELSE completed_at END,
                result = COALESCE($5, result)
            WHERE job_id = $6 AND status = $7
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.at)
        .bind(update.status == JobStatus::Running)
        .bind(update.status.is_terminal())
        .bind(result)
        .bind(job_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() == 1)
    }

    async fn list_jobs(&self, project: Option<&str>, limit: usize) -> StoreResult<Vec<Job>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = match project {
            Some(project) => {
                sqlx::query_as::<_, JobRow>(
                    r#"
                    SELECT job_id, project, code_key, language, status, created_at, updated_at,
                           started_at, completed_at, timeout_ms, result
                    FROM jobs
                    WHERE project = $1
                    ORDER BY created_at DESC
                    LIMIT $2
                    "#,
                )
                .bind(project)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, JobRow>(
                    r#"
                    SELECT job_id, project, code_key, language, status, created_at, updated_at,
                           started_at, completed_at, timeout_ms, result
                    FROM jobs
                    ORDER BY created_at DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn ensure_project(
        &self,
        project: &str,
        description: Option<&str>,
    ) -> StoreResult<Project> {
        sqlx::query(
            r#"
            INSERT INTO projects (project, description, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (project) DO NOTHING
            "#,
        )
        .bind(project)
        .bind(description)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, ProjectRow>(
            "SELECT project, description, created_at FROM projects WHERE project = $1",
        )
        .bind(project)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            "SELECT project, description, created_at FROM projects ORDER BY project ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO executions (execution_id, job_id, stdout, stderr, log_key, logs_url,
                                    error_message, cpu_percent, memory_mb, execution_time_ms,
                                    completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.execution_id)
        .bind(record.job_id)
        .bind(&record.stdout)
        .bind(&record.stderr)
        .bind(&record.log_key)
        .bind(&record.logs_url)
        .bind(&record.error_message)
        .bind(record.resource.cpu_percent)
        .bind(record.resource.memory_mb)
        .bind(record.resource.execution_time_ms)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_execution(&self, job_id: Uuid) -> StoreResult<Option<ExecutionRecord>> {
        let row = sqlx::query_as::<_, ExecutionRow>(
            r#"
            SELECT execution_id, job_id, stdout, stderr, log_key, logs_url, error_message,
                   cpu_percent, memory_mb, execution_time_ms, completed_at
            FROM executions
            WHERE job_id = $1
            ORDER BY completed_at DESC
            LIMIT 1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn to_db_millis(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: Uuid,
    project: String,
    code_key: String,
    language: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    timeout_ms: i64,
    result: Option<serde_json::Value>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|e| StoreError::Corrupt(format!("job {}: {}", row.job_id, e)))?;
        let language = row
            .language
            .parse::<Language>()
            .map_err(|e| StoreError::Corrupt(format!("job {}: {}", row.job_id, e)))?;
        let result = row
            .result
            .map(serde_json::from_value::<JobResult>)
            .transpose()?;

        Ok(Job {
            job_id: row.job_id,
            project: row.project,
            code_key: row.code_key,
            language,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            timeout_ms: u64::try_from(row.timeout_ms).unwrap_or(0),
            result,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    project: String,
    description: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            project: row.project,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ExecutionRow {
    execution_id: Uuid,
    job_id: Uuid,
    stdout: String,
    stderr: String,
    log_key: Option<String>,
    logs_url: Option<String>,
    error_message: Option<String>,
    cpu_percent: Option<f64>,
    memory_mb: Option<f64>,
    execution_time_ms: Option<f64>,
    completed_at: chrono::DateTime<chrono::Utc>,
}

impl From<ExecutionRow> for ExecutionRecord {
    fn from(row: ExecutionRow) -> Self {
        ExecutionRecord {
            execution_id: row.execution_id,
            job_id: row.job_id,
            stdout: row.stdout,
            stderr: row.stderr,
            log_key: row.log_key,
            logs_url: row.logs_url,
            error_message: row.error_message,
            resource: ResourceMetrics {
                cpu_percent: row.cpu_percent,
                memory_mb: row.memory_mb,
                execution_time_ms: row.execution_time_ms,
            },
            completed_at: row.completed_at,
        }
    }
}
