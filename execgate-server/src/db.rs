use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create projects table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            project VARCHAR(255) PRIMARY KEY,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            job_id UUID PRIMARY KEY,
            project VARCHAR(255) NOT NULL REFERENCES projects(project),
            code_key VARCHAR(500) NOT NULL,
            language VARCHAR(50) NOT NULL,
            status VARCHAR(20) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            timeout_ms BIGINT NOT NULL,
            result JSONB
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create executions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS executions (
            execution_id UUID PRIMARY KEY,
            job_id UUID NOT NULL REFERENCES jobs(job_id),
            stdout TEXT NOT NULL DEFAULT '',
            stderr TEXT NOT NULL DEFAULT '',
            log_key VARCHAR(500),
            logs_url VARCHAR(500),
            error_message TEXT,
            cpu_percent DOUBLE PRECISION,
            memory_mb DOUBLE PRECISION,
            execution_time_ms DOUBLE PRECISION,
            completed_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_project_status ON jobs(project, status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at DESC)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_executions_job_id ON executions(job_id, completed_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
