//! Deferred analysis jobs.
//!
//! Upload and metadata-update events only enqueue a job; a worker drains
//! the queue and runs the pipeline off the triggering request. Jobs live in
//! the `jobs` table, so a queue survives restarts.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::analysis::Pipeline;
use crate::error::Result;
use crate::store::AttachmentId;

/// How long the worker sleeps when the queue is empty.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// A claimed job.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub attachment_id: AttachmentId,
}

/// SQLite-backed job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    pool: SqlitePool,
}

impl JobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Queue an analysis of `attachment_id`.
    ///
    /// Returns `false` when a job for it is already waiting.
    pub async fn schedule(&self, attachment_id: AttachmentId) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO jobs (attachment_id) VALUES (?)")
            .bind(attachment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Attachment {}: analysis already queued", attachment_id);
            return Ok(false);
        }

        tracing::info!("Attachment {}: analysis queued", attachment_id);
        Ok(true)
    }

    /// Mark the oldest queued job as running and return it.
    pub async fn claim_next(&self) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET status = 'running'
            WHERE id = (SELECT id FROM jobs WHERE status = 'queued' ORDER BY id LIMIT 1)
            RETURNING id, attachment_id
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    pub async fn complete(&self, job: &Job) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'done', finished_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(job.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn fail(&self, job: &Job, error: &str) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'failed', error = ?, finished_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(error)
            .bind(job.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Whether an analysis of `attachment_id` is waiting or running.
    pub async fn is_pending(&self, attachment_id: AttachmentId) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs WHERE attachment_id = ? AND status IN ('queued', 'running')",
        )
        .bind(attachment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Put jobs left `running` by a worker that stopped mid-job back in the
    /// queue. Returns the number requeued.
    ///
    /// Must only be called while no other worker is running. A job whose
    /// attachment already has a queued job is marked failed instead, since
    /// the queued one covers it.
    pub async fn recover_interrupted(&self) -> Result<u64> {
        let requeued = sqlx::query("UPDATE OR IGNORE jobs SET status = 'queued' WHERE status = 'running'")
            .execute(&self.pool)
            .await?
            .rows_affected();

        sqlx::query(
            "UPDATE jobs SET status = 'failed', error = 'interrupted', finished_at = CURRENT_TIMESTAMP WHERE status = 'running'",
        )
        .execute(&self.pool)
        .await?;

        if requeued > 0 {
            tracing::warn!("Requeued {} interrupted jobs", requeued);
        }
        Ok(requeued)
    }

    /// Number of jobs waiting to run.
    pub async fn queued_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE status = 'queued'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Run queued jobs until the queue is empty. Returns the number run.
///
/// A failing job is marked failed and does not stop the others; only
/// queue errors end the run early.
pub async fn run_pending(queue: &JobQueue, pipeline: &Pipeline) -> Result<usize> {
    let mut processed = 0;

    while let Some(job) = queue.claim_next().await? {
        tracing::info!("Picked up job {} for attachment {}", job.id, job.attachment_id);

        match pipeline.update_attachment_data(job.attachment_id).await {
            Ok(_) => queue.complete(&job).await?,
            Err(e) => {
                tracing::warn!("Job {} failed: {}", job.id, e);
                queue.fail(&job, &e.to_string()).await?;
            }
        }
        processed += 1;
    }

    Ok(processed)
}

/// Drain the queue, then keep polling unless `once` is set.
///
/// Jobs interrupted by an earlier worker are requeued first.
pub async fn run_worker(queue: &JobQueue, pipeline: &Pipeline, poll_interval: Duration, once: bool) -> Result<()> {
    queue.recover_interrupted().await?;
    let mut sleeping = false;

    loop {
        let processed = run_pending(queue, pipeline).await?;
        if processed > 0 {
            sleeping = false;
        }

        if once {
            return Ok(());
        }

        if !sleeping {
            sleeping = true;
            tracing::info!("No jobs, going to sleep...");
        }
        tokio::time::sleep(poll_interval).await;
    }
}
