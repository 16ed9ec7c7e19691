//! The `JobStore` repository.
//!
//! All status transitions are guarded so that terminal writes are safe
//! under at-least-once semantics: a failure write only fires while the
//! job is still processing, and a completed job is never demoted.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use vpost_models::{InputKind, Job, JobId, JobStatus, NewPost, Post, PostId};

use crate::error::{StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id                  TEXT PRIMARY KEY,
        input_kind          TEXT NOT NULL,
        input_summary       TEXT NOT NULL,
        content_fingerprint TEXT,
        status              TEXT NOT NULL DEFAULT 'processing',
        error               TEXT,
        transcript          TEXT,
        created_at          TEXT NOT NULL,
        updated_at          TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs (status)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_fingerprint ON jobs (input_kind, content_fingerprint)",
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id            TEXT PRIMARY KEY,
        job_id        TEXT NOT NULL REFERENCES jobs (id) ON DELETE CASCADE,
        content       TEXT NOT NULL,
        quote_snippet TEXT,
        media_path    TEXT,
        start_time    REAL,
        end_time      REAL,
        page_number   INTEGER,
        created_at    TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_job_id ON posts (job_id)",
];

/// Durable repository for `Job` and `Post` entities.
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Open a store at the given SQLite URL, creating the file if needed.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to job store at {}", url);
        Ok(Self { pool })
    }

    /// Apply the schema. Idempotent; run once at startup.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Close the underlying pool. Further calls will fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert a freshly created job.
    pub async fn create_job(&self, job: &Job) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, input_kind, input_summary, content_fingerprint,
                              status, error, transcript, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.input_kind.as_str())
        .bind(&job.input_summary)
        .bind(job.content_fingerprint.as_deref())
        .bind(job.status.as_str())
        .bind(job.error.as_deref())
        .bind(job.transcript.as_deref())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(job_id = %job.id, kind = %job.input_kind, "Created job");
        Ok(())
    }

    /// Fetch a job by id.
    pub async fn get_job(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| job_from_row(&r)).transpose()
    }

    /// Fetch all posts belonging to a job, in creation order.
    pub async fn posts_for_job(&self, id: &JobId) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query("SELECT * FROM posts WHERE job_id = ? ORDER BY rowid")
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(post_from_row).collect()
    }

    /// Fetch a single post by id.
    pub async fn get_post(&self, id: &PostId) -> StoreResult<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| post_from_row(&r)).transpose()
    }

    /// Dedup lookup: id of a completed job with the same input kind and
    /// fingerprint. Processing and failed jobs never match, so callers
    /// cannot be handed an incomplete result or a perpetuated failure.
    pub async fn find_completed(
        &self,
        input_kind: InputKind,
        fingerprint: &str,
    ) -> StoreResult<Option<JobId>> {
        let row = sqlx::query(
            r#"
            SELECT id FROM jobs
            WHERE input_kind = ? AND content_fingerprint = ? AND status = 'complete'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(input_kind.as_str())
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| JobId::from_string(r.get::<String, _>("id"))))
    }

    /// Persist the worker's posts and flip the job to complete, as one
    /// transactional unit so readers never observe a torn state.
    ///
    /// Completing wins over a failure written by a racing reaper (last
    /// meaningful write), but a job that is already complete is left
    /// untouched so posts are never duplicated.
    pub async fn complete_job(
        &self,
        id: &JobId,
        transcript: Option<&str>,
        posts: &[NewPost],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'complete',
                error = NULL,
                transcript = COALESCE(?, transcript),
                updated_at = ?
            WHERE id = ? AND status != 'complete'
            "#,
        )
        .bind(transcript)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Either the job does not exist or it already completed.
            drop(tx);
            return match self.get_job(id).await? {
                Some(_) => Ok(()),
                None => Err(StoreError::JobNotFound(id.to_string())),
            };
        }

        for post in posts {
            let bounds = post.clip_bounds();
            sqlx::query(
                r#"
                INSERT INTO posts (id, job_id, content, quote_snippet, media_path,
                                   start_time, end_time, page_number, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(PostId::new().as_str())
            .bind(id.as_str())
            .bind(&post.content)
            .bind(post.quote_snippet.as_deref())
            .bind(post.media_path.as_deref())
            .bind(bounds.map(|(start, _)| start))
            .bind(bounds.map(|(_, end)| end))
            .bind(post.page_number)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(job_id = %id, posts = posts.len(), "Job completed");
        Ok(())
    }

    /// Mark a job failed with a message. Only fires while the job is
    /// still processing, so repeated failure writes are no-ops and a
    /// completed job can never be demoted. Returns whether the write
    /// took effect.
    pub async fn fail_job(&self, id: &JobId, error: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', error = ?, updated_at = ?
            WHERE id = ? AND status = 'processing'
            "#,
        )
        .bind(error)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() > 0;
        if applied {
            info!(job_id = %id, error = %error, "Job failed");
        }
        Ok(applied)
    }

    /// Fail every processing job created before the timeout threshold.
    /// Purely timestamp-driven so it works even when the process that
    /// spawned the worker is long gone. Returns the number of jobs
    /// transitioned.
    pub async fn reap_stale(&self, older_than: Duration, message: &str) -> StoreResult<u64> {
        let threshold =
            chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::days(365));
        let cutoff: DateTime<Utc> = Utc::now() - threshold;

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed', error = ?, updated_at = ?
            WHERE status = 'processing' AND created_at < ?
            "#,
        )
        .bind(message)
        .bind(Utc::now())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Attach clip media and bounds to an existing post. Both bounds are
    /// written together; the rest of the post is untouched.
    pub async fn attach_clip(
        &self,
        id: &PostId,
        media_path: &str,
        start_time: f64,
        end_time: f64,
        quote_snippet: Option<&str>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET media_path = ?,
                start_time = ?,
                end_time = ?,
                quote_snippet = COALESCE(?, quote_snippet)
            WHERE id = ?
            "#,
        )
        .bind(media_path)
        .bind(start_time)
        .bind(end_time)
        .bind(quote_snippet)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PostNotFound(id.to_string()));
        }
        Ok(())
    }
}

fn job_from_row(row: &SqliteRow) -> StoreResult<Job> {
    let kind: String = row.try_get("input_kind")?;
    let status: String = row.try_get("status")?;

    Ok(Job {
        id: JobId::from_string(row.try_get::<String, _>("id")?),
        input_kind: kind
            .parse::<InputKind>()
            .map_err(|e| StoreError::decode(e.to_string()))?,
        input_summary: row.try_get("input_summary")?,
        content_fingerprint: row.try_get("content_fingerprint")?,
        status: JobStatus::parse(&status)
            .ok_or_else(|| StoreError::decode(format!("unknown job status '{status}'")))?,
        error: row.try_get("error")?,
        transcript: row.try_get("transcript")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn post_from_row(row: &SqliteRow) -> StoreResult<Post> {
    Ok(Post {
        id: PostId::from_string(row.try_get::<String, _>("id")?),
        job_id: JobId::from_string(row.try_get::<String, _>("job_id")?),
        content: row.try_get("content")?,
        quote_snippet: row.try_get("quote_snippet")?,
        media_path: row.try_get("media_path")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        page_number: row.try_get("page_number")?,
        created_at: row.try_get("created_at")?,
    })
}
