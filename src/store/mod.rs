//! Backing-store access
//!
//! The agent talks to the store through the narrow [`StoreClient`] trait;
//! [`HttpStore`] is the production implementation against the store's REST
//! layer. Tests substitute their own implementations.

pub mod http;
pub mod records;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use http::HttpStore;
pub use records::{AgentRecord, Job, JobLog, JobStatus, NewJobLog};

/// Errors returned by store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never produced an HTTP response (connect failure,
    /// request timeout, DNS, ...)
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("store returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body text, surfaced verbatim in diagnostics
        body: String,
    },

    /// The response body could not be decoded into the expected record
    #[error("failed to decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A write that should return the affected row returned none
    #[error("{table} write returned no rows")]
    NoRows {
        /// Relation the write targeted
        table: &'static str,
    },
}

/// Operational classification of a store error
///
/// Transient failures are worth a bounded retry; permanent ones (bad
/// credentials, constraint violations, undecodable replies) are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Likely to succeed if retried shortly
    Transient,
    /// Retrying will not help
    Permanent,
}

impl StoreError {
    /// Classify this error for retry purposes
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Transport(_) => StoreErrorKind::Transient,
            StoreError::Http { status, .. } => match status {
                408 | 429 => StoreErrorKind::Transient,
                500..=599 => StoreErrorKind::Transient,
                _ => StoreErrorKind::Permanent,
            },
            StoreError::Decode(_) | StoreError::NoRows { .. } => StoreErrorKind::Permanent,
        }
    }
}

/// Narrow interface over the backing store
///
/// Covers exactly the operations the control loop needs: one insert per
/// relation, the claimable-jobs query, and the guarded status transitions.
/// All writes that transition a job are conditional on its current state,
/// so a lost race surfaces as "no rows matched" rather than a blind
/// overwrite.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Insert a new agent identity; the store assigns the id
    async fn register_agent(&self, name: &str) -> Result<AgentRecord, StoreError>;

    /// Refresh the agent's `last_seen` heartbeat
    async fn touch_agent(&self, agent_id: Uuid, seen_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// All jobs addressed to this agent that are claimable at `now`:
    /// pending jobs, plus claimed jobs whose claim has lapsed
    async fn fetch_claimable(
        &self,
        agent_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, StoreError>;

    /// Atomically claim one job, guarded on it still being claimable at
    /// `now`. Returns `Ok(None)` when another instance won the race.
    async fn claim_job(
        &self,
        job_id: Uuid,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Job>, StoreError>;

    /// Append one execution-attempt log row
    async fn insert_log(&self, log: NewJobLog) -> Result<JobLog, StoreError>;

    /// Transition a claimed job to `Done` and clear its claim
    async fn mark_done(&self, job_id: Uuid) -> Result<Job, StoreError>;

    /// Return a claimed job to `Pending` so it can be claimed again
    /// (used after a timed-out execution)
    async fn release_job(&self, job_id: Uuid) -> Result<Job, StoreError>;
}
