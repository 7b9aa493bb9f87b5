//! Record types persisted in the backing store
//!
//! Three relations: `agents`, `jobs`, `job_logs`. The store assigns every
//! `id`; the agent never invents one. All types serialize to the JSON
//! shapes the store's REST layer expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a job
///
/// `Claimed` marks the window between fetch and recording: a store-side
/// conditional update moves a job from `Pending` to `Claimed`, so at most
/// one agent instance holds it at a time. A claim expires after its TTL,
/// at which point the job becomes claimable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed
    Pending,
    /// Held by one agent instance, until the claim expires
    Claimed,
    /// Executed and recorded; terminal
    Done,
}

/// A registered agent identity
///
/// Created once at process startup; `id` is immutable after insert.
/// `last_seen` is refreshed once per polling cycle as a heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Store-assigned identifier
    pub id: Uuid,
    /// Display name, typically the machine's hostname
    pub name: String,
    /// Last heartbeat timestamp
    pub last_seen: DateTime<Utc>,
}

/// A unit of work addressed to exactly one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Store-assigned identifier
    pub id: Uuid,
    /// Owning agent; never changes after creation
    pub agent_id: Uuid,
    /// Opaque script payload, executed verbatim
    pub script: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Lifecycle state
    pub status: JobStatus,
    /// When the current claim lapses; `None` unless `status` is `Claimed`
    #[serde(default)]
    pub claim_expires_at: Option<DateTime<Utc>>,
}

/// An immutable record of one execution attempt
///
/// Append-only. A job that is executed more than once (for example after a
/// recording failure) accumulates one log row per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLog {
    /// Store-assigned identifier
    pub id: i64,
    /// The job this attempt belongs to
    pub job_id: Uuid,
    /// Captured script output, newline-joined
    pub output: String,
    /// Whether the script runner reported any errors
    pub is_error: bool,
    /// Whether the attempt was cut off by the execution timeout
    #[serde(default)]
    pub timed_out: bool,
    /// Insertion timestamp
    pub logged_at: DateTime<Utc>,
}

/// Insert payload for a job log row
#[derive(Debug, Clone, Serialize)]
pub struct NewJobLog {
    /// The job this attempt belongs to
    pub job_id: Uuid,
    /// Captured script output, newline-joined
    pub output: String,
    /// Whether the script runner reported any errors
    pub is_error: bool,
    /// Whether the attempt was cut off by the execution timeout
    pub timed_out: bool,
}
