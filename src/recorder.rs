//! Result recorder
//!
//! Persists one execution attempt: append the log row, then advance the
//! job's status. The order is load-bearing: a job may only leave the
//! claimed state after its log row exists, so no job ever reaches `done`
//! with zero logs. The converse failure (log written, status update lost)
//! leaves the job re-claimable and produces a duplicate log on the next
//! attempt; that asymmetry is accepted.

use tracing::{debug, info};

use crate::executor::ExecutionReport;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::{Job, NewJobLog, StoreClient, StoreError};

/// Record `report` for `job` and advance the job's lifecycle state
///
/// A normal attempt ends `done`; a timed-out attempt is released back to
/// `pending` so it can be claimed again instead of stalling forever. If
/// the log insert fails, no status change is attempted.
///
/// Retries wrap each store call separately: a transient failure of the
/// status update must never re-insert the log row it follows.
pub async fn record<S>(
    store: &S,
    policy: &RetryPolicy,
    job: &Job,
    report: &ExecutionReport,
) -> Result<Job, StoreError>
where
    S: StoreClient + ?Sized,
{
    let log = with_retry(policy, || {
        store.insert_log(NewJobLog {
            job_id: job.id,
            output: report.output.clone(),
            is_error: report.is_error,
            timed_out: report.timed_out,
        })
    })
    .await?;

    debug!(
        job_id = %job.id,
        log_id = log.id,
        is_error = report.is_error,
        "log entry inserted"
    );

    let updated = if report.timed_out {
        let updated = with_retry(policy, || store.release_job(job.id)).await?;
        info!(job_id = %job.id, "job released for reclaim after timeout");
        updated
    } else {
        let updated = with_retry(policy, || store.mark_done(job.id)).await?;
        info!(job_id = %job.id, "job marked done");
        updated
    };

    Ok(updated)
}
