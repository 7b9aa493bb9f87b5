//! Job poller
//!
//! One fetch per cycle: query the store for jobs addressed to this agent
//! that are claimable right now, then take an atomic claim on each before
//! it is executed. Claims lost to a competing instance are skipped, not
//! errors. No ordering is imposed beyond whatever the store returns.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::retry::{with_retry, RetryPolicy};
use crate::store::{Job, StoreClient, StoreError};

/// Fetch and claim this cycle's batch of jobs
///
/// Claimable means `pending`, or `claimed` with a lapsed claim (an
/// instance that died mid-job leaves such a row behind). Each successful
/// claim is stamped with `now + claim_ttl`; the claim must outlive one
/// execution, or another instance may start the same job.
///
/// Each store call carries its own transient-failure retry, so a network
/// blip between two claims does not forfeit the claims already taken.
pub async fn claim_batch<S>(
    store: &S,
    policy: &RetryPolicy,
    agent_id: Uuid,
    now: DateTime<Utc>,
    claim_ttl: Duration,
) -> Result<Vec<Job>, StoreError>
where
    S: StoreClient + ?Sized,
{
    let candidates = with_retry(policy, || store.fetch_claimable(agent_id, now)).await?;

    if candidates.is_empty() {
        debug!(agent_id = %agent_id, "no claimable jobs");
        return Ok(Vec::new());
    }

    info!(
        agent_id = %agent_id,
        candidates = candidates.len(),
        "fetched claimable jobs"
    );

    let expires_at = now + claim_ttl;
    let mut claimed = Vec::with_capacity(candidates.len());
    for job in candidates {
        match with_retry(policy, || store.claim_job(job.id, now, expires_at)).await? {
            Some(claimed_job) => claimed.push(claimed_job),
            None => debug!(job_id = %job.id, "claim lost to another instance"),
        }
    }

    Ok(claimed)
}
