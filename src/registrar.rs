//! Agent registrar
//!
//! Runs once at startup: inserts this process's identity record and hands
//! back the store-assigned id. Without an identity the agent cannot own
//! jobs, so any rejection here aborts startup.

use tracing::info;

use crate::error::AgentError;
use crate::retry::{with_retry, RetryPolicy};
use crate::store::{AgentRecord, StoreClient};

/// Register this process with the store under `name`
///
/// Transient store failures are retried per `policy`; a permanent
/// rejection (or exhausted retries) surfaces as
/// [`AgentError::Registration`], carrying the store's status and message.
pub async fn register<S>(
    store: &S,
    policy: &RetryPolicy,
    name: &str,
) -> Result<AgentRecord, AgentError>
where
    S: StoreClient + ?Sized,
{
    info!(name = %name, "registering agent");

    let agent = with_retry(policy, || store.register_agent(name))
        .await
        .map_err(AgentError::Registration)?;

    info!(agent_id = %agent.id, name = %agent.name, "agent registered");
    Ok(agent)
}
