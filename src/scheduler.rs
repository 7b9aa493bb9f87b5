//! Polling scheduler
//!
//! Drives the claim/execute/record loop as an explicit state machine so
//! shutdown can be injected at every transition instead of only between
//! cycles. One cycle walks `Fetching → (Executing → Recording)* → Idle`;
//! jobs within a batch run strictly one at a time, in fetch order.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AgentError;
use crate::executor::{self, ExecutionReport};
use crate::poller;
use crate::recorder;
use crate::retry::{with_retry, RetryPolicy};
use crate::runner::ScriptRunner;
use crate::store::{AgentRecord, Job, StoreClient, StoreErrorKind};

/// Where the loop currently is within one polling cycle
#[derive(Debug)]
pub enum CyclePhase {
    /// Between cycles; sleeping out the poll interval
    Idle,
    /// Heartbeating and claiming this cycle's batch
    Fetching,
    /// Running one job's script
    Executing(Job),
    /// Persisting the attempt and advancing the job's status
    Recording {
        /// The job whose attempt is being recorded
        job: Job,
        /// What the execution produced
        report: ExecutionReport,
    },
}

/// The agent's control loop
pub struct Scheduler<S, R> {
    store: S,
    runner: R,
    agent: AgentRecord,
    poll_interval: Duration,
    script_timeout: Duration,
    claim_ttl: chrono::Duration,
    retry: RetryPolicy,
    batch: VecDeque<Job>,
}

impl<S, R> Scheduler<S, R>
where
    S: StoreClient,
    R: ScriptRunner,
{
    /// Build a scheduler for a registered agent
    pub fn new(store: S, runner: R, agent: AgentRecord, config: &Config) -> Self {
        Self {
            store,
            runner,
            agent,
            poll_interval: config.poll_interval(),
            script_timeout: config.script_timeout(),
            claim_ttl: config.claim_ttl(),
            retry: config.retry_policy(),
            batch: VecDeque::new(),
        }
    }

    /// Run the polling loop until `shutdown` flips to true or a store
    /// failure survives the retry policy
    ///
    /// The poll interval is measured from the end of one cycle's
    /// processing to the start of the next. The sender side of `shutdown`
    /// must stay alive for as long as the loop should be stoppable.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), AgentError> {
        info!(
            agent_id = %self.agent.id,
            poll_interval_secs = self.poll_interval.as_secs(),
            "polling loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle(&shutdown).await?;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!(agent_id = %self.agent.id, "polling loop stopped");
        Ok(())
    }

    /// Run a single cycle to completion
    ///
    /// Shutdown is honored at every phase transition, with one exception:
    /// a job that has already executed is always recorded first, so its
    /// output is never silently discarded.
    pub async fn run_cycle(&mut self, shutdown: &watch::Receiver<bool>) -> Result<(), AgentError> {
        let mut phase = CyclePhase::Fetching;
        loop {
            if *shutdown.borrow() && !matches!(phase, CyclePhase::Recording { .. }) {
                info!("shutdown requested, abandoning cycle");
                return Ok(());
            }

            phase = self.step(phase).await?;

            if matches!(phase, CyclePhase::Idle) {
                return Ok(());
            }
        }
    }

    /// Advance the state machine by one transition
    async fn step(&mut self, phase: CyclePhase) -> Result<CyclePhase, AgentError> {
        match phase {
            CyclePhase::Idle => Ok(CyclePhase::Idle),

            CyclePhase::Fetching => {
                let agent_id = self.agent.id;

                with_retry(&self.retry, || self.store.touch_agent(agent_id, Utc::now())).await?;

                let batch = poller::claim_batch(
                    &self.store,
                    &self.retry,
                    agent_id,
                    Utc::now(),
                    self.claim_ttl,
                )
                .await?;

                self.batch = batch.into();
                Ok(self.next_job())
            }

            CyclePhase::Executing(job) => {
                let report = executor::execute(&self.runner, &job, self.script_timeout).await;
                Ok(CyclePhase::Recording { job, report })
            }

            CyclePhase::Recording { job, report } => {
                let outcome = recorder::record(&self.store, &self.retry, &job, &report).await;

                match outcome {
                    Ok(_) => {}
                    Err(e) if e.kind() == StoreErrorKind::Permanent => {
                        // Scoped to this job: its claim lapses and it will
                        // be retried later. The rest of the batch proceeds.
                        error!(
                            job_id = %job.id,
                            error = %e,
                            "failed to record job result, leaving claim to lapse"
                        );
                    }
                    // Transient and out of retries: the store connection is
                    // gone, which is fatal for the whole process. Jobs of
                    // this batch already recorded as done stay done.
                    Err(e) => return Err(e.into()),
                }

                Ok(self.next_job())
            }
        }
    }

    fn next_job(&mut self) -> CyclePhase {
        match self.batch.pop_front() {
            Some(job) => CyclePhase::Executing(job),
            None => CyclePhase::Idle,
        }
    }
}
