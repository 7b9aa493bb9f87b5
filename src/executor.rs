//! Job executor
//!
//! Hands a job's script to the runner, bounded by the execution timeout,
//! and condenses whatever happens into an [`ExecutionReport`]. A failing
//! or timed-out script is data to be recorded, never a process-level
//! error: the loop must keep serving the rest of the batch.

use std::time::Duration;
use tracing::{error, info, warn};

use crate::runner::ScriptRunner;
use crate::store::Job;

/// What one execution attempt produced, ready to be recorded
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    /// Captured output lines, joined with `\n`
    pub output: String,
    /// True iff the runner reported errors (or could not run the script)
    pub is_error: bool,
    /// True iff the attempt was cut off by the execution timeout
    pub timed_out: bool,
}

/// Execute one job's script, bounded by `timeout`
///
/// The script text is passed to the runner verbatim. On timeout the
/// runner's future is dropped, which tears down the script process, and
/// the report carries the distinct timeout marker so the recorder can
/// leave the job re-claimable instead of marking it done.
pub async fn execute(
    runner: &dyn ScriptRunner,
    job: &Job,
    timeout: Duration,
) -> ExecutionReport {
    info!(
        job_id = %job.id,
        created_at = %job.created_at,
        script_len = job.script.len(),
        "executing job script"
    );

    match tokio::time::timeout(timeout, runner.run(&job.script)).await {
        Ok(Ok(output)) => {
            info!(
                job_id = %job.id,
                lines = output.output_lines.len(),
                had_errors = output.had_errors,
                "script finished"
            );
            ExecutionReport {
                output: output.output_lines.join("\n"),
                is_error: output.had_errors,
                timed_out: false,
            }
        }
        Ok(Err(e)) => {
            warn!(job_id = %job.id, error = %e, "script could not be run");
            ExecutionReport {
                output: e.to_string(),
                is_error: true,
                timed_out: false,
            }
        }
        Err(_) => {
            error!(
                job_id = %job.id,
                timeout_secs = timeout.as_secs(),
                "script execution timed out"
            );
            ExecutionReport {
                output: String::new(),
                is_error: true,
                timed_out: true,
            }
        }
    }
}
