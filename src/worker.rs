//! The worker loop: iterate task indices, apply the claim protocol, invoke the user's
//! job, and classify its outcome.
//!
//! The user's job function is the one external collaborator this crate treats as
//! opaque; everything else here — index iteration, claiming, per-task logging, marker
//! bookkeeping — is the worker's own responsibility.

use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;
use tracing::error;

use crate::claim::ClaimAttempt;
use crate::claim::ClaimError;
use crate::claim::LockRecord;
use crate::claim::finish_recoverable_error;
use crate::claim::finish_success;
use crate::claim::release_without_marker;
use crate::claim::try_claim;
use crate::jobspec::Assignment;
use crate::jobspec::JobSpec;

/// The parameters and metadata delivered to one invocation of the user's job.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// The concrete, typed parameters for this job.
    pub params: Assignment,
    /// The stringified form of every parameter.
    pub metadata: std::collections::BTreeMap<String, String>,
    /// Whether this invocation is running under [`run_interactive`] rather than the
    /// claim-protected worker loop.
    pub interactive: bool,
}

/// The outcome a job function returns, distinguishing recoverable failures (which
/// write an `.err` marker and let the worker continue) from fatal interruptions (which
/// propagate immediately and write no terminal marker).
///
/// Rust has no analogue to Python's `except Exception` vs. `KeyboardInterrupt` /
/// `SystemExit` exception-hierarchy distinction, so this classification is made
/// explicit and total in the return type instead of inferred from what was thrown.
#[derive(Debug, Error)]
pub enum JobError {
    /// A fatal interruption: re-raised immediately, no terminal marker written.
    #[error("fatal interruption: {0}")]
    Fatal(String),
    /// Any other failure: recorded as an `.err` marker, the worker moves on.
    #[error(transparent)]
    Recoverable(#[from] anyhow::Error),
}

/// The user-supplied job, invoked once per claimed task index.
pub trait JobFn: Send + Sync {
    /// Runs the job for the given context.
    fn call(&self, ctx: JobContext) -> Result<(), JobError>;
}

impl<F> JobFn for F
where
    F: Fn(JobContext) -> Result<(), JobError> + Send + Sync,
{
    fn call(&self, ctx: JobContext) -> Result<(), JobError> {
        self(ctx)
    }
}

/// Errors raised by the worker loop itself, as opposed to errors from the user's job
/// (which are classified and recorded, not propagated).
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Setting up `locks/` or the log directory failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Claim-marker manipulation failed for reasons other than contention.
    #[error("claim error: {0}")]
    Claim(#[from] ClaimError),
    /// The job raised a fatal interruption; the worker stopped at this index.
    #[error("fatal interruption at task {task_index}: {reason}")]
    Fatal {
        /// The index the worker was processing when the fatal error occurred.
        task_index: usize,
        /// The reason given by the job.
        reason: String,
    },
}

/// Configuration for one worker process's pass over the job space.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding `.lck`/`.done`/`.err` marker files.
    pub locks_dir: PathBuf,
    /// Directory holding per-task log files.
    pub log_dir: PathBuf,
    /// The job's display name, embedded in marker and log filenames.
    pub job_name: String,
    /// The submission attempt's unique id.
    pub job_id: String,
    /// The number of task indices to iterate, `[0, num_jobs)`.
    pub num_jobs: usize,
}

/// Runs the worker loop: ensures `locks/` and the log directory exist, then attempts
/// every index in `[0, num_jobs)` in ascending order, applying the claim protocol and
/// invoking `job` for every index this process successfully claims.
///
/// Claim contention and already-terminal indices are expected and silent (beyond a
/// debug-level trace); only a fatal interruption from the job or an I/O failure in the
/// claim machinery itself stops the loop early.
pub fn do_job(spec: &JobSpec, job: &dyn JobFn, config: &WorkerConfig) -> Result<(), WorkerError> {
    std::fs::create_dir_all(&config.locks_dir)?;
    std::fs::create_dir_all(&config.log_dir)?;

    for task_index in 0..config.num_jobs {
        let record = LockRecord::new(&config.locks_dir, &config.job_name, &config.job_id, task_index);

        match try_claim(&record)? {
            ClaimAttempt::AlreadyDone => {
                debug!(task_index, "already done, skipping");
                continue;
            }
            ClaimAttempt::AlreadyErrored => {
                debug!(task_index, "previously errored, skipping");
                continue;
            }
            ClaimAttempt::Contended => {
                debug!(task_index, "already in progress, skipping");
                continue;
            }
            ClaimAttempt::Acquired => {}
        }

        let log_path = config
            .log_dir
            .join(format!("run-{}-{}-{}.log", config.job_name, config.job_id, task_index));
        let _log_guard = attach_task_log(&log_path).ok();

        let payload = spec.job_at(task_index);
        debug!(task_index, metadata = ?payload.metadata, "beginning job");

        let ctx = JobContext {
            params: payload.params,
            metadata: payload.metadata,
            interactive: false,
        };

        match job.call(ctx) {
            Ok(()) => finish_success(&record)?,
            Err(JobError::Recoverable(err)) => {
                error!(task_index, error = %err, "job failed, recorded as errored");
                finish_recoverable_error(&record)?;
            }
            Err(JobError::Fatal(reason)) => {
                release_without_marker(&record)?;
                return Err(WorkerError::Fatal { task_index, reason });
            }
        }
    }

    Ok(())
}

/// Runs exactly one index directly, without claiming or writing any marker, and
/// returns the job's outcome instead of recording it. Intended for single-machine
/// debugging of the job function.
pub fn run_interactive(spec: &JobSpec, job: &dyn JobFn, task_index: usize) -> Result<(), JobError> {
    let payload = spec.job_at(task_index);
    let ctx = JobContext {
        params: payload.params,
        metadata: payload.metadata,
        interactive: true,
    };
    job.call(ctx)
}

/// Holds the two guards that keep a per-task log sink alive: the [`tracing`] default
/// subscriber override, and the non-blocking file writer's flush-on-drop worker.
/// Dropping this detaches the sink, the structural analogue of removing a
/// `logging.FileHandler` from the logger at the end of a task.
struct TaskLogGuard(tracing::subscriber::DefaultGuard, tracing_appender::non_blocking::WorkerGuard);

fn attach_task_log(path: &Path) -> std::io::Result<TaskLogGuard> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let (writer, worker_guard) = tracing_appender::non_blocking(file);
    let subscriber = tracing_subscriber::fmt().with_writer(writer).with_ansi(false).finish();
    let default_guard = tracing::subscriber::set_default(subscriber);
    Ok(TaskLogGuard(default_guard, worker_guard))
}
