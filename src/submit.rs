//! The submission driver: invokes the scheduler's submission command, parses the
//! returned job id, and chains an afterany cleanup job onto a main submission.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::script::ScriptError;
use crate::script::ScriptOptions;
use crate::script::write_script;

/// Errors raised by the submission driver.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Spawning or waiting on the submission subprocess failed.
    #[error("failed to invoke submission command: {0}")]
    Spawn(#[from] std::io::Error),

    /// The scheduler wrote to stderr, which this driver treats as a submission
    /// failure regardless of exit status.
    #[error("error encountered submitting job: {0}")]
    SchedulerError(String),

    /// Rendering or writing the batch script failed.
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// The submission command's stdout matched, but no job id followed a dependent
    /// submission that required one (e.g. chaining a cleanup job onto a main job
    /// whose id could not be parsed).
    #[error("scheduler did not return a job id")]
    MissingJobId,
}

fn submitted_job_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*Submitted batch job (\d+)\s*$").expect("valid regex"))
}

/// Parses the scheduler's submission stdout for the job id, per
/// `^\s*Submitted batch job (\d+)\s*$`. Returns `None` without raising if the pattern
/// did not match.
pub fn parse_submitted_job_id(stdout: &str) -> Option<u64> {
    submitted_job_id_pattern()
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Invokes `submit_command script_path` as a subprocess, captures stdout, and parses
/// the job id out of it. A non-empty stderr is treated as a submission failure even if
/// the process exited successfully.
pub async fn submit(submit_command: &str, script_path: &Path) -> Result<Option<u64>, SubmitError> {
    let output = tokio::process::Command::new(submit_command)
        .arg(script_path)
        .output()
        .await?;

    if !output.stderr.is_empty() {
        return Err(SubmitError::SchedulerError(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let job_id = parse_submitted_job_id(&stdout);
    debug!(?job_id, "submission command completed");
    Ok(job_id)
}

/// The pair of job ids produced by a chained submission: the main array (or single)
/// job, and the cleanup job scheduled `afterany` of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainedSubmission {
    /// The main job's id.
    pub main_id: u64,
    /// The cleanup job's id.
    pub cleanup_id: u64,
}

/// Renders and submits `main_opts`, then builds the cleanup script from `main_id` via
/// `cleanup_opts`, renders and submits it too.
///
/// Both renders write to the same `run-slurm.sh` inside `work_dir`, overwriting the
/// main script with the cleanup script only *after* the main script has already been
/// handed to the scheduler — matching the reference implementation, which reuses one
/// script file for both submissions in sequence.
pub async fn submit_chained(
    submit_command: &str,
    work_dir: &Path,
    main_opts: &ScriptOptions,
    cleanup_opts: impl FnOnce(u64) -> ScriptOptions,
) -> Result<ChainedSubmission, SubmitError> {
    let main_path = write_script(work_dir, main_opts)?;
    let main_id = submit(submit_command, &main_path).await?.ok_or(SubmitError::MissingJobId)?;

    let cleanup_opts = cleanup_opts(main_id);
    let cleanup_path = write_script(work_dir, &cleanup_opts)?;
    let cleanup_id = submit(submit_command, &cleanup_path)
        .await?
        .ok_or(SubmitError::MissingJobId)?;

    Ok(ChainedSubmission { main_id, cleanup_id })
}
