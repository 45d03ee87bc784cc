//! Implementation of the `do_job` subcommand: the per-worker-process entry point
//! spawned by the array script, iterating this worker's slice of task indices.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::jobspec::JobSpec;
use crate::worker::JobFn;
use crate::worker::WorkerConfig;
use crate::worker::do_job as run_worker_loop;

/// Arguments for the `do_job` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The job's display name, embedded in marker and log filenames.
    #[arg(long)]
    pub job_name: String,

    /// The submission attempt's unique id.
    #[arg(long)]
    pub job_id: String,

    /// Number of task indices to iterate, `[0, num_jobs)`.
    #[arg(long)]
    pub num_jobs: usize,

    /// Directory for per-task log files.
    #[arg(long, default_value = "log")]
    pub logdir: String,
}

/// Runs the worker loop for this process over `[0, num_jobs)`, claiming and
/// executing whichever indices this process wins against the other workers racing
/// the same `locks/` directory.
pub fn do_job(args: Args, spec: &JobSpec, job: &dyn JobFn) -> Result<()> {
    let config = WorkerConfig {
        locks_dir: PathBuf::from("locks"),
        log_dir: PathBuf::from(&args.logdir),
        job_name: args.job_name,
        job_id: args.job_id,
        num_jobs: args.num_jobs,
    };

    run_worker_loop(spec, job, &config)?;
    Ok(())
}
