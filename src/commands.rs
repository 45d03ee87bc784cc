//! Implementation of the gridrunner CLI subcommands: `prep`, `run`, `do_job`, `wait`,
//! `status`, `cleanup`, and the ambient `completions` helper.

pub mod cleanup;
pub mod completions;
pub mod do_job;
pub mod prep;
pub mod run;
pub mod status;
pub mod wait;

use crate::config::ScriptDefaults;
use crate::script::Dependency;

/// Layout and scheduler-resource flags shared by `prep` and `run`.
#[derive(clap::Args, Debug, Clone)]
pub struct ScriptArgs {
    /// Number of iterations to run.
    #[arg(short = 'l', long)]
    pub limit: Option<usize>,

    /// Number of worker processes to run per node.
    #[arg(short = 'n', long = "jobs_per_node")]
    pub jobs_per_node: Option<usize>,

    /// Number of nodes to request for this job.
    #[arg(short = 'x', long = "maxnodes")]
    pub maxnodes: Option<usize>,

    /// Name of the job.
    #[arg(short = 'j', long = "jobname", default_value = "gridrunner_job")]
    pub jobname: String,

    /// Resource partition on which to run.
    #[arg(short = 'p', long = "partition")]
    pub partition: Option<String>,

    /// Job ids this submission depends on (rendered as `afterany:<ids>`).
    #[arg(short = 'd', long = "dependency")]
    pub dependency: Vec<u64>,

    /// Directory to write log files.
    #[arg(short = 'L', long = "logdir")]
    pub logdir: Option<String>,

    /// Unique job pool id; defaults to the scheduler-provided array-job id.
    #[arg(short = 'u', long = "uniqueid")]
    pub uniqueid: Option<String>,

    /// Scheduler billing account.
    #[arg(long)]
    pub account: Option<String>,

    /// Scheduler QoS class.
    #[arg(long)]
    pub qos: Option<String>,

    /// Wall clock limit, e.g. `72:00:00`.
    #[arg(long)]
    pub walltime: Option<String>,
}

/// [`ScriptArgs`] with every option resolved against [`ScriptDefaults`]: explicit CLI
/// flags win, configuration file values apply where no flag was given.
#[derive(Debug, Clone)]
pub struct ResolvedScriptArgs {
    /// Number of iterations to run, if capped.
    pub limit: Option<usize>,
    /// Worker processes per node.
    pub jobs_per_node: usize,
    /// Size of the worker-node array.
    pub maxnodes: usize,
    /// Name of the job.
    pub jobname: String,
    /// Resource partition.
    pub partition: String,
    /// Scheduler billing account, if any.
    pub account: Option<String>,
    /// Scheduler QoS class, if any.
    pub qos: Option<String>,
    /// Wall clock limit.
    pub walltime: String,
    /// Directory for logs.
    pub logdir: String,
    /// Unique job pool id.
    pub uniqueid: String,
    /// Dependency clause built from `--dependency` flags, if any were given.
    pub dependencies: Option<Dependency>,
}

impl ScriptArgs {
    /// Resolves every option, falling back to `defaults` where no flag was given.
    pub fn resolve(&self, defaults: &ScriptDefaults) -> ResolvedScriptArgs {
        ResolvedScriptArgs {
            limit: self.limit,
            jobs_per_node: self.jobs_per_node.unwrap_or(defaults.jobs_per_node),
            maxnodes: self.maxnodes.unwrap_or(defaults.maxnodes),
            jobname: self.jobname.clone(),
            partition: self.partition.clone().unwrap_or_else(|| defaults.partition.clone()),
            account: self.account.clone().or_else(|| defaults.account.clone()),
            qos: self.qos.clone().or_else(|| defaults.qos.clone()),
            walltime: self.walltime.clone().unwrap_or_else(|| defaults.walltime.clone()),
            logdir: self.logdir.clone().unwrap_or_else(|| defaults.logdir.clone()),
            uniqueid: self
                .uniqueid
                .clone()
                .unwrap_or_else(|| "\"${SLURM_ARRAY_JOB_ID}\"".to_owned()),
            dependencies: if self.dependency.is_empty() {
                None
            } else {
                Some(Dependency::afterany(self.dependency.iter().copied()))
            },
        }
    }
}

/// An optional hook run by `cleanup` once the scheduler's accounting output has been
/// fetched and printed, given the main array job's id.
pub trait OnFinishFn: Send + Sync {
    /// Runs the hook.
    fn call(&self, job_id: u64) -> anyhow::Result<()>;
}

impl<F> OnFinishFn for F
where
    F: Fn(u64) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, job_id: u64) -> anyhow::Result<()> {
        self(job_id)
    }
}

/// Returns the path to the currently running executable as a string suitable for
/// embedding in a generated script, falling back to `argv[0]` if the canonical path
/// cannot be resolved (e.g. the binary was invoked from a `PATH` entry that no longer
/// points at a stable inode).
pub fn current_program_path() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.to_str().map(str::to_owned))
        .or_else(|| std::env::args().next())
        .unwrap_or_else(|| "gridrunner".to_owned())
}
