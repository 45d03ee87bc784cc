//! The batch-script generator: renders a Slurm-family submission script for either a
//! single run or an array of worker nodes, and writes it to `run-slurm.sh`.

use std::path::Path;

use thiserror::Error;

/// A scheduler dependency clause, e.g. `afterany:1234,1235`.
#[derive(Debug, Clone)]
pub struct Dependency {
    /// The dependency status keyword (`afterany` means "regardless of exit status").
    pub status: String,
    /// The job ids this script depends on.
    pub ids: Vec<u64>,
}

impl Dependency {
    /// An `afterany` dependency on the given ids.
    pub fn afterany(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            status: "afterany".to_owned(),
            ids: ids.into_iter().collect(),
        }
    }
}

/// Whether the rendered script runs a single invocation or an array of worker nodes.
#[derive(Debug, Clone)]
pub enum Layout {
    /// A single invocation with no array; `program` is run directly.
    Single {
        /// The command the script runs, verbatim.
        program: String,
    },
    /// An array of `maxnodes` tasks, each spawning `jobs_per_node` background worker
    /// processes invoking `do_job`, followed by a foreground `wait`.
    Array {
        /// Total number of task indices across the whole array (optionally capped by
        /// a `limit` upstream of this type).
        num_jobs: usize,
        /// Worker processes spawned per array element.
        jobs_per_node: usize,
        /// Number of array elements (`--array=0-(maxnodes-1)`).
        maxnodes: usize,
        /// Path to the program each worker process invokes with `do_job`/`wait`.
        program_path: String,
    },
}

/// Options recognized by the script generator.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Display name, also embedded in lock filenames.
    pub jobname: String,
    /// Scheduler resource pool.
    pub partition: String,
    /// Scheduler billing account (`#SBATCH --account=`), if any.
    pub account: Option<String>,
    /// Scheduler QoS class (`#SBATCH --qos=`), if any.
    pub qos: Option<String>,
    /// Wall clock limit, e.g. `"72:00:00"`.
    pub walltime: String,
    /// String interpolated into lock filenames; defaults to the scheduler-provided
    /// array-job id (`"${SLURM_ARRAY_JOB_ID}"`).
    pub uniqueid: String,
    /// Dependency clause, if any.
    pub dependencies: Option<Dependency>,
    /// Directory for scheduler stdout and worker logs.
    pub logdir: String,
    /// Extra arguments appended to the invoked program.
    pub flags: Vec<String>,
    /// Whether this renders a single invocation or an array (and its shape).
    pub layout: Layout,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            jobname: "gridrunner_job".to_owned(),
            partition: "batch".to_owned(),
            account: None,
            qos: None,
            walltime: "72:00:00".to_owned(),
            uniqueid: "\"${SLURM_ARRAY_JOB_ID}\"".to_owned(),
            dependencies: None,
            logdir: "log".to_owned(),
            flags: Vec::new(),
            layout: Layout::Single {
                program: String::new(),
            },
        }
    }
}

/// Errors raised while rendering or writing a batch script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Writing `run-slurm.sh` failed.
    #[error("i/o error writing script: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders the `#SBATCH` preamble shared by both templates.
fn render_preamble(opts: &ScriptOptions, output_pattern: &str) -> String {
    let mut lines = vec![
        "#!/bin/bash".to_owned(),
        format!("#SBATCH --job-name={}", opts.jobname),
        format!("#SBATCH --partition={}", opts.partition),
    ];

    if let Some(account) = &opts.account {
        lines.push(format!("#SBATCH --account={account}"));
    }
    if let Some(qos) = &opts.qos {
        lines.push(format!("#SBATCH --qos={qos}"));
    }

    lines.push("#SBATCH --nodes=1".to_owned());
    lines.push(format!("#SBATCH --time={}", opts.walltime));
    lines.push("#SBATCH --requeue".to_owned());

    if let Some(dep) = &opts.dependencies {
        if !dep.ids.is_empty() {
            let ids = dep
                .ids
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            lines.push(format!("#SBATCH --dependency={}:{}", dep.status, ids));
        }
    }

    lines.push(format!("#SBATCH --output {}", output_pattern));

    lines.join("\n")
}

fn flagstr(flags: &[String]) -> String {
    flags.join(" ")
}

/// Renders the script text for `opts`, choosing the single- or multi-node template
/// based on `opts.layout`.
pub fn render(opts: &ScriptOptions) -> String {
    match &opts.layout {
        Layout::Single { program } => {
            let output = format!("{}/slurm-{}-%A.out", opts.logdir, opts.jobname);
            let preamble = render_preamble(opts, &output);
            format!(
                "{preamble}\n\n## Run command\n{program} {flags}\n",
                flags = flagstr(&opts.flags)
            )
        }
        Layout::Array {
            num_jobs,
            jobs_per_node,
            maxnodes,
            program_path,
        } => {
            let output = format!("{}/slurm-{}-%A_%a.out", opts.logdir, opts.jobname);
            let preamble = render_preamble(opts, &output);
            let maxnodes_inclusive = maxnodes.saturating_sub(1);

            format!(
                "{preamble}\n\
                #SBATCH --array=0-{maxnodes_inclusive}\n\n\
                mkdir -p {logdir}\n\
                mkdir -p locks\n\n\
                ## Run command\n\n\
                for i in $(seq 1 {jobs_per_node})\n\
                do\n\
                \tnohup {program_path} do_job --job-name {jobname} \\\n\
                \t--job-id {uniqueid} --num-jobs {num_jobs} --logdir \"{logdir}\" {flags} \\\n\
                \t> {logdir}/nohup-{jobname}-{uniqueid}-${{SLURM_ARRAY_TASK_ID}}-$i.out &\n\
                done\n\n\
                {program_path} wait --job-name {jobname} \\\n\
                --job-id {uniqueid} --num-jobs {num_jobs} {flags}\n",
                logdir = opts.logdir,
                jobname = opts.jobname,
                uniqueid = opts.uniqueid,
                flags = flagstr(&opts.flags),
            )
        }
    }
}

/// Renders `opts` and writes it to `run-slurm.sh` inside `dir`, overwriting any prior
/// copy.
pub fn write_script(dir: &Path, opts: &ScriptOptions) -> Result<std::path::PathBuf, ScriptError> {
    let path = dir.join("run-slurm.sh");
    let text = render(opts);
    std::fs::write(&path, text)?;
    Ok(path)
}
