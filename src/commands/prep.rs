//! Implementation of the `prep` subcommand: render `run-slurm.sh` without submitting.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::commands::ScriptArgs;
use crate::commands::current_program_path;
use crate::config::Config;
use crate::jobspec::JobSpec;
use crate::script::Layout;
use crate::script::ScriptOptions;
use crate::script::write_script;

/// Arguments for the `prep` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    #[command(flatten)]
    pub script: ScriptArgs,
}

/// Renders `run-slurm.sh` for the full job space described by `spec`, without
/// submitting it.
pub fn prep(args: Args, spec: &JobSpec, config: &Config) -> Result<()> {
    let resolved = args.script.resolve(&config.script);

    let num_jobs = resolved.limit.map_or(spec.count(), |limit| limit.min(spec.count()));

    let opts = ScriptOptions {
        jobname: resolved.jobname.clone(),
        partition: resolved.partition,
        account: resolved.account,
        qos: resolved.qos,
        walltime: resolved.walltime,
        uniqueid: resolved.uniqueid,
        dependencies: resolved.dependencies,
        logdir: resolved.logdir,
        flags: Vec::new(),
        layout: Layout::Array {
            num_jobs,
            jobs_per_node: resolved.jobs_per_node,
            maxnodes: resolved.maxnodes,
            program_path: current_program_path(),
        },
    };

    let path = write_script(&std::env::current_dir()?, &opts)?;
    info!(path = %path.display(), num_jobs, "wrote batch script");
    println!("wrote {}", path.display());

    Ok(())
}
