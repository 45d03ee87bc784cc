//! Implementation of the `run` subcommand: render, submit the main array job, then
//! submit a cleanup job chained `afterany` of it.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::commands::ScriptArgs;
use crate::commands::current_program_path;
use crate::config::Config;
use crate::jobspec::JobSpec;
use crate::script::Dependency;
use crate::script::Layout;
use crate::script::ScriptOptions;
use crate::submit::submit_chained;

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    #[command(flatten)]
    pub script: ScriptArgs,
}

/// Renders, submits the main array job, and submits a single-script cleanup job
/// depending `afterany` on the main job's id.
pub async fn run(args: Args, spec: &JobSpec, config: &Config) -> Result<()> {
    let resolved = args.script.resolve(&config.script);
    std::fs::create_dir_all(&resolved.logdir)?;

    let num_jobs = resolved.limit.map_or(spec.count(), |limit| limit.min(spec.count()));
    let program_path = current_program_path();

    let main_opts = ScriptOptions {
        jobname: resolved.jobname.clone(),
        partition: resolved.partition.clone(),
        account: resolved.account.clone(),
        qos: resolved.qos.clone(),
        walltime: resolved.walltime.clone(),
        uniqueid: resolved.uniqueid.clone(),
        dependencies: resolved.dependencies.clone(),
        logdir: resolved.logdir.clone(),
        flags: Vec::new(),
        layout: Layout::Array {
            num_jobs,
            jobs_per_node: resolved.jobs_per_node,
            maxnodes: resolved.maxnodes,
            program_path: program_path.clone(),
        },
    };

    let cwd = std::env::current_dir()?;
    let submit_command = config.script.submit_command.clone();
    let jobname = resolved.jobname.clone();
    let partition = resolved.partition.clone();
    let account = resolved.account.clone();
    let qos = resolved.qos.clone();
    let walltime = resolved.walltime.clone();
    let uniqueid = resolved.uniqueid.clone();
    let logdir = resolved.logdir.clone();

    let chained = submit_chained(&submit_command, &cwd, &main_opts, move |main_id| ScriptOptions {
        jobname: format!("{jobname}_finish"),
        partition,
        account,
        qos,
        walltime,
        uniqueid,
        dependencies: Some(Dependency::afterany([main_id])),
        logdir,
        flags: vec![main_id.to_string()],
        layout: Layout::Single {
            program: format!("{program_path} cleanup"),
        },
    })
    .await?;

    info!(main_id = chained.main_id, cleanup_id = chained.cleanup_id, "submitted");
    println!("run job: {}\non-finish job: {}", chained.main_id, chained.cleanup_id);

    Ok(())
}
