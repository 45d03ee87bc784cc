//! `gridrunner` enumerates a Cartesian product of parameter axes into a job space,
//! renders and submits Slurm-family batch scripts for it, and coordinates workers
//! racing to claim and run each job exactly once via a shared `locks/` directory.
//!
//! Embedding applications supply a job function (see [`worker::JobFn`]) and a
//! [`jobspec::JobSpec`] describing the axes, then hand both to [`gridrunner_main`],
//! which parses the CLI, dispatches to the relevant subcommand, and returns a process
//! exit code.

pub mod claim;
pub mod commands;
pub mod config;
pub mod jobspec;
pub mod lock;
pub mod script;
pub mod submit;
pub mod worker;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;

use crate::commands::OnFinishFn;
use crate::config::Config;
use crate::jobspec::JobSpec;
use crate::worker::JobFn;

/// The top-level `gridrunner` CLI.
#[derive(Parser, Debug)]
#[command(name = "gridrunner", version, about = "A parameterized batch job runner for Slurm-family cluster schedulers")]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity, repeatable (`-v`, `-vv`, ...).
    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity,

    /// Path to a layered TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// The command surface: `prep`, `run`, `do_job`, `wait`, `status`, `cleanup`, plus the
/// ambient `completions` helper.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Renders `run-slurm.sh` without submitting it.
    Prep(commands::prep::Args),
    /// Renders, submits the array job, and chains a cleanup job onto it.
    Run(commands::run::Args),
    /// Per-worker-process entry point: iterates and claims task indices.
    DoJob(commands::do_job::Args),
    /// Blocks until every task index of a job is terminal.
    Wait(commands::wait::Args),
    /// Reports aggregate marker counts for a job.
    Status(commands::status::Args),
    /// Reports scheduler accounting for the main array job and runs the on-finish hook.
    Cleanup(commands::cleanup::Args),
    /// Emits a shell completion script.
    Completions(commands::completions::Args),
}

fn init_tracing(verbosity: &clap_verbosity_flag::Verbosity) {
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn dispatch(
    command: Commands,
    spec: &JobSpec,
    config: &Config,
    job: &dyn JobFn,
    on_finish: Option<&dyn OnFinishFn>,
) -> anyhow::Result<()> {
    match command {
        Commands::Prep(args) => commands::prep::prep(args, spec, config),
        Commands::Run(args) => commands::run::run(args, spec, config).await,
        Commands::DoJob(args) => commands::do_job::do_job(args, spec, job),
        Commands::Wait(args) => commands::wait::wait(args).await,
        Commands::Status(args) => commands::status::status(args),
        Commands::Cleanup(args) => commands::cleanup::cleanup(args, &config.accounting_command, on_finish).await,
        Commands::Completions(args) => {
            commands::completions::completions::<Cli>(args);
            Ok(())
        }
    }
}

/// Parses the CLI, initializes tracing and configuration, dispatches to the selected
/// subcommand, and returns an appropriate process exit code.
///
/// `job` is invoked once per claimed task index by `do_job`; `on_finish`, if given, is
/// invoked by `cleanup` once scheduler accounting for the main job has been fetched.
pub fn gridrunner_main<J>(job: J, spec: JobSpec, on_finish: Option<Box<dyn OnFinishFn>>) -> ExitCode
where
    J: JobFn + 'static,
{
    let cli = Cli::parse();
    init_tracing(&cli.verbosity);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(dispatch(cli.command, &spec, &config, &job, on_finish.as_deref()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
