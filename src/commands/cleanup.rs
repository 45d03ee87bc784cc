//! Implementation of the `cleanup` subcommand: the single-script job chained
//! `afterany` the main array job, reporting scheduler accounting for it.

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::commands::OnFinishFn;

/// Arguments for the `cleanup` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The main array job's scheduler id.
    pub slurm_id: u64,
}

/// Invokes the scheduler's accounting command for `args.slurm_id`, prints its
/// output, and runs `on_finish` if one was supplied.
pub async fn cleanup(args: Args, accounting_command: &str, on_finish: Option<&dyn OnFinishFn>) -> Result<()> {
    let mut parts = accounting_command.split_whitespace();
    let program = parts.next().context("accounting_command is empty")?;
    let leading_args: Vec<&str> = parts.collect();

    let output = tokio::process::Command::new(program)
        .args(&leading_args)
        .arg(args.slurm_id.to_string())
        .output()
        .await
        .with_context(|| format!("invoking accounting command `{accounting_command}`"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    info!(slurm_id = args.slurm_id, "fetched accounting output");
    print!("{stdout}");
    if !output.stderr.is_empty() {
        eprint!("{}", String::from_utf8_lossy(&output.stderr));
    }

    if let Some(hook) = on_finish {
        hook.call(args.slurm_id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_the_accounting_command_with_the_job_id_appended() {
        let args = Args { slurm_id: 42 };
        cleanup(args, "echo accounting for", None).await.unwrap();
    }

    #[tokio::test]
    async fn runs_the_onfinish_hook_when_supplied() {
        let args = Args { slurm_id: 7 };
        let seen = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let seen_clone = std::sync::Arc::clone(&seen);
        let hook = move |job_id: u64| -> Result<()> {
            seen_clone.store(job_id, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        };

        cleanup(args, "echo", Some(&hook)).await.unwrap();
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 7);
    }
}
