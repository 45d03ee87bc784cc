//! Implementation of the `status` subcommand: reports aggregate marker counts for a
//! job without blocking.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::claim::status as claim_status;

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The job's display name.
    #[arg(short = 'j', long)]
    pub job_name: String,

    /// The submission attempt's unique id.
    #[arg(short = 'u', long)]
    pub job_id: String,
}

/// Reports `{total, done, in_progress, errored}` by reading the entire `locks/`
/// directory. `total` is the number of markers observed, not a caller-supplied
/// expectation — per the specification's resolved open question, `status` does not
/// take a `num_jobs`/`logdir` parameter.
pub fn status(args: Args) -> Result<()> {
    let locks_dir = PathBuf::from("locks");
    let counts = claim_status(&locks_dir, &args.job_name, &args.job_id, 0)?;
    let observed = counts.done + counts.in_progress + counts.errored;

    println!(
        "done: {}\nin_progress: {}\nerrored: {}\ntotal observed: {}",
        counts.done, counts.in_progress, counts.errored, observed
    );

    Ok(())
}
