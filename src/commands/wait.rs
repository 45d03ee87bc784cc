//! Implementation of the `wait` subcommand: blocks until every task index of a job
//! has reached a terminal marker.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Arguments for the `wait` subcommand.
#[derive(Parser, Debug)]
pub struct Args {
    /// The job's display name.
    #[arg(long)]
    pub job_name: String,

    /// The submission attempt's unique id.
    #[arg(long)]
    pub job_id: String,

    /// Total number of task indices to wait for.
    #[arg(long)]
    pub num_jobs: usize,
}

/// Polls `locks/` every [`POLL_INTERVAL`] until every task index is terminal
/// (`done` or `err`), then returns.
pub async fn wait(args: Args) -> Result<()> {
    wait_in(args, &PathBuf::from("locks")).await
}

async fn wait_in(args: Args, locks_dir: &Path) -> Result<()> {
    loop {
        let counts = crate::claim::status(locks_dir, &args.job_name, &args.job_id, args.num_jobs)?;
        let terminal = counts.done + counts.errored;

        info!(
            done = counts.done,
            errored = counts.errored,
            in_progress = counts.in_progress,
            total = counts.total,
            "waiting for job completion"
        );

        if terminal >= counts.total {
            return Ok(());
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::LockRecord;
    use crate::claim::finish_recoverable_error;
    use crate::claim::finish_success;
    use crate::claim::try_claim;

    fn record(dir: &Path, index: usize) -> LockRecord {
        LockRecord::new(dir, "job", "attempt-1", index)
    }

    #[tokio::test]
    async fn wait_returns_immediately_once_all_indices_are_terminal() {
        let dir = tempfile::tempdir().unwrap();

        for i in 0..2 {
            let rec = record(dir.path(), i);
            try_claim(&rec).unwrap();
            finish_success(&rec).unwrap();
        }
        let rec = record(dir.path(), 2);
        try_claim(&rec).unwrap();
        finish_recoverable_error(&rec).unwrap();

        let args = Args {
            job_name: "job".to_owned(),
            job_id: "attempt-1".to_owned(),
            num_jobs: 3,
        };

        let result = tokio::time::timeout(Duration::from_secs(1), wait_in(args, dir.path())).await;
        assert!(result.is_ok());
    }
}
