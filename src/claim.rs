//! The claim protocol: a per-task-index state machine over `{absent, locked, done, err}`,
//! coordinated across worker processes purely through marker files in a shared directory.
//!
//! See the module-level state diagram in the specification: `done`/`err` are terminal and
//! mutually exclusive; `lck` is transient and is always removed by the worker that created
//! it, on every exit path, whether the attempt succeeded, failed recoverably, or panicked.

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::lock::LockError;
use crate::lock::exclusive_create;
use crate::lock::remove_if_present;

/// Errors raised while manipulating claim markers.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// An I/O failure unrelated to lock contention (e.g. writing a `.done` marker).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Identifies the marker files for one `(job_name, job_id, task_index)` triple.
#[derive(Debug, Clone)]
pub struct LockRecord {
    /// Directory containing the marker files (conventionally `locks/`).
    pub locks_dir: PathBuf,
    /// The job's display name, embedded in the marker filenames.
    pub job_name: String,
    /// The submission attempt's unique id; a fresh id clears the ledger by convention.
    pub job_id: String,
    /// The task index within the job space.
    pub task_index: usize,
}

impl LockRecord {
    /// Builds a new lock record.
    pub fn new(locks_dir: impl Into<PathBuf>, job_name: impl Into<String>, job_id: impl Into<String>, task_index: usize) -> Self {
        Self {
            locks_dir: locks_dir.into(),
            job_name: job_name.into(),
            job_id: job_id.into(),
            task_index,
        }
    }

    fn marker(&self, suffix: &str) -> PathBuf {
        self.locks_dir.join(format!(
            "{}-{}-{}.{}",
            self.job_name, self.job_id, self.task_index, suffix
        ))
    }

    /// Path to the `.lck` marker.
    pub fn lck_path(&self) -> PathBuf {
        self.marker("lck")
    }

    /// Path to the `.done` marker.
    pub fn done_path(&self) -> PathBuf {
        self.marker("done")
    }

    /// Path to the `.err` marker.
    pub fn err_path(&self) -> PathBuf {
        self.marker("err")
    }

    /// Whether the `.done` marker is present.
    pub fn is_done(&self) -> bool {
        self.done_path().exists()
    }

    /// Whether the `.err` marker is present.
    pub fn is_errored(&self) -> bool {
        self.err_path().exists()
    }

    /// Whether the `.lck` marker is present.
    pub fn is_locked(&self) -> bool {
        self.lck_path().exists()
    }
}

/// The outcome of attempting to claim one task index, before the job is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimAttempt {
    /// The claim was acquired; the caller now owns the `.lck` marker and must run the
    /// job and call [`finish_success`], [`finish_recoverable_error`], or
    /// [`release_without_marker`].
    Acquired,
    /// The index was already `.done`; nothing to do.
    AlreadyDone,
    /// The index was already `.err`; not retried within this run.
    AlreadyErrored,
    /// Another worker holds the `.lck` marker.
    Contended,
}

/// Attempts to claim `record` for execution.
///
/// Implements steps 1-4 of the claim procedure: skip on a terminal marker, attempt
/// exclusive creation of `.lck`, and re-check for a terminal marker written by a
/// concurrent worker between our first check and our `.lck` creation (the race this
/// double-check closes: two workers both pass step 1, then one creates `.lck` and runs
/// the job to completion before the other's `exclusive_create` call lands).
pub fn try_claim(record: &LockRecord) -> Result<ClaimAttempt, ClaimError> {
    if record.is_done() {
        return Ok(ClaimAttempt::AlreadyDone);
    }
    if record.is_errored() {
        return Ok(ClaimAttempt::AlreadyErrored);
    }

    match exclusive_create(&record.lck_path()) {
        Ok(_file) => {}
        Err(LockError::Exists(_)) => return Ok(ClaimAttempt::Contended),
        Err(LockError::Io { source, .. }) => return Err(ClaimError::Io(source)),
    }

    if record.is_done() || record.is_errored() {
        remove_if_present(&record.lck_path())?;
        return Ok(if record.is_done() {
            ClaimAttempt::AlreadyDone
        } else {
            ClaimAttempt::AlreadyErrored
        });
    }

    Ok(ClaimAttempt::Acquired)
}

/// Marks a claimed index as successfully completed and releases the `.lck` marker.
pub fn finish_success(record: &LockRecord) -> Result<(), ClaimError> {
    touch(&record.done_path())?;
    remove_if_present(&record.lck_path())?;
    Ok(())
}

/// Marks a claimed index as having failed with a recoverable error and releases the
/// `.lck` marker. The worker continues to the next index after this returns.
pub fn finish_recoverable_error(record: &LockRecord) -> Result<(), ClaimError> {
    touch(&record.err_path())?;
    remove_if_present(&record.lck_path())?;
    Ok(())
}

/// Releases the `.lck` marker without writing a terminal marker.
///
/// Used when a fatal interruption re-raises out of the job: the worker process is
/// about to exit, but the `.lck` release is still a guaranteed step on that exit path
/// where the runtime allows it to run (e.g. normal unwinding, not a `SIGKILL`).
pub fn release_without_marker(record: &LockRecord) -> Result<(), ClaimError> {
    remove_if_present(&record.lck_path())?;
    Ok(())
}

fn touch(path: &Path) -> std::io::Result<()> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(())
}

/// Aggregate marker counts across every task index of a job, as reported by `status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Total number of task indices in the job space.
    pub total: usize,
    /// Number of `.done` markers present.
    pub done: usize,
    /// Number of `.lck` markers present (in progress).
    pub in_progress: usize,
    /// Number of `.err` markers present.
    pub errored: usize,
}

/// Computes [`StatusCounts`] by reading the entire `locks_dir`, matching on filenames of
/// the form `<job_name>-<job_id>-<index>.<suffix>`.
///
/// Per the specification's resolved open question, this reads the whole directory
/// rather than trusting a caller-supplied `num_jobs`/`logdir`, since those parameters
/// are unused by the distilled command and their intended scope is unclear.
pub fn status(locks_dir: &Path, job_name: &str, job_id: &str, total: usize) -> std::io::Result<StatusCounts> {
    let mut counts = StatusCounts {
        total,
        ..Default::default()
    };

    let prefix = format!("{job_name}-{job_id}-");

    let entries = match std::fs::read_dir(locks_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(counts),
        Err(err) => return Err(err),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(rest) = name.strip_prefix(&prefix) else {
            continue;
        };

        if rest.ends_with(".done") {
            counts.done += 1;
        } else if rest.ends_with(".lck") {
            counts.in_progress += 1;
        } else if rest.ends_with(".err") {
            counts.errored += 1;
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::thread;

    fn record(dir: &Path, index: usize) -> LockRecord {
        LockRecord::new(dir, "job", "attempt-1", index)
    }

    #[test]
    fn claim_then_finish_success_leaves_only_done() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        let rec = record(dir.path(), 0);

        assert_eq!(try_claim(&rec).unwrap(), ClaimAttempt::Acquired);
        finish_success(&rec).unwrap();

        assert!(rec.is_done());
        assert!(!rec.is_locked());
        assert!(!rec.is_errored());
    }

    #[test]
    fn done_marker_short_circuits_future_claims() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record(dir.path(), 0);

        try_claim(&rec).unwrap();
        finish_success(&rec).unwrap();

        assert_eq!(try_claim(&rec).unwrap(), ClaimAttempt::AlreadyDone);
    }

    #[test]
    fn err_marker_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record(dir.path(), 0);

        try_claim(&rec).unwrap();
        finish_recoverable_error(&rec).unwrap();

        assert_eq!(try_claim(&rec).unwrap(), ClaimAttempt::AlreadyErrored);
    }

    #[test]
    fn contended_claim_does_not_disturb_the_holder() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record(dir.path(), 0);

        try_claim(&rec).unwrap();
        assert_eq!(try_claim(&rec).unwrap(), ClaimAttempt::Contended);
        assert!(rec.is_locked());
    }

    #[test]
    fn fatal_release_leaves_index_reclaimable() {
        let dir = tempfile::tempdir().unwrap();
        let rec = record(dir.path(), 0);

        try_claim(&rec).unwrap();
        release_without_marker(&rec).unwrap();

        assert!(!rec.is_locked());
        assert_eq!(try_claim(&rec).unwrap(), ClaimAttempt::Acquired);
    }

    /// S4: concurrent workers racing the same index set never duplicate or lose work.
    #[test]
    fn s4_claim_race_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let n = 10usize;
        let done_count = Arc::new(AtomicUsize::new(0));
        let err_count = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dir = dir.path().to_owned();
                let done_count = Arc::clone(&done_count);
                let err_count = Arc::clone(&err_count);
                thread::spawn(move || {
                    for i in 0..n {
                        let rec = LockRecord::new(&dir, "race", "attempt-1", i);
                        match try_claim(&rec).unwrap() {
                            ClaimAttempt::Acquired => {
                                // Simulate a job that fails on even indices.
                                if i % 2 == 0 {
                                    finish_recoverable_error(&rec).unwrap();
                                    err_count.fetch_add(1, Ordering::SeqCst);
                                } else {
                                    finish_success(&rec).unwrap();
                                    done_count.fetch_add(1, Ordering::SeqCst);
                                }
                            }
                            ClaimAttempt::AlreadyDone
                            | ClaimAttempt::AlreadyErrored
                            | ClaimAttempt::Contended => {}
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let counts = status(dir.path(), "race", "attempt-1", n).unwrap();
        assert_eq!(counts.done, 5);
        assert_eq!(counts.errored, 5);
        assert_eq!(counts.in_progress, 0);
        assert_eq!(done_count.load(Ordering::SeqCst), 5);
        assert_eq!(err_count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn s6_status_counts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();

        for i in 0..7 {
            let rec = record(dir.path(), i);
            try_claim(&rec).unwrap();
            finish_success(&rec).unwrap();
        }
        for i in 7..9 {
            let rec = record(dir.path(), i);
            try_claim(&rec).unwrap();
            finish_recoverable_error(&rec).unwrap();
        }
        // index 9 crashes mid-lock: .lck created, never removed, no terminal marker.
        let crashed = record(dir.path(), 9);
        try_claim(&crashed).unwrap();

        let counts = status(dir.path(), "job", "attempt-1", 10).unwrap();
        assert_eq!(
            counts,
            StatusCounts {
                total: 10,
                done: 7,
                in_progress: 1,
                errored: 2,
            }
        );
    }

    #[test]
    fn status_on_missing_locks_dir_is_all_zero() {
        let counts = status(Path::new("/nonexistent/locks/dir"), "job", "attempt-1", 3).unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.done, 0);
    }
}
