//! Integration coverage for the worker loop driving the claim protocol end to end,
//! exercised through the public crate API rather than module-private internals.

use gridrunner::claim::status;
use gridrunner::jobspec::Axis;
use gridrunner::jobspec::JobSpec;
use gridrunner::jobspec::ParamValue;
use gridrunner::worker::JobContext;
use gridrunner::worker::JobError;
use gridrunner::worker::WorkerConfig;
use gridrunner::worker::do_job;

fn temperature_sweep() -> JobSpec {
    let mut axis = Axis::new();
    for t in [-10, 0, 10, 20, 30] {
        axis.push([("temperature", ParamValue::Int(t))]);
    }
    JobSpec::new([axis])
}

#[test]
fn a_single_worker_completes_every_index_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let spec = temperature_sweep();

    let job = |ctx: JobContext| -> Result<(), JobError> {
        assert!(!ctx.interactive);
        assert!(ctx.params.contains_key("temperature"));
        Ok(())
    };

    let config = WorkerConfig {
        locks_dir: dir.path().join("locks"),
        log_dir: dir.path().join("log"),
        job_name: "sweep".into(),
        job_id: "attempt-1".into(),
        num_jobs: spec.count(),
    };

    do_job(&spec, &job, &config).unwrap();

    let counts = status(&config.locks_dir, "sweep", "attempt-1", spec.count()).unwrap();
    assert_eq!(counts.done, spec.count());
    assert_eq!(counts.errored, 0);
    assert_eq!(counts.in_progress, 0);
}

#[test]
fn rerunning_the_same_job_id_skips_already_done_indices() {
    let dir = tempfile::tempdir().unwrap();
    let spec = temperature_sweep();

    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let calls_clone = std::sync::Arc::clone(&calls);
    let job = move |_ctx: JobContext| -> Result<(), JobError> {
        calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    };

    let config = WorkerConfig {
        locks_dir: dir.path().join("locks"),
        log_dir: dir.path().join("log"),
        job_name: "sweep".into(),
        job_id: "attempt-1".into(),
        num_jobs: spec.count(),
    };

    do_job(&spec, &job, &config).unwrap();
    do_job(&spec, &job, &config).unwrap();

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), spec.count());
}

#[test]
fn a_fresh_job_id_reruns_the_whole_space() {
    let dir = tempfile::tempdir().unwrap();
    let spec = temperature_sweep();
    let job = |_ctx: JobContext| -> Result<(), JobError> { Ok(()) };

    let mut config = WorkerConfig {
        locks_dir: dir.path().join("locks"),
        log_dir: dir.path().join("log"),
        job_name: "sweep".into(),
        job_id: "attempt-1".into(),
        num_jobs: spec.count(),
    };
    do_job(&spec, &job, &config).unwrap();

    config.job_id = "attempt-2".into();
    do_job(&spec, &job, &config).unwrap();

    let counts = status(&config.locks_dir, "sweep", "attempt-2", spec.count()).unwrap();
    assert_eq!(counts.done, spec.count());
}
