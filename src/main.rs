//! The `gridrunner` binary: wires an example job function and job specification into
//! [`gridrunner::gridrunner_main`].
//!
//! Embedding applications are expected to replace [`example_job`] and
//! [`example_spec`] with their own payload and parameter axes; this binary exists so
//! the CLI surface is directly runnable and testable end to end.

use std::process::ExitCode;

use gridrunner::jobspec::Axis;
use gridrunner::jobspec::JobSpec;
use gridrunner::jobspec::ParamValue;
use gridrunner::worker::JobContext;
use gridrunner::worker::JobError;

fn example_spec() -> JobSpec {
    let mut axis = Axis::new();
    for i in 0..10 {
        axis.push([("i", ParamValue::Int(i))]);
    }
    JobSpec::new([axis])
}

fn example_job(ctx: JobContext) -> Result<(), JobError> {
    tracing::info!(params = ?ctx.params, interactive = ctx.interactive, "running example job");
    Ok(())
}

fn main() -> ExitCode {
    gridrunner::gridrunner_main(example_job, example_spec(), None)
}
