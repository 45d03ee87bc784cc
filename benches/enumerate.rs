//! Benchmarks job-space enumeration across a range of axis shapes.

use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use gridrunner::jobspec::Axis;
use gridrunner::jobspec::JobSpec;
use gridrunner::jobspec::ParamValue;

const AXIS_NAMES: [&str; 4] = ["axis0", "axis1", "axis2", "axis3"];

fn spec_with_axes(axis_count: usize, entries_per_axis: usize) -> JobSpec {
    let axes = (0..axis_count)
        .map(|a| {
            let mut axis = Axis::new();
            for e in 0..entries_per_axis {
                axis.push([(AXIS_NAMES[a], ParamValue::Int(e as i64))]);
            }
            axis
        })
        .collect::<Vec<_>>();
    JobSpec::new(axes)
}

fn bench_job_at(c: &mut Criterion) {
    let spec = spec_with_axes(4, 10);
    let count = spec.count();

    c.bench_function("job_at random access over 10_000 jobs", |b| {
        b.iter(|| {
            for i in 0..count {
                black_box(spec.job_at(i));
            }
        });
    });
}

fn bench_enumerate(c: &mut Criterion) {
    let spec = spec_with_axes(4, 10);

    c.bench_function("enumerate full job space", |b| {
        b.iter(|| {
            for job in spec.enumerate() {
                black_box(job);
            }
        });
    });
}

criterion_group!(benches, bench_job_at, bench_enumerate);
criterion_main!(benches);
