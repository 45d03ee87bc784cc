//! The job-space model: deterministic enumeration of jobs from an axis product.
//!
//! An [`Axis`] is an ordered list of partial parameter assignments. A [`JobSpec`] is an
//! ordered list of axes; its Cartesian product defines the job space. [`JobSpec::job_at`]
//! decodes an integer index into one concrete [`Job`] using big-endian mixed-radix
//! arithmetic, so that any worker can compute its task's parameters from the index alone
//! without materializing the rest of the space.

use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value.
///
/// The original Python implementation treats parameters as arbitrary dynamically-typed
/// values; this is the closed, `Eq`-comparable substitute that lets [`JobSpec::job_at`]
/// stay pure and lets `metadata` stringify each variant unambiguously.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// A string.
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// A partial parameter assignment: one entry of one axis.
pub type Assignment = BTreeMap<String, ParamValue>;

/// One dimension of the job space: an ordered sequence of partial assignments.
#[derive(Debug, Clone, Default)]
pub struct Axis {
    entries: Vec<Assignment>,
}

impl Axis {
    /// Creates a new, empty axis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an axis from an iterator of assignments, preserving order.
    pub fn from_entries(entries: impl IntoIterator<Item = Assignment>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Appends one partial assignment, built from `(key, value)` pairs.
    pub fn push(&mut self, entry: impl IntoIterator<Item = (&'static str, ParamValue)>) -> &mut Self {
        self.entries
            .push(entry.into_iter().map(|(k, v)| (k.to_owned(), v)).collect());
        self
    }

    /// The number of entries in this axis.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this axis has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The ordered list of axes whose Cartesian product defines the job space.
///
/// `N = ∏ |Aᵢ|` jobs exist; job index `x` decodes to the tuple `(i₀, …, i_{k-1})` via
/// big-endian mixed-radix decoding, with the *last* axis varying slowest. Later axes
/// override earlier ones on key collision.
#[derive(Debug, Clone, Default)]
pub struct JobSpec {
    axes: Vec<Axis>,
}

/// A concrete job: the merge of one entry from every axis, plus stringified `metadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// The merged, typed parameters.
    pub params: Assignment,
    /// The stringified form of every parameter, delivered alongside `params`.
    pub metadata: BTreeMap<String, String>,
}

impl JobSpec {
    /// Builds a job specification from an ordered list of axes.
    pub fn new(axes: impl IntoIterator<Item = Axis>) -> Self {
        Self {
            axes: axes.into_iter().collect(),
        }
    }

    /// The axes that make up this specification.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// The total number of jobs: the product of the axis lengths.
    ///
    /// An empty axis list has a count of 1 (the empty product), matching the
    /// Cartesian-product identity.
    pub fn count(&self) -> usize {
        self.axes.iter().map(Axis::len).product()
    }

    /// Decodes `index` into the concrete job at that position.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.count()`, mirroring the distilled spec's constraint
    /// `0 ≤ index < N`; callers on the claim path always bound `index` by `count()`
    /// beforehand, so this is an invariant violation rather than an expected failure.
    pub fn job_at(&self, index: usize) -> Job {
        assert!(
            index < self.count(),
            "job index {index} out of range for job space of size {}",
            self.count()
        );

        let mut params = Assignment::new();
        let mut trailing_product = 1usize;

        // Walk axes from last to first so each axis's stride (`trailing_product`) is
        // the product of the lengths of axes *after* it — the big-endian mixed-radix
        // decoding in which the last axis varies slowest.
        for axis in self.axes.iter().rev() {
            let len = axis.len().max(1);
            let local_index = (index / trailing_product) % len;
            if let Some(entry) = axis.entries.get(local_index) {
                for (k, v) in entry {
                    params.insert(k.clone(), v.clone());
                }
            }
            trailing_product *= len;
        }

        let metadata = params.iter().map(|(k, v)| (k.clone(), v.to_string())).collect();

        Job { params, metadata }
    }

    /// Produces all `N` jobs in index order, lazily.
    pub fn enumerate(&self) -> impl Iterator<Item = Job> + '_ {
        (0..self.count()).map(move |i| self.job_at(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_of(pairs: &[(&'static str, ParamValue)]) -> Axis {
        let mut axis = Axis::new();
        for &(k, ref v) in pairs {
            axis.push([(k, v.clone())]);
        }
        axis
    }

    #[test]
    fn s1_single_axis_enumeration() {
        let spec = JobSpec::new([axis_of(&[
            ("x", ParamValue::Int(1)),
            ("x", ParamValue::Int(2)),
            ("x", ParamValue::Int(3)),
        ])]);

        assert_eq!(spec.count(), 3);
        assert_eq!(spec.job_at(0).params["x"], ParamValue::Int(1));
        assert_eq!(spec.job_at(2).params["x"], ParamValue::Int(3));
    }

    #[test]
    fn s2_two_axis_big_endian() {
        let a = axis_of(&[("a", ParamValue::Int(0)), ("a", ParamValue::Int(1))]);
        let b = axis_of(&[
            ("b", ParamValue::from("p")),
            ("b", ParamValue::from("q")),
            ("b", ParamValue::from("r")),
        ]);
        let spec = JobSpec::new([a, b]);

        assert_eq!(spec.count(), 6);

        let j0 = spec.job_at(0);
        assert_eq!(j0.params["a"], ParamValue::Int(0));
        assert_eq!(j0.params["b"], ParamValue::from("p"));

        let j3 = spec.job_at(3);
        assert_eq!(j3.params["a"], ParamValue::Int(1));
        assert_eq!(j3.params["b"], ParamValue::from("p"));

        let j5 = spec.job_at(5);
        assert_eq!(j5.params["a"], ParamValue::Int(1));
        assert_eq!(j5.params["b"], ParamValue::from("r"));
    }

    #[test]
    fn s3_key_collision_later_axis_wins() {
        let spec = JobSpec::new([
            axis_of(&[("k", ParamValue::from("x"))]),
            axis_of(&[("k", ParamValue::from("y"))]),
        ]);

        assert_eq!(spec.job_at(0).params["k"], ParamValue::from("y"));
    }

    #[test]
    fn enumeration_is_total_and_distinct_per_axis_zero() {
        let a = axis_of(&[("a", ParamValue::Int(0)), ("a", ParamValue::Int(1))]);
        let b = axis_of(&[
            ("b", ParamValue::Int(0)),
            ("b", ParamValue::Int(1)),
            ("b", ParamValue::Int(2)),
        ]);
        let spec = JobSpec::new([a, b]);

        let jobs: Vec<Job> = spec.enumerate().collect();
        assert_eq!(jobs.len(), spec.count());

        // Last-axis-slowest: for fixed i0, a contiguous range of indices shares a0.
        for i0 in 0..2 {
            let stride = 3;
            for i in i0 * stride..(i0 + 1) * stride {
                assert_eq!(spec.job_at(i).params["a"], ParamValue::Int(i0 as i64));
            }
        }
    }

    #[test]
    fn job_at_is_pure() {
        let spec = JobSpec::new([axis_of(&[
            ("x", ParamValue::Int(1)),
            ("x", ParamValue::Int(2)),
        ])]);
        assert_eq!(spec.job_at(1), spec.job_at(1));
    }

    #[test]
    fn metadata_stringifies_every_param() {
        let spec = JobSpec::new([axis_of(&[("n", ParamValue::Int(7))])]);
        let job = spec.job_at(0);
        assert_eq!(job.metadata["n"], "7");
    }

    #[test]
    fn empty_spec_has_one_job() {
        let spec = JobSpec::new([]);
        assert_eq!(spec.count(), 1);
        assert!(spec.job_at(0).params.is_empty());
    }
}
