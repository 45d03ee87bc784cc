//! The configuration layer: defaults for script-generation options, loaded from an
//! optional TOML file and overridden by explicit CLI flags.
//!
//! This generalizes the keyword-argument defaults the distilled spec's reference
//! implementation hard-codes per call (`partition='savio2'`, `jobs_per_node=24`, …)
//! into a single layered `Config`, the same file-then-flags precedence the reference
//! CLI tooling in this codebase applies to its own subcommands.

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;

/// Default script-generation options, all overridable by CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields, default)]
pub struct ScriptDefaults {
    /// Scheduler resource pool.
    pub partition: String,
    /// Scheduler billing account, if any.
    pub account: Option<String>,
    /// Scheduler QoS class, if any.
    pub qos: Option<String>,
    /// Wall clock limit.
    pub walltime: String,
    /// Worker processes per array element.
    pub jobs_per_node: usize,
    /// Size of the worker-node array.
    pub maxnodes: usize,
    /// Directory for scheduler stdout and worker logs.
    pub logdir: String,
    /// The command used to submit a rendered script (e.g. `sbatch`).
    pub submit_command: String,
}

impl Default for ScriptDefaults {
    fn default() -> Self {
        Self {
            partition: "batch".to_owned(),
            account: None,
            qos: None,
            walltime: "72:00:00".to_owned(),
            jobs_per_node: 24,
            maxnodes: 100,
            logdir: "log".to_owned(),
            submit_command: "sbatch".to_owned(),
        }
    }
}

/// The configuration for the gridrunner CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields, default)]
pub struct Config {
    /// Defaults for script-generation options.
    pub script: ScriptDefaults,
    /// The scheduler's accounting command, invoked by `cleanup` with the job id
    /// appended (e.g. `sacct -j`).
    pub accounting_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            script: ScriptDefaults::default(),
            accounting_command: "sacct -j".to_owned(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` if given, falling back to built-in defaults
    /// when no file is present. A missing `path` is not an error; an explicitly
    /// provided path that doesn't parse is.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let raw = builder.build().context("loading gridrunner configuration")?;

        // An empty source set deserializes to all-defaults via `serde(default)`.
        raw.try_deserialize().context("parsing gridrunner configuration")
    }
}
