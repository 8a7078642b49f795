//! Run configuration
//!
//! Every setting is a command-line argument with a declared default. Arguments
//! are split into two help headings: [`BASICS`] holds operational settings
//! (paths, debug mode) and [`CONFIGS`] holds the hyper-parameters that identify
//! a run. Only the latter take part in experiment directory naming.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SeqPriorError};

/// Heading for operational arguments
pub const BASICS: &str = "basics";

/// Heading for arguments that identify an experiment
pub const CONFIGS: &str = "configs";

#[derive(Debug, Clone, PartialEq, Parser, Serialize, Deserialize)]
#[command(name = "seqprior", about = "Sequence labeling experiment settings")]
pub struct Config {
    /// Skip experiment directory creation and log to the console
    #[arg(long, help_heading = BASICS)]
    pub debug: bool,

    /// Directory holding persisted prior buffers
    #[arg(long, default_value = "priors", help_heading = BASICS)]
    pub prior_file: PathBuf,

    /// Directory holding vocabulary files
    #[arg(long, default_value = "vocab", help_heading = BASICS)]
    pub vocab_file: PathBuf,

    /// Root under which experiment directories are created
    #[arg(long, default_value = "experiments", help_heading = BASICS)]
    pub experiments_prefix: PathBuf,

    /// Name of the log file inside the experiment directory
    #[arg(long, default_value = "log", help_heading = BASICS)]
    pub logfile_name: String,

    #[arg(long, default_value_t = 32, help_heading = CONFIGS)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 100, help_heading = CONFIGS)]
    pub eval_batch_size: usize,

    /// Word embedding dimension
    #[arg(long, default_value_t = 100, help_heading = CONFIGS)]
    pub edim: usize,

    /// Feature dimension of each cached prior
    #[arg(long, default_value_t = 50, help_heading = CONFIGS)]
    pub prior_dim: usize,

    /// Number of updates between prior refreshes
    #[arg(long, default_value_t = 1, help_heading = CONFIGS)]
    pub prior_freq: usize,

    #[arg(long, default_value_t = 1e-3, help_heading = CONFIGS)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 30_000, help_heading = CONFIGS)]
    pub n_iter: usize,

    /// Temperature passed to the model at evaluation time
    #[arg(long, default_value_t = 1.0, help_heading = CONFIGS)]
    pub vb_temp: f64,

    #[arg(long, default_value_t = 1e-4, help_heading = CONFIGS)]
    pub kl_anneal_rate: f64,

    #[arg(long, default_value_t = 1.0, help_heading = CONFIGS)]
    pub max_temp: f64,

    /// Report micro F1 instead of plain accuracy
    #[arg(long, help_heading = CONFIGS)]
    pub f1_score: bool,

    #[arg(long, default_value_t = 0, help_heading = CONFIGS)]
    pub seed: u64,
}

impl Config {
    /// Parse a configuration from an argument list (first item is the program name)
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::try_parse_from(args)?)
    }

    /// A configuration with every argument at its declared default
    pub fn defaults() -> Result<Self> {
        Self::from_args(["seqprior"])
    }

    /// Argument ids listed under the given help heading, sorted
    pub fn group_keys(group: &str) -> Vec<String> {
        let mut keys: Vec<String> = Self::command()
            .get_arguments()
            .filter(|arg| arg.get_help_heading() == Some(group))
            .map(|arg| arg.get_id().as_str().to_string())
            .collect();
        keys.sort();
        keys
    }

    /// The snapshot as a JSON object keyed by argument id
    pub fn values(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(SeqPriorError::Config(format!(
                "expected an object snapshot, got {}",
                other
            ))),
        }
    }

    /// `(key, value)` pairs in `group` whose value differs from the default,
    /// sorted by key
    pub fn non_default_values(&self, group: &str) -> Result<Vec<(String, String)>> {
        let current = self.values()?;
        let defaults = Self::defaults()?.values()?;

        let mut diffs = Vec::new();
        for key in Self::group_keys(group) {
            let value = current.get(&key).ok_or_else(|| {
                SeqPriorError::Config(format!("argument '{}' missing from snapshot", key))
            })?;
            if defaults.get(&key) != Some(value) {
                diffs.push((key, display_value(value)));
            }
        }
        Ok(diffs)
    }

    /// Write the snapshot as pretty JSON
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
