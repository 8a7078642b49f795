//! # seqprior - Bookkeeping for sequence labeling experiments
//!
//! seqprior carries the pieces of a tagging model's training loop that are not
//! the model itself: where a run's results live, how its log is kept, how
//! running losses and tag metrics are accumulated, and a per-sequence cache of
//! model posteriors that is refreshed on a slow schedule.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seqprior::config::Config;
//! use seqprior::experiment::Experiment;
//! use seqprior::prior_buffer::PriorBuffer;
//!
//! # fn main() -> seqprior::error::Result<()> {
//! let config = Config::from_args(["train", "--vb-temp", "0.5"])?;
//! let mut scope = Experiment::new(config)?.enter()?;
//! scope.register_directory("checkpoints")?;
//!
//! // One cached prior per training sentence
//! let sentence_lengths = [12, 7, 30];
//! let prior_dir = scope.config().prior_file.clone();
//! let prior = PriorBuffer::new(&sentence_lengths, 50, 5, "train", scope.log(), Some(prior_dir.as_path()))?;
//! prior.save(scope.log())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Run configuration and default introspection
//! - [`error`] - Error types and result handling
//! - [`evaluator`] - Evaluation pass over a dataset
//! - [`experiment`] - Experiment directories and log lifecycle
//! - [`metrics`] - Running means, accuracy and micro F1 reporters
//! - [`prior_buffer`] - Periodically refreshed per-sequence prior cache
//! - [`schedule`] - KL temperature annealing

pub mod config;
pub mod error;
pub mod evaluator;
pub mod experiment;
pub mod metrics;
pub mod prior_buffer;
pub mod schedule;
