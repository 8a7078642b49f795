pub mod tracker;
pub mod scoring;
pub mod reporter;

pub use tracker::RunningTracker;
pub use scoring::{ClassCounts, MicroAverage, Scorer, Scores};
pub use reporter::{AccuracyReporter, F1Reporter, MetricReporter, Metrics, ReportArtifact};
