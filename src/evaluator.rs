use ndarray::{Array2, Array3};

use crate::error::Result;
use crate::experiment::ExperimentScope;
use crate::metrics::{
    AccuracyReporter, F1Reporter, MetricReporter, Metrics, ReportArtifact, RunningTracker,
};

/// One padded batch of sequences as produced by the data pipeline
#[derive(Debug, Clone)]
pub struct Minibatch {
    /// Word ids, `batch x max_len`
    pub words: Array2<usize>,
    /// 1 for real tokens, 0 for padding
    pub mask: Array2<f32>,
    /// Character ids, `batch x max_len x max_word_len`
    pub chars: Array3<usize>,
    pub char_mask: Array3<f32>,
    /// Gold tag ids, `batch x max_len`
    pub labels: Array2<usize>,
    /// Dataset positions of the batch rows
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub log_loss: f64,
    /// Predicted tag ids, `batch x max_len`
    pub predictions: Array2<usize>,
}

/// The tagging model under evaluation
pub trait SequenceModel {
    /// Switch to inference behaviour (no dropout and the like)
    fn eval(&mut self);

    /// Score one batch. `loss_weights` is `[weight, temperature]`.
    fn forward(&mut self, batch: &Minibatch, loss_weights: [f64; 2]) -> Result<ModelOutput>;
}

/// Runs a model over a dataset and reports masked accuracy or micro F1,
/// depending on `f1_score` in the experiment configuration.
pub struct Evaluator<'a, M: SequenceModel> {
    tag_vocab: Vec<String>,
    model: M,
    experiment: &'a ExperimentScope,
}

impl<'a, M: SequenceModel> Evaluator<'a, M> {
    pub fn new(tag_vocab: Vec<String>, model: M, experiment: &'a ExperimentScope) -> Self {
        Evaluator {
            tag_vocab,
            model,
            experiment,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Evaluate over every batch and log a one-line summary
    pub fn evaluate<I>(&mut self, batches: I) -> Result<(Metrics, ReportArtifact)>
    where
        I: IntoIterator<Item = Minibatch>,
    {
        let config = self.experiment.config();
        self.model.eval();

        let mut eval_stats = RunningTracker::new(&["log_loss"])?;
        let mut reporter: Box<dyn MetricReporter> = if config.f1_score {
            Box::new(F1Reporter::new(self.tag_vocab.clone()))
        } else {
            Box::new(AccuracyReporter::new())
        };

        for batch in batches {
            let output = self.model.forward(&batch, [1.0, config.vb_temp])?;
            reporter.update(
                output.predictions.view(),
                batch.labels.view(),
                batch.mask.view(),
            )?;
            eval_stats.update(&[("log_loss", output.log_loss)], f64::from(batch.mask.sum()))?;
        }

        let (perf, res) = reporter.report();
        let metrics_line = perf
            .entries()
            .iter()
            .map(|(name, value)| format!("{}: {:.5}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        let summary = eval_stats.summarize(&metrics_line);
        self.experiment.log().info(&summary);

        Ok((perf, res))
    }
}
