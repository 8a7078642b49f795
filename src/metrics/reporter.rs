use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use super::scoring::{MicroAverage, Scorer, Scores};
use crate::error::{Result, SeqPriorError};

/// Evaluation summary returned by a reporter
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub acc: f64,
    pub f1: f64,
    pub prec: f64,
    pub rec: f64,
}

impl Metrics {
    /// `(name, value)` pairs sorted by name
    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("acc", self.acc),
            ("f1", self.f1),
            ("prec", self.prec),
            ("rec", self.rec),
        ]
    }
}

/// Secondary output of [`MetricReporter::report`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReportArtifact {
    /// Cumulative accuracy
    Accuracy(f64),
    /// Every F1 value reported so far
    F1History(Vec<f64>),
}

/// Accumulates masked predictions across batches
pub trait MetricReporter {
    /// Add one batch. `mask` weights each position; padding is 0.
    fn update(
        &mut self,
        pred: ArrayView2<usize>,
        label: ArrayView2<usize>,
        mask: ArrayView2<f32>,
    ) -> Result<()>;

    fn report(&mut self) -> (Metrics, ReportArtifact);
}

fn check_shapes(pred: &ArrayView2<usize>, label: &ArrayView2<usize>, mask: &ArrayView2<f32>) -> Result<()> {
    if pred.dim() != label.dim() || pred.dim() != mask.dim() {
        return Err(SeqPriorError::dimension_mismatch(
            format!("pred, label and mask of shape {:?}", pred.dim()),
            format!("label {:?}, mask {:?}", label.dim(), mask.dim()),
        ));
    }
    Ok(())
}

/// Sum of `(pred == label) * mask` and of `mask`
fn masked_counts(pred: &ArrayView2<usize>, label: &ArrayView2<usize>, mask: &ArrayView2<f32>) -> (f64, f64) {
    let right = Zip::from(pred).and(label).and(mask).fold(0.0, |acc, p, l, m| {
        let hit = if p == l { 1.0 } else { 0.0 };
        acc + hit * f64::from(*m)
    });
    let total: f64 = mask.iter().map(|&m| f64::from(m)).sum();
    (right, total)
}

fn ratio(right: f64, total: f64) -> f64 {
    if total != 0.0 {
        right / total
    } else {
        0.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Plain masked accuracy. F1, precision and recall are always reported as 0.
#[derive(Debug, Clone, Default)]
pub struct AccuracyReporter {
    right_count: f64,
    instance_count: f64,
    last_batch: Option<(Array2<usize>, Array2<usize>)>,
}

impl AccuracyReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn right_count(&self) -> f64 {
        self.right_count
    }

    pub fn instance_count(&self) -> f64 {
        self.instance_count
    }

    /// Raw predictions and labels of the latest batch
    pub fn last_batch(&self) -> Option<(&Array2<usize>, &Array2<usize>)> {
        self.last_batch.as_ref().map(|(p, l)| (p, l))
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.right_count, self.instance_count)
    }
}

impl MetricReporter for AccuracyReporter {
    fn update(
        &mut self,
        pred: ArrayView2<usize>,
        label: ArrayView2<usize>,
        mask: ArrayView2<f32>,
    ) -> Result<()> {
        check_shapes(&pred, &label, &mask)?;
        let (right, total) = masked_counts(&pred, &label, &mask);
        self.right_count += right;
        self.instance_count += total;
        self.last_batch = Some((pred.to_owned(), label.to_owned()));
        Ok(())
    }

    fn report(&mut self) -> (Metrics, ReportArtifact) {
        let acc = self.accuracy();
        (
            Metrics { acc, f1: 0.0, prec: 0.0, rec: 0.0 },
            ReportArtifact::Accuracy(acc),
        )
    }
}

/// Micro precision/recall/F1 reporter for tag sequences.
///
/// Accuracy is cumulative over every update, but each `report` scores only the
/// latest batch and the returned F1/precision/recall are the mean over all
/// reports so far.
#[derive(Debug, Clone)]
pub struct F1Reporter<S: Scorer = MicroAverage> {
    tag_vocab: Vec<String>,
    scorer: S,
    right_count: f64,
    instance_count: f64,
    pred: Vec<usize>,
    label: Vec<usize>,
    f1: Vec<f64>,
    prec: Vec<f64>,
    rec: Vec<f64>,
}

impl F1Reporter<MicroAverage> {
    /// `tag_vocab[id]` is the tag name for label id `id`
    pub fn new(tag_vocab: Vec<String>) -> Self {
        Self::with_scorer(tag_vocab, MicroAverage)
    }

    /// Per-tag scores of the latest batch, one tag per line
    pub fn class_report(&self) -> String {
        MicroAverage::per_class(&self.label, &self.pred)
            .into_iter()
            .map(|(class, scores)| {
                format!(
                    "{}: prec {:.5}, rec {:.5}, f1 {:.5}",
                    self.tag_name(class),
                    scores.precision,
                    scores.recall,
                    scores.f1
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<S: Scorer> F1Reporter<S> {
    pub fn with_scorer(tag_vocab: Vec<String>, scorer: S) -> Self {
        F1Reporter {
            tag_vocab,
            scorer,
            right_count: 0.0,
            instance_count: 0.0,
            pred: Vec::new(),
            label: Vec::new(),
            f1: Vec::new(),
            prec: Vec::new(),
            rec: Vec::new(),
        }
    }

    pub fn tag_name(&self, id: usize) -> String {
        self.tag_vocab
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", id))
    }

    pub fn right_count(&self) -> f64 {
        self.right_count
    }

    pub fn instance_count(&self) -> f64 {
        self.instance_count
    }

    /// Masked-in predictions of the latest batch
    pub fn predictions(&self) -> &[usize] {
        &self.pred
    }

    /// Masked-in labels of the latest batch
    pub fn labels(&self) -> &[usize] {
        &self.label
    }

    pub fn f1_history(&self) -> &[f64] {
        &self.f1
    }

    pub fn precision_history(&self) -> &[f64] {
        &self.prec
    }

    pub fn recall_history(&self) -> &[f64] {
        &self.rec
    }
}

impl<S: Scorer> MetricReporter for F1Reporter<S> {
    fn update(
        &mut self,
        pred: ArrayView2<usize>,
        label: ArrayView2<usize>,
        mask: ArrayView2<f32>,
    ) -> Result<()> {
        check_shapes(&pred, &label, &mask)?;
        let (right, total) = masked_counts(&pred, &label, &mask);
        self.right_count += right;
        self.instance_count += total;

        // Row-major flatten, keeping only positions with a non-zero mask
        self.pred.clear();
        self.label.clear();
        for ((&p, &l), &m) in pred.iter().zip(label.iter()).zip(mask.iter()) {
            if m != 0.0 {
                self.pred.push(p);
                self.label.push(l);
            }
        }
        Ok(())
    }

    fn report(&mut self) -> (Metrics, ReportArtifact) {
        let acc = ratio(self.right_count, self.instance_count);
        let Scores { precision, recall, f1 } = self.scorer.score(&self.label, &self.pred);

        self.f1.push(f1);
        self.rec.push(recall);
        self.prec.push(precision);

        (
            Metrics {
                acc,
                f1: mean(&self.f1),
                prec: mean(&self.prec),
                rec: mean(&self.rec),
            },
            ReportArtifact::F1History(self.f1.clone()),
        )
    }
}
