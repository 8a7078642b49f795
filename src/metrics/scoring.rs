use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Precision, recall and F1 for one set of predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Scores {
    /// Build scores from raw counts, yielding 0 wherever a denominator is 0
    pub fn from_counts(true_positives: usize, false_positives: usize, false_negatives: usize) -> Self {
        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if true_positives + false_negatives > 0 {
            true_positives as f64 / (true_positives + false_negatives) as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * (precision * recall) / (precision + recall)
        } else {
            0.0
        };

        Scores { precision, recall, f1 }
    }
}

/// Turns aligned label/prediction sequences into scores
pub trait Scorer {
    fn score(&self, labels: &[usize], predictions: &[usize]) -> Scores;
}

/// Per-class confusion counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Micro-averaged multi-class scoring: true/false positive and false negative
/// counts are pooled over every class before dividing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroAverage;

impl MicroAverage {
    /// Confusion counts for every class seen in either sequence
    pub fn class_counts(labels: &[usize], predictions: &[usize]) -> BTreeMap<usize, ClassCounts> {
        let mut counts: BTreeMap<usize, ClassCounts> = BTreeMap::new();

        for (&label, &pred) in labels.iter().zip(predictions.iter()) {
            if label == pred {
                counts.entry(label).or_default().true_positives += 1;
            } else {
                counts.entry(pred).or_default().false_positives += 1;
                counts.entry(label).or_default().false_negatives += 1;
            }
        }

        counts
    }

    /// Scores for each class on its own
    pub fn per_class(labels: &[usize], predictions: &[usize]) -> BTreeMap<usize, Scores> {
        Self::class_counts(labels, predictions)
            .into_iter()
            .map(|(class, c)| {
                (class, Scores::from_counts(c.true_positives, c.false_positives, c.false_negatives))
            })
            .collect()
    }
}

impl Scorer for MicroAverage {
    fn score(&self, labels: &[usize], predictions: &[usize]) -> Scores {
        let (tp, fp, fn_) = Self::class_counts(labels, predictions)
            .values()
            .fold((0, 0, 0), |(tp, fp, fn_), c| {
                (tp + c.true_positives, fp + c.false_positives, fn_ + c.false_negatives)
            });
        Scores::from_counts(tp, fp, fn_)
    }
}
