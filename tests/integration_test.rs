use std::fs;
use std::path::Path;

use ndarray::{array, Array2, Array3};
use seqprior::{
    config::Config,
    error::Result,
    evaluator::{Evaluator, Minibatch, ModelOutput, SequenceModel},
    experiment::{Experiment, ExperimentScope},
    metrics::ReportArtifact,
    prior_buffer::PriorBuffer,
};
use tempfile::tempdir;

/// Predicts the gold tags except that it always tags position 0 as `0`
struct FirstTokenO {
    eval_calls: usize,
    temperatures: Vec<f64>,
}

impl FirstTokenO {
    fn new() -> Self {
        FirstTokenO {
            eval_calls: 0,
            temperatures: Vec::new(),
        }
    }
}

impl SequenceModel for FirstTokenO {
    fn eval(&mut self) {
        self.eval_calls += 1;
    }

    fn forward(&mut self, batch: &Minibatch, loss_weights: [f64; 2]) -> Result<ModelOutput> {
        self.temperatures.push(loss_weights[1]);
        let mut predictions = batch.labels.clone();
        predictions.column_mut(0).fill(0);
        Ok(ModelOutput {
            log_loss: 0.5,
            predictions,
        })
    }
}

fn batch(labels: Array2<usize>, mask: Array2<f32>) -> Minibatch {
    let (rows, cols) = labels.dim();
    Minibatch {
        words: Array2::zeros((rows, cols)),
        mask,
        chars: Array3::zeros((rows, cols, 4)),
        char_mask: Array3::zeros((rows, cols, 4)),
        labels,
        indices: (0..rows).collect(),
    }
}

fn dataset() -> Vec<Minibatch> {
    vec![
        // 4 real tokens, position 0 is wrong once (label 1)
        batch(array![[1, 2, 0], [0, 0, 0]], array![[1.0, 1.0, 1.0], [1.0, 0.0, 0.0]]),
        // 4 real tokens, position 0 is wrong twice
        batch(array![[2, 2], [1, 0]], array![[1.0, 1.0], [1.0, 1.0]]),
    ]
}

fn enter(root: &Path, extra: &[&str]) -> ExperimentScope {
    let mut args: Vec<String> = vec![
        "seqprior".into(),
        "--experiments-prefix".into(),
        root.join("runs").display().to_string(),
        "--prior-file".into(),
        root.join("priors").display().to_string(),
        "--vocab-file".into(),
        root.join("vocab").display().to_string(),
    ];
    args.extend(extra.iter().map(|a| a.to_string()));
    let config = Config::from_args(args).unwrap();
    Experiment::new(config).unwrap().enter().unwrap()
}

#[test]
fn test_accuracy_evaluation_end_to_end() {
    let dir = tempdir().unwrap();
    let scope = enter(dir.path(), &["--vb-temp", "0.3"]);
    let log_file = scope.log_file();

    let mut evaluator = Evaluator::new(vec!["O".into(), "B".into(), "I".into()], FirstTokenO::new(), &scope);
    let (metrics, artifact) = evaluator.evaluate(dataset()).unwrap();

    // 8 masked tokens, 3 of them wrong
    assert!((metrics.acc - 5.0 / 8.0).abs() < 1e-12);
    assert_eq!(metrics.f1, 0.0);
    assert_eq!(artifact, ReportArtifact::Accuracy(metrics.acc));

    let model = evaluator.into_model();
    assert_eq!(model.eval_calls, 1);
    assert_eq!(model.temperatures, vec![0.3, 0.3]);

    scope.exit();
    let contents = fs::read_to_string(log_file).unwrap();
    assert!(contents.contains("acc: 0.62500, f1: 0.00000, prec: 0.00000, rec: 0.00000, log_loss: 0.500, elapsed time:"));
}

#[test]
fn test_f1_evaluation_end_to_end() {
    let dir = tempdir().unwrap();
    let scope = enter(dir.path(), &["--f1-score"]);

    let mut evaluator = Evaluator::new(vec!["O".into(), "B".into(), "I".into()], FirstTokenO::new(), &scope);
    let (metrics, artifact) = evaluator.evaluate(dataset()).unwrap();

    // accuracy covers both batches, F1 only the last one (2 of 4 right)
    assert!((metrics.acc - 5.0 / 8.0).abs() < 1e-12);
    assert!((metrics.f1 - 0.5).abs() < 1e-12);
    assert_eq!(artifact, ReportArtifact::F1History(vec![metrics.f1]));

    // a second pass appends to a fresh reporter, not the old history
    let (_, again) = evaluator.evaluate(dataset()).unwrap();
    assert_eq!(again, ReportArtifact::F1History(vec![metrics.f1]));
}

#[test]
fn test_empty_dataset_reports_zero() {
    let dir = tempdir().unwrap();
    let scope = enter(dir.path(), &[]);

    let mut evaluator = Evaluator::new(Vec::new(), FirstTokenO::new(), &scope);
    let (metrics, _) = evaluator.evaluate(Vec::new()).unwrap();
    assert_eq!(metrics.acc, 0.0);
}

#[test]
fn test_prior_buffer_persists_across_runs() {
    let dir = tempdir().unwrap();
    let lengths = [3, 5, 2];

    let scope = enter(dir.path(), &["--prior-dim", "4"]);
    let prior_dir = scope.config().prior_file.clone();
    let dim = scope.config().prior_dim;
    let mut prior = PriorBuffer::new(&lengths, dim, 2, "train", scope.log(), Some(prior_dir.as_path())).unwrap();

    let post = Array3::from_elem((2, 5, dim), 1.5f32);
    prior.update_buffer(&[1, 5], post.view(), &[5, 2]).unwrap();
    prior.save(scope.log()).unwrap();
    let log_file = scope.log_file();
    scope.exit();

    let log = fs::read_to_string(log_file).unwrap();
    assert!(log.contains("prior saved to:"));

    // different settings so the experiment directory is new
    let scope = enter(dir.path(), &["--prior-dim", "4", "--seed", "1"]);
    let restored = PriorBuffer::new(&lengths, dim, 2, "train", scope.log(), Some(prior_dir.as_path())).unwrap();
    for i in 0..lengths.len() {
        assert_eq!(restored.slot(i).unwrap(), prior.slot(i).unwrap());
    }
    // index 5 wrapped onto slot 2
    assert!(restored.slot(2).unwrap().iter().all(|&v| v == 1.5));
    assert!(restored.slot(0).unwrap().iter().all(|&v| v == 0.0));

    let padded = restored.read(&[0, 1, 2]).unwrap();
    assert_eq!(padded.dim(), (3, 5, dim));
}

#[test]
fn test_rerun_with_same_config_is_refused() {
    let dir = tempdir().unwrap();
    let scope = enter(dir.path(), &["--learning-rate", "0.01"]);
    assert!(scope.experiment_dir().ends_with("learning_rate0.01"));
    scope.exit();

    let config = Config::from_args([
        "seqprior".to_string(),
        "--experiments-prefix".into(),
        dir.path().join("runs").display().to_string(),
        "--prior-file".into(),
        dir.path().join("priors").display().to_string(),
        "--vocab-file".into(),
        dir.path().join("vocab").display().to_string(),
        "--learning-rate".into(),
        "0.01".into(),
    ])
    .unwrap();
    let err = Experiment::new(config).unwrap_err();
    assert!(err.to_string().starts_with("log exists:"));
}
