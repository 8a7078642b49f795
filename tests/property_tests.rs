#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use ndarray::Array3;
    use seqprior::experiment::ExperimentLog;
    use seqprior::metrics::{AccuracyReporter, MetricReporter, RunningTracker};
    use seqprior::prior_buffer::PriorBuffer;
    use ndarray::Array2;

    // (value, count) pairs fed to a single-name tracker
    fn updates_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((-100.0f64..100.0, 0.0f64..50.0), 1..30)
    }

    fn lengths_strategy() -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(1usize..=20, 1..10)
    }

    proptest! {
        #[test]
        fn test_tracker_mean_is_weighted_average(updates in updates_strategy()) {
            let mut tracker = RunningTracker::new(&["log_loss"]).unwrap();
            for &(value, count) in &updates {
                tracker.update(&[("log_loss", value)], count).unwrap();
            }

            let total: f64 = updates.iter().map(|(_, c)| c).sum();
            let weighted: f64 = updates.iter().map(|(v, c)| v * c).sum();
            let expected = if total == 0.0 { 0.0 } else { weighted / total };

            prop_assert!((tracker.get("log_loss") - expected).abs() <= 1e-6 * (1.0 + expected.abs()));
            prop_assert_eq!(tracker.len(), 1);
        }

        #[test]
        fn test_prior_slots_keep_their_shape(
            lengths in lengths_strategy(),
            dim in 1usize..=8,
            period in 1usize..=4,
            steps in 1usize..=12
        ) {
            let dir = tempfile::tempdir().unwrap();
            let log = ExperimentLog::to_file(&dir.path().join("log")).unwrap();
            let mut buffer = PriorBuffer::new(&lengths, dim, period, "train", &log, None).unwrap();

            for step in 0..steps {
                // walk past the end so indices wrap
                let index = step * 3;
                let len = lengths[index % lengths.len()];
                let post = Array3::from_elem((1, len, dim), step as f32);
                buffer.update_buffer(&[index], post.view(), &[len]).unwrap();
            }

            prop_assert_eq!(buffer.len(), lengths.len());
            for (i, &len) in lengths.iter().enumerate() {
                prop_assert_eq!(buffer.slot(i).unwrap().dim(), (len, dim));
            }
            let total: usize = (0..lengths.len()).map(|i| buffer.refresh_count(i).unwrap()).sum();
            prop_assert_eq!(total, steps);

            let all: Vec<usize> = (0..lengths.len()).collect();
            let padded = buffer.read(&all).unwrap();
            let max_len = *lengths.iter().max().unwrap();
            prop_assert_eq!(padded.dim(), (lengths.len(), max_len, dim));
        }

        #[test]
        fn test_accuracy_bounded(
            labels in prop::collection::vec(0usize..5, 1..40),
            preds in prop::collection::vec(0usize..5, 40),
            mask in prop::collection::vec(prop::bool::ANY, 40)
        ) {
            let n = labels.len();
            let label = Array2::from_shape_vec((1, n), labels).unwrap();
            let pred = Array2::from_shape_vec((1, n), preds[..n].to_vec()).unwrap();
            let mask = Array2::from_shape_vec(
                (1, n),
                mask[..n].iter().map(|&m| if m { 1.0f32 } else { 0.0 }).collect(),
            ).unwrap();

            let mut reporter = AccuracyReporter::new();
            reporter.update(pred.view(), label.view(), mask.view()).unwrap();
            prop_assert!(reporter.instance_count() >= reporter.right_count());
            prop_assert!(reporter.right_count() >= 0.0);

            let (metrics, _) = reporter.report();
            prop_assert!((0.0..=1.0).contains(&metrics.acc));
        }
    }
}
