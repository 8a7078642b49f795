use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::error::{Result, SeqPriorError};

/// Accumulates count-weighted sums for a fixed set of names and reports
/// running means.
#[derive(Debug, Clone)]
pub struct RunningTracker {
    names: Vec<String>,
    sums: HashMap<String, f64>,
    count: f64,
    start_time: Instant,
}

impl RunningTracker {
    /// Create a tracker over `names`. Duplicates are dropped, order is kept.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !unique.iter().any(|n| n == name) {
                unique.push(name.to_string());
            }
        }

        if unique.is_empty() {
            return Err(SeqPriorError::invalid_parameter(
                "names",
                "tracker needs at least one name",
            ));
        }

        let mut tracker = RunningTracker {
            names: unique,
            sums: HashMap::new(),
            count: 0.0,
            start_time: Instant::now(),
        };
        tracker.reset();
        Ok(tracker)
    }

    /// Zero every sum and the counter, and restart the clock
    pub fn reset(&mut self) {
        self.sums = self.names.iter().map(|n| (n.clone(), 0.0)).collect();
        self.count = 0.0;
        self.start_time = Instant::now();
    }

    /// Add `value * count` to each named sum and `count` to the counter.
    ///
    /// Fails without touching any state if a name is not tracked.
    pub fn update(&mut self, named_values: &[(&str, f64)], count: f64) -> Result<()> {
        if let Some((name, _)) = named_values.iter().find(|(n, _)| !self.sums.contains_key(*n)) {
            return Err(SeqPriorError::UnknownMetric(name.to_string()));
        }

        self.count += count;
        for (name, value) in named_values {
            if let Some(sum) = self.sums.get_mut(*name) {
                *sum += value * count;
            }
        }
        Ok(())
    }

    /// Running mean for `name`; 0 before any update or for an untracked name
    pub fn get(&self, name: &str) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }
        self.sums.get(name).map_or(0.0, |sum| sum / self.count)
    }

    /// All running means keyed by name
    pub fn stats(&self) -> BTreeMap<String, f64> {
        self.names
            .iter()
            .map(|n| (n.clone(), self.get(n)))
            .collect()
    }

    /// One line with every mean to 3 decimals and the elapsed time,
    /// appended to `prefix` when it is non-empty.
    pub fn summarize(&self, prefix: &str) -> String {
        let mut output = String::from(prefix);
        if !output.is_empty() {
            output.push_str(", ");
        }
        for name in &self.names {
            output.push_str(&format!("{}: {:.3}, ", name, self.get(name)));
        }
        output.push_str(&format!(
            "elapsed time: {:.1}(s)",
            self.elapsed().as_secs_f64()
        ));
        output
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Total weight accumulated since the last reset
    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
