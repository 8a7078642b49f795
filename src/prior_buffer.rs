use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bincode::{deserialize, serialize};
use ndarray::{s, Array2, Array3, ArrayView3};

use crate::error::{Result, SeqPriorError};
use crate::experiment::ExperimentLog;

/// Per-sequence cache of model posteriors.
///
/// Slot `i` holds a `(len_i, dim)` array for training sequence `i`. The slot
/// shapes are fixed when the buffer is created; updates only overwrite
/// contents, and only once every `period` updates of that slot.
#[derive(Debug, Clone)]
pub struct PriorBuffer {
    buffer: Vec<Array2<f32>>,
    refresh_count: Vec<usize>,
    period: usize,
    dim: usize,
    path: Option<PathBuf>,
}

impl PriorBuffer {
    /// Create a buffer for `seq_lens.len()` sequences.
    ///
    /// With `init_path`, the buffer lives at `<init_path>/<name>_<dim>`. If
    /// that file exists it is loaded instead of zero-filling; if the path is
    /// taken by something other than a file, construction fails.
    pub fn new(
        seq_lens: &[usize],
        dim: usize,
        period: usize,
        name: &str,
        log: &ExperimentLog,
        init_path: Option<&Path>,
    ) -> Result<Self> {
        if period == 0 {
            return Err(SeqPriorError::invalid_parameter(
                "period",
                "refresh period must be greater than 0",
            ));
        }

        let path = init_path.map(|dir| dir.join(format!("{}_{}", name, dim)));

        let buffer = match &path {
            Some(p) if p.is_file() => {
                let loaded = Self::read_file(p)?;
                log.info(&format!("prior loaded from: {}", p.display()));
                Self::check_loaded(&loaded, seq_lens.len(), dim)?;
                loaded
            }
            Some(p) if p.exists() => return Err(SeqPriorError::InvalidPriorPath(p.clone())),
            _ => seq_lens.iter().map(|&len| Array2::zeros((len, dim))).collect(),
        };

        let refresh_count = vec![0; buffer.len()];
        Ok(PriorBuffer {
            buffer,
            refresh_count,
            period,
            dim,
            path,
        })
    }

    fn check_loaded(loaded: &[Array2<f32>], expected_slots: usize, dim: usize) -> Result<()> {
        if loaded.len() != expected_slots {
            return Err(SeqPriorError::dimension_mismatch(
                format!("{} slots", expected_slots),
                format!("{} slots", loaded.len()),
            ));
        }
        if let Some(slot) = loaded.iter().find(|b| b.ncols() != dim) {
            return Err(SeqPriorError::dimension_mismatch(
                format!("feature dim {}", dim),
                format!("feature dim {}", slot.ncols()),
            ));
        }
        Ok(())
    }

    /// Refresh slots from a batch of posteriors.
    ///
    /// `post` is `batch x max_len x dim`; row `k` belongs to sequence
    /// `indices[k]` and its first `seq_lens[k]` steps are valid. Indices wrap
    /// modulo the buffer length. A slot is overwritten only when its refresh
    /// count is a multiple of the period, and its count is bumped either way.
    pub fn update_buffer(
        &mut self,
        indices: &[usize],
        post: ArrayView3<f32>,
        seq_lens: &[usize],
    ) -> Result<()> {
        if self.buffer.is_empty() {
            return Err(SeqPriorError::EmptyBuffer("prior buffer has no slots".to_string()));
        }
        let (batch, max_len, dim) = post.dim();
        if dim != self.dim {
            return Err(SeqPriorError::dimension_mismatch(
                format!("feature dim {}", self.dim),
                format!("feature dim {}", dim),
            ));
        }

        if indices.len() != seq_lens.len() || indices.len() != batch {
            return Err(SeqPriorError::dimension_mismatch(
                format!("{} indices and lengths", indices.len()),
                format!("{} lengths, {} batch rows", seq_lens.len(), batch),
            ));
        }

        // Validate every write before touching the buffer
        let mut counts = self.refresh_count.clone();
        let mut writes = Vec::with_capacity(indices.len());
        for (k, (&i, &len)) in indices.iter().zip(seq_lens).enumerate() {
            let slot = i % self.buffer.len();
            if counts[slot] % self.period == 0 {
                let slot_len = self.buffer[slot].nrows();
                if slot_len != len || len > max_len {
                    return Err(SeqPriorError::dimension_mismatch(
                        format!("length {} for slot {}", slot_len, slot),
                        format!("length {}", len),
                    ));
                }
                writes.push((k, slot, len));
            }
            counts[slot] += 1;
        }

        for (k, slot, len) in writes {
            self.buffer[slot].assign(&post.slice(s![k, ..len, ..]));
        }
        self.refresh_count = counts;
        Ok(())
    }

    /// Gather slots into a zero-padded `batch x max_len x dim` array
    pub fn read(&self, indices: &[usize]) -> Result<Array3<f32>> {
        let slots = indices
            .iter()
            .map(|&i| self.slot(i))
            .collect::<Result<Vec<_>>>()?;

        let max_len = slots.iter().map(|b| b.nrows()).max().unwrap_or(0);
        let mut padded = Array3::zeros((slots.len(), max_len, self.dim));
        for (k, slot) in slots.iter().enumerate() {
            padded.slice_mut(s![k, ..slot.nrows(), ..]).assign(*slot);
        }
        Ok(padded)
    }

    /// Sequence lengths of the given slots
    pub fn lengths(&self, indices: &[usize]) -> Result<Vec<usize>> {
        indices.iter().map(|&i| self.slot(i).map(|b| b.nrows())).collect()
    }

    pub fn slot(&self, index: usize) -> Result<&Array2<f32>> {
        self.buffer.get(index).ok_or_else(|| {
            SeqPriorError::invalid_parameter(
                "index".to_string(),
                format!("{} out of range for {} slots", index, self.buffer.len()),
            )
        })
    }

    /// How many updates slot `index` has received
    pub fn refresh_count(&self, index: usize) -> Option<usize> {
        self.refresh_count.get(index).copied()
    }

    /// Serialize the whole buffer to its path
    pub fn save(&self, log: &ExperimentLog) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| {
            SeqPriorError::invalid_parameter("path", "prior buffer has no save path")
        })?;
        let serialized = serialize(&self.buffer)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        log.info(&format!("prior saved to: {}", path.display()));
        Ok(())
    }

    /// Replace the buffer contents with what is stored at its path.
    ///
    /// The stored buffer must match the current slot shapes. Refresh counts
    /// are reset.
    pub fn load(&mut self, log: &ExperimentLog) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| {
            SeqPriorError::invalid_parameter("path", "prior buffer has no load path")
        })?;
        let loaded = Self::read_file(path)?;
        Self::check_loaded(&loaded, self.buffer.len(), self.dim)?;
        if let Some((slot, (old, new))) = self
            .buffer
            .iter()
            .zip(&loaded)
            .enumerate()
            .find(|(_, (old, new))| old.nrows() != new.nrows())
        {
            return Err(SeqPriorError::dimension_mismatch(
                format!("length {} for slot {}", old.nrows(), slot),
                format!("length {}", new.nrows()),
            ));
        }
        log.info(&format!("prior loaded from: {}", path.display()));
        self.refresh_count = vec![0; self.buffer.len()];
        self.buffer = loaded;
        Ok(())
    }

    fn read_file(path: &Path) -> Result<Vec<Array2<f32>>> {
        let mut file = fs::File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(deserialize(&bytes)?)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
