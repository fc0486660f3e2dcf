//! Ordered sample storage for the current channel lifetime

use pulse_shared::Sample;

/// Persistent sample sequence; clones share structure with the original.
pub type Samples = im::Vector<Sample>;

/// Append-only sequence of samples.
///
/// Only the stream connector appends, and only after a payload parsed.
/// `clear` marks the start of a new channel lifetime and bumps `generation`.
#[derive(Debug, Default, Clone)]
pub struct PointAccumulator {
    samples: Samples,
    generation: u64,
}

impl PointAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.generation += 1;
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Detached copy for publishing; shares storage until either side changes.
    pub fn share(&self) -> Samples {
        self.samples.clone()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
