//! Time-bounded sample window

use std::collections::{HashMap, VecDeque};

use entity::Timestamp;

/// One headcount observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountSample {
    pub timestamp: Timestamp,
    pub count: u32,
}

/// Samples newer than `now - duration`, oldest first
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<CountSample>,
    duration_s: f64,
}

impl SampleWindow {
    pub fn new(duration_s: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            duration_s,
        }
    }

    /// Append a sample and discard everything older than the window
    pub fn push(&mut self, sample: CountSample) {
        self.samples.push_back(sample);
        let cutoff = sample.timestamp - self.duration_s;
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&CountSample> {
        self.samples.back()
    }

    /// Most frequent count. Ties go to the value seen first.
    pub fn mode(&self) -> Option<u32> {
        let mut tally: HashMap<u32, (usize, usize)> = HashMap::new();
        for (index, sample) in self.samples.iter().enumerate() {
            tally.entry(sample.count).or_insert((0, index)).0 += 1;
        }

        tally
            .into_iter()
            .max_by(|(_, (freq_a, first_a)), (_, (freq_b, first_b))| {
                freq_a.cmp(freq_b).then(first_b.cmp(first_a))
            })
            .map(|(count, _)| count)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
