//! Bounded, append-only record of one fall.

use freefall_core::{TrajectorySample, DEFAULT_MAX_SAMPLES};

/// Chronological (time, velocity) samples of the current fall.
///
/// Insertion order is time order. The history is cleared when a new fall
/// starts and only read (as a slice) by reporting code.
#[derive(Clone, Debug, PartialEq)]
pub struct TrajectoryHistory {
    samples: Vec<TrajectorySample>,
    limit: usize,
    dropped: usize,
}

impl TrajectoryHistory {
    /// Empty history holding at most `limit` samples (at least 1).
    pub fn new(limit: usize) -> Self {
        Self { samples: Vec::new(), limit: limit.max(1), dropped: 0 }
    }

    /// Append a cadence sample. Returns `false` once the bound is reached.
    pub fn record(&mut self, sample: TrajectorySample) -> bool {
        if self.samples.len() >= self.limit {
            self.dropped += 1;
            if self.dropped == 1 {
                log::debug!("trajectory history full ({} samples), dropping further samples", self.limit);
            }
            return false;
        }
        self.samples.push(sample);
        true
    }

    /// Make sure `sample` is the last entry.
    ///
    /// Skipped when the last sample already has the same time (the landing
    /// step fell on the sampling cadence). A full history gives up its last
    /// entry so the landing point is always kept.
    pub fn ensure_final(&mut self, sample: TrajectorySample) {
        if self.last().is_some_and(|last| last.time == sample.time) {
            return;
        }
        if self.samples.len() >= self.limit {
            self.samples.pop();
        }
        self.samples.push(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped = 0;
    }

    pub fn samples(&self) -> &[TrajectorySample] { &self.samples }
    pub fn last(&self) -> Option<&TrajectorySample> { self.samples.last() }
    pub fn len(&self) -> usize { self.samples.len() }
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }
    pub fn limit(&self) -> usize { self.limit }
    /// Cadence samples rejected because the history was full.
    pub fn dropped(&self) -> usize { self.dropped }
}

impl Default for TrajectoryHistory {
    fn default() -> Self { Self::new(DEFAULT_MAX_SAMPLES) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(t: f64, v: f64) -> TrajectorySample { TrajectorySample::new(t, v) }

    #[test]
    fn records_in_order() {
        let mut h = TrajectoryHistory::default();
        assert!(h.is_empty());
        h.record(s(0.0, 0.0));
        h.record(s(0.1, 0.98));
        h.record(s(0.2, 1.96));
        assert_eq!(h.len(), 3);
        assert_eq!(h.samples()[1], s(0.1, 0.98));
        assert_eq!(h.last(), Some(&s(0.2, 1.96)));
    }

    #[test]
    fn final_sample_not_duplicated() {
        let mut h = TrajectoryHistory::default();
        h.record(s(0.1, 1.0));
        h.ensure_final(s(0.1, 1.0));
        assert_eq!(h.len(), 1);
        h.ensure_final(s(0.13, 1.3));
        assert_eq!(h.len(), 2);
        assert_eq!(h.last(), Some(&s(0.13, 1.3)));
    }

    #[test]
    fn bounded_history_keeps_landing_point() {
        let mut h = TrajectoryHistory::new(2);
        assert!(h.record(s(0.0, 0.0)));
        assert!(h.record(s(0.1, 1.0)));
        assert!(!h.record(s(0.2, 2.0)));
        assert_eq!(h.dropped(), 1);

        h.ensure_final(s(0.25, 2.4));
        assert_eq!(h.samples(), &[s(0.0, 0.0), s(0.25, 2.4)]);
    }

    #[test]
    fn clear_resets() {
        let mut h = TrajectoryHistory::new(1);
        h.record(s(0.0, 0.0));
        h.record(s(0.1, 1.0));
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.dropped(), 0);
        assert_eq!(h.limit(), 1);
    }
}
