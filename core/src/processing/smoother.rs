use crate::math::stats::StatsHelper;
use std::collections::VecDeque;

pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Bounded FIFO of raw samples for one anchor.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SampleWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest once capacity is exceeded.
    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn mean(&self) -> f64 {
        StatsHelper::mean(&self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

}

/// Moving averages of the two anchor distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPair {
    pub d1: f64,
    pub d2: f64,
}

/// Per-anchor moving-average filter.
///
/// Inputs are not validated here; NaN or negative samples flow through the
/// arithmetic untouched.
#[derive(Debug, Clone)]
pub struct DistanceSmoother {
    first: SampleWindow,
    second: SampleWindow,
}

impl DistanceSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            first: SampleWindow::with_capacity(window),
            second: SampleWindow::with_capacity(window),
        }
    }

    pub fn smooth(&mut self, d1: f64, d2: f64) -> SmoothedPair {
        self.first.push(d1);
        self.second.push(d2);
        SmoothedPair {
            d1: self.first.mean(),
            d2: self.second.mean(),
        }
    }

    pub fn windows(&self) -> (&SampleWindow, &SampleWindow) {
        (&self.first, &self.second)
    }
}

impl Default for DistanceSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_its_own_mean() {
        let mut smoother = DistanceSmoother::default();
        let pair = smoother.smooth(2.0, 4.0);
        assert_eq!(pair, SmoothedPair { d1: 2.0, d2: 4.0 });
    }

    #[test]
    fn window_never_exceeds_capacity_and_averages_most_recent() {
        let mut smoother = DistanceSmoother::default();
        let inputs: Vec<f64> = (1..=12).map(|v| v as f64).collect();

        for (seen, &value) in inputs.iter().enumerate() {
            let pair = smoother.smooth(value, value * 2.0);
            let (first, second) = smoother.windows();
            assert!(first.len() <= 5);
            assert_eq!(first.len(), second.len());

            let start = (seen + 1).saturating_sub(5);
            let recent = &inputs[start..=seen];
            let expected = recent.iter().sum::<f64>() / recent.len() as f64;
            assert_eq!(pair.d1, expected);
            assert_eq!(pair.d2, expected * 2.0);
        }
    }

    #[test]
    fn eviction_follows_insertion_order() {
        let mut smoother = DistanceSmoother::new(2);
        smoother.smooth(10.0, 0.0);
        smoother.smooth(20.0, 0.0);
        let pair = smoother.smooth(30.0, 0.0);
        assert_eq!(pair.d1, 25.0);
    }

    #[test]
    fn zero_capacity_is_treated_as_one() {
        let mut smoother = DistanceSmoother::new(0);
        smoother.smooth(1.0, 1.0);
        let pair = smoother.smooth(3.0, 5.0);
        assert_eq!(pair, SmoothedPair { d1: 3.0, d2: 5.0 });
    }

    #[test]
    fn nan_passes_through() {
        let mut smoother = DistanceSmoother::default();
        let pair = smoother.smooth(f64::NAN, -1.0);
        assert!(pair.d1.is_nan());
        assert_eq!(pair.d2, -1.0);
    }
}
