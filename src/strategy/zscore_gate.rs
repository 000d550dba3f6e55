//! Z-Score Gate
//!
//! Streaming rolling-window accumulator that standardizes each new value
//! against the trailing window ending at that value.
//!
//! Z-Score Formula: z = (value - rolling_mean) / rolling_std
//!
//! The standard deviation is the sample estimate (n - 1 denominator).
//! Until the window is full there are no statistics at all; once full, a
//! zero standard deviation leaves the z-score undefined rather than
//! dividing by zero.

use std::collections::VecDeque;

/// Default floor below which the rolling std counts as zero
const DEFAULT_MIN_STD: f64 = 1e-10;

/// Rolling statistics for the latest value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    /// Latest value pushed into the window
    pub value: f64,
    /// Rolling mean over the window
    pub mean: f64,
    /// Rolling sample standard deviation
    pub std_dev: f64,
    /// `None` when the window has no dispersion
    pub z_score: Option<f64>,
}

/// Rolling z-score calculator
#[derive(Debug, Clone)]
pub struct ZScoreGate {
    window: usize,
    min_std: f64,
    buffer: VecDeque<f64>,
}

impl ZScoreGate {
    /// Create a gate over `window` trailing observations
    pub fn new(window: usize) -> Self {
        Self {
            window,
            min_std: DEFAULT_MIN_STD,
            buffer: VecDeque::with_capacity(window + 1),
        }
    }

    /// Override the zero-dispersion floor (scale it to the data's units)
    pub fn with_min_std(mut self, min_std: f64) -> Self {
        self.min_std = min_std;
        self
    }

    /// Push a value; returns statistics once the window is full
    pub fn update(&mut self, value: f64) -> Option<ZScoreResult> {
        self.buffer.push_back(value);
        while self.buffer.len() > self.window {
            self.buffer.pop_front();
        }
        self.calculate()
    }

    /// Statistics for the current window contents
    pub fn calculate(&self) -> Option<ZScoreResult> {
        if !self.is_ready() || self.window < 2 {
            return None;
        }

        let value = *self.buffer.back()?;
        let mean = self.rolling_mean();
        let std_dev = self.rolling_std(mean);

        let z_score = (std_dev >= self.min_std).then(|| (value - mean) / std_dev);

        Some(ZScoreResult {
            value,
            mean,
            std_dev,
            z_score,
        })
    }

    fn rolling_mean(&self) -> f64 {
        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }

    fn rolling_std(&self, mean: f64) -> f64 {
        let variance = self
            .buffer
            .iter()
            .map(|&v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / (self.buffer.len() - 1) as f64;

        variance.sqrt()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_ready(&self) -> bool {
        self.buffer.len() >= self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_warm_up_has_no_statistics() {
        let mut gate = ZScoreGate::new(5);
        for i in 0..4 {
            assert!(gate.update(i as f64).is_none());
        }
        assert!(!gate.is_ready());
        assert!(gate.update(4.0).is_some());
        assert!(gate.is_ready());
    }

    #[test]
    fn test_sample_statistics() {
        let mut gate = ZScoreGate::new(4);
        let mut last = None;
        for v in [1.0, 2.0, 3.0, 6.0] {
            last = gate.update(v);
        }
        let result = last.unwrap();

        // mean 3, deviations -2,-1,0,3 -> ss = 14, sample var = 14/3
        assert_relative_eq!(result.mean, 3.0);
        assert_relative_eq!(result.std_dev, (14.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(result.z_score.unwrap(), 3.0 / (14.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_window_rolls() {
        let mut gate = ZScoreGate::new(3);
        for v in [100.0, 1.0, 2.0, 3.0] {
            gate.update(v);
        }
        let result = gate.calculate().unwrap();
        assert_relative_eq!(result.mean, 2.0);
        assert_relative_eq!(result.std_dev, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_std_is_undefined() {
        let mut gate = ZScoreGate::new(3);
        let mut last = None;
        for _ in 0..5 {
            last = gate.update(7.0);
        }
        let result = last.unwrap();
        assert_eq!(result.std_dev, 0.0);
        assert_eq!(result.z_score, None);
    }

    #[test]
    fn test_min_std_floor() {
        let mut gate = ZScoreGate::new(3).with_min_std(1.0);
        for v in [1.0, 1.1, 1.2] {
            gate.update(v);
        }
        assert!(gate.calculate().unwrap().z_score.is_none());
    }
}
