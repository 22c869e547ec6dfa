//! ═══════════════════════════════════════════════════════════════════════════════
//! STATS — Statistical Primitives for the Control Loop
//! ═══════════════════════════════════════════════════════════════════════════════
//!
//! Building blocks shared by the monitor and the pacer:
//! - EWMA (Exponentially Weighted Moving Average) for smoothing
//! - Rolling window with mean/stdev/trend for stability estimation
//! ═══════════════════════════════════════════════════════════════════════════════

use std::cmp::Ordering;
use std::collections::VecDeque;

/// Total-order comparison for f64 (NaN sorts last)
pub fn float_cmp(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EWMA — Exponentially Weighted Moving Average
// ═══════════════════════════════════════════════════════════════════════════════

/// Exponentially Weighted Moving Average.
/// New value weighted by α, history by (1-α).
#[derive(Debug, Clone)]
pub struct Ewma {
    /// Smoothing factor (0 < α ≤ 1)
    alpha: f64,
    value: f64,
    initialized: bool,
}

impl Ewma {
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self {
            alpha,
            value: 0.0,
            initialized: false,
        }
    }

    /// Seed the average with a starting value instead of adopting the first
    /// sample wholesale. Used where inertia from a known baseline matters.
    pub fn with_initial(alpha: f64, initial: f64) -> Self {
        let mut ewma = Self::new(alpha);
        ewma.value = initial;
        ewma.initialized = true;
        ewma
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        if !self.initialized {
            self.value = sample;
            self.initialized = true;
        } else {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        }
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROLLING WINDOW — bounded sample buffer with derived statistics
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-size rolling window over recent samples
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    max_size: usize,
}

impl RollingWindow {
    pub fn new(max_size: usize) -> Self {
        assert!(max_size > 0, "Window size must be positive");
        Self {
            samples: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() >= self.max_size {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.max_size
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Population standard deviation over the window
    pub fn std_dev(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .samples
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / n as f64;
        variance.sqrt()
    }

    /// Net movement over the most recent `n` samples (last − first).
    /// Returns None until at least 3 of the requested samples exist.
    pub fn trend(&self, n: usize) -> Option<f64> {
        let len = self.samples.len();
        let take = n.min(len);
        if take < 3 {
            return None;
        }
        let first = self.samples[len - take];
        let last = self.samples[len - 1];
        Some(last - first)
    }

    /// True when every sample in the window satisfies the predicate and the
    /// window is full. Used for sustained-condition exit checks.
    pub fn all_full<F: Fn(f64) -> bool>(&self, pred: F) -> bool {
        self.is_full() && self.samples.iter().all(|&v| pred(v))
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ewma_smoothing() {
        let mut ewma = Ewma::new(0.5);
        ewma.update(1.0);
        assert_eq!(ewma.value(), 1.0); // first sample adopted
        ewma.update(0.0);
        assert!((ewma.value() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_ewma_with_initial() {
        let mut ewma = Ewma::with_initial(0.1, 0.5);
        ewma.update(1.0);
        // Moves 10% of the way from 0.5 toward 1.0
        assert!((ewma.value() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut w = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        assert!((w.mean() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_std_dev() {
        let mut w = RollingWindow::new(10);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            w.push(v);
        }
        assert!((w.std_dev() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_trend() {
        let mut w = RollingWindow::new(10);
        w.push(0.1);
        w.push(0.2);
        assert!(w.trend(5).is_none()); // too few samples
        w.push(0.3);
        w.push(0.4);
        let t = w.trend(5).unwrap();
        assert!(t > 0.0);
    }

    #[test]
    fn test_window_all_full() {
        let mut w = RollingWindow::new(3);
        w.push(0.6);
        w.push(0.7);
        assert!(!w.all_full(|v| v >= 0.5)); // not full yet
        w.push(0.8);
        assert!(w.all_full(|v| v >= 0.5));
        w.push(0.4);
        assert!(!w.all_full(|v| v >= 0.5));
    }
}
