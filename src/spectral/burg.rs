//! Burg's method (maximum-entropy autoregressive fit).
//!
//! The estimator keeps its own raw buffer of the last N intervals and re-fits
//! the model on every sample once N have been seen.

use crate::window::SlidingWindow;

/// Run the Burg recursion in place.
///
/// `forward` and `backward` must both start as the input sequence and have
/// equal length. `coeffs` receives the prediction-error filter coefficients
/// `c_0..c_{M-1}` (lag 1..M), `prev` is scratch of the same length.
fn burg_recursion(
    forward: &mut [f64],
    backward: &mut [f64],
    coeffs: &mut [f64],
    prev: &mut [f64],
    epsilon: f64,
) {
    let n = forward.len();
    coeffs.iter_mut().for_each(|c| *c = 0.0);
    prev.iter_mut().for_each(|c| *c = 0.0);

    for m in 0..coeffs.len() {
        let mut num = 0.0;
        let mut den = 0.0;
        for t in (m + 1)..n {
            num += forward[t] * backward[t - 1];
            den += forward[t] * forward[t] + backward[t - 1] * backward[t - 1];
        }
        let k = -2.0 * num / (den + epsilon);

        coeffs[m] = k;
        for i in 0..m {
            coeffs[i] = prev[i] + k * prev[m - 1 - i];
        }

        for t in ((m + 1)..n).rev() {
            let f_old = forward[t];
            forward[t] = f_old + k * backward[t - 1];
            backward[t] = backward[t - 1] + k * f_old;
        }

        prev[..=m].copy_from_slice(&coeffs[..=m]);
    }
}

#[derive(Debug, Clone)]
pub struct ArEstimator {
    raw: SlidingWindow<f64>,
    samples_seen: u64,
    order: usize,
    center: bool,
    epsilon: f64,
    coefficients: Vec<f64>,
    forward: Vec<f64>,
    backward: Vec<f64>,
    prev: Vec<f64>,
}

impl ArEstimator {
    pub fn new(samples: usize, order: usize, center: bool, epsilon: f64) -> Self {
        Self {
            raw: SlidingWindow::new(samples),
            samples_seen: 0,
            order,
            center,
            epsilon,
            coefficients: vec![0.0; order],
            forward: vec![0.0; samples],
            backward: vec![0.0; samples],
            prev: vec![0.0; order],
        }
    }

    pub fn push(&mut self, value: f64) {
        self.raw.push(value);
        self.samples_seen += 1;
    }

    /// True once the raw buffer has been filled at least once since reset.
    pub fn is_ready(&self) -> bool {
        self.samples_seen >= self.raw.capacity() as u64
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Length N of the raw buffer.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Unbiased variance of the raw buffer, computed in two passes.
    pub fn buffer_variance(&self) -> f64 {
        let n = self.raw.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.raw.iter().sum::<f64>() / n as f64;
        self.raw.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    }

    /// Re-fit the model over the current buffer.
    ///
    /// Returns `None` until the buffer has been filled.
    pub fn estimate(&mut self) -> Option<&[f64]> {
        if !self.is_ready() {
            return None;
        }

        let offset = if self.center {
            self.raw.iter().sum::<f64>() / self.raw.len() as f64
        } else {
            0.0
        };
        for (slot, x) in self.forward.iter_mut().zip(self.raw.iter()) {
            *slot = x - offset;
        }
        self.backward.copy_from_slice(&self.forward);

        burg_recursion(
            &mut self.forward,
            &mut self.backward,
            &mut self.coefficients,
            &mut self.prev,
            self.epsilon,
        );

        if self.coefficients.iter().all(|c| c.is_finite()) {
            self.coefficients.iter_mut().for_each(|c| *c = -*c);
        } else {
            tracing::debug!("non-finite AR coefficients, clearing model");
            self.coefficients.iter_mut().for_each(|c| *c = 0.0);
        }
        Some(&self.coefficients)
    }

    pub fn reset(&mut self) {
        self.raw.clear();
        self.samples_seen = 0;
        self.coefficients.iter_mut().for_each(|c| *c = 0.0);
    }
}
