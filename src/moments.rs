//! Retractable Welford accumulator.
//!
//! `with_sample` is the usual online update. `without_sample` inverts it, so a
//! sliding window can drop its oldest sample without a second pass.

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMoments {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningMoments {
    /// Moments after adding `x`.
    pub fn with_sample(self, x: f64) -> Self {
        let count = self.count + 1;
        let delta = x - self.mean;
        let mean = self.mean + delta / count as f64;
        let m2 = self.m2 + delta * (x - mean);
        Self { count, mean, m2 }
    }

    /// Moments as if `x` had never been added.
    ///
    /// `x` must be one of the samples currently accounted for.
    pub fn without_sample(self, x: f64) -> Self {
        if self.count <= 1 {
            return Self::default();
        }
        let n = self.count as f64;
        let mean = (self.mean * n - x) / (n - 1.0);
        let m2 = (self.m2 - (x - self.mean) * (x - mean)).max(0.0);
        Self {
            count: self.count - 1,
            mean,
            m2,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance, `M2 / count`; zero when empty.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
