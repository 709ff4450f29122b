//! Time-domain HRV statistics over the sliding window.
//!
//! Everything here is maintained incrementally: each accepted interval adds
//! its own contribution and retracts the contribution of the interval it
//! evicted. Only the rank lookups and the rare eviction-of-extreme case touch
//! every histogram bin.

use crate::config::HrvConfig;
use crate::histogram::Histogram;
use crate::moments::RunningMoments;
use crate::window::SlidingWindow;

/// Sum of squared adjacent differences and the count of large ones, for the
/// pairs currently inside the window.
#[derive(Debug, Clone, Copy, Default)]
struct SuccessiveDiffs {
    sum_sq: u64,
    over_threshold: u32,
}

impl SuccessiveDiffs {
    fn add(&mut self, diff: i64, threshold: f64) {
        self.sum_sq += diff.unsigned_abs().pow(2);
        if diff.abs() as f64 > threshold {
            self.over_threshold += 1;
        }
    }

    fn retract(&mut self, diff: i64, threshold: f64) {
        self.sum_sq = self.sum_sq.saturating_sub(diff.unsigned_abs().pow(2));
        if diff.abs() as f64 > threshold {
            self.over_threshold = self.over_threshold.saturating_sub(1);
        }
    }
}

/// Time-domain metrics for the current window contents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeDomainMetrics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub p20: f64,
    pub p80: f64,
    pub rmssd: f64,
    pub pnn50: f64,
    pub triangular_index: f64,
    pub tinn: f64,
}

#[derive(Debug, Clone)]
pub struct StreamingStatistics {
    window: SlidingWindow<u16>,
    histogram: Histogram,
    moments: RunningMoments,
    diffs: SuccessiveDiffs,
    min: Option<f64>,
    max: Option<f64>,
    diff_threshold: f64,
}

impl StreamingStatistics {
    pub fn new(config: &HrvConfig) -> Self {
        Self {
            window: SlidingWindow::new(config.window_capacity),
            histogram: Histogram::new(config.hist_start_ms, config.bin_width_ms, config.bin_count()),
            moments: RunningMoments::default(),
            diffs: SuccessiveDiffs::default(),
            min: None,
            max: None,
            diff_threshold: config.diff_threshold_ms,
        }
    }

    /// Fold one interval into the window; returns the interval it evicted.
    pub fn observe(&mut self, value: u16) -> Option<u16> {
        let previous = self.window.newest();
        let evicted = self.window.push(value);
        let x = f64::from(value);

        self.histogram.observe(x, evicted.map(f64::from));
        self.update_extremes(x, evicted.map(f64::from));

        if let Some(old) = evicted {
            self.moments = self.moments.without_sample(f64::from(old));
        }
        self.moments = self.moments.with_sample(x);

        // The pair (evicted, new oldest) left the window with the eviction.
        if let (Some(old), Some(next)) = (evicted, self.window.oldest()) {
            self.diffs
                .retract(i64::from(old) - i64::from(next), self.diff_threshold);
        }
        if let Some(prev) = previous {
            self.diffs
                .add(i64::from(value) - i64::from(prev), self.diff_threshold);
        }

        evicted
    }

    /// Bins are compared rather than raw values, so a clamped outlier and the
    /// bin center cached after a rescan are recognised as the same extreme.
    fn update_extremes(&mut self, x: f64, evicted: Option<f64>) {
        let hist = &self.histogram;
        let old_bin = evicted.map(|old| hist.bin_index(old));

        self.max = match (self.max, old_bin) {
            (Some(max), Some(old)) if old >= hist.bin_index(max) => {
                hist.last_nonempty().map(|bin| hist.bin_center(bin))
            }
            (Some(max), _) if x <= max => Some(max),
            _ => Some(x),
        };

        self.min = match (self.min, old_bin) {
            (Some(min), Some(old)) if old <= hist.bin_index(min) => {
                hist.first_nonempty().map(|bin| hist.bin_center(bin))
            }
            (Some(min), _) if x >= min => Some(min),
            _ => Some(x),
        };
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window(&self) -> &SlidingWindow<u16> {
        &self.window
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn moments(&self) -> RunningMoments {
        self.moments
    }

    /// Root mean square of successive differences; zero below two samples.
    pub fn rmssd(&self) -> f64 {
        match self.pair_count() {
            Some(pairs) => (self.diffs.sum_sq as f64 / pairs).sqrt(),
            None => 0.0,
        }
    }

    /// Percentage of successive differences above the threshold; zero below two samples.
    pub fn pnn50(&self) -> f64 {
        match self.pair_count() {
            Some(pairs) => 100.0 * f64::from(self.diffs.over_threshold) / pairs,
            None => 0.0,
        }
    }

    fn pair_count(&self) -> Option<f64> {
        match self.window.len() {
            0 | 1 => None,
            n => Some((n - 1) as f64),
        }
    }

    pub fn metrics(&self) -> TimeDomainMetrics {
        let hist = &self.histogram;
        let center = |bin: Option<usize>| bin.map(|b| hist.bin_center(b)).unwrap_or(0.0);
        let count = self.window.len();
        let modal = hist.modal_count();

        let (triangular_index, tinn) = if modal == 0 {
            (0.0, 0.0)
        } else {
            let n = count as f64;
            let modal = f64::from(modal);
            (n / modal, 2.0 * n * hist.width() / modal)
        };

        TimeDomainMetrics {
            count,
            mean: self.moments.mean(),
            median: center(hist.median_bin()),
            min: self.min.unwrap_or(0.0),
            max: self.max.unwrap_or(0.0),
            std_dev: self.moments.std_dev(),
            p20: center(hist.percentile_bin(0.2)),
            p80: center(hist.percentile_bin(0.8)),
            rmssd: self.rmssd(),
            pnn50: self.pnn50(),
            triangular_index,
            tinn,
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.histogram.clear();
        self.moments = RunningMoments::default();
        self.diffs = SuccessiveDiffs::default();
        self.min = None;
        self.max = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stats(capacity: usize) -> StreamingStatistics {
        StreamingStatistics::new(&HrvConfig {
            window_capacity: capacity,
            ..Default::default()
        })
    }

    fn feed(s: &mut StreamingStatistics, values: &[u16]) {
        for &v in values {
            s.observe(v);
        }
    }

    #[test]
    fn single_sample_has_no_successive_metrics() {
        let mut s = stats(4);
        s.observe(800);
        let m = s.metrics();
        assert_eq!(m.count, 1);
        assert_eq!(m.rmssd, 0.0);
        assert_eq!(m.pnn50, 0.0);
        assert_eq!(m.std_dev, 0.0);
        assert_eq!(m.min, 800.0);
        assert_eq!(m.max, 800.0);
    }

    #[test]
    fn rmssd_and_pnn50_before_eviction() {
        let mut s = stats(8);
        feed(&mut s, &[800, 860, 850, 780]);
        // diffs: 60, -10, -70
        let expected = ((3600.0 + 100.0 + 4900.0) / 3.0f64).sqrt();
        assert_relative_eq!(s.rmssd(), expected, max_relative = 1e-12);
        assert_relative_eq!(s.pnn50(), 200.0 / 3.0, max_relative = 1e-12);
    }

    #[test]
    fn successive_metrics_track_the_window() {
        let mut s = stats(3);
        feed(&mut s, &[800, 900, 880, 870]);
        // window [900, 880, 870]: diffs -20, -10
        let expected = ((400.0 + 100.0) / 2.0f64).sqrt();
        assert_relative_eq!(s.rmssd(), expected, max_relative = 1e-12);
        assert_eq!(s.pnn50(), 0.0);
    }

    #[test]
    fn raw_extremes_before_eviction() {
        let mut s = stats(5);
        feed(&mut s, &[800, 650, 910, 700]);
        let m = s.metrics();
        assert_eq!(m.min, 650.0);
        assert_eq!(m.max, 910.0);
    }

    #[test]
    fn evicting_the_max_rescans_from_the_top() {
        let mut s = stats(3);
        feed(&mut s, &[1000, 800, 820, 810]);
        let hist = s.histogram();
        let expected = hist.bin_center(hist.bin_index(820.0));
        assert_relative_eq!(s.metrics().max, expected);
    }

    #[test]
    fn evicting_the_min_rescans_from_the_bottom() {
        let mut s = stats(3);
        feed(&mut s, &[600, 800, 820, 810]);
        let hist = s.histogram();
        let expected = hist.bin_center(hist.bin_index(800.0));
        assert_relative_eq!(s.metrics().min, expected);
    }

    #[test]
    fn evicted_high_outliers_release_the_max() {
        let mut s = stats(3);
        feed(&mut s, &[65535, 65535, 800, 810]);
        let last = s.histogram().counts().len() - 1;
        assert_relative_eq!(s.metrics().max, s.histogram().bin_center(last));

        s.observe(820);
        let hist = s.histogram();
        assert_relative_eq!(s.metrics().max, hist.bin_center(hist.bin_index(820.0)));
    }

    #[test]
    fn evicted_low_outliers_release_the_min() {
        let mut s = stats(3);
        feed(&mut s, &[0, 0, 800, 810, 820]);
        let hist = s.histogram();
        assert_relative_eq!(s.metrics().min, hist.bin_center(hist.bin_index(800.0)));
    }

    #[test]
    fn triangular_metrics_use_modal_bin() {
        let mut s = stats(10);
        feed(&mut s, &[810, 811, 812, 900]);
        let m = s.metrics();
        assert_relative_eq!(m.triangular_index, 4.0 / 3.0);
        assert_relative_eq!(m.tinn, 2.0 * 4.0 * 7.815 / 3.0, max_relative = 1e-12);
    }

    #[test]
    fn empty_metrics_are_zero() {
        let s = stats(4);
        assert_eq!(s.metrics(), TimeDomainMetrics::default());
    }

    #[test]
    fn reset_forgets_everything() {
        let mut s = stats(4);
        feed(&mut s, &[800, 900, 1000, 700, 650]);
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.histogram().total(), 0);
        assert_eq!(s.metrics(), TimeDomainMetrics::default());
    }
}
