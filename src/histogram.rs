//! Fixed-width histogram over the interval range.
//!
//! Values outside the range land in the first or last bin. The modal count is
//! cached and only rescanned when the bin holding it loses a sample.

#[derive(Debug, Clone)]
pub struct Histogram {
    start: f64,
    width: f64,
    counts: Vec<u32>,
    total: u32,
    modal: u32,
}

impl Histogram {
    pub fn new(start: f64, width: f64, bins: usize) -> Self {
        Self {
            start,
            width,
            counts: vec![0; bins.max(1)],
            total: 0,
            modal: 0,
        }
    }

    /// Bin holding `value`, clamped to `[0, B)`.
    pub fn bin_index(&self, value: f64) -> usize {
        let pos = ((value - self.start) / self.width).floor();
        if !(pos > 0.0) {
            return 0;
        }
        (pos as usize).min(self.counts.len() - 1)
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.start + (bin as f64 + 0.5) * self.width
    }

    /// Count `value` and, when the window dropped one, un-count `evicted`.
    pub fn observe(&mut self, value: f64, evicted: Option<f64>) {
        let bin = self.bin_index(value);
        self.counts[bin] += 1;
        self.total += 1;

        if let Some(old) = evicted {
            let old_bin = self.bin_index(old);
            let before = self.counts[old_bin];
            self.counts[old_bin] = before.saturating_sub(1);
            self.total = self.total.saturating_sub(1);
            if before == self.modal {
                self.modal = self.counts.iter().copied().max().unwrap_or(0);
                return;
            }
        }

        self.modal = self.modal.max(self.counts[bin]);
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn count_at(&self, value: f64) -> u32 {
        self.counts[self.bin_index(value)]
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn modal_count(&self) -> u32 {
        self.modal
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Bin containing the 0-indexed rank `(total - 1) / 2`.
    pub fn median_bin(&self) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        let target = (self.total - 1) / 2;
        self.scan(|cumulative| cumulative > target)
    }

    /// Bin containing the inclusive rank `floor(p * total) + 1`.
    pub fn percentile_bin(&self, p: f64) -> Option<usize> {
        if self.total == 0 {
            return None;
        }
        let rank = ((p * self.total as f64) as u32 + 1).min(self.total);
        self.scan(|cumulative| cumulative >= rank)
    }

    pub fn first_nonempty(&self) -> Option<usize> {
        self.counts.iter().position(|&c| c > 0)
    }

    pub fn last_nonempty(&self) -> Option<usize> {
        self.counts.iter().rposition(|&c| c > 0)
    }

    pub fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.total = 0;
        self.modal = 0;
    }

    fn scan(&self, mut hit: impl FnMut(u32) -> bool) -> Option<usize> {
        let mut cumulative = 0u32;
        for (i, &c) in self.counts.iter().enumerate() {
            cumulative += c;
            if hit(cumulative) {
                return Some(i);
            }
        }
        self.last_nonempty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hist() -> Histogram {
        Histogram::new(300.0, 10.0, 170)
    }

    #[test]
    fn clamps_out_of_range_values() {
        let h = hist();
        assert_eq!(h.bin_index(0.0), 0);
        assert_eq!(h.bin_index(299.9), 0);
        assert_eq!(h.bin_index(65535.0), 169);
        assert_eq!(h.bin_index(f64::NAN), 0);
        assert_eq!(h.bin_index(315.0), 1);
    }

    #[test]
    fn bin_center_is_midpoint() {
        let h = hist();
        assert_relative_eq!(h.bin_center(0), 305.0);
        assert_relative_eq!(h.bin_center(20), 505.0);
    }

    #[test]
    fn modal_count_follows_insertions() {
        let mut h = hist();
        h.observe(500.0, None);
        h.observe(505.0, None);
        h.observe(700.0, None);
        assert_eq!(h.modal_count(), 2);
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn modal_count_rescans_after_losing_mode() {
        let mut h = hist();
        for v in [500.0, 501.0, 700.0, 800.0] {
            h.observe(v, None);
        }
        h.observe(900.0, Some(500.0));
        assert_eq!(h.modal_count(), 1);
        assert_eq!(h.total(), 4);
    }

    #[test]
    fn eviction_does_not_hide_a_new_mode() {
        let mut h = hist();
        for v in [500.0, 700.0, 705.0, 701.0] {
            h.observe(v, None);
        }
        assert_eq!(h.modal_count(), 3);
        h.observe(702.0, Some(500.0));
        assert_eq!(h.modal_count(), 4);
    }

    #[test]
    fn same_bin_replacement_keeps_mode() {
        let mut h = hist();
        for v in [500.0, 501.0, 700.0] {
            h.observe(v, None);
        }
        h.observe(502.0, Some(500.0));
        assert_eq!(h.modal_count(), 2);
    }

    #[test]
    fn rank_scans() {
        let mut h = hist();
        for v in [400.0, 500.0, 600.0, 700.0, 800.0] {
            h.observe(v, None);
        }
        assert_eq!(h.median_bin(), Some(h.bin_index(600.0)));
        // floor(0.2 * 5) + 1 = 2nd smallest
        assert_eq!(h.percentile_bin(0.2), Some(h.bin_index(500.0)));
        // floor(0.8 * 5) + 1 = 5th smallest
        assert_eq!(h.percentile_bin(0.8), Some(h.bin_index(800.0)));
        assert_eq!(h.first_nonempty(), Some(h.bin_index(400.0)));
        assert_eq!(h.last_nonempty(), Some(h.bin_index(800.0)));
    }

    #[test]
    fn empty_histogram_has_no_ranks() {
        let h = hist();
        assert_eq!(h.median_bin(), None);
        assert_eq!(h.percentile_bin(0.8), None);
        assert_eq!(h.first_nonempty(), None);
    }
}
