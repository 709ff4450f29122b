use serde::Serialize;

use crate::config::Band;

/// Trapezoidal integration of a PSD sampled on an evenly spaced grid.
///
/// Band edges need not fall on grid points: the PSD is treated as piecewise
/// linear between points and partial segments are weighted by their length.
#[derive(Debug, Clone, Copy)]
pub struct BandPowerIntegrator {
    freq_start: f64,
    freq_end: f64,
    bins: usize,
}

impl BandPowerIntegrator {
    pub fn new(freq_start: f64, freq_end: f64, bins: usize) -> Self {
        Self {
            freq_start,
            freq_end,
            bins: bins.max(2),
        }
    }

    fn step(&self) -> f64 {
        (self.freq_end - self.freq_start) / (self.bins - 1) as f64
    }

    /// Fractional grid position of `freq`, clamped to `[0, F-1]`.
    fn position(&self, freq: f64) -> f64 {
        let last = (self.bins - 1) as f64;
        let pos = (freq - self.freq_start) * last / (self.freq_end - self.freq_start);
        if pos.is_nan() {
            return 0.0;
        }
        pos.clamp(0.0, last)
    }

    pub fn integrate(&self, psd: &[f64], band: Band) -> f64 {
        if psd.len() < self.bins || band.low >= band.high {
            return 0.0;
        }
        let p0 = self.position(band.low);
        let p1 = self.position(band.high);
        if p1 <= p0 {
            return 0.0;
        }

        let value_at = |p: f64| {
            let i = (p.floor() as usize).min(self.bins - 2);
            let frac = p - i as f64;
            psd[i] + (psd[i + 1] - psd[i]) * frac
        };

        let first = p0.ceil() as usize;
        let last = p1.floor() as usize;
        let area = if first > last {
            // both edges inside one segment
            0.5 * (value_at(p0) + value_at(p1)) * (p1 - p0)
        } else {
            let lead = 0.5 * (value_at(p0) + psd[first]) * (first as f64 - p0);
            let body: f64 = (first..last).map(|i| 0.5 * (psd[i] + psd[i + 1])).sum();
            let tail = 0.5 * (psd[last] + value_at(p1)) * (p1 - last as f64);
            lead + body + tail
        };

        area * self.step()
    }
}

/// Frequency-domain powers derived from one PSD pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandPowers {
    pub total: f64,
    /// LF power as a percentage of total power.
    pub lf: f64,
    /// HF power as a percentage of total power.
    pub hf: f64,
    pub lf_hf_ratio: f64,
}

impl BandPowers {
    /// Values reported while there is no usable spectrum.
    pub fn floor(floor: f64) -> Self {
        Self {
            total: 0.0,
            lf: floor,
            hf: floor,
            lf_hf_ratio: 1.0,
        }
    }

    pub fn from_psd(
        integrator: &BandPowerIntegrator,
        psd: &[f64],
        total_band: Band,
        lf_band: Band,
        hf_band: Band,
        floor: f64,
    ) -> Self {
        let total = integrator.integrate(psd, total_band);
        let lf = integrator.integrate(psd, lf_band);
        let hf = integrator.integrate(psd, hf_band);

        let (lf, hf) = if total.is_finite() && total > floor {
            (lf / total * 100.0, hf / total * 100.0)
        } else {
            (floor, floor)
        };
        let finite_or = |value: f64, fallback: f64, band: &'static str| {
            if value.is_finite() {
                value
            } else {
                tracing::debug!(band, value, "non-finite band power, clamping");
                fallback
            }
        };
        let lf = finite_or(lf, floor, "lf");
        let hf = finite_or(hf, floor, "hf");
        let total = finite_or(total, 0.0, "total");

        let lf_hf_ratio = if lf > floor && hf > floor { lf / hf } else { 1.0 };

        Self {
            total,
            lf,
            hf,
            lf_hf_ratio,
        }
    }
}
