//! Frequency-domain HRV: Burg AR fit → PSD → LF/HF band powers.

mod bands;
mod burg;
mod psd;

pub use bands::{BandPowerIntegrator, BandPowers};
pub use burg::ArEstimator;
pub use psd::{PsdEngine, TrigTable};

use crate::config::{Band, HrvConfig};

#[derive(Debug, Clone)]
pub struct SpectralAnalyzer {
    estimator: ArEstimator,
    psd: PsdEngine,
    integrator: BandPowerIntegrator,
    total_band: Band,
    lf_band: Band,
    hf_band: Band,
    floor: f64,
    powers: BandPowers,
}

impl SpectralAnalyzer {
    pub fn new(config: &HrvConfig) -> Self {
        let order = config.model_order();
        let table = TrigTable::new(order, config.freq_start, config.freq_end, config.freq_bins);
        Self {
            estimator: ArEstimator::new(
                config.ar_samples,
                order,
                config.center_ar_input,
                config.epsilon,
            ),
            psd: PsdEngine::new(table, config.epsilon, config.power_floor),
            integrator: BandPowerIntegrator::new(
                config.freq_start,
                config.freq_end,
                config.freq_bins,
            ),
            total_band: config.total_band,
            lf_band: config.lf_band,
            hf_band: config.hf_band,
            floor: config.power_floor,
            powers: BandPowers::floor(config.power_floor),
        }
    }

    /// Feed one interval and, once the raw buffer is full, refresh the band powers.
    pub fn push(&mut self, value: f64) -> &BandPowers {
        self.estimator.push(value);

        if self.estimator.estimate().is_none() {
            self.powers = BandPowers::floor(self.floor);
            return &self.powers;
        }
        if self.estimator.samples_seen() == self.estimator.capacity() as u64 {
            tracing::debug!(order = self.estimator.order(), "spectral estimator ready");
        }

        let variance = self.estimator.buffer_variance();
        let psd = self.psd.compute(self.estimator.coefficients(), variance);
        self.powers = BandPowers::from_psd(
            &self.integrator,
            psd,
            self.total_band,
            self.lf_band,
            self.hf_band,
            self.floor,
        );
        &self.powers
    }

    pub fn is_ready(&self) -> bool {
        self.estimator.is_ready()
    }

    pub fn powers(&self) -> &BandPowers {
        &self.powers
    }

    pub fn psd(&self) -> &[f64] {
        self.psd.psd()
    }

    pub fn frequencies(&self) -> &[f64] {
        self.psd.table().frequencies()
    }

    pub fn coefficients(&self) -> &[f64] {
        self.estimator.coefficients()
    }

    pub fn reset(&mut self) {
        self.estimator.reset();
        self.psd.reset();
        self.powers = BandPowers::floor(self.floor);
    }
}
