use serde::Serialize;

use crate::config::{ConfigError, HrvConfig};
use crate::spectral::SpectralAnalyzer;
use crate::stats::StreamingStatistics;

/// Which parts of a snapshot are backed by enough data.
///
/// A `false` flag means the matching fields hold their sentinel values rather
/// than a genuine zero reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// At least one interval: mean, median, extremes, percentiles, histogram shape.
    pub statistics: bool,
    /// At least two intervals: RMSSD and pNN50.
    pub successive: bool,
    /// The AR buffer has been filled: total power, LF, HF, LF/HF.
    pub spectral: bool,
}

/// Every HRV metric after the most recent update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HrvSnapshot {
    pub count: usize,
    pub latest: u16,
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
    pub total_power: f64,
    pub lf: f64,
    pub hf: f64,
    pub lf_hf_ratio: f64,
    pub ready: Readiness,
}

impl HrvSnapshot {
    fn empty(power_floor: f64) -> Self {
        Self {
            count: 0,
            latest: 0,
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
            std_dev: 0.0,
            p20: 0.0,
            p80: 0.0,
            rmssd: 0.0,
            pnn50: 0.0,
            triangular_index: 0.0,
            tinn: 0.0,
            total_power: 0.0,
            lf: power_floor,
            hf: power_floor,
            lf_hf_ratio: 1.0,
            ready: Readiness::default(),
        }
    }
}

/// Owns all per-session HRV state and folds one interval at a time into it.
#[derive(Debug, Clone)]
pub struct HrvContext {
    config: HrvConfig,
    stats: StreamingStatistics,
    spectral: SpectralAnalyzer,
    snapshot: HrvSnapshot,
}

impl HrvContext {
    pub fn new(config: HrvConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            stats: StreamingStatistics::new(&config),
            spectral: SpectralAnalyzer::new(&config),
            snapshot: HrvSnapshot::empty(config.power_floor),
            config,
        })
    }

    /// Clear all state back to an empty session with the same sizing.
    pub fn reset(&mut self) {
        self.stats.reset();
        self.spectral.reset();
        self.snapshot = HrvSnapshot::empty(self.config.power_floor);
    }

    /// Start a new session with different sizing constants.
    ///
    /// On error the current session is left untouched.
    pub fn reconfigure(&mut self, config: HrvConfig) -> Result<(), ConfigError> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Fold one accepted interval (ms) into every metric.
    pub fn update(&mut self, value: u16) -> &HrvSnapshot {
        let evicted = self.stats.observe(value);
        tracing::trace!(value, ?evicted, "interval accepted");

        let powers = *self.spectral.push(f64::from(value));
        let time = self.stats.metrics();

        self.snapshot = HrvSnapshot {
            count: time.count,
            latest: value,
            mean: time.mean,
            median: time.median,
            min: time.min,
            max: time.max,
            std_dev: time.std_dev,
            p20: time.p20,
            p80: time.p80,
            rmssd: time.rmssd,
            pnn50: time.pnn50,
            triangular_index: time.triangular_index,
            tinn: time.tinn,
            total_power: powers.total,
            lf: powers.lf,
            hf: powers.hf,
            lf_hf_ratio: powers.lf_hf_ratio,
            ready: Readiness {
                statistics: time.count >= 1,
                successive: time.count >= 2,
                spectral: self.spectral.is_ready(),
            },
        };
        &self.snapshot
    }

    pub fn snapshot(&self) -> &HrvSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &HrvConfig {
        &self.config
    }

    pub fn statistics(&self) -> &StreamingStatistics {
        &self.stats
    }

    pub fn spectral(&self) -> &SpectralAnalyzer {
        &self.spectral
    }
}
