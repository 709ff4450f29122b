use std::f64::consts::PI;

/// Precomputed `exp(-j·2π·f·(i+1))` for every (coefficient, frequency) pair.
///
/// Built once per session so the PSD pass never calls into `sin`/`cos`.
#[derive(Debug, Clone)]
pub struct TrigTable {
    order: usize,
    frequencies: Vec<f64>,
    re: Vec<f64>,
    im: Vec<f64>,
}

impl TrigTable {
    pub fn new(order: usize, freq_start: f64, freq_end: f64, bins: usize) -> Self {
        let step = (freq_end - freq_start) / (bins.saturating_sub(1).max(1)) as f64;
        let frequencies: Vec<f64> = (0..bins).map(|b| freq_start + step * b as f64).collect();

        let mut re = Vec::with_capacity(order * bins);
        let mut im = Vec::with_capacity(order * bins);
        for i in 0..order {
            let lag = (i + 1) as f64;
            for &f in &frequencies {
                let w = -2.0 * PI * f * lag;
                re.push(w.cos());
                im.push(w.sin());
            }
        }

        Self {
            order,
            frequencies,
            re,
            im,
        }
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn bins(&self) -> usize {
        self.frequencies.len()
    }

    pub fn order(&self) -> usize {
        self.order
    }

    #[inline]
    fn at(&self, coeff: usize, bin: usize) -> (f64, f64) {
        let idx = coeff * self.frequencies.len() + bin;
        (self.re[idx], self.im[idx])
    }
}

/// Evaluates an AR model's power spectral density on the table's grid.
#[derive(Debug, Clone)]
pub struct PsdEngine {
    table: TrigTable,
    psd: Vec<f64>,
    epsilon: f64,
    floor: f64,
}

impl PsdEngine {
    pub fn new(table: TrigTable, epsilon: f64, floor: f64) -> Self {
        let bins = table.bins();
        Self {
            table,
            psd: vec![0.0; bins],
            epsilon,
            floor,
        }
    }

    /// `PSD[f] = variance / (|1 - Σ a_i·e^{-j2πf(i+1)}|² + ε)`, recomputed for every bin.
    pub fn compute(&mut self, coefficients: &[f64], variance: f64) -> &[f64] {
        let order = coefficients.len().min(self.table.order());
        for bin in 0..self.psd.len() {
            let mut d_re = 1.0;
            let mut d_im = 0.0;
            for (i, &a) in coefficients[..order].iter().enumerate() {
                let (c, s) = self.table.at(i, bin);
                d_re -= a * c;
                d_im -= a * s;
            }
            let power = variance / (d_re * d_re + d_im * d_im + self.epsilon);
            self.psd[bin] = if power.is_finite() {
                power
            } else {
                tracing::debug!(bin, power, "non-finite PSD value, using floor");
                self.floor
            };
        }
        &self.psd
    }

    pub fn psd(&self) -> &[f64] {
        &self.psd
    }

    pub fn table(&self) -> &TrigTable {
        &self.table
    }

    pub fn reset(&mut self) {
        self.psd.iter_mut().for_each(|p| *p = 0.0);
    }
}
