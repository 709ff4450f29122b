use serde::Serialize;

use crate::context::HrvSnapshot;

/// Full-scale value of the 12-bit actuation output.
pub const DUTY_MAX: u32 = 4095;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// `START,...,END` framed CSV, one line per record.
    Csv,
    /// One JSON object per record.
    Json,
}

/// Map an interval onto the 12-bit duty range spanned by the histogram.
pub fn duty_cycle(value: u16, hist_start_ms: f64, hist_end_ms: f64) -> u32 {
    let scale = f64::from(DUTY_MAX) / (hist_end_ms - hist_start_ms);
    let duty = scale * (f64::from(value) - hist_start_ms);
    if duty.is_nan() {
        return 0;
    }
    duty.clamp(0.0, f64::from(DUTY_MAX)) as u32
}

/// The duty cycle rides along as the last field before `END`.
pub fn csv_line(elapsed_s: f64, duty: u32, s: &HrvSnapshot) -> String {
    format!(
        "START,{:.2},{},{},{:.2},{:.2},{:.0},{:.0},{:.2},{:.0},{:.0},{:.0},{:.2},{:.2},{:.0},{:.0},{:.2},{:.2},{:.2},{},END",
        elapsed_s,
        s.count,
        s.latest,
        s.mean,
        s.median,
        s.min,
        s.max,
        s.std_dev,
        s.p20,
        s.p80,
        s.rmssd,
        s.pnn50,
        s.triangular_index,
        s.tinn,
        s.total_power,
        s.lf,
        s.hf,
        s.lf_hf_ratio,
        duty,
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    t: f64,
    duty: u32,
    #[serde(flatten)]
    snapshot: &'a HrvSnapshot,
}

pub fn json_line(elapsed_s: f64, duty: u32, s: &HrvSnapshot) -> serde_json::Result<String> {
    serde_json::to_string(&JsonReport {
        t: elapsed_s,
        duty,
        snapshot: s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HrvConfig, HrvContext};

    #[test]
    fn duty_cycle_spans_histogram_range() {
        assert_eq!(duty_cycle(300, 300.0, 2000.0), 0);
        assert_eq!(duty_cycle(2000, 300.0, 2000.0), DUTY_MAX);
        assert_eq!(duty_cycle(1150, 300.0, 2000.0), 2047);
    }

    #[test]
    fn duty_cycle_clamps_outside_range() {
        assert_eq!(duty_cycle(0, 300.0, 2000.0), 0);
        assert_eq!(duty_cycle(65535, 300.0, 2000.0), DUTY_MAX);
    }

    #[test]
    fn csv_line_is_framed_with_all_fields() {
        let mut ctx = HrvContext::new(HrvConfig::default()).unwrap();
        ctx.update(800);
        let line = csv_line(1.5, 1204, ctx.snapshot());
        assert!(line.starts_with("START,1.50,1,800,800.00,"));
        assert!(line.ends_with(",1.00,1204,END"));
        assert_eq!(line.split(',').count(), 21);
    }

    #[test]
    fn json_line_flattens_snapshot() {
        let mut ctx = HrvContext::new(HrvConfig::default()).unwrap();
        ctx.update(800);
        let line = json_line(0.25, 1204, ctx.snapshot()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["latest"], 800);
        assert_eq!(v["duty"], 1204);
        assert_eq!(v["ready"]["statistics"], true);
        assert_eq!(v["ready"]["spectral"], false);
    }
}
