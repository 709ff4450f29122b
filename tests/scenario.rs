use approx::assert_relative_eq;
use ppi_hrv::{HrvConfig, HrvContext};

fn context(capacity: usize) -> HrvContext {
    HrvContext::new(HrvConfig {
        window_capacity: capacity,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn five_pushes_into_a_window_of_four() {
    let mut ctx = context(4);
    for v in [500, 520, 510, 530] {
        ctx.update(v);
    }
    let hist = ctx.statistics().histogram();
    let before_500 = hist.count_at(500.0);
    let before_505 = hist.count_at(505.0);

    ctx.update(505);

    let window: Vec<u16> = ctx.statistics().window().iter().collect();
    assert_eq!(window, vec![520, 510, 530, 505]);

    let hist = ctx.statistics().histogram();
    assert_eq!(hist.count_at(500.0), before_500 - 1);
    assert_eq!(hist.count_at(505.0), before_505 + 1);
    assert_eq!(hist.total(), 4);

    let xs = [520.0, 510.0, 530.0, 505.0];
    let mean = xs.iter().sum::<f64>() / 4.0;
    let var = xs.iter().map(|x: &f64| (x - mean).powi(2)).sum::<f64>() / 4.0;
    let s = ctx.snapshot();
    assert_relative_eq!(s.mean, mean, max_relative = 1e-12);
    assert_relative_eq!(s.std_dev, var.sqrt(), max_relative = 1e-9);

    let sq: f64 = xs.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    assert_relative_eq!(s.rmssd, (sq / 3.0).sqrt(), max_relative = 1e-12);
    assert_eq!(s.pnn50, 0.0);
}

#[test]
fn evicting_an_identical_value_changes_nothing() {
    for capacity in [2, 5, 30, 40] {
        let mut full = context(capacity);
        let mut over = context(capacity);
        for _ in 0..capacity {
            full.update(812);
            over.update(812);
        }
        over.update(812);

        let (a, b) = (*full.snapshot(), *over.snapshot());
        assert_eq!(a.count, b.count);
        assert_eq!(a.mean, b.mean);
        assert_eq!(a.std_dev, b.std_dev);
        assert_eq!(a.rmssd, b.rmssd);
        assert_eq!(a.pnn50, b.pnn50);
        assert_eq!(a.median, b.median);
        assert_eq!(a.p20, b.p20);
        assert_eq!(a.p80, b.p80);
        assert_eq!(a.triangular_index, b.triangular_index);
        assert_eq!(a.tinn, b.tinn);
        assert_eq!(a.total_power, b.total_power);
        assert_eq!(a.lf, b.lf);
        assert_eq!(a.hf, b.hf);
        assert_eq!(a.lf_hf_ratio, b.lf_hf_ratio);
        assert_eq!(a.ready, b.ready);
        assert_eq!(
            full.statistics().histogram().counts(),
            over.statistics().histogram().counts()
        );

        // Evicting the extreme rescans, which reports the bin center.
        let hist = over.statistics().histogram();
        let center = hist.bin_center(hist.bin_index(812.0));
        assert_eq!((a.min, a.max), (812.0, 812.0));
        assert_relative_eq!(b.min, center);
        assert_relative_eq!(b.max, center);
        assert!((b.max - 812.0).abs() < hist.width());
    }
}

#[test]
fn evicted_outliers_do_not_pin_the_extremes() {
    let mut ctx = context(3);
    for v in [65535, 0, 65535, 0, 800, 810, 820] {
        ctx.update(v);
    }
    let window: Vec<u16> = ctx.statistics().window().iter().collect();
    assert_eq!(window, vec![800, 810, 820]);

    let hist = ctx.statistics().histogram();
    let s = ctx.snapshot();
    assert_relative_eq!(s.min, hist.bin_center(hist.bin_index(800.0)));
    // 820 arrived after the last rescan and lies above the cached center.
    assert_eq!(s.max, 820.0);
}

#[test]
fn out_of_range_values_are_clamped_not_rejected() {
    let mut ctx = context(4);
    ctx.update(0);
    ctx.update(65535);
    let hist = ctx.statistics().histogram();
    assert_eq!(hist.counts()[0], 1);
    assert_eq!(*hist.counts().last().unwrap(), 1);
    assert_eq!(ctx.snapshot().count, 2);
}
