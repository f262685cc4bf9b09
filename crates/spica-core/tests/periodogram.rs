use std::f64::consts::TAU;

use spica_core::config::PeriodogramConfig;
use spica_core::lightcurve::{LightCurve, LightCurveError};
use spica_core::periodogram::{Periodogram, PER_DAY_TO_UHZ};
use spica_fits::synthetic::LONG_CADENCE_DAYS;

fn sinusoid(n: usize, freq_per_day: f64, amplitude: f64) -> LightCurve {
    let time: Vec<f64> = (0..n).map(|i| 2300.0 + i as f64 * LONG_CADENCE_DAYS).collect();
    let flux = time
        .iter()
        .map(|t| 1.0 + amplitude * (TAU * freq_per_day * t).sin())
        .collect();
    LightCurve::new(time, flux, vec![1e-4; n], (0..n as i64).collect())
        .expect("columns have equal length")
}

#[test]
fn recovers_injected_frequency_and_amplitude() -> anyhow::Result<()> {
    let n = 2000;
    let baseline = (n - 1) as f64 * LONG_CADENCE_DAYS;
    // on the frequency grid: 160 resolution steps
    let injected = 160.0 / baseline;
    let lc = sinusoid(n, injected, 0.01);
    let periodogram = Periodogram::from_lightcurve(&lc, &PeriodogramConfig::default())?;

    let (peak_uhz, peak_amp) = periodogram.peak().expect("non-empty spectrum");
    let step_uhz = PER_DAY_TO_UHZ / baseline;
    assert!((peak_uhz - injected * PER_DAY_TO_UHZ).abs() < 0.5 * step_uhz);
    assert!(peak_amp > 0.0095 && peak_amp < 0.0105, "amplitude {peak_amp}");
    Ok(())
}

#[test]
fn grid_runs_to_nyquist() -> anyhow::Result<()> {
    let lc = sinusoid(500, 1.0, 0.01);
    let periodogram = Periodogram::from_lightcurve(&lc, &PeriodogramConfig::default())?;

    let nyquist_uhz = 0.5 / LONG_CADENCE_DAYS * PER_DAY_TO_UHZ;
    let last = *periodogram.frequency_uhz.last().expect("non-empty grid");
    assert!(last <= nyquist_uhz + 1e-6);
    assert!(periodogram.frequency_uhz[0] > 0.0);
    assert!(periodogram.frequency_uhz.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(periodogram.frequency_uhz.len(), periodogram.amplitude.len());

    let oversampled = Periodogram::from_lightcurve(
        &lc,
        &PeriodogramConfig {
            oversample_factor: 5.0,
            ..PeriodogramConfig::default()
        },
    )?;
    assert!(oversampled.len() > 4 * periodogram.len());
    Ok(())
}

#[test]
fn too_few_samples_is_an_error() {
    let lc = sinusoid(2, 1.0, 0.01);
    let err = Periodogram::from_lightcurve(&lc, &PeriodogramConfig::default()).unwrap_err();
    assert!(matches!(err, LightCurveError::TooFewSamples { needed: 3, have: 2 }));
}

#[test]
fn floating_mean_absorbs_offset_over_partial_cycles() -> anyhow::Result<()> {
    let n = 200;
    let baseline = (n - 1) as f64 * LONG_CADENCE_DAYS;
    // 1.3 cycles: the 13th step of a 10x oversampled grid
    let injected = 1.3 / baseline;
    let lc = sinusoid(n, injected, 0.01);
    let floating = PeriodogramConfig {
        oversample_factor: 10.0,
        fit_mean: true,
    };
    let classic = PeriodogramConfig {
        fit_mean: false,
        ..floating.clone()
    };

    let with_mean = Periodogram::from_lightcurve(&lc, &floating)?;
    let without_mean = Periodogram::from_lightcurve(&lc, &classic)?;
    let index = with_mean
        .frequency_uhz
        .iter()
        .position(|f| (f - injected * PER_DAY_TO_UHZ).abs() < 1e-6)
        .expect("injected frequency is on the grid");

    // an exact offset-plus-sinusoid model explains all of the variance
    let mean = lc.flux.iter().sum::<f64>() / n as f64;
    let variance: f64 = lc.flux.iter().map(|f| (f - mean).powi(2)).sum();
    let amplitude = with_mean.amplitude[index];
    let explained = amplitude * amplitude * n as f64 / 2.0;
    assert!(
        (explained - variance).abs() < 1e-6 * variance,
        "explained {explained}, variance {variance}"
    );
    assert!(without_mean.amplitude[index] <= amplitude + 1e-12);
    Ok(())
}
