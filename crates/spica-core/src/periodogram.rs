use std::f64::consts::TAU;

use crate::config::PeriodogramConfig;
use crate::lightcurve::{LightCurve, LightCurveError, LightCurveMeta};
use crate::statistics::{mean, median_cadence};

/// Cycles per day to microhertz.
pub const PER_DAY_TO_UHZ: f64 = 1.0e6 / 86_400.0;

const MIN_SAMPLES: usize = 3;

/// Amplitude spectrum of a lightcurve.
#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    pub meta: LightCurveMeta,
    pub frequency_uhz: Vec<f64>,
    pub amplitude: Vec<f64>,
}

impl Periodogram {
    /// Lomb–Scargle amplitude spectrum from the first resolvable frequency up
    /// to the Nyquist frequency of the median sampling interval.
    pub fn from_lightcurve(
        lc: &LightCurve,
        config: &PeriodogramConfig,
    ) -> Result<Self, LightCurveError> {
        let (time, flux): (Vec<f64>, Vec<f64>) = lc
            .time
            .iter()
            .zip(&lc.flux)
            .filter(|(t, f)| t.is_finite() && f.is_finite())
            .map(|(&t, &f)| (t, f))
            .unzip();
        if time.len() < MIN_SAMPLES {
            return Err(LightCurveError::TooFewSamples {
                needed: MIN_SAMPLES,
                have: time.len(),
            });
        }

        let t0 = time.iter().copied().fold(f64::INFINITY, f64::min);
        let t1 = time.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let baseline = t1 - t0;
        let dt = median_cadence(&time).ok_or(LightCurveError::TooFewSamples {
            needed: MIN_SAMPLES,
            have: time.len(),
        })?;
        if baseline <= 0.0 {
            return Err(LightCurveError::TooFewSamples {
                needed: MIN_SAMPLES,
                have: 1,
            });
        }

        let step = 1.0 / (baseline * config.oversample_factor.max(1.0));
        let nyquist = 0.5 / dt;
        let n_freq = (nyquist / step).floor() as usize;

        let offset = mean(&flux).unwrap_or(0.0);
        let centred: Vec<f64> = flux.iter().map(|f| f - offset).collect();
        let norm = (4.0 / time.len() as f64).sqrt();

        let mut frequency_uhz = Vec::with_capacity(n_freq);
        let mut amplitude = Vec::with_capacity(n_freq);
        for k in 1..=n_freq {
            let freq = step * k as f64;
            let power = lomb_scargle_power(&time, &centred, TAU * freq, config.fit_mean);
            frequency_uhz.push(freq * PER_DAY_TO_UHZ);
            amplitude.push(power.max(0.0).sqrt() * norm);
        }

        Ok(Self {
            meta: lc.meta.clone(),
            frequency_uhz,
            amplitude,
        })
    }

    pub fn len(&self) -> usize {
        self.frequency_uhz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency_uhz.is_empty()
    }

    /// (frequency µHz, amplitude) of the highest peak.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequency_uhz
            .iter()
            .zip(&self.amplitude)
            .filter(|(_, a)| a.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&f, &a)| (f, a))
    }
}

/// Half the reduction in squared residuals from fitting a sinusoid at
/// `omega`, plus a free offset when `fit_mean` is set.
fn lomb_scargle_power(time: &[f64], y: &[f64], omega: f64, fit_mean: bool) -> f64 {
    let n = time.len() as f64;

    let (mut s, mut c, mut s2, mut c2) = (0.0, 0.0, 0.0, 0.0);
    for &t in time {
        let (sin2, cos2) = (2.0 * omega * t).sin_cos();
        s2 += sin2;
        c2 += cos2;
        if fit_mean {
            let (sin, cos) = (omega * t).sin_cos();
            s += sin;
            c += cos;
        }
    }
    if fit_mean {
        s2 -= 2.0 * s * c / n;
        c2 -= (c * c - s * s) / n;
    }
    let tau = s2.atan2(c2) / (2.0 * omega);

    let (mut yc, mut ys, mut cc, mut ss) = (0.0, 0.0, 0.0, 0.0);
    let (mut c_sum, mut s_sum, mut y_sum) = (0.0, 0.0, 0.0);
    for (&t, &v) in time.iter().zip(y) {
        let (sin, cos) = (omega * (t - tau)).sin_cos();
        yc += v * cos;
        ys += v * sin;
        cc += cos * cos;
        ss += sin * sin;
        c_sum += cos;
        s_sum += sin;
        y_sum += v;
    }
    if fit_mean {
        cc -= c_sum * c_sum / n;
        ss -= s_sum * s_sum / n;
        yc -= y_sum * c_sum / n;
        ys -= y_sum * s_sum / n;
    }

    let mut power = 0.0;
    if cc > 0.0 {
        power += yc * yc / cc;
    }
    if ss > 0.0 {
        power += ys * ys / ss;
    }
    0.5 * power
}
