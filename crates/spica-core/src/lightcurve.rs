use std::cmp::Ordering;

use serde::Serialize;
use spica_fits::TargetPixelFile;
use thiserror::Error;

use crate::statistics::{median, std_dev};

/// Upper bound on cadences synthesised by a single gap fill.
const MAX_FILLED_CADENCES: i64 = 1_000_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LightCurveError {
    #[error("time, flux, flux_err and cadence columns differ in length ({0})")]
    LengthMismatch(String),
    #[error("aperture mask selects no pixels")]
    EmptyAperture,
    #[error("aperture mask has {mask} pixels but frames have {frame}")]
    MaskShape { mask: usize, frame: usize },
    #[error("lightcurve has no finite flux samples")]
    NoFiniteFlux,
    #[error("cannot normalize by median flux {0}")]
    DegenerateMedian(f64),
    #[error("need at least {needed} samples, have {have}")]
    TooFewSamples { needed: usize, have: usize },
    #[error("cadence numbers do not increase with time")]
    UnorderedCadences,
    #[error("gap fill would synthesise {0} cadences")]
    GapTooLarge(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LightCurveMeta {
    pub epic_id: u64,
    pub campaign: u32,
    pub object: Option<String>,
    pub label: String,
}

/// A brightness time series. Every transform returns a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurve {
    pub meta: LightCurveMeta,
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
    pub cadenceno: Vec<i64>,
}

impl LightCurve {
    pub fn new(
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_err: Vec<f64>,
        cadenceno: Vec<i64>,
    ) -> Result<Self, LightCurveError> {
        let lens = [time.len(), flux.len(), flux_err.len(), cadenceno.len()];
        if lens.iter().any(|&len| len != lens[0]) {
            return Err(LightCurveError::LengthMismatch(format!("{lens:?}")));
        }
        Ok(Self {
            meta: LightCurveMeta::default(),
            time,
            flux,
            flux_err,
            cadenceno,
        })
    }

    /// Simple aperture photometry: per cadence, the sum of finite pixel fluxes
    /// inside `mask`, errors added in quadrature. Cadences where every masked
    /// pixel is NaN yield NaN flux. Samples are returned in time order.
    pub fn from_tpf(tpf: &TargetPixelFile, mask: &[bool]) -> Result<Self, LightCurveError> {
        if mask.len() != tpf.n_pixels() {
            return Err(LightCurveError::MaskShape {
                mask: mask.len(),
                frame: tpf.n_pixels(),
            });
        }
        let selected: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        if selected.is_empty() {
            return Err(LightCurveError::EmptyAperture);
        }

        let mut rows: Vec<(f64, f64, f64, i64)> = Vec::with_capacity(tpf.n_cadences());
        for cadence in 0..tpf.n_cadences() {
            let (Some(frame), Some(errors)) = (tpf.frame(cadence), tpf.frame_err(cadence)) else {
                continue;
            };

            let mut flux = 0.0;
            let mut variance = 0.0;
            let mut finite = 0usize;
            for &pix in &selected {
                if frame[pix].is_finite() {
                    flux += frame[pix];
                    finite += 1;
                    if errors[pix].is_finite() {
                        variance += errors[pix] * errors[pix];
                    }
                }
            }
            let (flux, err) = if finite == 0 {
                (f64::NAN, f64::NAN)
            } else {
                (flux, variance.sqrt())
            };
            rows.push((tpf.time[cadence], flux, err, tpf.cadenceno[cadence]));
        }
        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let meta = LightCurveMeta {
            epic_id: tpf.metadata.epic_id,
            campaign: tpf.metadata.campaign,
            object: tpf.metadata.object.clone(),
            label: format!("c{}", tpf.metadata.campaign),
        };

        let mut lc = Self::new(
            rows.iter().map(|r| r.0).collect(),
            rows.iter().map(|r| r.1).collect(),
            rows.iter().map(|r| r.2).collect(),
            rows.iter().map(|r| r.3).collect(),
        )?;
        lc.meta = meta;
        Ok(lc)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn has_nan_flux(&self) -> bool {
        self.flux.iter().any(|f| !f.is_finite())
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.time.windows(2).all(|w| w[1] > w[0])
    }

    fn select(&self, mut keep: impl FnMut(usize) -> bool) -> Self {
        let idx: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        Self {
            meta: self.meta.clone(),
            time: idx.iter().map(|&i| self.time[i]).collect(),
            flux: idx.iter().map(|&i| self.flux[i]).collect(),
            flux_err: idx.iter().map(|&i| self.flux_err[i]).collect(),
            cadenceno: idx.iter().map(|&i| self.cadenceno[i]).collect(),
        }
    }

    /// Divides flux and errors by the median of the finite flux values.
    pub fn normalize(&self) -> Result<Self, LightCurveError> {
        let med = median(&self.flux).ok_or(LightCurveError::NoFiniteFlux)?;
        if med == 0.0 || !med.is_finite() {
            return Err(LightCurveError::DegenerateMedian(med));
        }
        let mut out = self.clone();
        out.flux.iter_mut().for_each(|f| *f /= med);
        out.flux_err.iter_mut().for_each(|e| *e /= med.abs());
        Ok(out)
    }

    pub fn remove_nans(&self) -> Self {
        self.select(|i| self.flux[i].is_finite() && self.time[i].is_finite())
    }

    /// Iterative sigma clipping around the median using the standard deviation
    /// of the surviving samples. Non-finite samples are always dropped.
    pub fn remove_outliers(&self, sigma: f64, max_iters: usize) -> Self {
        let mut clipped: Vec<bool> = self.flux.iter().map(|f| !f.is_finite()).collect();

        for _ in 0..max_iters.max(1) {
            let surviving: Vec<f64> = self
                .flux
                .iter()
                .zip(&clipped)
                .filter(|(_, flag)| !**flag)
                .map(|(&f, _)| f)
                .collect();
            let (Some(centre), Some(spread)) = (median(&surviving), std_dev(&surviving)) else {
                break;
            };

            let mut changed = false;
            for (flag, &f) in clipped.iter_mut().zip(&self.flux) {
                if !*flag && (f - centre).abs() > sigma * spread {
                    *flag = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        self.select(|i| !clipped[i])
    }

    /// Rebuilds the continuous cadence grid between the first and last cadence,
    /// synthesising samples for missing cadence numbers.
    pub fn fill_gaps(&self, method: crate::cleaning::FillMethod) -> Result<Self, LightCurveError> {
        use crate::cleaning::FillMethod;

        // first occurrence of each cadence wins
        let mut seen = std::collections::HashSet::new();
        let base = self.select(|i| seen.insert(self.cadenceno[i]));
        if base.len() < 2 {
            return Ok(base);
        }
        if base.cadenceno.windows(2).any(|w| w[1] <= w[0]) {
            return Err(LightCurveError::UnorderedCadences);
        }

        let first = base.cadenceno[0];
        let last = base.cadenceno[base.len() - 1];
        let missing = (last - first + 1) - base.len() as i64;
        if missing == 0 {
            return Ok(base);
        }
        if missing > MAX_FILLED_CADENCES {
            return Err(LightCurveError::GapTooLarge(missing));
        }

        let total = (last - first + 1) as usize;
        let mut out = Self {
            meta: base.meta.clone(),
            time: Vec::with_capacity(total),
            flux: Vec::with_capacity(total),
            flux_err: Vec::with_capacity(total),
            cadenceno: Vec::with_capacity(total),
        };

        for k in 0..base.len() {
            out.time.push(base.time[k]);
            out.flux.push(base.flux[k]);
            out.flux_err.push(base.flux_err[k]);
            out.cadenceno.push(base.cadenceno[k]);

            let Some(&next_cadence) = base.cadenceno.get(k + 1) else {
                break;
            };
            let (c0, c1) = (base.cadenceno[k], next_cadence);
            let (t0, t1) = (base.time[k], base.time[k + 1]);
            for c in (c0 + 1)..c1 {
                let frac = (c - c0) as f64 / (c1 - c0) as f64;
                let nearest = if c - c0 <= c1 - c { k } else { k + 1 };
                let (flux, err) = match method {
                    FillMethod::Nearest => (base.flux[nearest], base.flux_err[nearest]),
                    FillMethod::Linear => (
                        base.flux[k] + (base.flux[k + 1] - base.flux[k]) * frac,
                        base.flux_err[k] + (base.flux_err[k + 1] - base.flux_err[k]) * frac,
                    ),
                };
                out.time.push(t0 + (t1 - t0) * frac);
                out.flux.push(flux);
                out.flux_err.push(err);
                out.cadenceno.push(c);
            }
        }

        Ok(out)
    }
}
