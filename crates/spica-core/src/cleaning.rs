use serde::{Deserialize, Serialize};

use crate::config::CleaningConfig;
use crate::lightcurve::{LightCurve, LightCurveError};

/// How samples are synthesised for missing cadences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Copy the flux of the nearest real cadence.
    #[default]
    Nearest,
    Linear,
}

/// A single lightcurve transform. Chains are plain slices applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Cleaning {
    Normalize,
    RemoveNans,
    RemoveOutliers { sigma: f64, max_iters: usize },
    FillGaps(FillMethod),
}

impl Cleaning {
    pub fn name(&self) -> &'static str {
        match self {
            Cleaning::Normalize => "normalize",
            Cleaning::RemoveNans => "remove_nans",
            Cleaning::RemoveOutliers { .. } => "remove_outliers",
            Cleaning::FillGaps(_) => "fill_gaps",
        }
    }

    pub fn apply(&self, lc: &LightCurve) -> Result<LightCurve, LightCurveError> {
        match self {
            Cleaning::Normalize => lc.normalize(),
            Cleaning::RemoveNans => Ok(lc.remove_nans()),
            Cleaning::RemoveOutliers { sigma, max_iters } => {
                Ok(lc.remove_outliers(*sigma, *max_iters))
            }
            Cleaning::FillGaps(method) => lc.fill_gaps(*method),
        }
    }
}

pub fn apply_chain(lc: &LightCurve, chain: &[Cleaning]) -> Result<LightCurve, LightCurveError> {
    let mut current = lc.clone();
    for step in chain {
        let before = current.len();
        current = step.apply(&current)?;
        tracing::debug!(
            step = step.name(),
            before,
            after = current.len(),
            "applied cleaning step"
        );
    }
    Ok(current)
}

/// normalize, remove_nans, remove_outliers, fill_gaps
pub fn sap_chain(config: &CleaningConfig) -> Vec<Cleaning> {
    vec![
        Cleaning::Normalize,
        Cleaning::RemoveNans,
        Cleaning::RemoveOutliers {
            sigma: config.outlier_sigma,
            max_iters: config.outlier_max_iters,
        },
        Cleaning::FillGaps(config.fill_method),
    ]
}

/// Applied to a corrected lightcurve: remove_outliers, fill_gaps
pub fn post_correction_chain(config: &CleaningConfig) -> Vec<Cleaning> {
    vec![
        Cleaning::RemoveOutliers {
            sigma: config.outlier_sigma,
            max_iters: config.outlier_max_iters,
        },
        Cleaning::FillGaps(config.fill_method),
    ]
}
