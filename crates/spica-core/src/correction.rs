use crate::config::CorrectionConfig;
use crate::error::{PipelineError, Result};
use crate::lightcurve::LightCurve;

/// Hook for motion-systematics correction of a cleaned SAP lightcurve.
pub trait SystematicsCorrector {
    /// Short name used in artifact suffixes, e.g. `SFF_10`.
    fn name(&self) -> String;

    fn correct(&self, lc: &LightCurve) -> Result<LightCurve>;
}

/// Self Flat Fielding with `windows` segments.
///
/// The algorithm itself is not provided here; `correct` always reports
/// `CorrectionUnsupported` so the runner can skip the corrected stage.
#[derive(Debug, Clone)]
pub struct SffCorrector {
    pub windows: usize,
}

impl SffCorrector {
    pub fn new(windows: usize) -> Self {
        Self { windows }
    }

    pub fn from_config(config: &CorrectionConfig) -> Self {
        Self::new(config.windows)
    }
}

impl SystematicsCorrector for SffCorrector {
    fn name(&self) -> String {
        format!("SFF_{}", self.windows)
    }

    fn correct(&self, lc: &LightCurve) -> Result<LightCurve> {
        Err(PipelineError::CorrectionUnsupported {
            method: self.name(),
            reason: format!(
                "self flat fielding is not available ({} samples, EPIC {})",
                lc.len(),
                lc.meta.epic_id
            ),
        })
    }
}
