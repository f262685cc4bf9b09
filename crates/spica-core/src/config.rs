use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spica_fits::QualityBitmask;

use crate::cleaning::FillMethod;
use crate::error::{PipelineError, Result};
use crate::targets::{default_targets, Target};

pub const DEFAULT_OUTPUT_DIR: &str = "./toutput";
pub const DEFAULT_CACHE_DIR: &str = "./.spica-cache";
pub const MAST_BASE_URL: &str = "https://archive.stsci.edu";

/// Everything the runner needs; `Default` reproduces the fixed Spica workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub targets: Vec<Target>,
    pub archive: ArchiveConfig,
    pub cleaning: CleaningConfig,
    pub correction: CorrectionConfig,
    pub periodogram: PeriodogramConfig,
    pub plot: PlotConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            targets: default_targets(),
            archive: ArchiveConfig::default(),
            cleaning: CleaningConfig::default(),
            correction: CorrectionConfig::default(),
            periodogram: PeriodogramConfig::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(PipelineError::Config("no targets configured".to_string()));
        }
        if !(self.cleaning.outlier_sigma > 0.0) {
            return Err(PipelineError::Config(format!(
                "cleaning.outlier_sigma must be positive, got {}",
                self.cleaning.outlier_sigma
            )));
        }
        if self.correction.windows == 0 {
            return Err(PipelineError::Config(
                "correction.windows must be at least 1".to_string(),
            ));
        }
        if !(self.periodogram.oversample_factor >= 1.0) {
            return Err(PipelineError::Config(format!(
                "periodogram.oversample_factor must be >= 1, got {}",
                self.periodogram.oversample_factor
            )));
        }
        if self.plot.width < 100 || self.plot.height < 100 {
            return Err(PipelineError::Config(format!(
                "plot size {}x{} is too small",
                self.plot.width, self.plot.height
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub timeout_secs: u64,
    /// Read pixel files from this directory instead of the network.
    pub local_dir: Option<PathBuf>,
    pub quality_bitmask: QualityBitmask,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: MAST_BASE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            timeout_secs: 120,
            local_dir: None,
            quality_bitmask: QualityBitmask::Default,
        }
    }
}

impl ArchiveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub outlier_sigma: f64,
    pub outlier_max_iters: usize,
    pub fill_method: FillMethod,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            outlier_sigma: 5.0,
            outlier_max_iters: 5,
            fill_method: FillMethod::Nearest,
        }
    }
}

/// Systematics correction is off unless explicitly enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub enabled: bool,
    pub windows: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            windows: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodogramConfig {
    pub oversample_factor: f64,
    /// Fit a constant offset at every trial frequency (generalised
    /// Lomb–Scargle). Off gives the classic periodogram of the mean-subtracted
    /// series.
    pub fit_mean: bool,
}

impl Default for PeriodogramConfig {
    fn default() -> Self {
        Self {
            oversample_factor: 1.0,
            fit_mean: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}
