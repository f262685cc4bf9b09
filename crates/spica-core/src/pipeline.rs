use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::archive::{archive_from_config, PixelArchive};
use crate::cleaning::{apply_chain, post_correction_chain, sap_chain};
use crate::config::PipelineConfig;
use crate::correction::{SffCorrector, SystematicsCorrector};
use crate::error::{PipelineError, Result};
use crate::lightcurve::LightCurve;
use crate::periodogram::Periodogram;
use crate::render::{render_artifact, ApertureFigure, LightCurveFigure, PeriodogramFigure};
use crate::targets::Target;

/// Which lightcurve a derived product was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightCurveStage {
    Sap,
    Corrected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum CorrectionOutcome {
    Disabled,
    Applied { method: String },
    Failed { method: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: Target,
    pub label: String,
    pub n_cadences: usize,
    pub artifacts: Vec<PathBuf>,
    pub correction: CorrectionOutcome,
    /// The periodogram is always taken from the cleaned SAP series, even when a
    /// corrected series exists.
    pub periodogram_source: LightCurveStage,
    pub peak_frequency_uhz: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub targets: Vec<TargetReport>,
}

impl RunSummary {
    pub fn artifacts(&self) -> impl Iterator<Item = &PathBuf> {
        self.targets.iter().flat_map(|report| report.artifacts.iter())
    }
}

pub struct PipelineRunner {
    config: PipelineConfig,
    archive: Box<dyn PixelArchive>,
    corrector: Option<Box<dyn SystematicsCorrector>>,
}

impl PipelineRunner {
    /// The corrector is SFF when `correction.enabled` is set, otherwise none.
    pub fn new(config: PipelineConfig, archive: Box<dyn PixelArchive>) -> Self {
        let corrector: Option<Box<dyn SystematicsCorrector>> = if config.correction.enabled {
            Some(Box::new(SffCorrector::from_config(&config.correction)))
        } else {
            None
        };
        Self {
            config,
            archive,
            corrector,
        }
    }

    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let archive = archive_from_config(&config.archive)?;
        Ok(Self::new(config, archive))
    }

    pub fn with_corrector(mut self, corrector: Box<dyn SystematicsCorrector>) -> Self {
        self.corrector = Some(corrector);
        self
    }

    /// Processes every target in order, stopping at the first fatal error.
    /// Files written for earlier targets are left in place.
    pub fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        fs::create_dir_all(&self.config.output_dir)?;

        let mut summary = RunSummary {
            output_dir: self.config.output_dir.clone(),
            targets: Vec::with_capacity(self.config.targets.len()),
        };
        for target in &self.config.targets {
            let report = self.run_target(target)?;
            tracing::info!(
                target = %target,
                artifacts = report.artifacts.len(),
                "target complete"
            );
            summary.targets.push(report);
        }
        Ok(summary)
    }

    pub fn run_target(&self, target: &Target) -> Result<TargetReport> {
        let out_dir = &self.config.output_dir;
        let plot = &self.config.plot;
        let label = target.label();
        let mut artifacts = Vec::new();

        let tpf = self.archive.fetch(target)?;
        tracing::debug!(
            target = %target,
            cadences = tpf.n_cadences(),
            rows = tpf.n_rows,
            cols = tpf.n_cols,
            "fetched pixel file"
        );

        let aperture = ApertureFigure::from_tpf(&tpf)?;
        artifacts.push(render_artifact(out_dir, &label, &aperture, plot)?);

        let mut sap = LightCurve::from_tpf(&tpf, &tpf.pipeline_mask())?;
        sap.meta.label = label.clone();
        let cleaned = apply_chain(&sap, &sap_chain(&self.config.cleaning))?;
        artifacts.push(render_artifact(
            out_dir,
            &label,
            &LightCurveFigure::new(&cleaned, "lc_sap"),
            plot,
        )?);

        let correction = match &self.corrector {
            None => CorrectionOutcome::Disabled,
            Some(corrector) => {
                let method = corrector.name();
                match corrector.correct(&cleaned) {
                    Ok(corrected) => {
                        let corrected =
                            apply_chain(&corrected, &post_correction_chain(&self.config.cleaning))?;
                        artifacts.push(render_artifact(
                            out_dir,
                            &label,
                            &LightCurveFigure::new(&corrected, format!("clc_{method}")),
                            plot,
                        )?);
                        CorrectionOutcome::Applied { method }
                    }
                    Err(PipelineError::CorrectionUnsupported { reason, .. }) => {
                        tracing::warn!(
                            target = %target,
                            %method,
                            %reason,
                            "systematics correction skipped"
                        );
                        CorrectionOutcome::Failed { method, reason }
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        let periodogram = Periodogram::from_lightcurve(&cleaned, &self.config.periodogram)?;
        artifacts.push(render_artifact(
            out_dir,
            &label,
            &PeriodogramFigure::new(&periodogram),
            plot,
        )?);

        Ok(TargetReport {
            target: target.clone(),
            label,
            n_cadences: cleaned.len(),
            artifacts,
            correction,
            periodogram_source: LightCurveStage::Sap,
            peak_frequency_uhz: periodogram.peak().map(|(freq, _)| freq),
        })
    }
}
