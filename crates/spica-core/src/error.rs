// crates/spica-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

use crate::lightcurve::LightCurveError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no pixel data for EPIC {epic_id} in campaign {campaign}")]
    DataUnavailable { epic_id: u64, campaign: u32 },

    #[error("{method} correction unsupported: {reason}")]
    CorrectionUnsupported { method: String, reason: String },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive request failed: {0}")]
    Archive(String),

    #[error("Pixel file could not be read: {0}")]
    Fits(#[from] spica_fits::FitsError),

    #[error("Lightcurve processing failed: {0}")]
    LightCurve(#[from] LightCurveError),

    #[error("Rendering {path} failed: {message}")]
    Render { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Archive(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
