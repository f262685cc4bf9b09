//! Sources of K2 target pixel files.
//!
//! `MastArchive` downloads long-cadence products from the MAST archive and
//! keeps them in an on-disk cache; `LocalArchive` reads the same file names
//! from a directory for offline runs.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use spica_fits::{QualityBitmask, TargetPixelFile};

use crate::config::ArchiveConfig;
use crate::error::{PipelineError, Result};
use crate::targets::Target;

pub trait PixelArchive {
    fn fetch(&self, target: &Target) -> Result<TargetPixelFile>;
}

/// `ktwo{epic}-c{campaign:02}_lpd-targ.fits.gz`
pub fn product_file_name(target: &Target) -> String {
    format!(
        "ktwo{}-c{:02}_lpd-targ.fits.gz",
        target.epic_id, target.campaign
    )
}

/// Builds the archive to use from configuration: a local directory when one
/// is set, otherwise MAST.
pub fn archive_from_config(config: &ArchiveConfig) -> Result<Box<dyn PixelArchive>> {
    match &config.local_dir {
        Some(dir) => Ok(Box::new(LocalArchive::new(dir, config.quality_bitmask))),
        None => Ok(Box::new(MastArchive::new(config)?)),
    }
}

fn ensure_identity(tpf: TargetPixelFile, target: &Target) -> Result<TargetPixelFile> {
    if tpf.metadata.epic_id != target.epic_id || tpf.metadata.campaign != target.campaign {
        tracing::warn!(
            requested = %target,
            found_epic = tpf.metadata.epic_id,
            found_campaign = tpf.metadata.campaign,
            "pixel file does not belong to the requested target"
        );
        return Err(PipelineError::DataUnavailable {
            epic_id: target.epic_id,
            campaign: target.campaign,
        });
    }
    Ok(tpf)
}

pub struct MastArchive {
    base_url: String,
    cache_dir: PathBuf,
    bitmask: QualityBitmask,
    client: reqwest::blocking::Client,
}

impl MastArchive {
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("spica/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache_dir: config.cache_dir.clone(),
            bitmask: config.quality_bitmask,
            client,
        })
    }

    /// Long-cadence TPF location, bucketed by EPIC id the way MAST lays out
    /// the K2 mission directory.
    pub fn product_url(&self, target: &Target) -> String {
        let id = target.epic_id;
        format!(
            "{}/missions/k2/target_pixel_files/c{}/{}/{:05}/{}",
            self.base_url,
            target.campaign,
            id / 100_000 * 100_000,
            id % 100_000 / 1_000 * 1_000,
            product_file_name(target)
        )
    }

    pub fn cache_path(&self, target: &Target) -> PathBuf {
        self.cache_dir.join(product_file_name(target))
    }

    /// Downloads into a partial file next to the cache entry and only moves
    /// it into place once it reads as the requested target's pixel file.
    fn download(&self, target: &Target, dest: &Path) -> Result<TargetPixelFile> {
        let url = self.product_url(target);
        tracing::info!(%url, "downloading target pixel file");

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PipelineError::DataUnavailable {
                epic_id: target.epic_id,
                campaign: target.campaign,
            });
        }
        if !status.is_success() {
            return Err(PipelineError::Archive(format!("GET {url}: HTTP {status}")));
        }
        let bytes = response.bytes()?;

        fs::create_dir_all(&self.cache_dir)?;
        // keeps the .fits.gz suffix so the reader sees the same name shape
        let partial = self
            .cache_dir
            .join(format!("partial-{}", product_file_name(target)));
        let mut file = File::create(&partial)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        let checked = TargetPixelFile::from_path(&partial, self.bitmask)
            .map_err(|err| {
                PipelineError::Archive(format!("GET {url}: not a readable pixel file: {err}"))
            })
            .and_then(|tpf| ensure_identity(tpf, target));
        match checked {
            Ok(tpf) => {
                fs::rename(&partial, dest)?;
                tracing::debug!(bytes = bytes.len(), path = %dest.display(), "cached download");
                Ok(tpf)
            }
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    tracing::warn!(path = %partial.display(), error = %cleanup, "could not remove partial download");
                }
                Err(err)
            }
        }
    }
}

impl PixelArchive for MastArchive {
    fn fetch(&self, target: &Target) -> Result<TargetPixelFile> {
        let path = self.cache_path(target);
        if !path.exists() {
            return self.download(target, &path);
        }
        tracing::debug!(path = %path.display(), "using cached pixel file");
        let tpf = TargetPixelFile::from_path(&path, self.bitmask)?;
        ensure_identity(tpf, target)
    }
}

/// Pixel files already on disk, named as MAST names them (gzipped or not).
#[derive(Debug, Clone)]
pub struct LocalArchive {
    dir: PathBuf,
    bitmask: QualityBitmask,
}

impl LocalArchive {
    pub fn new(dir: impl Into<PathBuf>, bitmask: QualityBitmask) -> Self {
        Self {
            dir: dir.into(),
            bitmask,
        }
    }

    pub fn locate(&self, target: &Target) -> Option<PathBuf> {
        let gz = self.dir.join(product_file_name(target));
        let plain = gz.with_extension("");
        [gz, plain].into_iter().find(|path| path.is_file())
    }
}

impl PixelArchive for LocalArchive {
    fn fetch(&self, target: &Target) -> Result<TargetPixelFile> {
        let path = self
            .locate(target)
            .ok_or(PipelineError::DataUnavailable {
                epic_id: target.epic_id,
                campaign: target.campaign,
            })?;
        tracing::debug!(path = %path.display(), "reading local pixel file");
        let tpf = TargetPixelFile::from_path(&path, self.bitmask)?;
        ensure_identity(tpf, target)
    }
}
