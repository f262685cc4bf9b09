use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::register_font;
use spica_fits::TargetPixelFile;

use crate::config::PlotConfig;
use crate::error::{PipelineError, Result};
use crate::lightcurve::{LightCurve, LightCurveError};
use crate::periodogram::Periodogram;
use crate::statistics::percentile;

/// Family every figure draws text with; backed by the font shipped in the crate.
const FONT_FAMILY: &str = "sans-serif";

static BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Rendering never depends on fonts installed on the host.
static FONT_REGISTERED: Lazy<bool> =
    Lazy::new(|| register_font(FONT_FAMILY, FontStyle::Normal, BUNDLED_FONT).is_ok());

pub type DrawResult = std::result::Result<(), Box<dyn Error>>;

/// Anything the runner can write to `{label}_{suffix}.png`.
pub trait Figure {
    fn artifact_suffix(&self) -> String;

    fn draw(&self, area: &DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult;
}

pub fn artifact_path(out_dir: &Path, label: &str, figure: &dyn Figure) -> PathBuf {
    out_dir.join(format!("{label}_{}.png", figure.artifact_suffix()))
}

/// Draws `figure` into the output directory, replacing any earlier file.
pub fn render_artifact(
    out_dir: &Path,
    label: &str,
    figure: &dyn Figure,
    plot: &PlotConfig,
) -> Result<PathBuf> {
    let path = artifact_path(out_dir, label, figure);
    let render_error = |message: String| PipelineError::Render {
        path: path.clone(),
        message,
    };

    if !*FONT_REGISTERED {
        return Err(render_error("bundled font could not be loaded".to_string()));
    }

    {
        let root = BitMapBackend::new(&path, (plot.width, plot.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| render_error(e.to_string()))?;
        figure.draw(&root).map_err(|e| render_error(e.to_string()))?;
        root.present().map_err(|e| render_error(e.to_string()))?;
    }

    tracing::debug!(path = %path.display(), "rendered artifact");
    Ok(path)
}

/// Padded axis range over the finite values, never empty.
fn axis_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    (lo - pad)..(hi + pad)
}

/// First frame of the pixel stamp with the pipeline aperture outlined.
#[derive(Debug, Clone)]
pub struct ApertureFigure {
    pub title: String,
    pub n_rows: usize,
    pub n_cols: usize,
    pub column_origin: i64,
    pub row_origin: i64,
    pub frame: Vec<f64>,
    pub mask: Vec<bool>,
    pub stretch: f64,
    pub interval_percent: f64,
}

impl ApertureFigure {
    pub fn from_tpf(tpf: &TargetPixelFile) -> std::result::Result<Self, LightCurveError> {
        let frame = tpf.frame(0).ok_or(LightCurveError::TooFewSamples {
            needed: 1,
            have: tpf.n_cadences(),
        })?;
        Ok(Self {
            title: format!(
                "EPIC {} frame 0 (campaign {})",
                tpf.metadata.epic_id, tpf.metadata.campaign
            ),
            n_rows: tpf.n_rows,
            n_cols: tpf.n_cols,
            column_origin: tpf.metadata.column_origin,
            row_origin: tpf.metadata.row_origin,
            frame: frame.to_vec(),
            mask: tpf.pipeline_mask(),
            stretch: 1000.0,
            interval_percent: 95.0,
        })
    }

    /// Pixel values mapped to 0..=1 through a percentile interval and a log
    /// stretch `log(a·x + 1) / log(a + 1)`. NaN pixels stay NaN.
    pub fn scaled_frame(&self) -> Vec<f64> {
        let tail = (100.0 - self.interval_percent) / 2.0;
        let lo = percentile(&self.frame, tail).unwrap_or(0.0);
        let hi = percentile(&self.frame, 100.0 - tail).unwrap_or(1.0);
        let span = if hi > lo { hi - lo } else { 1.0 };
        let a = self.stretch;
        self.frame
            .iter()
            .map(|&v| {
                if !v.is_finite() {
                    return f64::NAN;
                }
                let x = ((v - lo) / span).clamp(0.0, 1.0);
                (a * x + 1.0).ln() / (a + 1.0).ln()
            })
            .collect()
    }

    fn in_mask(&self, row: isize, col: isize) -> bool {
        if row < 0 || col < 0 || row as usize >= self.n_rows || col as usize >= self.n_cols {
            return false;
        }
        self.mask[row as usize * self.n_cols + col as usize]
    }
}

impl Figure for ApertureFigure {
    fn artifact_suffix(&self) -> String {
        "tpf_aperture".to_string()
    }

    fn draw(&self, area: &DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult {
        let x0 = self.column_origin as f64;
        let y0 = self.row_origin as f64;
        let mut chart = ChartBuilder::on(area)
            .caption(&self.title, (FONT_FAMILY, 22))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x0..x0 + self.n_cols as f64, y0..y0 + self.n_rows as f64)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Pixel Column Number")
            .y_desc("Pixel Row Number")
            .draw()?;

        let scaled = self.scaled_frame();
        chart.draw_series((0..self.n_rows).flat_map(|r| {
            let scaled = &scaled;
            (0..self.n_cols).map(move |c| {
                let (x, y) = (x0 + c as f64, y0 + r as f64);
                let color = colormap(scaled[r * self.n_cols + c]);
                Rectangle::new([(x, y), (x + 1.0, y + 1.0)], color.filled())
            })
        }))?;

        // outline: every mask pixel edge that borders a non-mask pixel
        let mut edges = Vec::new();
        for r in 0..self.n_rows as isize {
            for c in 0..self.n_cols as isize {
                if !self.in_mask(r, c) {
                    continue;
                }
                let (x, y) = (x0 + c as f64, y0 + r as f64);
                if !self.in_mask(r - 1, c) {
                    edges.push([(x, y), (x + 1.0, y)]);
                }
                if !self.in_mask(r + 1, c) {
                    edges.push([(x, y + 1.0), (x + 1.0, y + 1.0)]);
                }
                if !self.in_mask(r, c - 1) {
                    edges.push([(x, y), (x, y + 1.0)]);
                }
                if !self.in_mask(r, c + 1) {
                    edges.push([(x + 1.0, y), (x + 1.0, y + 1.0)]);
                }
            }
        }
        chart.draw_series(
            edges
                .into_iter()
                .map(|edge| PathElement::new(edge.to_vec(), RED.stroke_width(2))),
        )?;
        Ok(())
    }
}

const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Viridis-like colour for a value in 0..=1; NaN renders light grey.
pub fn colormap(value: f64) -> RGBColor {
    if !value.is_finite() {
        return RGBColor(220, 220, 220);
    }
    let pos = value.clamp(0.0, 1.0) * (VIRIDIS.len() - 1) as f64;
    let i = (pos.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = pos - i as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (lo, hi) = (VIRIDIS[i], VIRIDIS[i + 1]);
    RGBColor(lerp(lo.0, hi.0), lerp(lo.1, hi.1), lerp(lo.2, hi.2))
}

#[derive(Debug, Clone)]
pub struct LightCurveFigure {
    pub title: String,
    pub suffix: String,
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
}

impl LightCurveFigure {
    pub fn new(lc: &LightCurve, suffix: impl Into<String>) -> Self {
        Self {
            title: format!("EPIC {} ({})", lc.meta.epic_id, lc.meta.label),
            suffix: suffix.into(),
            time: lc.time.clone(),
            flux: lc.flux.clone(),
        }
    }
}

impl Figure for LightCurveFigure {
    fn artifact_suffix(&self) -> String {
        self.suffix.clone()
    }

    fn draw(&self, area: &DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult {
        let mut chart = ChartBuilder::on(area)
            .caption(&self.title, (FONT_FAMILY, 22))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(axis_range(&self.time), axis_range(&self.flux))?;
        chart
            .configure_mesh()
            .x_desc("Time - 2454833 [BKJD days]")
            .y_desc("Normalized Flux")
            .draw()?;

        chart.draw_series(LineSeries::new(
            self.time
                .iter()
                .zip(&self.flux)
                .filter(|(t, f)| t.is_finite() && f.is_finite())
                .map(|(&t, &f)| (t, f)),
            &BLACK,
        ))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PeriodogramFigure {
    pub title: String,
    pub frequency_uhz: Vec<f64>,
    pub amplitude: Vec<f64>,
}

impl PeriodogramFigure {
    pub fn new(periodogram: &Periodogram) -> Self {
        Self {
            title: format!(
                "EPIC {} ({}) amplitude spectrum",
                periodogram.meta.epic_id, periodogram.meta.label
            ),
            frequency_uhz: periodogram.frequency_uhz.clone(),
            amplitude: periodogram.amplitude.clone(),
        }
    }
}

impl Figure for PeriodogramFigure {
    fn artifact_suffix(&self) -> String {
        "raw_period".to_string()
    }

    fn draw(&self, area: &DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult {
        let x = axis_range(&self.frequency_uhz);
        let y = axis_range(&self.amplitude);
        let mut chart = ChartBuilder::on(area)
            .caption(&self.title, (FONT_FAMILY, 22))
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x.start.max(0.0)..x.end, y.start.max(0.0)..y.end)?;
        chart
            .configure_mesh()
            .x_desc("Frequency [µHz]")
            .y_desc("Amplitude")
            .draw()?;

        chart.draw_series(LineSeries::new(
            self.frequency_uhz
                .iter()
                .zip(&self.amplitude)
                .map(|(&f, &a)| (f, a)),
            &BLACK,
        ))?;
        Ok(())
    }
}
