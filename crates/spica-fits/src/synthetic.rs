//! Encoder for small synthetic target pixel files, used by tests across the
//! workspace (enable the `testing` feature from other crates).

use std::path::{Path, PathBuf};

use fitsio::images::{ImageDescription, ImageType};
use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;

use crate::errors::FitsError;

/// K2 long-cadence sampling interval in days.
pub const LONG_CADENCE_DAYS: f64 = 0.020_431_74;

#[derive(Debug, Clone)]
pub struct SyntheticTpf {
    pub epic_id: u64,
    pub campaign: u32,
    pub object: String,
    pub n_rows: usize,
    pub n_cols: usize,
    pub column_origin: i64,
    pub row_origin: i64,
    pub time: Vec<f64>,
    pub cadenceno: Vec<i64>,
    pub quality: Vec<i64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
    pub aperture: Vec<i32>,
}

impl SyntheticTpf {
    /// Empty stamp whose pipeline aperture is the central 3x3 block (or the whole
    /// stamp when it is smaller than that).
    pub fn new(epic_id: u64, campaign: u32, n_rows: usize, n_cols: usize) -> Self {
        let (cr, cc) = (n_rows / 2, n_cols / 2);
        let aperture = (0..n_rows)
            .flat_map(|r| (0..n_cols).map(move |c| (r, c)))
            .map(|(r, c)| if r.abs_diff(cr) <= 1 && c.abs_diff(cc) <= 1 { 3 } else { 1 })
            .collect();

        Self {
            epic_id,
            campaign,
            object: format!("EPIC {epic_id}"),
            n_rows,
            n_cols,
            column_origin: 600,
            row_origin: 400,
            time: Vec::new(),
            cadenceno: Vec::new(),
            quality: Vec::new(),
            flux: Vec::new(),
            flux_err: Vec::new(),
            aperture,
        }
    }

    /// A 5x5 stamp with a point source whose brightness follows `signal(time)`.
    pub fn with_star(
        epic_id: u64,
        campaign: u32,
        n_cadences: usize,
        signal: impl Fn(f64) -> f64,
    ) -> Self {
        let mut tpf = Self::new(epic_id, campaign, 5, 5);
        for i in 0..n_cadences {
            let time = 2300.0 + i as f64 * LONG_CADENCE_DAYS;
            let level = signal(time);
            let frame: Vec<f64> = (0..25)
                .map(|p| {
                    let (r, c) = ((p / 5) as f64 - 2.0, (p % 5) as f64 - 2.0);
                    let psf = (-(r * r + c * c) / 1.5).exp();
                    10.0 + 1000.0 * psf * level
                })
                .collect();
            tpf.push_cadence(time, 100_000 + i as i64, 0, &frame);
        }
        tpf
    }

    pub fn push_cadence(&mut self, time: f64, cadenceno: i64, quality: i64, frame: &[f64]) {
        assert_eq!(frame.len(), self.n_rows * self.n_cols, "frame size mismatch");
        self.time.push(time);
        self.cadenceno.push(cadenceno);
        self.quality.push(quality);
        self.flux.extend_from_slice(frame);
        self.flux_err
            .extend(frame.iter().map(|v| if v.is_finite() { v.abs().sqrt() } else { f64::NAN }));
    }

    /// Conventional archive file name for this target.
    pub fn file_name(&self) -> String {
        format!("ktwo{}-c{:02}_lpd-targ.fits", self.epic_id, self.campaign)
    }

    /// Writes the TPF to `path`, replacing any existing file. A path ending in
    /// `.gz` is written gzip-compressed.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<PathBuf, FitsError> {
        let path = path.as_ref();
        let n_pix = self.n_rows * self.n_cols;
        let mut fptr = FitsFile::create(path).overwrite().open()?;

        let primary = fptr.primary_hdu()?;
        primary.write_key(&mut fptr, "TELESCOP", "Kepler")?;
        primary.write_key(&mut fptr, "MISSION", "K2")?;
        primary.write_key(&mut fptr, "OBJECT", self.object.as_str())?;
        primary.write_key(&mut fptr, "KEPLERID", self.epic_id as i64)?;
        primary.write_key(&mut fptr, "CAMPAIGN", i64::from(self.campaign))?;

        let columns = [
            ColumnDescription::new("TIME")
                .with_type(ColumnDataType::Double)
                .create()?,
            ColumnDescription::new("CADENCENO")
                .with_type(ColumnDataType::Int)
                .create()?,
            ColumnDescription::new("FLUX")
                .with_type(ColumnDataType::Float)
                .that_repeats(n_pix)
                .create()?,
            ColumnDescription::new("FLUX_ERR")
                .with_type(ColumnDataType::Float)
                .that_repeats(n_pix)
                .create()?,
            ColumnDescription::new("QUALITY")
                .with_type(ColumnDataType::Int)
                .create()?,
        ];
        let table = fptr.create_table("TARGETTABLES".to_string(), &columns)?;
        let tdim = format!("({},{})", self.n_cols, self.n_rows);
        table.write_key(&mut fptr, "TDIM3", tdim.as_str())?;
        table.write_key(&mut fptr, "TDIM4", tdim.as_str())?;
        let cadenceno: Vec<i32> = self.cadenceno.iter().map(|&c| c as i32).collect();
        let quality: Vec<i32> = self.quality.iter().map(|&q| q as i32).collect();
        table.write_col(&mut fptr, "TIME", &self.time)?;
        table.write_col(&mut fptr, "CADENCENO", &cadenceno)?;
        // vector cells are filled element by element across rows
        table.write_col(&mut fptr, "FLUX", &self.flux)?;
        table.write_col(&mut fptr, "FLUX_ERR", &self.flux_err)?;
        table.write_col(&mut fptr, "QUALITY", &quality)?;

        let description = ImageDescription {
            data_type: ImageType::Long,
            dimensions: &[self.n_rows, self.n_cols],
        };
        let image = fptr.create_image("APERTURE".to_string(), &description)?;
        image.write_key(&mut fptr, "CRVAL1P", self.column_origin)?;
        image.write_key(&mut fptr, "CRVAL2P", self.row_origin)?;
        image.write_image(&mut fptr, &self.aperture)?;

        Ok(path.to_path_buf())
    }
}
