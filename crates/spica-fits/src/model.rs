use std::path::Path;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::errors::check_status;
use fitsio::FitsFile;
use serde::Serialize;

use crate::errors::FitsError;
use crate::quality::QualityBitmask;

const TABLE_HDU: &str = "TARGETTABLES";
const APERTURE_HDU: &str = "APERTURE";
const PIPELINE_APERTURE_BIT: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TpfMetadata {
    pub object: Option<String>,
    pub mission: Option<String>,
    pub epic_id: u64,
    pub campaign: u32,
    /// CCD column of the first stamp pixel.
    pub column_origin: i64,
    /// CCD row of the first stamp pixel.
    pub row_origin: i64,
}

/// A K2 target pixel file after cadence quality filtering.
///
/// Pixel data is stored frame by frame; within a frame the column index varies
/// fastest, matching the FITS `TDIM` layout of the `FLUX` column.
#[derive(Debug, Clone)]
pub struct TargetPixelFile {
    pub metadata: TpfMetadata,
    pub n_rows: usize,
    pub n_cols: usize,
    pub time: Vec<f64>,
    pub cadenceno: Vec<i64>,
    pub quality: Vec<i64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
    pub aperture: Vec<i64>,
}

impl TargetPixelFile {
    /// Reads a K2 long-cadence TPF, plain or gzip-compressed.
    pub fn from_path(path: impl AsRef<Path>, bitmask: QualityBitmask) -> Result<Self, FitsError> {
        let mut fptr = FitsFile::open(path.as_ref())?;

        let primary = fptr.primary_hdu()?;
        let epic_id: i64 = primary.read_key(&mut fptr, "KEPLERID")?;
        let campaign: i64 = primary.read_key(&mut fptr, "CAMPAIGN")?;
        let object: Option<String> = primary.read_key(&mut fptr, "OBJECT").ok();
        let mission: Option<String> = primary
            .read_key(&mut fptr, "MISSION")
            .or_else(|_| primary.read_key(&mut fptr, "TELESCOP"))
            .ok();

        let table = find_hdu(&mut fptr, TABLE_HDU)?;
        let HduInfo::TableInfo {
            column_descriptions: column_descriptors,
            num_rows,
        } = &table.info
        else {
            return Err(FitsError::NotATable(TABLE_HDU.to_string()));
        };
        let n_rows_table = *num_rows;
        let columns: Vec<String> = column_descriptors.iter().map(|c| c.name.clone()).collect();
        let flux_position = column_position(&columns, "FLUX")?;
        let flux_repeat = column_descriptors[flux_position].data_type.repeat;
        let flux_err_position = columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case("FLUX_ERR"));
        let tdim_keyword = format!("TDIM{}", flux_position + 1);
        let tdim: Option<String> = table.read_key(&mut fptr, &tdim_keyword).ok();

        column_position(&columns, "TIME")?;
        let raw_time: Vec<f64> = table.read_col(&mut fptr, "TIME")?;
        let raw_cadenceno: Vec<i64> = if column_position(&columns, "CADENCENO").is_ok() {
            let values: Vec<i32> = table.read_col(&mut fptr, "CADENCENO")?;
            values.into_iter().map(i64::from).collect()
        } else {
            (0..n_rows_table as i64).collect()
        };
        let raw_quality: Vec<i64> = if column_position(&columns, "QUALITY").is_ok() {
            let values: Vec<i32> = table.read_col(&mut fptr, "QUALITY")?;
            values.into_iter().map(i64::from).collect()
        } else {
            vec![0; n_rows_table]
        };
        // the table is the current HDU after the reads above
        let raw_flux = read_vector_column(&mut fptr, flux_position, n_rows_table * flux_repeat)?;
        let raw_flux_err = match flux_err_position {
            Some(position) => read_vector_column(&mut fptr, position, n_rows_table * flux_repeat)?,
            None => vec![f64::NAN; raw_flux.len()],
        };

        let aperture_hdu = find_hdu(&mut fptr, APERTURE_HDU)?;
        let HduInfo::ImageInfo { shape, .. } = &aperture_hdu.info else {
            return Err(FitsError::NotAnImage(APERTURE_HDU.to_string()));
        };
        let image_shape = shape.clone();
        let aperture: Vec<i32> = aperture_hdu.read_image(&mut fptr)?;

        let metadata = TpfMetadata {
            object,
            mission,
            epic_id: u64::try_from(epic_id)
                .map_err(|_| FitsError::Validation(format!("negative KEPLERID {epic_id}")))?,
            campaign: u32::try_from(campaign)
                .map_err(|_| FitsError::Validation(format!("invalid CAMPAIGN {campaign}")))?,
            column_origin: aperture_hdu.read_key(&mut fptr, "CRVAL1P").unwrap_or(0),
            row_origin: aperture_hdu.read_key(&mut fptr, "CRVAL2P").unwrap_or(0),
        };

        let (n_cols, n_rows) = match tdim.as_deref() {
            Some(raw) => parse_tdim(raw).ok_or_else(|| FitsError::InvalidKeyword {
                hdu: TABLE_HDU.to_string(),
                keyword: tdim_keyword.clone(),
                message: format!("expected '(cols,rows)', got '{raw}'"),
            })?,
            // image shape lists the slowest axis first
            None => match image_shape.as_slice() {
                [rows, cols] => (*cols, *rows),
                other => {
                    return Err(FitsError::Validation(format!(
                        "APERTURE image has shape {other:?}, expected two axes"
                    )))
                }
            },
        };
        let n_pix = n_cols * n_rows;
        if n_pix == 0 || flux_repeat != n_pix {
            return Err(FitsError::Validation(format!(
                "FLUX column holds {flux_repeat} values per cadence, expected {n_cols}x{n_rows}"
            )));
        }
        if aperture.len() != n_pix {
            return Err(FitsError::Validation(format!(
                "APERTURE image has {} pixels, expected {n_pix}",
                aperture.len()
            )));
        }
        if raw_time.len() != n_rows_table
            || raw_cadenceno.len() != n_rows_table
            || raw_quality.len() != n_rows_table
            || raw_flux_err.len() != raw_flux.len()
        {
            return Err(FitsError::Validation(
                "target table columns disagree on cadence count".to_string(),
            ));
        }

        let keep: Vec<usize> = (0..n_rows_table)
            .filter(|&i| raw_time[i].is_finite() && bitmask.accepts(raw_quality[i]))
            .collect();

        let mut flux = Vec::with_capacity(keep.len() * n_pix);
        let mut flux_err = Vec::with_capacity(keep.len() * n_pix);
        for &i in &keep {
            flux.extend_from_slice(&raw_flux[i * n_pix..(i + 1) * n_pix]);
            flux_err.extend_from_slice(&raw_flux_err[i * n_pix..(i + 1) * n_pix]);
        }

        let tpf = TargetPixelFile {
            metadata,
            n_rows,
            n_cols,
            time: keep.iter().map(|&i| raw_time[i]).collect(),
            cadenceno: keep.iter().map(|&i| raw_cadenceno[i]).collect(),
            quality: keep.iter().map(|&i| raw_quality[i]).collect(),
            flux,
            flux_err,
            aperture: aperture.into_iter().map(i64::from).collect(),
        };

        if !tpf.pipeline_mask().iter().any(|&m| m) {
            return Err(FitsError::Validation(
                "pipeline aperture mask selects no pixels".to_string(),
            ));
        }

        Ok(tpf)
    }

    pub fn n_cadences(&self) -> usize {
        self.time.len()
    }

    pub fn n_pixels(&self) -> usize {
        self.n_rows * self.n_cols
    }

    pub fn pipeline_mask(&self) -> Vec<bool> {
        self.aperture
            .iter()
            .map(|&bits| bits & PIPELINE_APERTURE_BIT != 0)
            .collect()
    }

    pub fn frame(&self, cadence: usize) -> Option<&[f64]> {
        let n_pix = self.n_pixels();
        self.flux.get(cadence * n_pix..(cadence + 1) * n_pix)
    }

    pub fn frame_err(&self, cadence: usize) -> Option<&[f64]> {
        let n_pix = self.n_pixels();
        self.flux_err.get(cadence * n_pix..(cadence + 1) * n_pix)
    }
}

fn find_hdu(fptr: &mut FitsFile, name: &str) -> Result<FitsHdu, FitsError> {
    fptr.hdu(name)
        .map_err(|_| FitsError::HduNotFound(name.to_string()))
}

/// Reads every element of a vector column of the current HDU, row after row.
/// `FitsHdu::read_col` reads one element per row, which only suits scalar columns.
fn read_vector_column(
    fptr: &mut FitsFile,
    position: usize,
    n_elements: usize,
) -> Result<Vec<f64>, FitsError> {
    let mut values = vec![f64::NAN; n_elements];
    if n_elements == 0 {
        return Ok(values);
    }
    let mut any_null = 0;
    let mut status = 0;
    unsafe {
        fitsio::sys::ffgcvd(
            fptr.as_raw(),
            (position + 1) as _,
            1,
            1,
            n_elements as _,
            f64::NAN,
            values.as_mut_ptr(),
            &mut any_null,
            &mut status,
        );
    }
    check_status(status)?;
    Ok(values)
}

fn column_position(columns: &[String], name: &str) -> Result<usize, FitsError> {
    columns
        .iter()
        .position(|column| column.eq_ignore_ascii_case(name))
        .ok_or_else(|| FitsError::ColumnNotFound {
            hdu: TABLE_HDU.to_string(),
            column: name.to_string(),
        })
}

/// `TDIMn = '(11,12)'` gives (columns, rows).
pub(crate) fn parse_tdim(raw: &str) -> Option<(usize, usize)> {
    let inner = raw.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut axes = inner.split(',').map(|axis| axis.trim().parse::<usize>());
    let cols = axes.next()?.ok()?;
    let rows = axes.next()?.ok()?;
    if axes.next().is_some() {
        return None;
    }
    Some((cols, rows))
}
