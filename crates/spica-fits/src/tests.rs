use tempfile::tempdir;

use crate::model::parse_tdim;
use crate::synthetic::SyntheticTpf;
use crate::{FitsError, QualityBitmask, QualityFlag, TargetPixelFile};

#[test]
fn reads_synthetic_target_pixel_file() {
    let dir = tempdir().unwrap();
    let synthetic = SyntheticTpf::with_star(212573842, 6, 40, |_| 1.0);
    let path = synthetic
        .write_to(dir.path().join(synthetic.file_name()))
        .expect("fixture written");
    let tpf = TargetPixelFile::from_path(&path, QualityBitmask::Default).expect("TPF reads");

    assert_eq!(tpf.metadata.epic_id, 212573842);
    assert_eq!(tpf.metadata.campaign, 6);
    assert_eq!(tpf.metadata.mission.as_deref(), Some("K2"));
    assert_eq!(tpf.metadata.object.as_deref(), Some("EPIC 212573842"));
    assert_eq!(tpf.metadata.column_origin, 600);
    assert_eq!(tpf.metadata.row_origin, 400);
    assert_eq!((tpf.n_cadences(), tpf.n_rows, tpf.n_cols), (40, 5, 5));
    assert_eq!(tpf.cadenceno[0], 100_000);
    assert_eq!(tpf.pipeline_mask().iter().filter(|&&m| m).count(), 9);

    // row-major within a frame: pixel (2, 2) is the star centre
    let frame = tpf.frame(0).unwrap();
    assert!(frame[12] > frame[0]);
    assert!((frame[12] - 1010.0).abs() < 1e-3);
    assert!((tpf.frame_err(0).unwrap()[12] - 1010.0_f64.sqrt()).abs() < 1e-3);
    assert!(tpf.frame(40).is_none());
}

#[test]
fn gzip_file_is_read_transparently() {
    let dir = tempdir().unwrap();
    let synthetic = SyntheticTpf::with_star(200213067, 17, 8, |_| 1.0);
    let path = synthetic
        .write_to(dir.path().join(format!("{}.gz", synthetic.file_name())))
        .expect("gzip fixture written");

    let tpf = TargetPixelFile::from_path(&path, QualityBitmask::Default).expect("gzip TPF reads");
    assert_eq!(tpf.metadata.epic_id, 200213067);
    assert_eq!(tpf.metadata.campaign, 17);
    assert_eq!(tpf.n_cadences(), 8);
}

#[test]
fn non_square_stamp_keeps_its_shape() {
    let dir = tempdir().unwrap();
    let mut synthetic = SyntheticTpf::new(7, 6, 3, 4);
    let frame: Vec<f64> = (0..12).map(f64::from).collect();
    synthetic.push_cadence(1.0, 1, 0, &frame);
    let path = synthetic.write_to(dir.path().join("stamp.fits")).unwrap();

    let tpf = TargetPixelFile::from_path(&path, QualityBitmask::Default).unwrap();
    assert_eq!((tpf.n_rows, tpf.n_cols), (3, 4));
    assert_eq!(tpf.frame(0).unwrap(), frame.as_slice());
}

#[test]
fn quality_bitmask_drops_flagged_cadences() {
    let dir = tempdir().unwrap();
    let mut synthetic = SyntheticTpf::new(1, 6, 3, 3);
    let frame = vec![5.0; 9];
    synthetic.push_cadence(1.0, 10, 0, &frame);
    synthetic.push_cadence(2.0, 11, QualityFlag::Desat.bit(), &frame);
    synthetic.push_cadence(3.0, 12, QualityFlag::ApertureCosmic.bit(), &frame);
    synthetic.push_cadence(f64::NAN, 13, 0, &frame);
    let path = synthetic.write_to(dir.path().join("quality.fits")).unwrap();

    let default = TargetPixelFile::from_path(&path, QualityBitmask::Default).unwrap();
    assert_eq!(default.cadenceno, vec![10, 12]);

    let hard = TargetPixelFile::from_path(&path, QualityBitmask::Hard).unwrap();
    assert_eq!(hard.cadenceno, vec![10]);

    let none = TargetPixelFile::from_path(&path, QualityBitmask::None).unwrap();
    assert_eq!(none.cadenceno, vec![10, 11, 12]);
}

#[test]
fn default_bitmask_matches_kepler_convention() {
    assert_eq!(QualityBitmask::Default.bits(), 175);
    assert!(QualityBitmask::Default.accepts(QualityFlag::Argabrightening.bit()));
    assert!(!QualityBitmask::Default.accepts(QualityFlag::SafeMode.bit()));
}

#[test]
fn empty_pipeline_mask_is_rejected() {
    let dir = tempdir().unwrap();
    let mut synthetic = SyntheticTpf::with_star(1, 6, 4, |_| 1.0);
    synthetic.aperture = vec![1; 25];
    let path = synthetic.write_to(dir.path().join("nomask.fits")).unwrap();

    let err = TargetPixelFile::from_path(&path, QualityBitmask::Default)
        .expect_err("mask without pipeline bit");
    assert!(matches!(err, FitsError::Validation(_)));
}

#[test]
fn non_fits_input_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("page.fits");
    std::fs::write(&path, b"<html>busy</html>").unwrap();
    assert!(TargetPixelFile::from_path(&path, QualityBitmask::Default).is_err());
    assert!(TargetPixelFile::from_path(dir.path().join("absent.fits"), QualityBitmask::Default).is_err());
}

#[test]
fn tdim_gives_columns_then_rows() {
    assert_eq!(parse_tdim("(11,12)"), Some((11, 12)));
    assert_eq!(parse_tdim(" ( 5, 5 ) "), Some((5, 5)));
    assert_eq!(parse_tdim("(5)"), None);
    assert_eq!(parse_tdim("(5,5,2)"), None);
    assert_eq!(parse_tdim("5,5"), None);
}
