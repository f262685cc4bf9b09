use spica_core::cleaning::{apply_chain, post_correction_chain, sap_chain, Cleaning, FillMethod};
use spica_core::config::CleaningConfig;
use spica_core::lightcurve::{LightCurve, LightCurveError};
use spica_fits::synthetic::{SyntheticTpf, LONG_CADENCE_DAYS};
use spica_fits::{QualityBitmask, TargetPixelFile};

fn series(cadences: &[i64], flux: &[f64]) -> LightCurve {
    let time = cadences
        .iter()
        .map(|&c| 2300.0 + (c - cadences[0]) as f64 * LONG_CADENCE_DAYS)
        .collect();
    LightCurve::new(time, flux.to_vec(), vec![1.0; flux.len()], cadences.to_vec())
        .expect("columns have equal length")
}

fn read(synthetic: &SyntheticTpf) -> anyhow::Result<TargetPixelFile> {
    let dir = tempfile::tempdir()?;
    let path = synthetic.write_to(dir.path().join(synthetic.file_name()))?;
    Ok(TargetPixelFile::from_path(&path, QualityBitmask::Default)?)
}

#[test]
fn sap_sums_the_pipeline_aperture() -> anyhow::Result<()> {
    let synthetic = SyntheticTpf::with_star(212573842, 6, 20, |_| 1.0);
    let tpf = read(&synthetic)?;
    let lc = LightCurve::from_tpf(&tpf, &tpf.pipeline_mask())?;

    let expected: f64 = (0..25)
        .filter(|p| tpf.pipeline_mask()[*p])
        .map(|p| tpf.frame(0).unwrap()[p])
        .sum();
    assert_eq!(lc.len(), 20);
    assert!((lc.flux[0] - expected).abs() < 1e-3);
    assert!(lc.is_strictly_increasing());
    assert_eq!(lc.meta.epic_id, 212573842);
    Ok(())
}

#[test]
fn sap_rejects_empty_mask() -> anyhow::Result<()> {
    let synthetic = SyntheticTpf::with_star(212573842, 6, 5, |_| 1.0);
    let tpf = read(&synthetic)?;
    let err = LightCurve::from_tpf(&tpf, &[false; 25]).unwrap_err();
    assert_eq!(err, LightCurveError::EmptyAperture);
    Ok(())
}

#[test]
fn all_nan_aperture_cadence_becomes_nan() -> anyhow::Result<()> {
    let mut synthetic = SyntheticTpf::new(1, 6, 3, 3);
    synthetic.push_cadence(2300.0, 10, 0, &[1.0; 9]);
    synthetic.push_cadence(2300.02, 11, 0, &[f64::NAN; 9]);
    let tpf = read(&synthetic)?;
    let lc = LightCurve::from_tpf(&tpf, &tpf.pipeline_mask())?;

    assert_eq!(lc.flux[0], 9.0);
    assert!(lc.flux[1].is_nan());
    assert_eq!(lc.remove_nans().len(), 1);
    Ok(())
}

#[test]
fn normalize_divides_by_median() -> anyhow::Result<()> {
    let lc = series(&[1, 2, 3], &[2.0, 4.0, f64::NAN]);
    let normalized = lc.normalize()?;
    assert_eq!(normalized.flux[0], 2.0 / 3.0);
    assert_eq!(normalized.flux[1], 4.0 / 3.0);
    assert!(normalized.flux[2].is_nan());

    let zero = series(&[1, 2], &[0.0, 0.0]);
    assert_eq!(zero.normalize().unwrap_err(), LightCurveError::DegenerateMedian(0.0));

    let empty = series(&[1], &[f64::NAN]);
    assert_eq!(empty.normalize().unwrap_err(), LightCurveError::NoFiniteFlux);
    Ok(())
}

#[test]
fn outliers_are_clipped_iteratively() {
    let mut flux: Vec<f64> = (0..200).map(|i| 1.0 + 0.001 * ((i % 7) as f64 - 3.0)).collect();
    flux[50] = 1.5;
    flux[120] = 0.2;
    let cadences: Vec<i64> = (0..200).collect();
    let lc = series(&cadences, &flux);

    let clipped = lc.remove_outliers(5.0, 5);
    assert_eq!(clipped.len(), 198);
    assert!(!clipped.cadenceno.contains(&50));
    assert!(!clipped.cadenceno.contains(&120));

    let untouched = series(&cadences[..10], &flux[..10]).remove_outliers(5.0, 5);
    assert_eq!(untouched.len(), 10);
}

#[test]
fn fill_gaps_restores_cadence_grid() -> anyhow::Result<()> {
    let lc = series(&[10, 11, 14, 15], &[1.0, 2.0, 5.0, 6.0]);

    let nearest = lc.fill_gaps(FillMethod::Nearest)?;
    assert_eq!(nearest.cadenceno, vec![10, 11, 12, 13, 14, 15]);
    assert_eq!(nearest.flux, vec![1.0, 2.0, 2.0, 5.0, 5.0, 6.0]);
    assert!(nearest.is_strictly_increasing());
    let expected_t12 = 2300.0 + 2.0 * LONG_CADENCE_DAYS;
    assert!((nearest.time[2] - expected_t12).abs() < 1e-9);

    let linear = lc.fill_gaps(FillMethod::Linear)?;
    let expected = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    assert_eq!(linear.len(), expected.len());
    for (got, want) in linear.flux.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12, "{got} != {want}");
    }
    Ok(())
}

#[test]
fn fill_gaps_collapses_duplicate_cadences() -> anyhow::Result<()> {
    let lc = LightCurve::new(
        vec![1.0, 1.01, 1.02, 1.04],
        vec![1.0, 9.0, 2.0, 3.0],
        vec![0.1; 4],
        vec![5, 5, 6, 8],
    )?;
    let filled = lc.fill_gaps(FillMethod::Nearest)?;
    assert_eq!(filled.cadenceno, vec![5, 6, 7, 8]);
    assert_eq!(filled.flux[0], 1.0);
    Ok(())
}

#[test]
fn fill_gaps_rejects_cadences_running_backwards() {
    let lc = LightCurve::new(vec![1.0, 2.0], vec![1.0; 2], vec![0.1; 2], vec![9, 3])
        .expect("equal lengths");
    assert_eq!(
        lc.fill_gaps(FillMethod::Nearest).unwrap_err(),
        LightCurveError::UnorderedCadences
    );
}

#[test]
fn chains_apply_in_declared_order() {
    let config = CleaningConfig::default();
    let names: Vec<&str> = sap_chain(&config).iter().map(Cleaning::name).collect();
    assert_eq!(names, ["normalize", "remove_nans", "remove_outliers", "fill_gaps"]);

    let names: Vec<&str> = post_correction_chain(&config)
        .iter()
        .map(Cleaning::name)
        .collect();
    assert_eq!(names, ["remove_outliers", "fill_gaps"]);
}

#[test]
fn sap_chain_output_is_clean() -> anyhow::Result<()> {
    let mut flux: Vec<f64> = (0..100).map(|i| 5000.0 + (i % 5) as f64).collect();
    flux[20] = f64::NAN;
    flux[60] = 90_000.0;
    let mut cadences: Vec<i64> = (0..100).collect();
    cadences.remove(40);
    flux.remove(40);
    let lc = series(&cadences, &flux);

    let cleaned = apply_chain(&lc, &sap_chain(&CleaningConfig::default()))?;
    assert!(!cleaned.has_nan_flux());
    assert!(cleaned.is_strictly_increasing());
    assert_eq!(cleaned.cadenceno, (0..100).collect::<Vec<i64>>());
    assert!(cleaned.flux.iter().all(|f| (f - 1.0).abs() < 0.01));
    Ok(())
}
