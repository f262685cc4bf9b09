use std::cmp::Ordering;

fn finite_sorted(data: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Median of the finite values; `None` when there are none.
pub fn median(data: &[f64]) -> Option<f64> {
    let v = finite_sorted(data);
    if v.is_empty() {
        return None;
    }
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) * 0.5)
    } else {
        Some(v[mid])
    }
}

pub fn mean(data: &[f64]) -> Option<f64> {
    let (sum, count) = data
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(s, n), &x| (s + x, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Population standard deviation (ddof = 0) of the finite values.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let mu = mean(data)?;
    let (ss, count) = data
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(s, n), &x| (s + (x - mu).powi(2), n + 1));
    Some((ss / count as f64).sqrt())
}

/// Median spacing of consecutive, strictly increasing samples.
pub fn median_cadence(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let dts: Vec<f64> = times
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .collect();
    median(&dts)
}

/// Linear-interpolated percentile (0..=100) of the finite values.
pub fn percentile(data: &[f64], q: f64) -> Option<f64> {
    let v = finite_sorted(data);
    if v.is_empty() {
        return None;
    }
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (v.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    Some(v[lo] + (v[hi] - v[lo]) * weight)
}
