//! Descriptive statistics over plain `f64` slices.
//!
//! Rolling helpers return one entry per input position; an entry is `None`
//! until its trailing window is complete and free of gaps.

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by n).
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (divides by n - 1); needs two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between order statistics, at
/// position `q * (n - 1)` of the sorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Simple percentage change `(x_t - x_{t-1}) / x_{t-1}`; the first entry is
/// undefined.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    for pair in values.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let change = (cur - prev) / prev;
        out.push(change.is_finite().then_some(change));
    }
    out
}

fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }

    let mut buf = Vec::with_capacity(window);
    for end in window..=values.len() {
        buf.clear();
        buf.extend(values[end - window..end].iter().flatten().copied());
        if buf.len() == window {
            out[end - 1] = f(&buf);
        }
    }
    out
}

/// Trailing mean over `window` periods.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Trailing sample standard deviation over `window` periods.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn quantile_interpolates() {
        let values = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 0.5), Some(3.0));
        assert_eq!(quantile(&values, 1.0), Some(5.0));
        // position 0.8 * 4 = 3.2 → 4 + 0.2 * (5 - 4)
        assert!(close(quantile(&values, 0.8).unwrap(), 4.2));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // population std is 2.0; sample variance = 32 / 7
        assert!(close(sample_std(&values).unwrap(), (32.0_f64 / 7.0).sqrt()));
        assert!(close(population_variance(&values).unwrap(), 4.0));
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn pct_change_first_undefined() {
        let changes = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(changes[0], None);
        assert!(close(changes[1].unwrap(), 0.1));
        assert!(close(changes[2].unwrap(), -0.1));
    }

    #[test]
    fn rolling_waits_for_full_window() {
        let values: Vec<Option<f64>> = vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let means = rolling_mean(&values, 3);
        assert!(means[..3].iter().all(Option::is_none));
        assert_eq!(means[3], Some(2.0));
        assert_eq!(means[4], Some(3.0));

        let stds = rolling_std(&values, 2);
        assert_eq!(stds[1], None);
        assert!(close(stds[2].unwrap(), 0.5_f64.sqrt()));
    }

    #[test]
    fn rolling_skips_windows_with_gaps() {
        let values = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)];
        let means = rolling_mean(&values, 2);
        assert_eq!(means, vec![None, Some(1.5), None, None, Some(4.5)]);
    }
}
