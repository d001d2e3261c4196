//! Small robust-statistics helpers shared by the trace estimators.

/// Median of a slice. `NaN` values are ignored.
///
/// Returns `None` when no finite-or-infinite values remain. For even-length
/// data the two middle values are averaged.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(f64::total_cmp);
    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        Some((valid[mid - 1] + valid[mid]) / 2.0)
    } else {
        Some(valid[mid])
    }
}

/// Population variance (divides by `n`). `None` for an empty slice.
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    Some(values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n)
}

/// A fitted straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Weighted least-squares line through `(x, y)` points.
///
/// Weights multiply the unsquared residuals, so the fit minimises
/// `Σ (wᵢ (yᵢ - a xᵢ - b))²`. Points with a zero or non-finite weight are
/// ignored. Returns `None` unless at least two distinct abscissae carry
/// weight.
pub fn weighted_line_fit(x: &[f64], y: &[f64], w: &[f64]) -> Option<Line> {
    let (mut s, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut n_used = 0usize;
    for ((&xi, &yi), &wi) in x.iter().zip(y).zip(w) {
        if !(wi.is_finite() && wi > 0.0 && xi.is_finite() && yi.is_finite()) {
            continue;
        }
        let w2 = wi * wi;
        s += w2;
        sx += w2 * xi;
        sy += w2 * yi;
        sxx += w2 * xi * xi;
        sxy += w2 * xi * yi;
        n_used += 1;
    }
    if n_used < 2 {
        return None;
    }
    // Centred form keeps the determinant well conditioned for large pixel x.
    let x_mean = sx / s;
    let y_mean = sy / s;
    let sxx_c = sxx - s * x_mean * x_mean;
    let sxy_c = sxy - s * x_mean * y_mean;
    if sxx_c <= f64::EPSILON * sxx.abs() || sxx_c <= 0.0 {
        return None;
    }
    let slope = sxy_c / sxx_c;
    Some(Line {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn median_skips_nan() {
        assert_eq!(median(&[f64::NAN, 5.0, 1.0]), Some(3.0));
        assert_eq!(median(&[f64::NAN]), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn variance_is_population() {
        assert_relative_eq!(variance(&[1.0, 3.0]).unwrap(), 1.0);
        assert_eq!(variance(&[7.0]), Some(0.0));
    }

    #[test]
    fn exact_line_is_recovered() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y: Vec<f64> = x.iter().map(|v| 0.5 * v - 2.0).collect();
        let line = weighted_line_fit(&x, &y, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_relative_eq!(line.slope, 0.5, epsilon = 1e-12);
        assert_relative_eq!(line.intercept, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn heavy_weight_pulls_the_fit() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 10.0, 0.0];
        let even = weighted_line_fit(&x, &y, &[1.0, 1.0, 1.0]).unwrap();
        let pulled = weighted_line_fit(&x, &y, &[1.0, 100.0, 1.0]).unwrap();
        assert!(pulled.eval(1.0) > even.eval(1.0));
    }

    #[test]
    fn zero_weights_are_ignored() {
        assert!(weighted_line_fit(&[0.0, 1.0], &[1.0, 2.0], &[1.0, 0.0]).is_none());
        assert!(weighted_line_fit(&[1.0, 1.0], &[1.0, 2.0], &[1.0, 1.0]).is_none());
    }
}
