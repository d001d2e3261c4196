//! Binned robust trend estimator.
//!
//! The detector columns are split into bins of `bin_width` pixels. Each bin
//! contributes its median height, weighted by `count / variance`, to a
//! weighted straight-line fit. Bins with fewer than two photons carry no
//! weight.

use log::debug;

use crate::error::{Result, SpectrifyError};
use crate::stats::{self, Line};

/// Variance floor for bins whose photons all share one height.
const MIN_BIN_VARIANCE: f64 = 1e-12;

/// Fit a robust linear trend `y(x)` to scattered photon positions.
///
/// Bin edges run `0, w, 2w, ..` up to `pixel_range`; bins are half-open and
/// samples outside every bin are not used by the fit.
pub fn estimate_trend(x: &[f64], y: &[f64], pixel_range: f64, bin_width: f64) -> Result<Line> {
    if !(bin_width > 0.0 && pixel_range > 0.0) {
        return Err(SpectrifyError::UnsupportedConfiguration(format!(
            "median trend needs a positive bin width and pixel range, got {bin_width} and {pixel_range}"
        )));
    }
    let n_edges = ((pixel_range + 1.0) / bin_width).ceil() as usize;
    let n_bins = n_edges.saturating_sub(1);

    let mut binned: Vec<Vec<f64>> = vec![Vec::new(); n_bins];
    for (&xi, &yi) in x.iter().zip(y) {
        if !(xi >= 0.0) || yi.is_nan() {
            continue;
        }
        let idx = (xi / bin_width).floor() as usize;
        if idx < n_bins {
            binned[idx].push(yi);
        }
    }

    let mut mids = Vec::with_capacity(n_bins);
    let mut meds = Vec::with_capacity(n_bins);
    let mut weights = Vec::with_capacity(n_bins);
    for (i, bin) in binned.iter().enumerate() {
        if bin.len() <= 1 {
            continue;
        }
        let (Some(med), Some(var)) = (stats::median(bin), stats::variance(bin)) else {
            continue;
        };
        mids.push((i as f64 + 0.5) * bin_width);
        meds.push(med);
        weights.push(bin.len() as f64 / var.max(MIN_BIN_VARIANCE));
    }
    debug!(
        "median trend: {} of {n_bins} bins populated (bin width {bin_width})",
        mids.len()
    );

    stats::weighted_line_fit(&mids, &meds, &weights).ok_or_else(|| {
        SpectrifyError::NumericDegeneracy(format!(
            "median trend needs at least two bins with two or more photons, found {}",
            mids.len()
        ))
    })
}

/// Cross-dispersion offsets from a fitted median trend: `y - trend(x)`.
///
/// Every sample is detrended, including those outside the fitted bins.
pub fn median_trace_residuals(
    x: &[f64],
    y: &[f64],
    pixel_range: f64,
    bin_width: f64,
) -> Result<Vec<f64>> {
    let line = estimate_trend(x, y, pixel_range, bin_width)?;
    Ok(x.iter().zip(y).map(|(&xi, &yi)| yi - line.eval(xi)).collect())
}
