//! Iterative centroid narrowing on a bright emission line.
//!
//! Photons inside the line's wavelength window are selected and their median
//! height taken as a first centroid. The height window around the centroid is
//! then halved repeatedly, re-selecting photons and re-taking the median, so
//! that the distorted wings of the (geocoronal) line drop out.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrifyError};
use crate::stats;

/// Hydrogen Lyman-alpha window used to locate the trace, in Angstrom.
pub const LYA_WINDOW: (f64, f64) = (1214.5, 1217.2);

/// Tuning of the centroid narrowing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentroidConfig {
    /// Wavelength window `[min, max)` of the emission line.
    pub line_window: (f64, f64),
    /// Fractional change between successive centroids that counts as converged.
    pub tolerance: f64,
    /// Hard cap on narrowing steps.
    pub max_iterations: usize,
}

impl Default for CentroidConfig {
    fn default() -> Self {
        Self {
            line_window: LYA_WINDOW,
            tolerance: 1e-4,
            max_iterations: 200,
        }
    }
}

/// Height of the emission line's centroid.
///
/// `max_y_halfwidth` is the initial half-height of the acceptance window; it
/// is halved before every re-selection.
pub fn estimate_line_centroid(
    w: &[f64],
    y: &[f64],
    max_y_halfwidth: f64,
    config: &CentroidConfig,
) -> Result<f64> {
    let (wmin, wmax) = config.line_window;
    let mut selected: Vec<f64> = w
        .iter()
        .zip(y)
        .filter(|(wi, _)| **wi >= wmin && **wi < wmax)
        .map(|(_, &yi)| yi)
        .collect();

    let mut centroid = stats::median(&selected).ok_or_else(|| {
        SpectrifyError::NumericDegeneracy(format!(
            "no photons in the line window [{wmin}, {wmax})"
        ))
    })?;
    let mut dy = max_y_halfwidth;

    for iteration in 1..=config.max_iterations {
        dy *= 0.5;
        if !(dy > 0.0) {
            break;
        }
        selected.retain(|&yi| yi >= centroid - dy && yi < centroid + dy);
        let previous = centroid;
        centroid = stats::median(&selected).ok_or_else(|| {
            SpectrifyError::NumericDegeneracy(format!(
                "line centroid window collapsed to zero photons after {iteration} narrowing steps"
            ))
        })?;

        let change = (centroid - previous).abs();
        let converged = if centroid == 0.0 {
            change <= config.tolerance
        } else {
            change / centroid.abs() <= config.tolerance
        };
        if converged {
            debug!(
                "line centroid {centroid:.3} after {iteration} steps ({} photons, half-height {dy})",
                selected.len()
            );
            return Ok(centroid);
        }
    }

    Err(SpectrifyError::NumericDegeneracy(format!(
        "line centroid did not converge within {} narrowing steps",
        config.max_iterations
    )))
}

/// Cross-dispersion offsets from the line centroid: `y - centroid`.
pub fn line_centroid_residuals(
    w: &[f64],
    y: &[f64],
    max_y_halfwidth: f64,
    config: &CentroidConfig,
) -> Result<Vec<f64>> {
    let centroid = estimate_line_centroid(w, y, max_y_halfwidth, config)?;
    Ok(y.iter().map(|yi| yi - centroid).collect())
}
