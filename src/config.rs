use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::trace::{CentroidConfig, TraceLocation};

/// Run configuration for spectral annotation.
///
/// Every field has a default, so a JSON file only needs the fields it changes:
///
/// ```json
/// { "traceloc": "median", "median_bin_width": 16, "lya_window": [1214.0, 1217.5] }
/// ```
///
/// Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpectrifyConfig {
    /// Where cross-dispersion offsets are measured from.
    pub traceloc: TraceLocation,
    /// Seed of the sub-pixel dequantization jitter. Fixed so that repeated
    /// runs on one exposure are bit-identical.
    pub dequantize_seed: u64,
    /// Median-trend bin width on the COS detectors, in pixels.
    #[serde(alias = "cos_median_bin_width")]
    pub median_bin_width: f64,
    /// Median-trend bin width on the STIS detectors, in pixels.
    pub stis_median_bin_width: f64,
    /// Wavelength window `[min, max)` of the line used by the centroid policy.
    pub lya_window: (f64, f64),
    /// Fractional centroid change that counts as converged.
    pub centroid_tolerance: f64,
    /// Hard cap on centroid narrowing steps.
    pub centroid_max_iterations: usize,
}

impl Default for SpectrifyConfig {
    fn default() -> Self {
        let centroid = CentroidConfig::default();
        Self {
            traceloc: TraceLocation::Default,
            dequantize_seed: 0,
            median_bin_width: 8.0,
            stis_median_bin_width: 1.0,
            lya_window: centroid.line_window,
            centroid_tolerance: centroid.tolerance,
            centroid_max_iterations: centroid.max_iterations,
        }
    }
}

impl SpectrifyConfig {
    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing config JSON")
    }

    /// Centroid narrowing settings.
    pub fn centroid(&self) -> CentroidConfig {
        CentroidConfig {
            line_window: self.lya_window,
            tolerance: self.centroid_tolerance,
            max_iterations: self.centroid_max_iterations,
        }
    }
}
