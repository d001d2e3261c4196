//! Trace-location policies.
//!
//! By default the cross-dispersion offset of a photon is measured from the
//! trace recorded in the calibration reference. The two alternatives locate
//! the trace from the photons themselves:
//!
//! * [`median`] – a robust line through pixel-binned median heights,
//! * [`centroid`] – the centroid of a bright, narrow emission line.

pub mod centroid;
pub mod median;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpectrifyError;

pub use centroid::{estimate_line_centroid, line_centroid_residuals, CentroidConfig};
pub use median::{estimate_trend, median_trace_residuals};

/// Where the spectral trace is taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TraceLocation {
    /// Trace recorded in the calibration reference.
    #[default]
    Default,
    /// Binned-median linear trend fitted to the photon positions.
    MedianTrend,
    /// Centroid of the Lyman-alpha airglow line.
    LineCentroid,
}

impl TraceLocation {
    /// Whether the policy relocates the trace from the photon data.
    pub fn is_manual(self) -> bool {
        self != TraceLocation::Default
    }
}

impl FromStr for TraceLocation {
    type Err = SpectrifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "stsci" => Ok(TraceLocation::Default),
            "median" | "median-trend" => Ok(TraceLocation::MedianTrend),
            "lya" | "line-centroid" => Ok(TraceLocation::LineCentroid),
            other => Err(SpectrifyError::UnsupportedConfiguration(format!(
                "unknown trace location policy '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for TraceLocation {
    type Error = SpectrifyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TraceLocation> for String {
    fn from(policy: TraceLocation) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for TraceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TraceLocation::Default => "default",
            TraceLocation::MedianTrend => "median-trend",
            TraceLocation::LineCentroid => "line-centroid",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// TraceFit – shared photon-based relocation used by every instrument
// ---------------------------------------------------------------------------

/// Detector geometry and tuning for locating the trace from the photons.
#[derive(Debug, Clone, Copy)]
pub struct TraceFit<'a> {
    /// Detector extent along the axis the policy scans: the dispersion range
    /// covered by the median-trend bins, or the cross-dispersion height whose
    /// half is the initial centroid window.
    pub extent: f64,
    /// Median-trend bin width in pixels.
    pub bin_width: f64,
    pub centroid: &'a CentroidConfig,
}

impl TraceFit<'_> {
    /// Cross-dispersion offsets of every photon under a photon-based policy.
    ///
    /// `wavelength` is only read by [`TraceLocation::LineCentroid`].
    pub fn offsets(
        &self,
        policy: TraceLocation,
        x: &[f64],
        y: &[f64],
        wavelength: &[f64],
    ) -> Result<Vec<f64>, SpectrifyError> {
        match policy {
            TraceLocation::MedianTrend => {
                median_trace_residuals(x, y, self.extent, self.bin_width)
            }
            TraceLocation::LineCentroid => {
                line_centroid_residuals(wavelength, y, self.extent / 2.0, self.centroid)
            }
            TraceLocation::Default => Err(SpectrifyError::UnsupportedConfiguration(
                "the default trace location is taken from the reference, not fitted".into(),
            )),
        }
    }
}
