//! COS annotation.
//!
//! On the FUV detector each segment records a single trace, so the order is
//! fixed by the segment (A → 0, B → 1) and the cross-dispersion offset is
//! measured from `SP_LOC_<seg> + SP_OFF_<seg>`. The NUV detector images
//! several stripes at once; every photon is assigned to the nearest stripe
//! location `SP_LOC_<seg>` of the order table's segments.
//!
//! Adds `order`, `xdisp` and `epera`.

use log::{debug, warn};

use crate::config::SpectrifyConfig;
use crate::data::model::{Column, EventTable, OrderTable};
use crate::data::table::append_cols;
use crate::error::{Result, SpectrifyError};
use crate::flux::FluxCalibration;
use crate::trace::{CentroidConfig, TraceFit, TraceLocation};

use super::nearest::NearestTrace;
use super::Annotator;

/// COS event columns.
const X_COLUMN: &str = "xfull";
const Y_COLUMN: &str = "yfull";
const WAVELENGTH_COLUMN: &str = "wavelength";

/// Detector layout of a COS exposure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CosDetector {
    /// One trace per segment; `segment` is the segment letter.
    Fuv { segment: char },
    /// Several simultaneous stripes.
    Nuv,
}

impl CosDetector {
    /// Read the layout from the `DETECTOR` and `SEGMENT` keywords.
    pub fn from_events(events: &EventTable) -> Result<Self> {
        let detector = events.header.require_str("DETECTOR")?.trim().to_ascii_uppercase();
        match detector.as_str() {
            "FUV" => {
                let name = events.header.require_str("SEGMENT")?;
                let segment = segment_letter(name).ok_or_else(|| SpectrifyError::InvalidKey {
                    key: "SEGMENT".into(),
                    value: name.to_string(),
                    expected: "a segment name",
                })?;
                Ok(CosDetector::Fuv { segment })
            }
            "NUV" => Ok(CosDetector::Nuv),
            _ => Err(SpectrifyError::InvalidKey {
                key: "DETECTOR".into(),
                value: detector,
                expected: "FUV or NUV",
            }),
        }
    }
}

fn segment_letter(segment: &str) -> Option<char> {
    segment.trim().chars().last().map(|c| c.to_ascii_uppercase())
}

/// Annotator for the Cosmic Origins Spectrograph.
#[derive(Debug, Clone)]
pub struct CosAnnotator {
    median_bin_width: f64,
    centroid: CentroidConfig,
}

impl CosAnnotator {
    pub fn new(config: &SpectrifyConfig) -> Self {
        Self {
            median_bin_width: config.median_bin_width,
            centroid: config.centroid(),
        }
    }
}

impl Annotator for CosAnnotator {
    fn annotate(
        &self,
        events: &EventTable,
        orders: &OrderTable,
        traceloc: TraceLocation,
        flux: &dyn FluxCalibration,
    ) -> Result<EventTable> {
        let detector = CosDetector::from_events(events)?;
        if detector == CosDetector::Nuv && traceloc.is_manual() {
            return Err(SpectrifyError::UnsupportedConfiguration(format!(
                "the NUV detector records several traces at once, so the {traceloc} trace \
                 location cannot be used"
            )));
        }

        let y = events.float_column(Y_COLUMN)?;
        let wavelength = events.float_column(WAVELENGTH_COLUMN)?;
        let n = y.len();

        let (order, reference_xdisp) = match &detector {
            CosDetector::Fuv { segment } => {
                let order = if *segment == 'A' { 0 } else { 1 };
                let xdisp = if traceloc.is_manual() {
                    None
                } else {
                    let expected = orders.header.require_f64(&format!("SP_LOC_{segment}"))?;
                    let offset = orders.header.require_f64(&format!("SP_OFF_{segment}"))?;
                    let trace = expected + offset;
                    Some(y.iter().map(|yi| yi - trace).collect())
                };
                (vec![order; n], xdisp)
            }
            CosDetector::Nuv => {
                let nearest = nearest_stripe(&y, orders)?;
                (nearest.line, Some(nearest.xdisp))
            }
        };

        let xdisp = match reference_xdisp {
            Some(xdisp) => xdisp,
            None => {
                // TALEN2 spans the dispersion axis, TALEN3 the cross-dispersion axis.
                let extent_key = if traceloc == TraceLocation::MedianTrend {
                    "TALEN2"
                } else {
                    "TALEN3"
                };
                let fit = TraceFit {
                    extent: events.header.require_extent(extent_key)? as f64,
                    bin_width: self.median_bin_width,
                    centroid: &self.centroid,
                };
                let x = if traceloc == TraceLocation::MedianTrend {
                    events.float_column(X_COLUMN)?.into_owned()
                } else {
                    Vec::new()
                };
                fit.offsets(traceloc, &x, &y, &wavelength)?
            }
        };

        let epera = flux.energy_per_area(&wavelength, Some(order.as_slice()))?;

        append_cols(
            events,
            &["order", "xdisp", "epera"],
            vec![
                Column::ints(order.iter().map(|&o| o as i64)),
                Column::Float(xdisp),
                Column::Float(epera),
            ],
        )
    }
}

/// Assign every photon to the closest NUV stripe.
fn nearest_stripe(y: &[f64], orders: &OrderTable) -> Result<NearestTrace> {
    if orders.is_empty() {
        return Err(SpectrifyError::UnsupportedConfiguration(
            "order table lists no NUV stripes".into(),
        ));
    }
    let mut nearest = NearestTrace::new(y.len());
    for (k, order) in orders.orders.iter().enumerate() {
        let segment = order
            .segment
            .as_deref()
            .and_then(segment_letter)
            .ok_or_else(|| SpectrifyError::MissingKey(format!("segment of order row {k}")))?;
        let location = orders.header.require_f64(&format!("SP_LOC_{segment}"))?;
        debug!("NUV stripe {segment} at y = {location}");
        nearest.offer(k, y.iter().map(|yi| yi - location));
    }
    let unassigned = nearest.unassigned();
    if unassigned > 0 {
        warn!("{unassigned} NUV photons have no defined stripe distance");
    }
    Ok(nearest)
}
