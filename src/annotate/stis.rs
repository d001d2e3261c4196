//! STIS annotation.
//!
//! Event times are rescaled to seconds and the raw pixel coordinates are
//! dequantized before the order profiles are interpolated onto the event
//! grid. With a single order the cross-dispersion offset follows the selected
//! trace-location policy. Echellograms carry many orders, so every photon is
//! assigned to its nearest order trace and only the reference traces may be
//! used.
//!
//! Adds `wavelength`, `xdisp`, `epera`, `order` and `dq`, and replaces `time`
//! with the rescaled times.

use log::{debug, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::SpectrifyConfig;
use crate::data::model::{Column, EventTable, OrderTable};
use crate::data::table::append_cols;
use crate::error::{Result, SpectrifyError};
use crate::flux::FluxCalibration;
use crate::interp::{build_order_interpolants, OrderInterpolants, PixelGrid};
use crate::trace::{CentroidConfig, TraceFit, TraceLocation};

use super::dequantize::dequantize;
use super::nearest::NearestTrace;
use super::Annotator;

const TIME_COLUMN: &str = "time";
const X_COLUMN: &str = "axis1";
const Y_COLUMN: &str = "axis2";
/// Time-scale keyword; removed once applied so it is never applied twice.
const TIME_SCALE_KEY: &str = "TSCAL1";

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Events after time rescaling and pixel dequantization.
#[derive(Debug, Clone)]
pub struct PreparedEvents {
    /// Input table with `time` in seconds and the time-scale keyword removed.
    pub table: EventTable,
    /// Dequantized x of every event.
    pub x: Vec<f64>,
    /// Dequantized y of every event.
    pub y: Vec<f64>,
}

/// Rescale event times and dequantize pixel coordinates.
///
/// The input is not modified. Dequantization draws from a generator seeded
/// with `seed`, so equal inputs give bit-identical coordinates.
pub fn prepare_events(events: &EventTable, seed: u64) -> Result<PreparedEvents> {
    let scale = events.header.require_f64(TIME_SCALE_KEY)?;
    let time: Vec<f64> = events
        .float_column(TIME_COLUMN)?
        .iter()
        .map(|t| t * scale)
        .collect();

    let mut table = events.clone();
    table.replace_column(TIME_COLUMN, Column::Float(time))?;
    table.header.remove(TIME_SCALE_KEY);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (x, y) = dequantize(
        &events.float_column(X_COLUMN)?,
        &events.float_column(Y_COLUMN)?,
        &mut rng,
    );
    Ok(PreparedEvents { table, x, y })
}

// ---------------------------------------------------------------------------
// Order assignment
// ---------------------------------------------------------------------------

/// Spectral quantities of every photon.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonSpectra {
    pub wavelength: Vec<f64>,
    pub xdisp: Vec<f64>,
    /// Row index of the assigned order in the order table.
    pub line: Vec<usize>,
    /// Order number of the assigned order.
    pub order: Vec<i64>,
    pub dq: Vec<Option<i64>>,
}

/// Assign photons at `(x, y)` to orders and evaluate their profiles.
///
/// With several orders each photon goes to the order whose trace is nearest
/// (ties to the earlier order) and only the default trace location is
/// accepted. `fit` supplies the detector geometry for photon-based trace
/// location with a single order.
pub fn assign_orders(
    x: &[f64],
    y: &[f64],
    orders: &[OrderInterpolants],
    traceloc: TraceLocation,
    fit: &TraceFit<'_>,
) -> Result<PhotonSpectra> {
    match orders {
        [] => Err(SpectrifyError::UnsupportedConfiguration(
            "order table has no spectral orders".into(),
        )),
        [single] => single_order(x, y, single, traceloc, fit),
        _ if traceloc.is_manual() => Err(SpectrifyError::UnsupportedConfiguration(format!(
            "cannot locate the {traceloc} trace on an echellogram with {} orders",
            orders.len()
        ))),
        _ => nearest_order(x, y, orders),
    }
}

fn single_order(
    x: &[f64],
    y: &[f64],
    order: &OrderInterpolants,
    traceloc: TraceLocation,
    fit: &TraceFit<'_>,
) -> Result<PhotonSpectra> {
    let wavelength = order.wavelength.eval_many(x);
    let xdisp = match traceloc {
        TraceLocation::Default => x
            .iter()
            .zip(y)
            .map(|(&xi, &yi)| yi - order.trace.eval(xi))
            .collect(),
        policy => fit.offsets(policy, x, y, &wavelength)?,
    };
    Ok(PhotonSpectra {
        dq: x.iter().map(|&xi| order.dq_at(xi)).collect(),
        line: vec![0; x.len()],
        order: vec![order.sporder; x.len()],
        wavelength,
        xdisp,
    })
}

fn nearest_order(x: &[f64], y: &[f64], orders: &[OrderInterpolants]) -> Result<PhotonSpectra> {
    let n = x.len();
    let mut nearest = NearestTrace::new(n);
    for (k, order) in orders.iter().enumerate() {
        nearest.offer(
            k,
            x.iter().zip(y).map(|(&xi, &yi)| yi - order.trace.eval(xi)),
        );
    }
    let unassigned = nearest.unassigned();
    if unassigned > 0 {
        warn!("{unassigned} photons fall outside every order trace");
    }

    // Profiles are evaluated per order group, never mixed across orders.
    let mut wavelength = vec![f64::NAN; n];
    let mut dq = vec![None; n];
    let mut order_numbers = vec![0; n];
    for (k, members) in nearest.groups(orders.len()).into_iter().enumerate() {
        let order = &orders[k];
        debug!("order {} collects {} photons", order.sporder, members.len());
        for i in members {
            wavelength[i] = order.wavelength.eval(x[i]);
            dq[i] = order.dq_at(x[i]);
            order_numbers[i] = order.sporder;
        }
    }

    Ok(PhotonSpectra {
        wavelength,
        xdisp: nearest.xdisp,
        line: nearest.line,
        order: order_numbers,
        dq,
    })
}

// ---------------------------------------------------------------------------
// StisAnnotator
// ---------------------------------------------------------------------------

/// Annotator for the Space Telescope Imaging Spectrograph.
#[derive(Debug, Clone)]
pub struct StisAnnotator {
    seed: u64,
    median_bin_width: f64,
    centroid: CentroidConfig,
}

impl StisAnnotator {
    pub fn new(config: &SpectrifyConfig) -> Self {
        Self {
            seed: config.dequantize_seed,
            median_bin_width: config.stis_median_bin_width,
            centroid: config.centroid(),
        }
    }
}

impl Annotator for StisAnnotator {
    fn annotate(
        &self,
        events: &EventTable,
        orders: &OrderTable,
        traceloc: TraceLocation,
        flux: &dyn FluxCalibration,
    ) -> Result<EventTable> {
        if orders.len() > 1 && traceloc.is_manual() {
            return Err(SpectrifyError::UnsupportedConfiguration(format!(
                "cannot locate the {traceloc} trace on an echellogram with {} orders",
                orders.len()
            )));
        }

        let prepared = prepare_events(events, self.seed)?;

        let nx_events = events.header.require_extent("AXLEN1")?;
        let ny_events = events.header.require_extent("AXLEN2")?;
        let nx_ref = orders.header.require_extent("SIZAXIS1")?;
        let ny_ref = orders.header.require_extent("SIZAXIS2")?;
        let grid = PixelGrid::rescaled(nx_events, ny_events, nx_ref, ny_ref);
        let interps = build_order_interpolants(&orders.orders, &grid)?;

        let extent = if traceloc == TraceLocation::MedianTrend {
            nx_events
        } else {
            ny_events
        };
        let fit = TraceFit {
            extent: extent as f64,
            bin_width: self.median_bin_width,
            centroid: &self.centroid,
        };
        let spectra = assign_orders(&prepared.x, &prepared.y, &interps, traceloc, &fit)?;

        let epera = if interps.len() > 1 {
            flux.energy_per_area(&spectra.wavelength, Some(spectra.line.as_slice()))?
        } else {
            flux.energy_per_area(&spectra.wavelength, None)?
        };

        append_cols(
            &prepared.table,
            &["wavelength", "xdisp", "epera", "order", "dq"],
            vec![
                Column::Float(spectra.wavelength),
                Column::Float(spectra.xdisp),
                Column::Float(epera),
                Column::ints(spectra.order),
                Column::Int(spectra.dq),
            ],
        )
    }
}
