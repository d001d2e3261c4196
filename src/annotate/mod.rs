//! Photon annotation: instrument dispatch and the per-instrument annotators.
//!
//! ```text
//!   EventTable + OrderTable
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ same_obs  │  both tables from one exposure?
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ Instrument  │  INSTRUME keyword → annotator
//!   └────────────┘
//!      │       │
//!      ▼       ▼
//!    cos      stis     order / xdisp / epera (+ wavelength / dq)
//! ```

pub mod cos;
pub mod dequantize;
mod nearest;
pub mod stis;

use std::fmt;

use log::info;

use crate::config::SpectrifyConfig;
use crate::data::consistency::same_obs;
use crate::data::model::{EventTable, OrderTable};
use crate::error::{Result, SpectrifyError};
use crate::flux::FluxCalibration;
use crate::trace::TraceLocation;

pub use cos::CosAnnotator;
pub use stis::StisAnnotator;

/// Header keyword naming the instrument.
pub const INSTRUMENT_KEY: &str = "INSTRUME";

// ---------------------------------------------------------------------------
// Annotator – shared capability of every instrument
// ---------------------------------------------------------------------------

/// Adds spectral columns to the photon events of one exposure.
///
/// Implementations return a new table with the same rows, in the same order,
/// plus the appended columns. On error nothing is returned.
pub trait Annotator {
    fn annotate(
        &self,
        events: &EventTable,
        orders: &OrderTable,
        traceloc: TraceLocation,
        flux: &dyn FluxCalibration,
    ) -> Result<EventTable>;
}

/// The instrument families that can be annotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    /// Cosmic Origins Spectrograph: fixed per-segment traces.
    Cos,
    /// Space Telescope Imaging Spectrograph: echelle and first-order modes.
    Stis,
}

impl Instrument {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "COS" => Ok(Instrument::Cos),
            "STIS" => Ok(Instrument::Stis),
            _ => Err(SpectrifyError::UnsupportedInstrument(name.trim().to_string())),
        }
    }

    /// Instrument named by the order table's header.
    pub fn from_orders(orders: &OrderTable) -> Result<Self> {
        Self::from_name(orders.header.require_str(INSTRUMENT_KEY)?)
    }

    pub fn annotator(self, config: &SpectrifyConfig) -> Box<dyn Annotator> {
        match self {
            Instrument::Cos => Box::new(CosAnnotator::new(config)),
            Instrument::Stis => Box::new(StisAnnotator::new(config)),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Cos => f.write_str("COS"),
            Instrument::Stis => f.write_str("STIS"),
        }
    }
}

/// Annotate the photon events of one exposure.
///
/// The tables must describe the same observation; the instrument named in the
/// order table selects the annotator.
pub fn spectrify(
    events: &EventTable,
    orders: &OrderTable,
    flux: &dyn FluxCalibration,
    config: &SpectrifyConfig,
) -> Result<EventTable> {
    same_obs(&[&events.header, &orders.header])?;
    let instrument = Instrument::from_orders(orders)?;
    info!(
        "annotating {} {instrument} events against {} orders (trace location: {})",
        events.len(),
        orders.len(),
        config.traceloc
    );
    instrument
        .annotator(config)
        .annotate(events, orders, config.traceloc, flux)
}
