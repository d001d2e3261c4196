//! # photon-spectrify
//!
//! Spectral annotation of time-tagged photon events recorded by the COS and
//! STIS spectrographs.
//!
//! Every photon of an exposure is given the spectral order it most likely
//! belongs to, its wavelength, its cross-dispersion offset from that order's
//! trace, the energy per unit area it carries and a data-quality flag. The
//! annotation is positional: the output table has exactly the rows of the
//! input, in the same order, plus the new columns.
//!
//! ```no_run
//! use std::path::Path;
//! use photon_spectrify::{load_events, load_orders, spectrify, x1d_epera_solution, SpectrifyConfig};
//!
//! let events = load_events(Path::new("o5ko01010_tag.parquet")).unwrap();
//! let orders = load_orders(Path::new("o5ko01010_x1d.json")).unwrap();
//! let flux = x1d_epera_solution(&orders).unwrap();
//! let annotated = spectrify(&events, &orders, &flux, &SpectrifyConfig::default()).unwrap();
//! assert_eq!(annotated.len(), events.len());
//! ```
//!
//! Cross-dispersion offsets are measured from the reference trace by default.
//! For single-trace exposures the trace can instead be located from the
//! photons, either with a binned-median linear trend or from the centroid of
//! the Lyman-alpha airglow line (see [`TraceLocation`]).

pub mod annotate;
pub mod config;
pub mod data;
pub mod error;
pub mod flux;
pub mod interp;
pub mod stats;
pub mod trace;

pub use annotate::{spectrify, Annotator, CosAnnotator, Instrument, StisAnnotator};
pub use config::SpectrifyConfig;
pub use data::consistency::same_obs;
pub use data::loader::{load_events, load_orders, write_events, write_orders};
pub use data::model::{Column, EventTable, Header, MetadataValue, OrderTable, SpectralOrder};
pub use data::table::append_cols;
pub use error::{Result, SpectrifyError};
pub use flux::{x1d_epera_solution, FluxCalibration, X1dEperA};
pub use interp::{InterpMode, Interpolant, OrderInterpolants, PixelGrid};
pub use trace::{CentroidConfig, TraceLocation};
