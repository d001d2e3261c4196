//! Per-order interpolants over the event-table pixel grid.
//!
//! An order's trace, wavelength and quality profiles are sampled once per
//! reference-grid column. The event table uses a (possibly finer) detector
//! grid, so the reference columns are placed at their pixel centres on the
//! event grid and interpolated from there.
//!
//! Queries outside `[min(grid), max(grid)]` evaluate to `NaN`. There is no
//! extrapolation.

use crate::data::model::SpectralOrder;
use crate::error::{Result, SpectrifyError};

/// How values between grid points are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpMode {
    /// Piecewise linear, for continuous profiles.
    Linear,
    /// Nearest grid point, for categorical profiles. Ties go to the lower point.
    Nearest,
}

/// A sampled profile that can be evaluated at arbitrary pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolant {
    grid: Vec<f64>,
    values: Vec<f64>,
    mode: InterpMode,
}

impl Interpolant {
    /// Build an interpolant. `grid` must be strictly increasing.
    pub fn new(grid: Vec<f64>, values: Vec<f64>, mode: InterpMode) -> Result<Self> {
        if grid.len() != values.len() || grid.is_empty() {
            return Err(SpectrifyError::ProfileLength {
                grid: grid.len(),
                values: values.len(),
            });
        }
        if grid.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SpectrifyError::NumericDegeneracy(
                "interpolation grid is not strictly increasing".into(),
            ));
        }
        Ok(Self { grid, values, mode })
    }

    pub fn linear(grid: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        Self::new(grid, values, InterpMode::Linear)
    }

    pub fn nearest(grid: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        Self::new(grid, values, InterpMode::Nearest)
    }

    /// Sampled domain `(min, max)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.grid[0], self.grid[self.grid.len() - 1])
    }

    pub fn contains(&self, x: f64) -> bool {
        let (lo, hi) = self.domain();
        x >= lo && x <= hi
    }

    /// Evaluate at `x`; `NaN` outside the sampled domain or for a `NaN` query.
    pub fn eval(&self, x: f64) -> f64 {
        if !self.contains(x) {
            return f64::NAN;
        }
        // First grid index with grid[i] >= x; contains() guarantees one exists.
        let hi = self.grid.partition_point(|&g| g < x);
        if hi == 0 || self.grid[hi] == x {
            return self.values[hi];
        }
        let lo = hi - 1;
        let (x0, x1) = (self.grid[lo], self.grid[hi]);
        match self.mode {
            InterpMode::Linear => {
                let t = (x - x0) / (x1 - x0);
                self.values[lo] + t * (self.values[hi] - self.values[lo])
            }
            InterpMode::Nearest => {
                if x - x0 <= x1 - x {
                    self.values[lo]
                } else {
                    self.values[hi]
                }
            }
        }
    }

    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}

// ---------------------------------------------------------------------------
// PixelGrid – reference columns placed on the event-table grid
// ---------------------------------------------------------------------------

/// Mapping between the calibration-reference sampling and the event grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    /// Event-grid x coordinate of every reference column centre.
    pub x: Vec<f64>,
    /// Event pixels per reference pixel, vertically.
    pub y_scale: f64,
}

impl PixelGrid {
    /// Reference columns of width `f = nx_events / nx_ref` event pixels,
    /// with 1-based pixel centres: `x_k = 1 + f/2 + k f`.
    pub fn rescaled(nx_events: usize, ny_events: usize, nx_ref: usize, ny_ref: usize) -> Self {
        let xfac = nx_events as f64 / nx_ref as f64;
        let x = (0..nx_ref)
            .map(|k| 1.0 + xfac / 2.0 + k as f64 * xfac)
            .collect();
        Self {
            x,
            y_scale: ny_events as f64 / ny_ref as f64,
        }
    }

    /// Grid given explicitly, with no vertical rescaling.
    pub fn explicit(x: Vec<f64>) -> Self {
        Self { x, y_scale: 1.0 }
    }
}

/// Trace, wavelength and quality interpolants of one order.
#[derive(Debug, Clone)]
pub struct OrderInterpolants {
    pub sporder: i64,
    pub trace: Interpolant,
    pub wavelength: Interpolant,
    pub dq: Option<Interpolant>,
}

impl OrderInterpolants {
    /// Build all profile interpolants of `order` over `grid`.
    ///
    /// The trace profile is scaled to the event grid's vertical sampling.
    pub fn build(order: &SpectralOrder, grid: &PixelGrid) -> Result<Self> {
        let trace = order.extrlocy.iter().map(|y| y * grid.y_scale).collect();
        let dq = match &order.dq {
            Some(dq) => Some(Interpolant::nearest(
                grid.x.clone(),
                dq.iter().map(|&v| v as f64).collect(),
            )?),
            None => None,
        };
        Ok(Self {
            sporder: order.sporder,
            trace: Interpolant::linear(grid.x.clone(), trace)?,
            wavelength: Interpolant::linear(grid.x.clone(), order.wavelength.clone())?,
            dq,
        })
    }

    /// Quality flag at `x`; `None` outside the domain or without a dq profile.
    pub fn dq_at(&self, x: f64) -> Option<i64> {
        let v = self.dq.as_ref()?.eval(x);
        v.is_finite().then_some(v as i64)
    }
}

/// Build interpolants for every order of an exposure.
pub fn build_order_interpolants(
    orders: &[SpectralOrder],
    grid: &PixelGrid,
) -> Result<Vec<OrderInterpolants>> {
    orders
        .iter()
        .map(|order| OrderInterpolants::build(order, grid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_interpolates_between_points() {
        let f = Interpolant::linear(vec![0.0, 10.0, 20.0], vec![0.0, 100.0, 50.0]).unwrap();
        assert_relative_eq!(f.eval(5.0), 50.0);
        assert_relative_eq!(f.eval(15.0), 75.0);
        assert_relative_eq!(f.eval(20.0), 50.0);
        assert_relative_eq!(f.eval(0.0), 0.0);
    }

    #[test]
    fn no_extrapolation() {
        let lin = Interpolant::linear(vec![1.0, 2.0], vec![5.0, 6.0]).unwrap();
        let near = Interpolant::nearest(vec![1.0, 2.0], vec![5.0, 6.0]).unwrap();
        for x in [0.999, 2.001, f64::NAN, f64::INFINITY] {
            assert!(lin.eval(x).is_nan());
            assert!(near.eval(x).is_nan());
        }
    }

    #[test]
    fn nearest_picks_closest_and_breaks_ties_low() {
        let f = Interpolant::nearest(vec![0.0, 2.0, 4.0], vec![0.0, 16.0, 4.0]).unwrap();
        assert_eq!(f.eval(0.9), 0.0);
        assert_eq!(f.eval(1.0), 0.0);
        assert_eq!(f.eval(1.1), 16.0);
        assert_eq!(f.eval(3.5), 4.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = Interpolant::linear(vec![0.0, 1.0], vec![0.0]).unwrap_err();
        assert!(matches!(err, SpectrifyError::ProfileLength { grid: 2, values: 1 }));
    }

    #[test]
    fn non_monotonic_grid_is_rejected() {
        assert!(Interpolant::linear(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn rescaled_grid_centres_reference_columns() {
        let grid = PixelGrid::rescaled(2048, 2048, 1024, 1024);
        assert_eq!(grid.x.len(), 1024);
        assert_relative_eq!(grid.x[0], 2.0);
        assert_relative_eq!(grid.x[1], 4.0);
        assert_relative_eq!(grid.x[1023], 2048.0);
        assert_relative_eq!(grid.y_scale, 2.0);
    }

    #[test]
    fn order_trace_is_scaled_to_event_grid() {
        let order = SpectralOrder {
            sporder: 1,
            segment: None,
            extrlocy: vec![10.0, 10.0, 10.0],
            wavelength: vec![1.0, 2.0, 3.0],
            dq: Some(vec![0, 4, 0]),
            flux: None,
            net: None,
        };
        let grid = PixelGrid {
            x: vec![0.0, 1.0, 2.0],
            y_scale: 2.0,
        };
        let interp = OrderInterpolants::build(&order, &grid).unwrap();
        assert_relative_eq!(interp.trace.eval(1.5), 20.0);
        assert_eq!(interp.dq_at(1.2), Some(4));
        assert_eq!(interp.dq_at(5.0), None);
    }
}
