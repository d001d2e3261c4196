//! Flux calibration: energy per unit area carried by one detected photon.

use crate::data::model::{OrderTable, SpectralOrder};
use crate::error::{Result, SpectrifyError};
use crate::interp::Interpolant;

/// Converts photon wavelengths into energy per unit detector area.
///
/// `order` holds, per photon, the row index of the order in the order table.
/// Without it every photon is calibrated against the first row.
pub trait FluxCalibration {
    fn energy_per_area(&self, wavelength: &[f64], order: Option<&[usize]>) -> Result<Vec<f64>>;
}

impl<F> FluxCalibration for F
where
    F: Fn(&[f64], Option<&[usize]>) -> Result<Vec<f64>>,
{
    fn energy_per_area(&self, wavelength: &[f64], order: Option<&[usize]>) -> Result<Vec<f64>> {
        self(wavelength, order)
    }
}

// ---------------------------------------------------------------------------
// X1dEperA – calibration derived from the extracted spectrum
// ---------------------------------------------------------------------------

/// Energy-per-area solution interpolated from each order's `flux` and `net`.
///
/// At every reference column `epera = flux * dλ / net`, where `dλ` is the
/// local wavelength step. Columns with zero net rate are undefined.
#[derive(Debug, Clone)]
pub struct X1dEperA {
    rows: Vec<Interpolant>,
}

/// Build the energy-per-area solution of an order table.
pub fn x1d_epera_solution(orders: &OrderTable) -> Result<X1dEperA> {
    let rows = orders
        .orders
        .iter()
        .enumerate()
        .map(|(i, order)| order_epera(order).map_err(|e| tag_row(i, e)))
        .collect::<Result<Vec<_>>>()?;
    Ok(X1dEperA { rows })
}

fn tag_row(row: usize, err: SpectrifyError) -> SpectrifyError {
    match err {
        SpectrifyError::Calibration(msg) => SpectrifyError::Calibration(format!("row {row}: {msg}")),
        other => other,
    }
}

fn order_epera(order: &SpectralOrder) -> Result<Interpolant> {
    let (Some(flux), Some(net)) = (&order.flux, &order.net) else {
        return Err(SpectrifyError::Calibration(
            "order has no flux/net profile".into(),
        ));
    };
    let wave = &order.wavelength;
    if flux.len() != wave.len() || net.len() != wave.len() || wave.len() < 2 {
        return Err(SpectrifyError::Calibration(format!(
            "profiles disagree: {} wavelengths, {} flux, {} net",
            wave.len(),
            flux.len(),
            net.len()
        )));
    }

    let dw = gradient(wave);
    let mut samples: Vec<(f64, f64)> = wave
        .iter()
        .zip(flux.iter().zip(net))
        .zip(&dw)
        .filter(|((w, _), _)| w.is_finite())
        .map(|((&w, (&f, &n)), &d)| {
            let epera = if n != 0.0 { f * d.abs() / n } else { f64::NAN };
            (w, epera)
        })
        .collect();
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));
    samples.dedup_by(|a, b| a.0 == b.0);

    let (grid, values) = samples.into_iter().unzip();
    Interpolant::linear(grid, values)
}

/// Central differences, one-sided at the ends.
fn gradient(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    (0..n)
        .map(|i| match i {
            0 => v[1] - v[0],
            i if i == n - 1 => v[n - 1] - v[n - 2],
            i => (v[i + 1] - v[i - 1]) / 2.0,
        })
        .collect()
}

impl FluxCalibration for X1dEperA {
    fn energy_per_area(&self, wavelength: &[f64], order: Option<&[usize]>) -> Result<Vec<f64>> {
        let Some(order) = order else {
            let row = self.rows.first().ok_or_else(|| {
                SpectrifyError::Calibration("order table has no rows".into())
            })?;
            return Ok(row.eval_many(wavelength));
        };
        if order.len() != wavelength.len() {
            return Err(SpectrifyError::Calibration(format!(
                "{} order indices for {} wavelengths",
                order.len(),
                wavelength.len()
            )));
        }
        wavelength
            .iter()
            .zip(order)
            .map(|(&w, &i)| {
                self.rows.get(i).map(|row| row.eval(w)).ok_or_else(|| {
                    SpectrifyError::Calibration(format!(
                        "order index {i} out of range ({} rows)",
                        self.rows.len()
                    ))
                })
            })
            .collect()
    }
}
