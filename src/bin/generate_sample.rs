use std::path::Path;

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use photon_spectrify::{
    write_events, write_orders, Column, EventTable, Header, MetadataValue, OrderTable,
    SpectralOrder,
};

const ROOTNAME: &str = "o5sample01";
/// Reference (x1d) grid.
const NX_REF: usize = 1024;
const NY_REF: usize = 1024;
/// Event (TIME-TAG) grid, twice as fine.
const NX_TAG: usize = 2048;
const NY_TAG: usize = 2048;

/// Box-Muller transform for normal distribution
fn gauss(rng: &mut impl Rng, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(1e-15);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn reference_order() -> SpectralOrder {
    let columns = 0..NX_REF;
    SpectralOrder {
        sporder: 1,
        segment: None,
        extrlocy: columns.clone().map(|k| 500.0 + 0.01 * k as f64).collect(),
        wavelength: columns.clone().map(|k| 1140.0 + 0.58 * k as f64).collect(),
        dq: Some(
            columns
                .clone()
                .map(|k| if (600..604).contains(&k) { 16 } else { 0 })
                .collect(),
        ),
        flux: Some(columns.clone().map(|_| 2.0e-14).collect()),
        net: Some(columns.map(|k| 1.0 + (k as f64 / 200.0).sin().abs()).collect()),
    }
}

fn main() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let order = reference_order();

    let mut time = Vec::new();
    let mut axis1 = Vec::new();
    let mut axis2 = Vec::new();

    let mut tick: i64 = 0;
    let mut emit = |x: f64, y: f64, rng: &mut ChaCha8Rng| {
        tick += 1 + rng.gen_range(0..16);
        time.push(Some(tick));
        axis1.push(Some(x.round().clamp(0.0, NX_TAG as f64 - 1.0) as i64));
        axis2.push(Some(y.round().clamp(0.0, NY_TAG as f64 - 1.0) as i64));
    };

    // Source continuum along the trace
    for _ in 0..50_000 {
        let x = rng.gen::<f64>() * NX_TAG as f64;
        let k = ((x / 2.0) as usize).min(NX_REF - 1);
        let y = gauss(&mut rng, 2.0 * order.extrlocy[k], 3.0);
        emit(x, y, &mut rng);
    }
    // Lyman-alpha airglow filling the slit
    let lya_col = order
        .wavelength
        .iter()
        .position(|&w| w >= 1215.67)
        .unwrap_or(0);
    for _ in 0..10_000 {
        let x = gauss(&mut rng, 2.0 * lya_col as f64 + 1.0, 2.0);
        let y = 2.0 * order.extrlocy[lya_col] + (rng.gen::<f64>() - 0.5) * 200.0;
        emit(x, y, &mut rng);
    }
    // Detector background
    for _ in 0..5_000 {
        let x = rng.gen::<f64>() * NX_TAG as f64;
        let y = rng.gen::<f64>() * NY_TAG as f64;
        emit(x, y, &mut rng);
    }

    let n_events = time.len();
    let events = EventTable::new(
        Header::new()
            .with("ROOTNAME", MetadataValue::String(ROOTNAME.into()))
            .with("TSCAL1", MetadataValue::Float(0.125))
            .with("AXLEN1", MetadataValue::Integer(NX_TAG as i64))
            .with("AXLEN2", MetadataValue::Integer(NY_TAG as i64)),
    )
    .with_column("time", Column::Int(time))?
    .with_column("axis1", Column::Int(axis1))?
    .with_column("axis2", Column::Int(axis2))?;

    let orders = OrderTable {
        header: Header::new()
            .with("ROOTNAME", MetadataValue::String(ROOTNAME.into()))
            .with("INSTRUME", MetadataValue::String("STIS".into()))
            .with("SIZAXIS1", MetadataValue::Integer(NX_REF as i64))
            .with("SIZAXIS2", MetadataValue::Integer(NY_REF as i64)),
        orders: vec![order],
    };

    let events_path = Path::new("sample_tag.parquet");
    let orders_path = Path::new("sample_x1d.json");
    write_events(events_path, &events)?;
    write_orders(orders_path, &orders)?;

    println!(
        "Wrote {n_events} events to {} and {} order to {}",
        events_path.display(),
        orders.len(),
        orders_path.display()
    );
    Ok(())
}
