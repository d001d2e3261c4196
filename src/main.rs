use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use photon_spectrify::{
    load_events, load_orders, spectrify, write_events, x1d_epera_solution, SpectrifyConfig,
    TraceLocation,
};

/// Annotate the photon events of one exposure with order, wavelength,
/// cross-dispersion offset, energy per area and quality flag.
#[derive(Debug, Parser)]
#[command(name = "photon-spectrify", version)]
struct Args {
    /// Photon event table (.parquet).
    #[arg(long)]
    events: PathBuf,
    /// Order reference table (.json).
    #[arg(long)]
    orders: PathBuf,
    /// Output event table (.parquet).
    #[arg(long)]
    out: PathBuf,
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Trace location: default, median or lya.
    #[arg(long)]
    traceloc: Option<String>,
    /// Dequantization seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SpectrifyConfig::from_json_file(path)?,
        None => SpectrifyConfig::default(),
    };
    if let Some(traceloc) = &args.traceloc {
        config.traceloc = traceloc.parse::<TraceLocation>()?;
    }
    if let Some(seed) = args.seed {
        config.dequantize_seed = seed;
    }

    let events = load_events(&args.events)
        .with_context(|| format!("loading events from {}", args.events.display()))?;
    let orders = load_orders(&args.orders)
        .with_context(|| format!("loading orders from {}", args.orders.display()))?;
    let flux = x1d_epera_solution(&orders)?;

    let annotated = spectrify(&events, &orders, &flux, &config)?;
    write_events(&args.out, &annotated)?;
    info!("wrote {} annotated events to {}", annotated.len(), args.out.display());
    Ok(())
}
