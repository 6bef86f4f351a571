//! Pixel-wise Pearson correlation between NDVI and burnt-area series,
//! after clipping every input to the study area and resampling onto the
//! CHIRPS grid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use landcover_core::config::CorrelationConfig;
use landcover_core::{correlation, logging};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pearson_correlation", about = "Correlate NDVI and burnt-area raster series pixel by pixel")]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder holding the MedianLST, MedianNDVI, MedianCHIRPS and BurntArea sub-folders
    #[arg(long)]
    data_folder: Option<PathBuf>,

    /// Study-area boundary (GeoJSON)
    #[arg(long)]
    boundary: Option<PathBuf>,

    /// Destination of clipped, resampled and correlation rasters
    #[arg(short, long)]
    output_folder: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => CorrelationConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => CorrelationConfig::default(),
    };
    if let Some(v) = args.data_folder {
        cfg.data_folder = v;
    }
    if let Some(v) = args.boundary {
        cfg.boundary_path = v;
    }
    if let Some(v) = args.output_folder {
        cfg.output_folder = v;
    }

    let out = correlation::run_correlation(&cfg)
        .with_context(|| format!("correlating rasters under {}", cfg.data_folder.display()))?;
    info!("Wrote {}", out.display());
    Ok(())
}
