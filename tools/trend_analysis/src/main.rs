//! Land-cover trend pipeline: area extraction, Mann-Kendall / Sen's slope
//! summary and per-region trend charts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use landcover_core::config::TrendConfig;
use landcover_core::table::AreaTable;
use landcover_core::{extract, logging, plot, trend};
use tracing::info;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "trend_analysis",
    about = "Extract yearly land-cover areas per region, test for trends and plot the selected classes"
)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of LC_Type3_500m_{year}.tif rasters (outputs are written here too)
    #[arg(long)]
    raster_dir: Option<PathBuf>,

    /// Region boundaries (GeoJSON FeatureCollection)
    #[arg(long)]
    boundary: Option<PathBuf>,

    /// Feature property holding the region name
    #[arg(long)]
    name_field: Option<String>,

    #[arg(long)]
    first_year: Option<i32>,

    #[arg(long)]
    last_year: Option<i32>,

    /// Reuse an existing area summary CSV instead of reading the rasters
    #[arg(long)]
    from_table: Option<PathBuf>,

    /// Stop after the trend table
    #[arg(long)]
    no_plots: bool,
}

impl Args {
    fn into_config(self) -> Result<(TrendConfig, Option<PathBuf>, bool)> {
        let mut cfg = match &self.config {
            Some(path) => TrendConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
            None => TrendConfig::default(),
        };
        if let Some(v) = self.raster_dir {
            cfg.raster_dir = v;
        }
        if let Some(v) = self.boundary {
            cfg.boundary_path = v;
        }
        if let Some(v) = self.name_field {
            cfg.name_field = v;
        }
        if let Some(v) = self.first_year {
            cfg.first_year = v;
        }
        if let Some(v) = self.last_year {
            cfg.last_year = v;
        }
        anyhow::ensure!(
            cfg.first_year <= cfg.last_year,
            "first year {} is after last year {}",
            cfg.first_year,
            cfg.last_year
        );
        Ok((cfg, self.from_table, !self.no_plots))
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    logging::init();
    let (cfg, from_table, plots) = Args::parse().into_config()?;

    let table = match from_table {
        Some(path) => {
            info!("Loading area data from {}", path.display());
            AreaTable::read_csv(&path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let table = extract::extract_landcover_area(&cfg).context("extracting land cover area")?;
            let out = cfg.area_output_path();
            table.write_csv(&out).with_context(|| format!("writing {}", out.display()))?;
            info!("Area data saved to {}", out.display());
            table
        }
    };

    let trends = trend::perform_trend_analysis(&table);
    let out = cfg.trend_output_path();
    trend::write_trend_csv(&trends, &out).with_context(|| format!("writing {}", out.display()))?;

    if plots {
        let written = plot::generate_plots(&table, &cfg).context("generating plots")?;
        info!("{} plot(s) written to {}", written.len(), cfg.plot_dir().display());
    }

    let significant = trends.iter().filter(|t| !t.significance.is_empty()).count();
    info!(
        "Done: {} area rows, {} trend rows ({} significant at 5%)",
        table.len(),
        trends.len(),
        significant
    );
    Ok(())
}
