//! Pixel-wise Pearson correlation between two raster time series.
//!
//! [`run_correlation`] clips every input series to the study area, resamples
//! them onto the grid of the first clipped precipitation raster and
//! correlates the NDVI and burnt-area stacks through time.
pub mod preprocess;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::CorrelationConfig;
use crate::error::{Error, Result};
use crate::raster::{geotiff, Raster};
use crate::stats::pearson_r;
use preprocess::{clip_raster_to_shape, resample_to_target};

#[cfg(feature = "threading")]
use rayon::prelude::*;

/// Pearson r of one pixel's paired finite samples; NaN when fewer than two
/// pairs remain or either side is constant.
fn pixel_r(a: &[Raster<f32>], b: &[Raster<f32>], idx: usize) -> f32 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .map(|(ra, rb)| (ra.data[idx] as f64, rb.data[idx] as f64))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();
    pearson_r(&xs, &ys).map_or(f32::NAN, |r| r as f32)
}

/// Correlate two equally long stacks of rasters on a common grid.
pub fn pixelwise_pearson(a: &[Raster<f32>], b: &[Raster<f32>]) -> Result<Raster<f32>> {
    if a.len() != b.len() {
        return Err(Error::GridMismatch(format!("stack lengths differ: {} vs {}", a.len(), b.len())));
    }
    let first = a.first().ok_or_else(|| Error::GridMismatch("empty raster stack".into()))?;
    if let Some(i) = a.iter().chain(b).position(|r| !r.same_grid(first)) {
        return Err(Error::GridMismatch(format!("layer {i} is not on the reference grid")));
    }

    let n = first.width * first.height;
    #[cfg(feature = "threading")]
    let data: Vec<f32> = (0..n).into_par_iter().map(|idx| pixel_r(a, b, idx)).collect();
    #[cfg(not(feature = "threading"))]
    let data: Vec<f32> = (0..n).map(|idx| pixel_r(a, b, idx)).collect();

    Ok(Raster { data, width: first.width, height: first.height, transform: first.transform, crs: first.crs, nodata: None })
}

/// `.tif` files directly inside `dir`, sorted by path.
pub fn list_tifs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "tif"))
        .collect();
    files.sort();
    Ok(files)
}

fn prefixed(out_dir: &Path, prefix: &str, file: &Path) -> PathBuf {
    let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    out_dir.join(format!("{prefix}{name}"))
}

fn clip_all(files: &[PathBuf], config: &CorrelationConfig) -> Result<Vec<PathBuf>> {
    files
        .iter()
        .map(|f| clip_raster_to_shape(f, &config.boundary_path, &prefixed(&config.output_folder, "clipped_", f)))
        .collect()
}

fn resample_all(files: &[PathBuf], target: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    files.iter().map(|f| resample_to_target(f, target, &prefixed(out_dir, "resampled_", f))).collect()
}

fn read_stack(files: &[PathBuf]) -> Result<Vec<Raster<f32>>> {
    files.iter().map(|f| geotiff::read_f32(f)).collect()
}

/// Run the full clip → resample → correlate pipeline and return the path of
/// the correlation raster.
pub fn run_correlation(config: &CorrelationConfig) -> Result<PathBuf> {
    fs::create_dir_all(&config.output_folder)?;
    let series = |sub: &str| list_tifs(&config.data_folder.join(sub));
    let lst = series(&config.lst_subdir)?;
    let ndvi = series(&config.ndvi_subdir)?;
    let chirps = series(&config.chirps_subdir)?;
    let burnt = series(&config.burnt_subdir)?;
    info!("Inputs: {} LST, {} NDVI, {} CHIRPS, {} burnt-area rasters", lst.len(), ndvi.len(), chirps.len(), burnt.len());

    info!("Clipping rasters to {}", config.boundary_path.display());
    let clipped_lst = clip_all(&lst, config)?;
    let clipped_ndvi = clip_all(&ndvi, config)?;
    let clipped_chirps = clip_all(&chirps, config)?;
    let clipped_burnt = clip_all(&burnt, config)?;

    let reference = clipped_chirps.first().ok_or_else(|| {
        Error::Other(format!("no .tif files in {}", config.data_folder.join(&config.chirps_subdir).display()))
    })?;
    info!("Resampling onto {}", reference.display());
    let resampled_lst = resample_all(&clipped_lst, reference, &config.output_folder)?;
    let resampled_ndvi = resample_all(&clipped_ndvi, reference, &config.output_folder)?;
    let resampled_burnt = resample_all(&clipped_burnt, reference, &config.output_folder)?;
    debug!("{} LST rasters resampled", resampled_lst.len());

    let ndvi_stack = read_stack(&resampled_ndvi)?;
    let burnt_stack = read_stack(&resampled_burnt)?;
    let pearson = pixelwise_pearson(&ndvi_stack, &burnt_stack)?;

    let out = config.output_folder.join(&config.output_name);
    geotiff::write_f32(&pearson, &out)?;
    info!("Pearson correlation saved to {}", out.display());
    Ok(out)
}
