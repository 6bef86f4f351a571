//! Clipping and resampling of continuous rasters ahead of the correlation.
use std::path::{Path, PathBuf};

use geo::MultiPolygon;
use tracing::debug;

use crate::boundary::load_regions;
use crate::error::Result;
use crate::mask::mask;
use crate::raster::{geotiff, Raster};

/// Crop `raster` to the geometry's bounding window and set every pixel whose
/// centre falls outside the geometry to NaN.
pub fn clip_raster(raster: &Raster<f32>, geometry: &MultiPolygon<f64>) -> Result<Raster<f32>> {
    Ok(mask(raster, geometry)?.fill_outside(f32::NAN))
}

/// Nearest-neighbour resample of `src` onto `target`'s grid (size,
/// geotransform and CRS). Target pixels that fall outside `src` are NaN.
pub fn resample_nearest<U>(src: &Raster<f32>, target: &Raster<U>) -> Raster<f32> {
    let reproject = match (target.crs, src.crs) {
        (Some(to), Some(from)) if to != from => Some((to, from)),
        _ => None,
    };

    let mut out = Raster {
        data: vec![f32::NAN; target.width * target.height],
        width: target.width,
        height: target.height,
        transform: target.transform,
        crs: target.crs.or(src.crs),
        nodata: None,
    };
    for row in 0..out.height {
        for col in 0..out.width {
            let (mut x, mut y) = out.transform.pixel_center(row, col);
            if let Some((to, from)) = reproject {
                (x, y) = to.transform(&from, x, y);
            }
            if let Some(v) = src.sample_nearest(x, y) {
                out.set(row, col, v);
            }
        }
    }
    out
}

/// Clip the raster at `src` to the union of the polygons in the GeoJSON
/// `boundary`, write it to `dst` and return `dst`.
pub fn clip_raster_to_shape(src: &Path, boundary: &Path, dst: &Path) -> Result<PathBuf> {
    let raster = geotiff::read_f32(src)?;
    let boundaries = load_regions(boundary, "name")?;
    let boundaries = match raster.crs {
        Some(crs) => boundaries.to_crs(&crs),
        None => boundaries,
    };
    let clipped = clip_raster(&raster, &boundaries.combined())?;
    debug!("Clipped {} to {}×{}", src.display(), clipped.width, clipped.height);
    geotiff::write_f32(&clipped, dst)?;
    Ok(dst.to_path_buf())
}

/// Resample the raster at `src` onto the grid of the raster at `target`,
/// write it to `dst` and return `dst`.
pub fn resample_to_target(src: &Path, target: &Path, dst: &Path) -> Result<PathBuf> {
    let source = geotiff::read_f32(src)?;
    let meta = geotiff::read_meta_from(target)?;
    let grid = Raster::new(meta.width, meta.height, meta.transform, 0u8).with_crs(meta.crs);
    let resampled = resample_nearest(&source, &grid);
    debug!("Resampled {} onto {}", src.display(), target.display());
    geotiff::write_f32(&resampled, dst)?;
    Ok(dst.to_path_buf())
}
