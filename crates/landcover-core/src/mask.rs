//! Polygon masking of rasters.
//!
//! A pixel belongs to the mask when its centre lies inside the geometry. The
//! result is cropped to the geometry's bounding window.
use std::collections::BTreeMap;

use geo::{BoundingRect, Contains, MultiPolygon, Point};

use crate::error::{Error, Result};
use crate::raster::Raster;

/// A raster window clipped to a polygon, with per-pixel membership.
#[derive(Debug, Clone)]
pub struct Masked<T> {
    pub raster: Raster<T>,
    /// Row-major, same shape as `raster`; true where the pixel centre is inside.
    pub inside: Vec<bool>,
}

impl<T: Copy> Masked<T> {
    /// Values of the pixels inside the geometry.
    pub fn values(&self) -> impl Iterator<Item = T> + '_ {
        self.raster.data.iter().zip(&self.inside).filter(|(_, &inside)| inside).map(|(&v, _)| v)
    }

    /// The cropped raster with every outside pixel replaced by `fill`.
    pub fn fill_outside(mut self, fill: T) -> Raster<T> {
        for (v, &inside) in self.raster.data.iter_mut().zip(&self.inside) {
            if !inside {
                *v = fill;
            }
        }
        self.raster
    }
}

/// Clip `raster` to `geometry`, which must already be in the raster's CRS.
///
/// Fails when the geometry is empty or does not overlap the raster extent.
pub fn mask<T: Copy>(raster: &Raster<T>, geometry: &MultiPolygon<f64>) -> Result<Masked<T>> {
    let rect = geometry
        .bounding_rect()
        .ok_or_else(|| Error::InvalidGeometry("empty geometry".into()))?;
    let window = raster.window_for_bounds(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    if window.is_empty() {
        return Err(Error::InvalidGeometry("input shapes do not overlap raster".into()));
    }

    let cropped = raster.crop(window);
    let mut inside = Vec::with_capacity(cropped.data.len());
    for row in 0..cropped.height {
        for col in 0..cropped.width {
            let (x, y) = cropped.transform.pixel_center(row, col);
            inside.push(geometry.contains(&Point::new(x, y)));
        }
    }
    Ok(Masked { raster: cropped, inside })
}

/// Frequency of each pixel value inside the mask, skipping `excluded` values.
pub fn value_counts(masked: &Masked<u8>, excluded: &[u8]) -> BTreeMap<u8, u64> {
    let mut counts = [0u64; 256];
    for v in masked.values() {
        counts[v as usize] += 1;
    }
    counts
        .iter()
        .enumerate()
        .filter(|&(v, &n)| n > 0 && !excluded.contains(&(v as u8)))
        .map(|(v, &n)| (v as u8, n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use geo::{LineString, Polygon};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        let ring = LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]);
        MultiPolygon::new(vec![Polygon::new(ring, vec![])])
    }

    /// 6×6 raster of 1 m pixels with origin (0, 6); value = row.
    fn rows_raster() -> Raster<u8> {
        let data = (0..36).map(|i| (i / 6) as u8).collect();
        Raster::from_vec(data, 6, 6, GeoTransform::new(0.0, 6.0, 1.0, -1.0)).unwrap()
    }

    #[test]
    fn mask_crops_to_bounding_window() {
        let m = mask(&rows_raster(), &square(1.0, 1.0, 4.0, 3.0)).unwrap();
        assert_eq!((m.raster.width, m.raster.height), (3, 2));
        assert!(m.inside.iter().all(|&b| b));
        let vals: Vec<u8> = m.values().collect();
        assert_eq!(vals, vec![3, 3, 3, 4, 4, 4]);
    }

    #[test]
    fn centre_rule_excludes_partial_pixels() {
        // Right triangle whose hypotenuse cuts through the lower-left 3×3 block.
        let ring = LineString::from(vec![(0.0, 0.0), (2.2, 0.0), (0.0, 2.2), (0.0, 0.0)]);
        let tri = MultiPolygon::new(vec![Polygon::new(ring, vec![])]);
        let m = mask(&rows_raster(), &tri).unwrap();
        assert_eq!(m.inside.iter().filter(|&&b| b).count(), 3);
        let filled = m.fill_outside(255);
        assert_eq!(filled.data, vec![255, 255, 255, 4, 255, 255, 5, 5, 255]);
    }

    #[test]
    fn disjoint_geometry_is_an_error() {
        assert!(mask(&rows_raster(), &square(100.0, 100.0, 110.0, 110.0)).is_err());
    }

    #[test]
    fn value_counts_skip_excluded() {
        let mut r = rows_raster();
        r.set(1, 1, 255);
        let m = mask(&r, &square(0.0, 0.0, 6.0, 6.0)).unwrap();
        let counts = value_counts(&m, &[255]);
        assert_eq!(counts.get(&1), Some(&5));
        assert_eq!(counts.get(&4), Some(&6));
        assert_eq!(counts.get(&255), None);
        assert_eq!(counts.values().sum::<u64>(), 35);
    }
}
