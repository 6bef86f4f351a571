//! In-memory single-band rasters with a north-up geotransform.
pub mod crs;
pub mod geotiff;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
pub use crs::Crs;

/// Affine pixel → world mapping without rotation terms.
///
/// World `(x, y)` of the top-left corner of pixel `(row, col)` is
/// `(origin_x + col * pixel_width, origin_y + row * pixel_height)`;
/// `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// World coordinate of the centre of pixel `(row, col)`.
    #[inline]
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional `(col, row)` of a world coordinate.
    #[inline]
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.origin_x) / self.pixel_width, (y - self.origin_y) / self.pixel_height)
    }

    /// Transform of the window whose top-left pixel is `(row0, col0)`.
    pub fn shifted(&self, row0: usize, col0: usize) -> Self {
        Self {
            origin_x: self.origin_x + col0 as f64 * self.pixel_width,
            origin_y: self.origin_y + row0 as f64 * self.pixel_height,
            ..*self
        }
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Pixel window `[row0, row0 + rows) × [col0, col0 + cols)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row0: usize,
    pub col0: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// A row-major single-band raster (row 0 = north edge).
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Option<Crs>,
    /// Declared nodata value, as stored in the file.
    pub nodata: Option<f64>,
}

impl<T: Copy> Raster<T> {
    /// Create a raster filled with `fill`.
    pub fn new(width: usize, height: usize, transform: GeoTransform, fill: T) -> Self {
        Self { data: vec![fill; width * height], width, height, transform, crs: None, nodata: None }
    }

    pub fn from_vec(data: Vec<T>, width: usize, height: usize, transform: GeoTransform) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::InvalidDimensions { width, height, len: data.len() });
        }
        Ok(Self { data, width, height, transform, crs: None, nodata: None })
    }

    pub fn with_crs(mut self, crs: Option<Crs>) -> Self {
        self.crs = crs;
        self
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.width + col] = val;
    }

    /// Value at world `(x, y)`, nearest pixel; `None` outside the extent.
    pub fn sample_nearest(&self, x: f64, y: f64) -> Option<T> {
        let (fc, fr) = self.transform.world_to_pixel(x, y);
        if fc < 0.0 || fr < 0.0 {
            return None;
        }
        let (col, row) = (fc.floor() as usize, fr.floor() as usize);
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.get(row, col))
    }

    /// Smallest pixel window covering the world rectangle, clamped to the
    /// raster. Empty when the rectangle lies outside.
    pub fn window_for_bounds(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Window {
        let (c_a, r_a) = self.transform.world_to_pixel(min_x, max_y);
        let (c_b, r_b) = self.transform.world_to_pixel(max_x, min_y);
        let clamp = |v: f64, hi: usize| -> usize { v.max(0.0).min(hi as f64) as usize };

        let col0 = clamp(c_a.min(c_b).floor(), self.width);
        let col1 = clamp(c_a.max(c_b).ceil(), self.width);
        let row0 = clamp(r_a.min(r_b).floor(), self.height);
        let row1 = clamp(r_a.max(r_b).ceil(), self.height);

        Window { row0, col0, rows: row1 - row0, cols: col1 - col0 }
    }

    /// Copy out a sub-window, keeping georeferencing consistent.
    pub fn crop(&self, window: Window) -> Raster<T> {
        let mut data = Vec::with_capacity(window.rows * window.cols);
        for r in window.row0..window.row0 + window.rows {
            let start = r * self.width + window.col0;
            data.extend_from_slice(&self.data[start..start + window.cols]);
        }
        Raster {
            data,
            width: window.cols,
            height: window.rows,
            transform: self.transform.shifted(window.row0, window.col0),
            crs: self.crs,
            nodata: self.nodata,
        }
    }

    /// True when both rasters share size and geotransform.
    pub fn same_grid<U>(&self, other: &Raster<U>) -> bool {
        self.width == other.width && self.height == other.height && self.transform == other.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: usize, height: usize) -> Raster<u8> {
        let data = (0..width * height).map(|i| i as u8).collect();
        Raster::from_vec(data, width, height, GeoTransform::new(100.0, 50.0, 10.0, -10.0)).unwrap()
    }

    #[test]
    fn from_vec_rejects_bad_length() {
        let err = Raster::from_vec(vec![0u8; 5], 2, 3, GeoTransform::default());
        assert!(matches!(err, Err(Error::InvalidDimensions { .. })));
    }

    #[test]
    fn pixel_center_and_inverse() {
        let r = grid(4, 3);
        assert_eq!(r.transform.pixel_center(0, 0), (105.0, 45.0));
        assert_eq!(r.transform.pixel_center(2, 3), (135.0, 25.0));
        assert_eq!(r.sample_nearest(135.0, 25.0), Some(11));
        assert_eq!(r.sample_nearest(99.0, 45.0), None);
        assert_eq!(r.sample_nearest(145.0, 45.0), None);
    }

    #[test]
    fn window_and_crop_keep_georeference() {
        let r = grid(4, 3);
        let w = r.window_for_bounds(112.0, 25.0, 128.0, 38.0);
        assert_eq!(w, Window { row0: 1, col0: 1, rows: 2, cols: 2 });
        let c = r.crop(w);
        assert_eq!(c.data, vec![5, 6, 9, 10]);
        assert_eq!(c.transform.origin_x, 110.0);
        assert_eq!(c.transform.origin_y, 40.0);
        assert_eq!(c.transform.pixel_center(0, 0), r.transform.pixel_center(1, 1));
    }

    #[test]
    fn window_outside_is_empty() {
        let r = grid(4, 3);
        assert!(r.window_for_bounds(500.0, 500.0, 600.0, 600.0).is_empty());
        assert_eq!(r.window_for_bounds(100.0, 20.0, 140.0, 50.0), Window { row0: 0, col0: 0, rows: 3, cols: 4 });
    }
}
