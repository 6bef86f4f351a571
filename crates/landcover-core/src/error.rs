use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the land-cover and correlation pipelines.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported pixel type in {path}: {kind}")]
    UnsupportedPixelType { path: PathBuf, kind: String },

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid raster dimensions: {width}x{height} with {len} values")]
    InvalidDimensions { width: usize, height: usize, len: usize },

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    #[error("Missing column {0:?} in area table")]
    MissingColumn(String),

    #[error("No raster found for any year in {first}..={last} under {dir}")]
    NoReferenceRaster { dir: PathBuf, first: i32, last: i32 },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
