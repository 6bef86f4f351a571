//! Land-cover area extraction, trend statistics and trend plotting over
//! annual classified rasters, plus a pixel-wise raster correlation pipeline.
//!
//! The trend pipeline runs three stages in order:
//! [`extract::extract_landcover_area`] → [`trend::perform_trend_analysis`]
//! and [`plot::generate_plots`], all driven by one [`config::TrendConfig`].
pub mod boundary;
pub mod classes;
pub mod config;
pub mod correlation;
pub mod error;
pub mod extract;
pub mod logging;
pub mod mask;
pub mod plot;
pub mod raster;
pub mod stats;
pub mod table;
pub mod trend;

pub use error::{Error, Result};
