//! Coordinate reference systems and pure-Rust point reprojection.
//!
//! Every supported CRS converts to and from WGS84 geographic coordinates, so
//! any pair can be bridged through lon/lat. UTM uses Snyder (1987) series
//! formulas on the WGS84 ellipsoid; Web Mercator and sinusoidal are spherical.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Authalic sphere radius of the MODIS sinusoidal grid.
pub const MODIS_SPHERE_RADIUS: f64 = 6_371_007.181;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Crs {
    /// EPSG:4326, x = longitude, y = latitude (degrees).
    Wgs84,
    /// EPSG:3857.
    WebMercator,
    /// EPSG:326xx (north) / 327xx (south).
    Utm { zone: u32, north: bool },
    /// Spherical sinusoidal (the MODIS tile grid uses this).
    Sinusoidal {
        radius: f64,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
    },
}

impl Crs {
    pub fn modis_sinusoidal() -> Self {
        Crs::Sinusoidal {
            radius: MODIS_SPHERE_RADIUS,
            central_meridian: 0.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }

    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 => Ok(Crs::Wgs84),
            3857 | 900913 => Ok(Crs::WebMercator),
            32601..=32660 => Ok(Crs::Utm { zone: code - 32600, north: true }),
            32701..=32760 => Ok(Crs::Utm { zone: code - 32700, north: false }),
            _ => Err(Error::UnsupportedCrs(format!("EPSG:{code}"))),
        }
    }

    /// Parse an OGC CRS name such as `urn:ogc:def:crs:EPSG::32633`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84` or `EPSG:4326`.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.ends_with("CRS84") {
            return Ok(Crs::Wgs84);
        }
        let code = name
            .rsplit(':')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| Error::UnsupportedCrs(name.to_string()))?;
        Self::from_epsg(code)
    }

    /// EPSG code, if this CRS has one.
    pub fn epsg(&self) -> Option<u32> {
        match *self {
            Crs::Wgs84 => Some(4326),
            Crs::WebMercator => Some(3857),
            Crs::Utm { zone, north: true } => Some(32600 + zone),
            Crs::Utm { zone, north: false } => Some(32700 + zone),
            Crs::Sinusoidal { .. } => None,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    /// Project WGS84 `(lon, lat)` degrees into this CRS.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        match *self {
            Crs::Wgs84 => (lon, lat),
            Crs::WebMercator => {
                let x = A * lon.to_radians();
                let y = A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
            Crs::Utm { zone, north } => lonlat_to_utm(lon, lat, zone, north),
            Crs::Sinusoidal { radius, central_meridian, false_easting, false_northing } => {
                let phi = lat.to_radians();
                let dlam = (lon - central_meridian).to_radians();
                (radius * dlam * phi.cos() + false_easting, radius * phi + false_northing)
            }
        }
    }

    /// Unproject a coordinate of this CRS to WGS84 `(lon, lat)` degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Crs::Wgs84 => (x, y),
            Crs::WebMercator => {
                let lon = (x / A).to_degrees();
                let lat = (2.0 * (y / A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
                (lon, lat)
            }
            Crs::Utm { zone, north } => utm_unproject(x, y, zone, north),
            Crs::Sinusoidal { radius, central_meridian, false_easting, false_northing } => {
                let phi = (y - false_northing) / radius;
                let cos_phi = phi.cos();
                let dlam = if cos_phi.abs() < 1e-12 { 0.0 } else { (x - false_easting) / (radius * cos_phi) };
                (central_meridian + dlam.to_degrees(), phi.to_degrees())
            }
        }
    }

    /// Transform a point from `self` into `target`.
    pub fn transform(&self, target: &Crs, x: f64, y: f64) -> (f64, f64) {
        if self == target {
            return (x, y);
        }
        let (lon, lat) = self.unproject(x, y);
        target.project(lon, lat)
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.epsg() {
            Some(code) => write!(f, "EPSG:{code}"),
            None => write!(f, "{self:?}"),
        }
    }
}

fn utm_central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// Snyder eq. 8-9 / 8-10.
fn lonlat_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = utm_central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a * a;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    let easting = K0 * n
        * (a + (1.0 - t + c) * a2 * a / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north { northing } else { northing + FALSE_NORTHING_SOUTH };
    (easting, northing)
}

/// Snyder eq. 8-17 … 8-25 (footpoint latitude series).
fn utm_unproject(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north { northing } else { northing - FALSE_NORTHING_SOUTH };

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();
    let c1 = E_PRIME2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let denom = 1.0 - E2 * sin1 * sin1;
    let n1 = A / denom.sqrt();
    let r1 = A * (1.0 - E2) / denom.powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d4 = d2 * d2;
    let d6 = d4 * d2;

    let lat = phi1
        - (n1 * tan1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * E_PRIME2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);
    let lon = utm_central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d2 * d / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1) * d4 * d
                / 120.0)
            / cos1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from the equator to `lat` radians (Snyder eq. 3-21).
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;
    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn epsg_parsing() {
        assert_eq!(Crs::from_epsg(32633).unwrap(), Crs::Utm { zone: 33, north: true });
        assert_eq!(Crs::from_epsg(32721).unwrap(), Crs::Utm { zone: 21, north: false });
        assert!(Crs::from_epsg(2154).is_err());
        assert_eq!(Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(), Crs::Wgs84);
        assert_eq!(Crs::from_name("urn:ogc:def:crs:EPSG::3857").unwrap(), Crs::WebMercator);
    }

    // pyproj: Transformer.from_crs(4326, 32630, always_xy=True).transform(-3.7037, 40.4168)
    #[test]
    fn madrid_to_utm30n() {
        let (e, n) = Crs::Utm { zone: 30, north: true }.project(-3.7037, 40.4168);
        assert_abs_diff_eq!(e, 440_298.94, epsilon = 1.0);
        assert_abs_diff_eq!(n, 4_474_257.31, epsilon = 1.0);
    }

    #[test]
    fn utm_inverse_recovers_lonlat() {
        let crs = Crs::Utm { zone: 33, north: true };
        let (e, n) = crs.project(14.25, 40.85);
        let (lon, lat) = crs.unproject(e, n);
        assert_abs_diff_eq!(lon, 14.25, epsilon = 1e-6);
        assert_abs_diff_eq!(lat, 40.85, epsilon = 1e-6);
    }

    #[test]
    fn sinusoidal_inverse_recovers_lonlat() {
        let crs = Crs::modis_sinusoidal();
        let (x, y) = crs.project(15.0, 41.0);
        assert!(x > 0.0 && y > 0.0);
        let (lon, lat) = crs.unproject(x, y);
        assert_abs_diff_eq!(lon, 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 41.0, epsilon = 1e-9);
    }

    #[test]
    fn web_mercator_origin_and_inverse() {
        let crs = Crs::WebMercator;
        let (x, y) = crs.project(0.0, 0.0);
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y, 0.0, epsilon = 1e-6);
        let (lon, lat) = crs.unproject(crs.project(12.5, 41.9).0, crs.project(12.5, 41.9).1);
        assert_abs_diff_eq!(lon, 12.5, epsilon = 1e-9);
        assert_abs_diff_eq!(lat, 41.9, epsilon = 1e-9);
    }

    #[test]
    fn transform_between_projected_systems() {
        let utm = Crs::Utm { zone: 33, north: true };
        let sin = Crs::modis_sinusoidal();
        let (e, n) = utm.project(14.5, 40.9);
        let (x, y) = utm.transform(&sin, e, n);
        let (lon, lat) = sin.unproject(x, y);
        assert_abs_diff_eq!(lon, 14.5, epsilon = 1e-6);
        assert_abs_diff_eq!(lat, 40.9, epsilon = 1e-6);
    }
}
