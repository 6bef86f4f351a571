//! Region boundaries from a GeoJSON FeatureCollection.
//!
//! Coordinates are WGS84 lon/lat (RFC 7946) unless the legacy `crs` member
//! names an EPSG code. Each feature with a Polygon or MultiPolygon geometry
//! becomes one [`Region`]; its name comes from a configurable property.
use std::fs;
use std::path::Path;

use geo::{Coord, MapCoords, MultiPolygon};
use geojson::FeatureCollection;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::raster::Crs;

/// A named administrative region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// All regions of a boundary file plus the CRS their coordinates are in.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundaries {
    pub crs: Crs,
    pub regions: Vec<Region>,
}

impl Boundaries {
    /// Copy of the boundaries with every vertex transformed into `target`.
    pub fn to_crs(&self, target: &Crs) -> Boundaries {
        if &self.crs == target {
            return self.clone();
        }
        let from = self.crs;
        let regions = self
            .regions
            .iter()
            .map(|r| Region {
                name: r.name.clone(),
                geometry: r.geometry.map_coords(|c| {
                    let (x, y) = from.transform(target, c.x, c.y);
                    Coord { x, y }
                }),
            })
            .collect();
        Boundaries { crs: *target, regions }
    }

    /// Every region's polygons merged into one multipolygon.
    pub fn combined(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.regions.iter().flat_map(|r| r.geometry.0.iter().cloned()).collect())
    }
}

/// EPSG name from the pre-RFC 7946 `crs` member, if the file carries one.
fn legacy_crs_name(collection: &FeatureCollection) -> Option<&str> {
    collection.foreign_members.as_ref()?.get("crs")?.get("properties")?.get("name")?.as_str()
}

fn property_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Parse a GeoJSON FeatureCollection held in memory.
pub fn parse_regions(text: &str, name_field: &str) -> Result<Boundaries> {
    let collection: FeatureCollection = text.parse()?;
    let crs = match legacy_crs_name(&collection) {
        Some(name) => Crs::from_name(name)?,
        None => Crs::Wgs84,
    };

    let mut regions = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let name = feature.property(name_field).and_then(property_string).unwrap_or_else(|| format!("feature_{i}"));

        let Some(geometry) = feature.geometry else {
            warn!("Region {name} has no geometry. Skipping...");
            continue;
        };
        let geometry = match geo::Geometry::<f64>::try_from(geometry)? {
            geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            geo::Geometry::MultiPolygon(mp) => mp,
            _ => {
                warn!("Region {name} is not a polygon. Skipping...");
                continue;
            }
        };
        debug!("Loaded region {name} with {} polygon(s)", geometry.0.len());
        regions.push(Region { name, geometry });
    }

    Ok(Boundaries { crs, regions })
}

/// Load region boundaries from a GeoJSON file.
pub fn load_regions(path: &Path, name_field: &str) -> Result<Boundaries> {
    let text = fs::read_to_string(path)?;
    parse_regions(&text, name_field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;
    use geo::BoundingRect;

    fn min_corner(region: &Region) -> (f64, f64) {
        let r = region.geometry.bounding_rect().unwrap();
        (r.min().x, r.min().y)
    }

    const PROVINCES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "NAME_2": "Napoli" },
              "geometry": { "type": "Polygon",
                "coordinates": [[[14.0, 40.7], [14.6, 40.7], [14.6, 41.0], [14.0, 41.0], [14.0, 40.7]]] } },
            { "type": "Feature", "properties": { "NAME_2": "Salerno" },
              "geometry": { "type": "MultiPolygon",
                "coordinates": [[[[14.8, 40.0, 0.0], [15.8, 40.0, 0.0], [15.8, 40.8, 0.0], [14.8, 40.0, 0.0]]],
                                [[[15.0, 39.9], [15.1, 39.9], [15.1, 39.95], [15.0, 39.9]]]] } },
            { "type": "Feature", "properties": { "NAME_2": "Nowhere" }, "geometry": null },
            { "type": "Feature", "properties": { "NAME_2": "Point" },
              "geometry": { "type": "Point", "coordinates": [14.0, 40.0] } }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_skips_others() {
        let b = parse_regions(PROVINCES, "NAME_2").unwrap();
        assert_eq!(b.crs, Crs::Wgs84);
        let names: Vec<&str> = b.regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Napoli", "Salerno"]);
        assert_eq!(b.regions[1].geometry.0.len(), 2);
        let rect = b.regions[0].geometry.bounding_rect().unwrap();
        assert_eq!((rect.min().x, rect.min().y, rect.max().x, rect.max().y), (14.0, 40.7, 14.6, 41.0));
    }

    #[test]
    fn missing_name_property_gets_placeholder() {
        let b = parse_regions(PROVINCES, "NAME_1").unwrap();
        assert_eq!(b.regions[0].name, "feature_0");
    }

    #[test]
    fn reprojection_moves_every_vertex() {
        let b = parse_regions(PROVINCES, "NAME_2").unwrap();
        let utm = Crs::Utm { zone: 33, north: true };
        let projected = b.to_crs(&utm);
        assert_eq!(projected.crs, utm);
        let (min_x, min_y) = min_corner(&projected.regions[0]);
        assert!(min_x > 300_000.0 && min_y > 4_400_000.0);

        let back = projected.to_crs(&Crs::Wgs84);
        let (x, y) = min_corner(&back.regions[0]);
        assert_abs_diff_eq!(x, 14.0, epsilon = 1e-6);
        assert_abs_diff_eq!(y, 40.7, epsilon = 1e-6);
    }

    #[test]
    fn declared_crs_is_honoured() {
        let text = r#"{ "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32633" } },
            "features": [] }"#;
        let b = parse_regions(text, "NAME_2").unwrap();
        assert_eq!(b.crs, Crs::Utm { zone: 33, north: true });
        assert!(b.regions.is_empty());
    }

    #[test]
    fn non_string_names_are_stringified() {
        let text = r#"{ "type": "FeatureCollection", "features": [
            { "type": "Feature", "properties": { "ID": 63 },
              "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] } } ] }"#;
        let b = parse_regions(text, "ID").unwrap();
        assert_eq!(b.regions[0].name, "63");
    }

    #[test]
    fn malformed_geojson_is_an_error() {
        assert!(matches!(parse_regions(r#"{ "type": "Feature" }"#, "NAME_2"), Err(Error::GeoJson(_))));
        assert!(parse_regions("not json", "NAME_2").is_err());
    }
}
