//! Stage one: per-region, per-year land-cover pixel counts and areas.
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::boundary::{load_regions, Boundaries, Region};
use crate::classes::LandCoverClass;
use crate::config::TrendConfig;
use crate::error::{Error, Result};
use crate::mask::{mask, value_counts};
use crate::raster::{geotiff, Crs};
use crate::stats::round_to;
use crate::table::{AreaRecord, AreaTable};

/// First raster of the year range that exists on disk.
fn reference_raster(config: &TrendConfig) -> Result<PathBuf> {
    config.years().map(|y| config.raster_path(y)).find(|p| p.exists()).ok_or_else(|| Error::NoReferenceRaster {
        dir: config.raster_dir.clone(),
        first: config.first_year,
        last: config.last_year,
    })
}

/// Count the classes of one raster inside one region. Only the configured
/// sentinel is excluded; a declared nodata of 0 is still Water Bodies.
fn region_year_record(config: &TrendConfig, region: &Region, year: i32, path: &Path) -> Result<AreaRecord> {
    let raster = geotiff::read_u8(path)?;
    let masked = mask(&raster, &region.geometry)?;
    let counts = value_counts(&masked, &[config.no_data]);

    let mut record = AreaRecord { region: region.name.clone(), year, pixels: [0; 11], areas: [None; 11] };
    for class in LandCoverClass::ALL {
        let n = counts.get(&class.code()).copied().unwrap_or(0);
        record.pixels[class.code() as usize] = n;
        record.areas[class.code() as usize] = Some(round_to(n as f64 * config.pixel_area_km2, 4));
    }
    Ok(record)
}

/// Regions reprojected into the CRS of the reference raster. A raster without
/// a CRS is assumed to share the boundary's.
fn regions_in_raster_crs(config: &TrendConfig, reference: &Path) -> Result<Boundaries> {
    let boundaries = load_regions(&config.boundary_path, &config.name_field)?;
    let target: Option<Crs> = geotiff::read_meta_from(reference)?.crs;
    match target {
        Some(crs) => {
            debug!("Reprojecting {} region(s) from {} to {}", boundaries.regions.len(), boundaries.crs, crs);
            Ok(boundaries.to_crs(&crs))
        }
        None => {
            warn!("{} has no CRS; using boundary coordinates as-is", reference.display());
            Ok(boundaries)
        }
    }
}

/// Build the area table for every region and every year whose raster exists.
///
/// Missing rasters and rasters that fail to read or mask are logged and the
/// affected (region, year) pairs left out; the run carries on.
pub fn extract_landcover_area(config: &TrendConfig) -> Result<AreaTable> {
    info!("Extracting land cover area...");
    let reference = reference_raster(config)?;
    let boundaries = regions_in_raster_crs(config, &reference)?;

    let mut records = Vec::new();
    for region in &boundaries.regions {
        info!("Processing region: {}", region.name);
        for year in config.years() {
            let path = config.raster_path(year);
            if !path.exists() {
                warn!("Raster file not found for year {year}. Skipping...");
                continue;
            }
            match region_year_record(config, region, year, &path) {
                Ok(record) => records.push(record),
                Err(e) => error!("Error processing file {}: {e}", path.display()),
            }
        }
    }
    Ok(AreaTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{GeoTransform, Raster};
    use std::fs;

    const BOUNDARY: &str = r#"{ "type": "FeatureCollection", "features": [
        { "type": "Feature", "properties": { "NAME_2": "Napoli" },
          "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]] } },
        { "type": "Feature", "properties": { "NAME_2": "Caserta" },
          "geometry": { "type": "Polygon", "coordinates": [[[4, 0], [8, 0], [8, 4], [4, 4], [4, 0]]] } }
    ] }"#;

    /// 8×4 one-degree grid: Napoli is the left half, Caserta the right half.
    fn write_year(dir: &Path, year: i32, fill: impl Fn(usize, usize) -> u8) {
        let mut raster = Raster::new(8, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0), 0u8).with_crs(Some(Crs::Wgs84));
        for row in 0..4 {
            for col in 0..8 {
                raster.set(row, col, fill(row, col));
            }
        }
        geotiff::write_u8(&raster, &dir.join(format!("LC_Type3_500m_{year}.tif"))).unwrap();
    }

    fn config(dir: &Path, first: i32, last: i32) -> TrendConfig {
        fs::write(dir.join("regions.geojson"), BOUNDARY).unwrap();
        TrendConfig {
            raster_dir: dir.to_path_buf(),
            boundary_path: dir.join("regions.geojson"),
            first_year: first,
            last_year: last,
            ..TrendConfig::default()
        }
    }

    #[test]
    fn counts_classes_per_region() {
        let dir = tempfile::tempdir().unwrap();
        // Left half: row 0 grassland, the rest croplands with one no-data pixel.
        write_year(dir.path(), 2001, |row, col| match (row, col) {
            (0, 0..=3) => 1,
            (3, 3) => 255,
            (_, 0..=3) => 3,
            _ => 10,
        });
        let table = extract_landcover_area(&config(dir.path(), 2001, 2001)).unwrap();
        assert_eq!(table.len(), 2);

        let napoli = &table.records[0];
        assert_eq!(napoli.region, "Napoli");
        assert_eq!(napoli.pixels(LandCoverClass::Grasslands), 4);
        assert_eq!(napoli.pixels(LandCoverClass::BroadleafCroplands), 11);
        assert_eq!(napoli.total_pixels(), 15);
        assert_eq!(napoli.area(LandCoverClass::Grasslands), Some(1.0));
        assert_eq!(napoli.area(LandCoverClass::BroadleafCroplands), Some(2.75));
        assert_eq!(napoli.area(LandCoverClass::WaterBodies), Some(0.0));

        let caserta = &table.records[1];
        assert_eq!(caserta.region, "Caserta");
        assert_eq!(caserta.pixels(LandCoverClass::UrbanAndBuiltUpLands), 16);
    }

    #[test]
    fn missing_year_is_skipped() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        for year in (2013..=2017).filter(|&y| y != 2015) {
            write_year(dir.path(), year, |_, _| 1);
        }
        let table = extract_landcover_area(&config(dir.path(), 2013, 2017)).unwrap();
        assert_eq!(table.len(), 8);
        assert!(table.records.iter().all(|r| r.year != 2015));
        let years: Vec<i32> = table.records.iter().filter(|r| r.region == "Napoli").map(|r| r.year).collect();
        assert_eq!(years, [2013, 2014, 2016, 2017]);
    }

    #[test]
    fn unreadable_raster_is_omitted() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        write_year(dir.path(), 2001, |_, _| 2);
        fs::write(dir.path().join("LC_Type3_500m_2002.tif"), b"not a tiff").unwrap();
        write_year(dir.path(), 2003, |_, _| 2);
        let table = extract_landcover_area(&config(dir.path(), 2001, 2003)).unwrap();
        assert_eq!(table.len(), 4);
        assert!(table.records.iter().all(|r| r.year != 2002));
    }

    #[test]
    fn no_raster_at_all_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_landcover_area(&config(dir.path(), 2001, 2003)).unwrap_err();
        assert!(matches!(err, Error::NoReferenceRaster { first: 2001, last: 2003, .. }));
    }

    #[test]
    fn rerun_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write_year(dir.path(), 2001, |row, col| ((row * 3 + col) % 11) as u8);
        let cfg = config(dir.path(), 2001, 2001);
        assert_eq!(extract_landcover_area(&cfg).unwrap(), extract_landcover_area(&cfg).unwrap());
    }

    #[test]
    fn declared_nodata_does_not_hide_a_class() {
        let dir = tempfile::tempdir().unwrap();
        // Napoli: two rows of water, one row of grassland, one row of 255.
        let mut raster = Raster::new(8, 4, GeoTransform::new(0.0, 4.0, 1.0, -1.0), 10u8)
            .with_crs(Some(Crs::Wgs84))
            .with_nodata(Some(0.0));
        for col in 0..4 {
            raster.set(0, col, 0);
            raster.set(1, col, 0);
            raster.set(2, col, 1);
            raster.set(3, col, 255);
        }
        geotiff::write_u8(&raster, &dir.path().join("LC_Type3_500m_2001.tif")).unwrap();

        let table = extract_landcover_area(&config(dir.path(), 2001, 2001)).unwrap();
        let napoli = &table.records[0];
        assert_eq!(napoli.region, "Napoli");
        assert_eq!(napoli.pixels(LandCoverClass::WaterBodies), 8);
        assert_eq!(napoli.pixels(LandCoverClass::Grasslands), 4);
        assert_eq!(napoli.total_pixels(), 12);
        assert_eq!(napoli.area(LandCoverClass::WaterBodies), Some(2.0));
    }

    #[test]
    fn missing_year_logs_a_skip_notice() {
        let dir = tempfile::tempdir().unwrap();
        for year in [2014, 2016] {
            write_year(dir.path(), year, |_, _| 1);
        }
        let cfg = config(dir.path(), 2014, 2016);

        let (table, log) = crate::logging::capture(|| extract_landcover_area(&cfg).unwrap());
        assert_eq!(table.len(), 4);
        assert!(log.contains("Raster file not found for year 2015. Skipping..."), "{log}");
        assert_eq!(log.matches("year 2015").count(), 2);
        assert!(!log.contains("year 2014"));
        assert!(log.contains("Processing region: Caserta"));
    }
}
