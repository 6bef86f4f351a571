use std::fs;
use std::path::Path;

use landcover_core::classes::LandCoverClass;
use landcover_core::config::TrendConfig;
use landcover_core::raster::{geotiff, Crs, GeoTransform, Raster};
use landcover_core::stats::Trend;
use landcover_core::table::AreaTable;
use landcover_core::{extract, plot, trend};

const BOUNDARY: &str = r#"{ "type": "FeatureCollection", "features": [
    { "type": "Feature", "properties": { "NAME_2": "Napoli" },
      "geometry": { "type": "Polygon", "coordinates": [[[14.0, 40.5], [14.5, 40.5], [14.5, 41.0], [14.0, 41.0], [14.0, 40.5]]] } },
    { "type": "Feature", "properties": { "NAME_2": "Caserta" },
      "geometry": { "type": "Polygon", "coordinates": [[[14.5, 40.5], [15.0, 40.5], [15.0, 41.0], [14.5, 41.0], [14.5, 40.5]]] } }
] }"#;

/// 20×10 grid of 0.05° pixels over 14–15°E, 40.5–41°N. The western half
/// (Napoli) loses two grassland pixels a year to grassy woodland; the eastern
/// half (Caserta) is deciduous forest throughout.
fn write_year(dir: &Path, year: i32) {
    let grass = 60 - 2 * (year - 2001) as usize;
    let mut raster =
        Raster::new(20, 10, GeoTransform::new(14.0, 41.0, 0.05, -0.05), 0u8).with_crs(Some(Crs::Wgs84));
    for row in 0..10 {
        for col in 0..20 {
            let v = if col >= 10 {
                6
            } else if row * 10 + col < grass {
                1
            } else {
                4
            };
            raster.set(row, col, v);
        }
    }
    raster.set(9, 19, 255);
    geotiff::write_u8(&raster, &dir.join(format!("LC_Type3_500m_{year}.tif"))).unwrap();
}

#[test]
fn extract_analyze_plot() {
    landcover_core::logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    for year in (2001..=2020).filter(|&y| y != 2015) {
        write_year(dir.path(), year);
    }
    fs::write(dir.path().join("provinces.geojson"), BOUNDARY).unwrap();
    let cfg = TrendConfig {
        raster_dir: dir.path().to_path_buf(),
        boundary_path: dir.path().join("provinces.geojson"),
        ..TrendConfig::default()
    };

    // Stage 1.
    let table = extract::extract_landcover_area(&cfg).unwrap();
    assert_eq!(table.len(), 2 * 19);
    assert!(table.records.iter().all(|r| r.year != 2015));
    for r in &table.records {
        for class in LandCoverClass::ALL {
            let expected = (r.pixels(class) as f64 * 0.25 * 1e4).round() / 1e4;
            assert_eq!(r.area(class), Some(expected));
        }
        let total = if r.region == "Napoli" { 100 } else { 99 };
        assert_eq!(r.total_pixels(), total);
    }
    let napoli_2001 = &table.records[0];
    assert_eq!((napoli_2001.region.as_str(), napoli_2001.year), ("Napoli", 2001));
    assert_eq!(napoli_2001.area(LandCoverClass::Grasslands), Some(15.0));

    table.write_csv(&cfg.area_output_path()).unwrap();
    let reloaded = AreaTable::read_csv(&cfg.area_output_path()).unwrap();
    assert_eq!(reloaded, table);

    // Stage 2.
    let trends = trend::perform_trend_analysis(&reloaded);
    let row = |region: &str, class: LandCoverClass| {
        trends.iter().find(|t| t.region == region && t.land_cover_type == class.name()).unwrap()
    };
    let grass = row("Napoli", LandCoverClass::Grasslands);
    assert_eq!(grass.trend, Trend::Decreasing);
    assert!(grass.sens_slope < 0.0);
    assert_eq!(grass.significance, "**");
    assert_eq!(row("Napoli", LandCoverClass::GrassyWoodlands).trend, Trend::Increasing);
    let forest = row("Caserta", LandCoverClass::DeciduousBroadleafForests);
    assert_eq!((forest.p_value, forest.trend, forest.sens_slope), (1.0, Trend::NoTrend, 0.0));
    assert_eq!(trends.len(), 2 * 11);
    assert_eq!(trends[0].region, "Caserta");

    trend::write_trend_csv(&trends, &cfg.trend_output_path()).unwrap();
    let text = fs::read_to_string(cfg.trend_output_path()).unwrap();
    assert_eq!(text.lines().count(), 1 + trends.len());

    // Stage 3.
    let plots = plot::generate_plots(&reloaded, &cfg).unwrap();
    assert_eq!(plots.len(), 2);
    for p in &plots {
        assert!(p.exists());
        assert!(p.starts_with(cfg.plot_dir()));
    }
    let napoli = fs::read_to_string(cfg.plot_dir().join("Napoli_LandCover_Trend_with_Slopes.svg")).unwrap();
    assert!(napoli.contains("Grassy Woodlands Trend"));
    assert!(napoli.contains("km²/year **"));
}
