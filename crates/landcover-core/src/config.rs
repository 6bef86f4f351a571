//! Run configuration for both pipelines.
//!
//! Defaults reproduce the Campania MODIS study: 500 m LC_Type3 rasters for
//! 2001–2020 and the five provincial boundaries. Build a config once at
//! startup and pass it by reference to each stage.
use std::collections::BTreeMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::classes::{LandCoverClass, NO_DATA};
use crate::error::Result;

/// Placeholder replaced by the four-digit year in [`TrendConfig::raster_template`].
pub const YEAR_PLACEHOLDER: &str = "{year}";

/// Parameters of the area → trend → plot pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Directory holding the yearly classified rasters. Outputs land here too.
    pub raster_dir: PathBuf,
    /// GeoJSON FeatureCollection with one feature per region.
    pub boundary_path: PathBuf,
    /// Feature property holding the region name.
    pub name_field: String,
    /// Raster file name with a `{year}` placeholder.
    pub raster_template: String,
    pub first_year: i32,
    pub last_year: i32,
    /// Area of one pixel in km² (500 m × 500 m).
    pub pixel_area_km2: f64,
    pub no_data: u8,
    pub area_output: String,
    pub trend_output: String,
    pub plot_subdir: String,
    /// Classes drawn by the plot generator.
    pub selected_classes: Vec<LandCoverClass>,
    /// SVG colour per plotted class. JSON entries override single classes.
    #[serde(deserialize_with = "colors_over_defaults")]
    pub colors: BTreeMap<LandCoverClass, String>,
    pub label_offsets: LabelOffsets,
}

fn default_colors() -> BTreeMap<LandCoverClass, String> {
    [
        (LandCoverClass::Grasslands, "yellow"),
        (LandCoverClass::GrassyWoodlands, "orange"),
        (LandCoverClass::DeciduousBroadleafForests, "green"),
    ]
    .into_iter()
    .map(|(c, col)| (c, col.to_string()))
    .collect()
}

fn colors_over_defaults<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<LandCoverClass, String>, D::Error> {
    let mut colors = default_colors();
    colors.extend(BTreeMap::<LandCoverClass, String>::deserialize(deserializer)?);
    Ok(colors)
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            raster_dir: PathBuf::from("data/MODIS-LULC"),
            boundary_path: PathBuf::from("data/Campania_Provinces.geojson"),
            name_field: "NAME_2".to_string(),
            raster_template: "LC_Type3_500m_{year}.tif".to_string(),
            first_year: 2001,
            last_year: 2020,
            pixel_area_km2: 0.25,
            no_data: NO_DATA,
            area_output: "landcover_pixel_area_summary.csv".to_string(),
            trend_output: "landcover_trend_analysis.csv".to_string(),
            plot_subdir: "Selected_Class_Plots".to_string(),
            selected_classes: vec![
                LandCoverClass::Grasslands,
                LandCoverClass::GrassyWoodlands,
                LandCoverClass::DeciduousBroadleafForests,
            ],
            colors: default_colors(),
            label_offsets: LabelOffsets::campania(),
        }
    }
}

impl TrendConfig {
    /// Read a JSON config; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }

    pub fn raster_path(&self, year: i32) -> PathBuf {
        self.raster_dir
            .join(self.raster_template.replace(YEAR_PLACEHOLDER, &year.to_string()))
    }

    pub fn area_output_path(&self) -> PathBuf {
        self.raster_dir.join(&self.area_output)
    }

    pub fn trend_output_path(&self) -> PathBuf {
        self.raster_dir.join(&self.trend_output)
    }

    pub fn plot_dir(&self) -> PathBuf {
        self.raster_dir.join(&self.plot_subdir)
    }

    /// Colour for a plotted class; black when none is registered.
    pub fn color_for(&self, class: LandCoverClass) -> &str {
        self.colors.get(&class).map(String::as_str).unwrap_or("black")
    }
}

/// Slope-label offsets `(dx years, dy km²)` per region and class. A JSON
/// `by_region` table replaces the built-in one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelOffsets {
    pub default: (f64, f64),
    pub by_region: BTreeMap<String, BTreeMap<LandCoverClass, (f64, f64)>>,
}

impl Default for LabelOffsets {
    fn default() -> Self {
        Self { default: (1.0, 20.0), by_region: BTreeMap::new() }
    }
}

impl LabelOffsets {
    /// Hand-placed offsets for the five Campania provinces.
    pub fn campania() -> Self {
        use LandCoverClass::{DeciduousBroadleafForests as Dbf, Grasslands as Gr, GrassyWoodlands as Gw};
        let table: [(&str, [(LandCoverClass, (f64, f64)); 3]); 5] = [
            ("Avellino", [(Gr, (-5.5, 120.0)), (Gw, (-5.0, -160.0)), (Dbf, (-5.0, 80.0))]),
            ("Benevento", [(Gr, (-5.5, 100.0)), (Gw, (-5.5, -160.0)), (Dbf, (-5.0, 60.0))]),
            ("Napoli", [(Gr, (-5.0, -30.0)), (Gw, (-5.0, 15.0)), (Dbf, (-5.0, 20.0))]),
            ("Salerno", [(Gr, (-6.0, 160.0)), (Gw, (-6.0, 180.0)), (Dbf, (-6.0, 190.0))]),
            ("Caserta", [(Gr, (-6.0, 80.0)), (Gw, (-5.0, 90.0)), (Dbf, (-5.0, 60.0))]),
        ];

        let by_region = table
            .into_iter()
            .map(|(region, entries)| (region.to_string(), entries.into_iter().collect()))
            .collect();
        Self { by_region, ..Self::default() }
    }

    pub fn get(&self, region: &str, class: LandCoverClass) -> (f64, f64) {
        self.by_region
            .get(region)
            .and_then(|m| m.get(&class))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Parameters of the pixel-wise correlation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub data_folder: PathBuf,
    /// Study-area boundary (GeoJSON).
    pub boundary_path: PathBuf,
    pub output_folder: PathBuf,
    pub lst_subdir: String,
    pub ndvi_subdir: String,
    pub chirps_subdir: String,
    pub burnt_subdir: String,
    pub output_name: String,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("data/Correlation/INPUT"),
            boundary_path: PathBuf::from("data/Correlation/Campania.geojson"),
            output_folder: PathBuf::from("data/Correlation/OUTPUT"),
            lst_subdir: "MedianLST".to_string(),
            ndvi_subdir: "MedianNDVI".to_string(),
            chirps_subdir: "MedianCHIRPS".to_string(),
            burnt_subdir: "BurntArea".to_string(),
            output_name: "pearson_ndvi_burnt.tif".to_string(),
        }
    }
}

impl CorrelationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_path_substitutes_year() {
        let cfg = TrendConfig { raster_dir: PathBuf::from("/tmp/lulc"), ..TrendConfig::default() };
        assert_eq!(cfg.raster_path(2007), PathBuf::from("/tmp/lulc/LC_Type3_500m_2007.tif"));
        assert_eq!(cfg.years().count(), 20);
    }

    #[test]
    fn label_offsets_fall_back_to_default() {
        let offsets = LabelOffsets::campania();
        assert_eq!(offsets.get("Napoli", LandCoverClass::Grasslands), (-5.0, -30.0));
        assert_eq!(offsets.get("Napoli", LandCoverClass::Shrublands), (1.0, 20.0));
        assert_eq!(offsets.get("Roma", LandCoverClass::Grasslands), (1.0, 20.0));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: TrendConfig =
            serde_json::from_str(r#"{ "first_year": 2005, "colors": { "Grasslands": "gold" } }"#).unwrap();
        assert_eq!(cfg.first_year, 2005);
        assert_eq!(cfg.last_year, 2020);
        assert_eq!(cfg.color_for(LandCoverClass::Grasslands), "gold");
        assert_eq!(cfg.color_for(LandCoverClass::GrassyWoodlands), "orange");
        assert_eq!(cfg.color_for(LandCoverClass::DeciduousBroadleafForests), "green");
        assert_eq!(cfg.color_for(LandCoverClass::Shrublands), "black");
        assert_eq!(cfg.label_offsets.get("Salerno", LandCoverClass::GrassyWoodlands), (-6.0, 180.0));
    }

    #[test]
    fn label_offsets_accept_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.json");
        fs::write(
            &path,
            r#"{ "label_offsets": { "by_region": { "Roma": { "Grasslands": [-2.0, 40.0] } } },
                 "colors": { "Shrublands": "brown" } }"#,
        )
        .unwrap();
        let cfg = TrendConfig::load(&path).unwrap();
        assert_eq!(cfg.label_offsets.get("Roma", LandCoverClass::Grasslands), (-2.0, 40.0));
        assert_eq!(cfg.label_offsets.get("Roma", LandCoverClass::Shrublands), (1.0, 20.0));
        assert_eq!(cfg.label_offsets.get("Napoli", LandCoverClass::Grasslands), (1.0, 20.0));
        assert_eq!(cfg.color_for(LandCoverClass::Shrublands), "brown");
        assert_eq!(cfg.color_for(LandCoverClass::Grasslands), "yellow");

        let only_default: LabelOffsets = serde_json::from_str(r#"{ "default": [0.5, 10.0] }"#).unwrap();
        assert_eq!(only_default.get("Napoli", LandCoverClass::Grasslands), (0.5, 10.0));
    }
}
