//! MODIS LC_Type3 land-cover legend (codes 0–10).
use serde::{Deserialize, Serialize};

/// Pixel value reserved for "no classification".
pub const NO_DATA: u8 = 255;

/// Discrete land-cover class stored in the yearly classified rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LandCoverClass {
    WaterBodies,
    Grasslands,
    Shrublands,
    BroadleafCroplands,
    GrassyWoodlands,
    EvergreenBroadleafForests,
    DeciduousBroadleafForests,
    EvergreenNeedleleafForests,
    DeciduousNeedleleafForests,
    NonVegetatedLands,
    UrbanAndBuiltUpLands,
}

impl LandCoverClass {
    /// All classes in code order.
    pub const ALL: [LandCoverClass; 11] = [
        LandCoverClass::WaterBodies,
        LandCoverClass::Grasslands,
        LandCoverClass::Shrublands,
        LandCoverClass::BroadleafCroplands,
        LandCoverClass::GrassyWoodlands,
        LandCoverClass::EvergreenBroadleafForests,
        LandCoverClass::DeciduousBroadleafForests,
        LandCoverClass::EvergreenNeedleleafForests,
        LandCoverClass::DeciduousNeedleleafForests,
        LandCoverClass::NonVegetatedLands,
        LandCoverClass::UrbanAndBuiltUpLands,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable legend name, also used for table column names.
    pub fn name(self) -> &'static str {
        match self {
            LandCoverClass::WaterBodies => "Water Bodies",
            LandCoverClass::Grasslands => "Grasslands",
            LandCoverClass::Shrublands => "Shrublands",
            LandCoverClass::BroadleafCroplands => "Broadleaf Croplands",
            LandCoverClass::GrassyWoodlands => "Grassy Woodlands",
            LandCoverClass::EvergreenBroadleafForests => "Evergreen Broadleaf Forests",
            LandCoverClass::DeciduousBroadleafForests => "Deciduous Broadleaf Forests",
            LandCoverClass::EvergreenNeedleleafForests => "Evergreen Needleleaf Forests",
            LandCoverClass::DeciduousNeedleleafForests => "Deciduous Needleleaf Forests",
            LandCoverClass::NonVegetatedLands => "Non-Vegetated Lands",
            LandCoverClass::UrbanAndBuiltUpLands => "Urban and Built-up Lands",
        }
    }

    /// Column header for the per-class pixel count.
    pub fn pixels_column(self) -> String {
        format!("{} Pixels", self.name())
    }

    /// Column header for the per-class area.
    pub fn area_column(self) -> String {
        format!("{} Area (sq. km)", self.name())
    }
}

impl std::fmt::Display for LandCoverClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_declaration_order() {
        for (i, class) in LandCoverClass::ALL.iter().enumerate() {
            assert_eq!(class.code() as usize, i);
        }
        assert!(LandCoverClass::ALL.iter().all(|c| c.code() != NO_DATA));
    }

    #[test]
    fn names_are_unique() {
        let names: std::collections::BTreeSet<&str> = LandCoverClass::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), LandCoverClass::ALL.len());
        assert_eq!(LandCoverClass::UrbanAndBuiltUpLands.to_string(), "Urban and Built-up Lands");
    }

    #[test]
    fn column_headers() {
        let c = LandCoverClass::GrassyWoodlands;
        assert_eq!(c.pixels_column(), "Grassy Woodlands Pixels");
        assert_eq!(c.area_column(), "Grassy Woodlands Area (sq. km)");
    }
}
