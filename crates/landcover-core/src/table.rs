//! The per-(region, year) area table and its CSV form.
//!
//! Columns: `Region`, `Year`, then for each class in code order
//! `<Class> Pixels` and `<Class> Area (sq. km)`.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::classes::LandCoverClass;
use crate::error::{Error, Result};

const N_CLASSES: usize = LandCoverClass::ALL.len();

/// Pixel counts and areas of one region in one year.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaRecord {
    pub region: String,
    pub year: i32,
    /// Indexed by class code.
    pub pixels: [u64; N_CLASSES],
    /// Indexed by class code; `None` for a blank cell in a loaded table.
    pub areas: [Option<f64>; N_CLASSES],
}

impl AreaRecord {
    pub fn pixels(&self, class: LandCoverClass) -> u64 {
        self.pixels[class.code() as usize]
    }

    pub fn area(&self, class: LandCoverClass) -> Option<f64> {
        self.areas[class.code() as usize].filter(|a| a.is_finite())
    }

    pub fn total_pixels(&self) -> u64 {
        self.pixels.iter().sum()
    }
}

/// Ordered collection of area records (region-major, year-minor).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaTable {
    pub records: Vec<AreaRecord>,
}

impl AreaTable {
    pub fn new(records: Vec<AreaRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records grouped by region, regions in lexical order.
    pub fn by_region(&self) -> BTreeMap<&str, Vec<&AreaRecord>> {
        let mut groups: BTreeMap<&str, Vec<&AreaRecord>> = BTreeMap::new();
        for r in &self.records {
            groups.entry(r.region.as_str()).or_default().push(r);
        }
        groups
    }

    /// `(year, area)` pairs with a present area, ordered by year.
    pub fn series(records: &[&AreaRecord], class: LandCoverClass) -> Vec<(i32, f64)> {
        let mut pts: Vec<(i32, f64)> = records.iter().filter_map(|r| r.area(class).map(|a| (r.year, a))).collect();
        pts.sort_by_key(|&(year, _)| year);
        pts
    }

    fn header() -> Vec<String> {
        let mut cols = vec!["Region".to_string(), "Year".to_string()];
        for class in LandCoverClass::ALL {
            cols.push(class.pixels_column());
            cols.push(class.area_column());
        }
        cols
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(Self::header())?;
        for r in &self.records {
            let mut row = vec![r.region.clone(), r.year.to_string()];
            for i in 0..N_CLASSES {
                row.push(r.pixels[i].to_string());
                row.push(r.areas[i].map(|a| a.to_string()).unwrap_or_default());
            }
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        self.to_writer(File::create(path)?)
    }

    /// Parse a table written by [`AreaTable::to_writer`]. Columns are matched
    /// by name; blank or unparsable area cells load as missing.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let col = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| Error::MissingColumn(name.to_string()))
        };

        let region_col = col("Region")?;
        let year_col = col("Year")?;
        let pixel_cols: Vec<Option<usize>> =
            LandCoverClass::ALL.iter().map(|c| col(&c.pixels_column()).ok()).collect();
        let area_cols: Vec<usize> =
            LandCoverClass::ALL.iter().map(|c| col(&c.area_column())).collect::<Result<_>>()?;

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let cell = |i: usize| row.get(i).unwrap_or("").trim();
            let year = cell(year_col)
                .parse::<f64>()
                .map_err(|e| Error::Other(format!("bad Year {:?}: {e}", cell(year_col))))?;

            let mut pixels = [0u64; N_CLASSES];
            let mut areas = [None; N_CLASSES];
            for i in 0..N_CLASSES {
                pixels[i] = pixel_cols[i].and_then(|c| cell(c).parse::<f64>().ok()).map(|p| p as u64).unwrap_or(0);
                areas[i] = cell(area_cols[i]).parse::<f64>().ok().filter(|a| a.is_finite());
            }
            records.push(AreaRecord { region: cell(region_col).to_string(), year: year as i32, pixels, areas });
        }
        Ok(Self { records })
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}
