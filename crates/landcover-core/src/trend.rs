//! Per-(region, class) Mann-Kendall trend and Sen's slope summary.
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classes::LandCoverClass;
use crate::error::Result;
use crate::stats::{mann_kendall, round_to, sens_slope, Trend};
use crate::table::AreaTable;

/// One row of the trend table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Land Cover Type")]
    pub land_cover_type: String,
    #[serde(rename = "Mann-Kendall Tau")]
    pub tau: f64,
    #[serde(rename = "P-Value")]
    pub p_value: f64,
    #[serde(rename = "Trend")]
    pub trend: Trend,
    #[serde(rename = "Sen's Slope (sq. km/year)")]
    pub sens_slope: f64,
    #[serde(rename = "Significance")]
    pub significance: String,
}

/// `"**"` below 0.01, `"*"` below 0.05, otherwise empty.
pub fn significance(p: f64) -> &'static str {
    if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else {
        ""
    }
}

/// Trend summary of a single area series, `None` below two values.
pub fn analyze_series(region: &str, class: LandCoverClass, areas: &[f64]) -> Option<TrendRecord> {
    if areas.len() < 2 {
        return None;
    }
    let mk = mann_kendall(areas);
    let sen = sens_slope(areas)?;
    Some(TrendRecord {
        region: region.to_string(),
        land_cover_type: class.name().to_string(),
        tau: round_to(mk.tau, 4),
        p_value: round_to(mk.p, 4),
        trend: mk.trend,
        sens_slope: round_to(sen.slope, 4),
        significance: significance(mk.p).to_string(),
    })
}

/// Run the trend test for every region (in name order) and every class with
/// at least two years of area data.
pub fn perform_trend_analysis(table: &AreaTable) -> Vec<TrendRecord> {
    info!("Performing trend analysis...");
    let mut out = Vec::new();
    for (region, records) in table.by_region() {
        info!("Processing region: {region}");
        for class in LandCoverClass::ALL {
            let areas: Vec<f64> = AreaTable::series(&records, class).into_iter().map(|(_, a)| a).collect();
            match analyze_series(region, class, &areas) {
                Some(rec) => out.push(rec),
                None => debug!("{region}/{class}: {} year(s) of data, skipped", areas.len()),
            }
        }
    }
    out
}

pub fn write_trend_records<W: Write>(records: &[TrendRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trend_csv(records: &[TrendRecord], path: &Path) -> Result<()> {
    write_trend_records(records, File::create(path)?)?;
    info!("Trend analysis results saved to {}", path.display());
    Ok(())
}
