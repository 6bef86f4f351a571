//! Stage three: one trend chart per region for the selected classes.
//!
//! Each chart shows the yearly areas as a scatter, a dashed least-squares
//! line over the same years and a slope label carrying the Mann-Kendall
//! significance marker.
pub mod svg;

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::classes::LandCoverClass;
use crate::config::TrendConfig;
use crate::error::Result;
use crate::stats::{linear_regression, mann_kendall, round_to, LinearFit};
use crate::table::{AreaRecord, AreaTable};
use crate::trend::significance;
use svg::{Anchor, Font, Stroke, SvgDocument};

const WIDTH: f64 = 1200.0;
const HEIGHT: f64 = 800.0;
const MARGIN_LEFT: f64 = 140.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 90.0;
const MARGIN_BOTTOM: f64 = 150.0;
const FONT: &str = "Arial";

/// One plotted class of a region chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSeries {
    pub class: LandCoverClass,
    pub points: Vec<(i32, f64)>,
    /// Absent when every point falls in the same year.
    pub fit: Option<LinearFit>,
    pub p_value: f64,
    /// Where the slope label is anchored, in data coordinates.
    pub label_at: Option<(f64, f64)>,
}

impl ClassSeries {
    pub fn label(&self) -> Option<String> {
        self.fit.map(|f| format!("{} km²/year {}", format_rounded(f.slope, 2), significance(self.p_value)))
    }
}

/// Everything needed to draw a region's chart.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionChart {
    pub region: String,
    pub series: Vec<ClassSeries>,
    pub max_area: f64,
}

impl RegionChart {
    /// Y-axis upper bound: 10 % headroom over the largest area, or a unit
    /// range when everything is zero.
    pub fn y_max(&self) -> f64 {
        if self.max_area > 0.0 {
            self.max_area * 1.1
        } else {
            1.0
        }
    }
}

/// Round and print with at least one decimal, like `round(x, 2)` renders in
/// a notebook: `-0.25`, `3.0`.
fn format_rounded(x: f64, decimals: i32) -> String {
    let r = round_to(x, decimals);
    let r = if r == 0.0 { 0.0 } else { r };
    if r.fract() == 0.0 {
        format!("{r:.1}")
    } else {
        format!("{r}")
    }
}

/// Gather the selected classes of one region.
pub fn build_chart(region: &str, records: &[&AreaRecord], config: &TrendConfig) -> RegionChart {
    let mut series = Vec::new();
    let mut max_area: f64 = 0.0;

    for &class in &config.selected_classes {
        let points = AreaTable::series(records, class);
        if points.is_empty() {
            continue;
        }
        let areas: Vec<f64> = points.iter().map(|&(_, a)| a).collect();
        let years: Vec<f64> = points.iter().map(|&(y, _)| y as f64).collect();
        let p_value = mann_kendall(&areas).p;
        let fit = linear_regression(&years, &areas);
        max_area = areas.iter().copied().fold(max_area, f64::max);

        let label_at = fit.map(|f| {
            let (dx, dy) = config.label_offsets.get(region, class);
            let x = years[years.len() - 1] + dx;
            (x, f.predict(x) + dy)
        });
        series.push(ClassSeries { class, points, fit, p_value, label_at });
    }

    RegionChart { region: region.to_string(), series, max_area }
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// Data → canvas mapping of the plotting area.
struct Frame {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        MARGIN_LEFT + (x - self.x0) / (self.x1 - self.x0) * (WIDTH - MARGIN_LEFT - MARGIN_RIGHT)
    }

    fn py(&self, y: f64) -> f64 {
        HEIGHT - MARGIN_BOTTOM - (y - self.y0) / (self.y1 - self.y0) * (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM)
    }
}

/// Tick spacing of 1, 2 or 5 × 10^k giving roughly `target` intervals.
fn nice_step(range: f64, target: usize) -> f64 {
    let raw = range / target as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0].into_iter().find(|m| m * magnitude >= raw).unwrap_or(10.0);
    step * magnitude
}

fn format_tick(v: f64, step: f64) -> String {
    if step >= 1.0 {
        format!("{v:.0}")
    } else {
        let decimals = (-step.log10().floor()) as usize;
        format!("{v:.decimals$}")
    }
}

/// Render a chart as an SVG document.
pub fn render_chart(chart: &RegionChart, config: &TrendConfig) -> String {
    let frame = Frame {
        x0: config.first_year as f64 - 1.0,
        x1: config.last_year as f64 + 1.0,
        y0: 0.0,
        y1: chart.y_max(),
    };
    let mut doc = SvgDocument::new(WIDTH, HEIGHT);
    let grid = Stroke::solid("lightgray", 0.5).with_opacity(0.5);
    let axis = Stroke::solid("black", 1.0);
    let tick_font = Font::new(FONT, 28.0);

    // Grid and ticks.
    for year in (config.first_year..config.last_year + 1).step_by(2) {
        let x = frame.px(year as f64);
        doc.line(x, frame.py(frame.y1), x, frame.py(0.0), &grid);
        doc.line(x, frame.py(0.0), x, frame.py(0.0) + 6.0, &axis);
        let ty = frame.py(0.0) + 36.0;
        doc.text(x, ty, &year.to_string(), &tick_font.clone().anchor(Anchor::End).rotate(-45.0));
    }
    let step = nice_step(frame.y1, 6);
    let mut v = 0.0;
    while v <= frame.y1 + step * 1e-9 {
        let y = frame.py(v);
        doc.line(frame.px(frame.x0), y, frame.px(frame.x1), y, &grid);
        doc.line(frame.px(frame.x0) - 6.0, y, frame.px(frame.x0), y, &axis);
        doc.text(frame.px(frame.x0) - 10.0, y + 9.0, &format_tick(v, step), &tick_font.clone().anchor(Anchor::End));
        v += step;
    }
    doc.rect(
        frame.px(frame.x0),
        frame.py(frame.y1),
        frame.px(frame.x1) - frame.px(frame.x0),
        frame.py(0.0) - frame.py(frame.y1),
        "none",
        Some(&axis),
    );

    // Data.
    for s in &chart.series {
        let color = config.color_for(s.class);
        for &(year, area) in &s.points {
            doc.circle(frame.px(year as f64), frame.py(area), 5.0, color);
        }
        if let Some(fit) = s.fit {
            let line: Vec<(f64, f64)> =
                s.points.iter().map(|&(year, _)| (frame.px(year as f64), frame.py(fit.predict(year as f64)))).collect();
            doc.polyline(&line, &Stroke::dashed(color, 2.0));
        }
        if let (Some((lx, ly)), Some(label)) = (s.label_at, s.label()) {
            doc.text(frame.px(lx), frame.py(ly), &label, &Font::new(FONT, 26.0));
        }
    }

    // Title, axis labels, legend.
    doc.text(MARGIN_LEFT, MARGIN_TOP - 25.0, &chart.region, &Font::new(FONT, 30.0));
    let label_font = Font::new(FONT, 30.0).anchor(Anchor::Middle);
    doc.text((frame.px(frame.x0) + frame.px(frame.x1)) / 2.0, HEIGHT - 20.0, "Time(Year)", &label_font);
    let mid_y = (frame.py(0.0) + frame.py(frame.y1)) / 2.0;
    doc.text(35.0, mid_y, "Area Coverage (km²)", &label_font.clone().rotate(-90.0));

    let legend_x = frame.px(frame.x1) - 420.0;
    let mut legend_y = frame.py(frame.y1) + 24.0;
    let legend_font = Font::new(FONT, 18.0);
    for s in &chart.series {
        let color = config.color_for(s.class);
        doc.circle(legend_x + 15.0, legend_y - 6.0, 5.0, color);
        doc.text(legend_x + 40.0, legend_y, s.class.name(), &legend_font);
        legend_y += 24.0;
        if s.fit.is_some() {
            doc.line(legend_x, legend_y - 6.0, legend_x + 30.0, legend_y - 6.0, &Stroke::dashed(color, 2.0));
            doc.text(legend_x + 40.0, legend_y, &format!("{} Trend", s.class.name()), &legend_font);
            legend_y += 24.0;
        }
    }

    doc.finish()
}

/// Chart file name for a region. Path separators in the name become `_` so
/// every chart stays inside the plot directory.
fn plot_file_name(region: &str) -> String {
    let stem: String = region.chars().map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c }).collect();
    format!("{stem}_LandCover_Trend_with_Slopes.svg")
}

/// Write `<Region>_LandCover_Trend_with_Slopes.svg` for every region into
/// the configured plot directory and return the written paths.
pub fn generate_plots(table: &AreaTable, config: &TrendConfig) -> Result<Vec<PathBuf>> {
    info!("Generating plots with slopes for selected land cover classes...");
    let dir = config.plot_dir();
    fs::create_dir_all(&dir)?;

    let mut written = Vec::new();
    for (region, records) in table.by_region() {
        let chart = build_chart(region, &records, config);
        if chart.series.is_empty() {
            warn!("No area data for the selected classes in {region}");
        }
        let path = dir.join(plot_file_name(region));
        fs::write(&path, render_chart(&chart, config))?;
        info!("Plot saved to {}", path.display());
        written.push(path);
    }
    Ok(written)
}
