use std::path::Path;

use plotters::prelude::*;

use crate::error::{Result, ToolError};
use crate::plot::palette::MUTANT_COLORS;

/// One mutant's averaged feature values along the tissue: `(x, mean,
/// standard error)` per point.
#[derive(Debug, Clone)]
pub struct MutantSeries {
    pub name: String,
    /// Index into the mutant palette.
    pub color: usize,
    pub points: Vec<(f64, f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendCorner {
    UpperLeft,
    LowerLeft,
}

/// Error-bar chart of every mutant's series over a shared x range.
pub fn error_bar_chart(
    path: &Path,
    x_max: f64,
    series: &[MutantSeries],
    legend: LegendCorner,
) -> Result<()> {
    draw_error_bars(path, x_max, series, legend).map_err(crate::plot::render_error)
}

fn draw_error_bars(
    path: &Path,
    x_max: f64,
    series: &[MutantSeries],
    legend: LegendCorner,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for mutant in series {
        for &(_, mean, err) in &mutant.points {
            y_min = y_min.min(mean - err);
            y_max = y_max.max(mean + err);
        }
    }
    let (y_lo, y_hi) = crate::plot::padded(y_min, y_max);

    let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max.max(1.0), y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Position along the tissue")
        .y_desc("Feature value")
        .draw()?;

    for mutant in series {
        let color = MUTANT_COLORS[mutant.color % MUTANT_COLORS.len()];
        let line = mutant.points.iter().map(|&(x, mean, _)| (x, mean));
        chart
            .draw_series(LineSeries::new(line, &color))?
            .label(mutant.name.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart.draw_series(mutant.points.iter().map(|&(x, mean, err)| {
            ErrorBar::new_vertical(x, mean - err, mean, mean + err, color.filled(), 6)
        }))?;
    }

    let position = match legend {
        LegendCorner::UpperLeft => SeriesLabelPosition::UpperLeft,
        LegendCorner::LowerLeft => SeriesLabelPosition::LowerLeft,
    };
    chart
        .configure_series_labels()
        .position(position)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// The spreadsheet behind a mutant chart: one header of x positions,
/// then per mutant a mean row and a nameless standard-error row.
pub fn write_mutant_csv(
    path: &Path,
    indexes: &[f64],
    rows: &[(String, Vec<f64>, Vec<f64>)],
) -> Result<()> {
    let mut out = String::from("mutant,");
    for index in indexes {
        out.push_str(&index.to_string());
        out.push(',');
    }
    out.push('\n');
    for (mutant, means, errors) in rows {
        out.push_str(mutant);
        out.push(',');
        for value in means {
            out.push_str(&value.to_string());
            out.push(',');
        }
        out.push_str("\n,");
        for value in errors {
            out.push_str(&value.to_string());
            out.push(',');
        }
        out.push('\n');
    }
    std::fs::write(path, out).map_err(|e| ToolError::file_access(path, e))
}
