use std::path::Path;

use plotters::prelude::*;
use plotters::style::FontTransform;

use crate::analysis::param_label;
use crate::error::{Result, ToolError};
use crate::plot::palette::error_ratio_color;
use crate::plot::YBounds;

const BAR_SLOT: f64 = 1.5;
const BAR_WIDTH: f64 = 1.4;

/// One sensitivity bar chart: a bar per system parameter with a stddev
/// error bar, redder the noisier the estimate.
pub fn sensitivity_bars(
    path: &Path,
    title: &str,
    y_label: &str,
    means: &[f64],
    errors: &[f64],
    bounds: YBounds,
) -> Result<()> {
    draw_bars(path, title, y_label, means, errors, bounds).map_err(crate::plot::render_error)
}

fn draw_bars(
    path: &Path,
    title: &str,
    y_label: &str,
    means: &[f64],
    errors: &[f64],
    bounds: YBounds,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut auto_min = 0.0f64;
    let mut auto_max = 0.0f64;
    for (&mean, &error) in means.iter().zip(errors) {
        auto_min = auto_min.min(mean - error);
        auto_max = auto_max.max(mean + error);
    }
    let (auto_min, auto_max) = crate::plot::padded(auto_min, auto_max);
    let (y_lo, y_hi) = bounds.resolve(auto_min, auto_max);
    let x_hi = means.len() as f64 * BAR_SLOT;

    let root = BitMapBackend::new(path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(90)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("System Parameter")
        .y_desc(y_label)
        .x_labels(means.len().min(46))
        .x_label_formatter(&|x| param_label((x / BAR_SLOT) as usize))
        .x_label_style(("sans-serif", 10).into_font().transform(FontTransform::Rotate90))
        .draw()?;

    for (i, (&mean, &error)) in means.iter().zip(errors).enumerate() {
        let x0 = i as f64 * BAR_SLOT;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, 0.0), (x0 + BAR_WIDTH, mean)],
            error_ratio_color(mean, error).filled(),
        )))?;
        chart.draw_series(std::iter::once(ErrorBar::new_vertical(
            x0 + BAR_WIDTH / 2.0,
            mean - error,
            mean,
            mean + error,
            BLACK.filled(),
            10,
        )))?;
    }

    root.present()?;
    Ok(())
}

/// Dump the numbers behind the bar charts: a header of parameter
/// names, then per feature its mean row and a `stdev:` row. Every cell
/// is comma-terminated the way the downstream spreadsheets expect.
pub fn write_bar_data(
    path: &Path,
    feature_names: &[String],
    means: &[Vec<f64>],
    errors: &[Vec<f64>],
    param_names: &[String],
) -> Result<()> {
    let mut out = String::from("Feature,");
    for name in param_names {
        out.push_str(name);
        out.push(',');
    }
    out.push('\n');
    for (feature, (row, errs)) in means.iter().zip(errors).enumerate() {
        out.push('\n');
        if let Some(name) = feature_names.get(feature) {
            out.push_str(name);
            out.push(',');
        }
        for value in row {
            out.push_str(&value.to_string());
            out.push(',');
        }
        out.push_str("\nstdev:,");
        for value in errs {
            out.push_str(&value.to_string());
            out.push(',');
        }
    }
    std::fs::write(path, out).map_err(|e| ToolError::file_access(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_data_layout_matches_the_spreadsheet_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bar_graph_data_normalized.csv");
        write_bar_data(
            &path,
            &["period".to_string(), "amplitude".to_string()],
            &[vec![1.5, 2.0], vec![3.0, 4.5]],
            &[vec![0.1, 0.2], vec![0.3, 0.4]],
            &["MSH1".to_string(), "MSH7".to_string()],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Feature,MSH1,MSH7,\n\
             \n\
             period,1.5,2,\n\
             stdev:,0.1,0.2,\n\
             amplitude,3,4.5,\n\
             stdev:,0.3,0.4,"
        );
    }

    #[test]
    fn bars_render_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("period.png");
        sensitivity_bars(
            &path,
            "period",
            "Normalized Sensitivity (%)",
            &[1.0, -2.0, 3.0],
            &[0.2, 0.4, 0.1],
            YBounds::default(),
        )
        .unwrap();
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
