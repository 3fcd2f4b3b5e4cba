use std::path::Path;

use plotters::prelude::*;

use crate::cons::ConsData;
use crate::error::Result;
use crate::plot::palette::{nominal_set_color, TRACE_COLORS};
use crate::plot::YBounds;

/// Elasticity line plot for one (parameter, feature) pair: perturbed
/// over nominal feature value against the perturbation percentage, one
/// line per nominal set.
pub fn elasticity_lines(
    path: &Path,
    title: &str,
    x_label: &str,
    percent: f64,
    points: usize,
    sets: &[Vec<f64>],
    bounds: YBounds,
) -> Result<()> {
    draw_elasticity(path, title, x_label, percent, points, sets, bounds)
        .map_err(crate::plot::render_error)
}

fn draw_elasticity(
    path: &Path,
    title: &str,
    x_label: &str,
    percent: f64,
    points: usize,
    sets: &[Vec<f64>],
    bounds: YBounds,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let step = percent / points as f64;
    let xvals: Vec<f64> = (0..=2 * points)
        .map(|i| (i as f64 - points as f64) * step)
        .collect();

    let mut auto_min = f64::INFINITY;
    let mut auto_max = f64::NEG_INFINITY;
    for set in sets {
        for &y in set {
            auto_min = auto_min.min(y);
            auto_max = auto_max.max(y);
        }
    }
    let (auto_min, auto_max) = crate::plot::padded(auto_min, auto_max);
    let (y_lo, y_hi) = bounds.resolve(auto_min, auto_max);

    let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-percent..percent, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("(Perturbed value) / (Nominal value)")
        .draw()?;

    for (n, set) in sets.iter().enumerate() {
        let color = nominal_set_color(n, sets.len());
        let line: Vec<(f64, f64)> = xvals.iter().copied().zip(set.iter().copied()).collect();
        chart.draw_series(LineSeries::new(line.iter().copied(), &color))?;
        chart.draw_series(
            line.iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

/// How a cell column reads out of the dump: index of the first and
/// last step where the cell exists, or nothing if it never does.
fn trace_span(data: &ConsData, cell: usize) -> Option<(usize, usize)> {
    let exists = |step: &crate::cons::ConsStep| step.levels[cell] != -1.0;
    let start = data.steps.iter().position(exists)?;
    let end = data.steps.iter().rposition(exists)?;
    Some((start, end))
}

/// Plot every cell's concentration against time. Cells enter and leave
/// the view staggered, so each trace is trimmed to the steps where the
/// cell exists (`-1` marks a cell with no data).
pub fn cell_traces(path: &Path, data: &ConsData, step_size: f64) -> Result<()> {
    draw_traces(path, data, step_size).map_err(crate::plot::render_error)
}

fn draw_traces(
    path: &Path,
    data: &ConsData,
    step_size: f64,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    let mut traces = Vec::new();
    for cell in 0..data.cells() {
        let Some((start, end)) = trace_span(data, cell) else {
            continue;
        };
        let points: Vec<(f64, f64)> = data.steps[start..=end]
            .iter()
            .map(|step| (step.time as f64 * step_size, step.levels[cell] as f64))
            .collect();
        for &(_, y) in &points {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        traces.push((cell, points));
    }

    let x_max = data
        .steps
        .last()
        .map(|step| step.time as f64 * step_size)
        .unwrap_or(1.0);
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
        .x_desc("Time (min)")
        .y_desc("Concentration")
        .draw()?;

    for (cell, points) in traces {
        let color = TRACE_COLORS[(cell + 1) % TRACE_COLORS.len()];
        chart.draw_series(LineSeries::new(points, &color))?;
    }

    root.present()?;
    Ok(())
}

/// Plot the tissue-wide average concentration at each step, skipping
/// cells that do not exist yet.
pub fn average_trace(path: &Path, title: &str, data: &ConsData, step_size: f64) -> Result<()> {
    draw_average(path, title, data, step_size).map_err(crate::plot::render_error)
}

fn draw_average(
    path: &Path,
    title: &str,
    data: &ConsData,
    step_size: f64,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut points = Vec::with_capacity(data.steps.len());
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for step in &data.steps {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for &level in &step.levels {
            if level != -1.0 {
                sum += level as f64;
                count += 1;
            }
        }
        if count == 0 {
            continue;
        }
        let avg = sum / count as f64;
        y_min = y_min.min(avg);
        y_max = y_max.max(avg);
        points.push((step.time as f64 * step_size, avg));
    }

    let x_max = points.last().map(|&(x, _)| x).unwrap_or(1.0);
    let (y_lo, y_hi) = crate::plot::padded(y_min, y_max);

    let root = BitMapBackend::new(path, (1000, 700)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max.max(1.0), y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Time (min)")
        .y_desc("Average concentration")
        .draw()?;

    chart.draw_series(LineSeries::new(points, &BLUE))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cons::ConsStep;

    fn staggered_data() -> ConsData {
        ConsData {
            width: 2,
            height: 1,
            steps: vec![
                ConsStep {
                    time: 0,
                    levels: vec![-1.0, 10.0],
                },
                ConsStep {
                    time: 60,
                    levels: vec![5.0, 20.0],
                },
                ConsStep {
                    time: 120,
                    levels: vec![7.0, -1.0],
                },
            ],
        }
    }

    #[test]
    fn spans_trim_the_missing_markers() {
        let data = staggered_data();
        assert_eq!(trace_span(&data, 0), Some((1, 2)));
        assert_eq!(trace_span(&data, 1), Some((0, 1)));
    }

    #[test]
    fn span_is_none_for_a_cell_that_never_exists() {
        let data = ConsData {
            width: 1,
            height: 1,
            steps: vec![ConsStep {
                time: 0,
                levels: vec![-1.0],
            }],
        };
        assert_eq!(trace_span(&data, 0), None);
    }

    #[test]
    fn traces_render_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.png");
        cell_traces(&path, &staggered_data(), 0.01).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn average_skips_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells_avg.png");
        average_trace(&path, "wildtype average", &staggered_data(), 0.01).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn elasticity_renders_one_line_per_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("period_0on1.png");
        elasticity_lines(
            &path,
            "period",
            "MSH1 perturbation (%)",
            20.0,
            4,
            &[vec![0.9, 0.95, 0.97, 0.99, 1.0, 1.01, 1.02, 1.05, 1.1]],
            YBounds::default(),
        )
        .unwrap();
        assert!(path.exists());
    }
}
