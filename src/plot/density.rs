use std::path::Path;

use plotters::prelude::*;

use crate::cons::ConsData;
use crate::error::{Result, ToolError};
use crate::plot::palette::{shade_index, MISSING_CELL, RED_SHADES};

/// Marker for table slots where no cell exists: not yet split off, or
/// already arrested.
const NO_CELL: f64 = -10.0;

/// Timing of the simulated tissue, all in raw time steps.
#[derive(Debug, Clone)]
pub struct DensityOptions {
    /// Steps before the tissue starts growing; everything earlier is
    /// dropped.
    pub steps_til_growth: usize,
    /// Steps between cell splits while growing, and between arrests
    /// after.
    pub steps_to_split: usize,
    /// Cells across the tissue when growth starts.
    pub initial_width: usize,
    /// Keep every n-th time step.
    pub granularity: usize,
    /// Crop window, relative to the end of `steps_til_growth`.
    pub start_step: usize,
    pub end_step: usize,
}

impl Default for DensityOptions {
    fn default() -> Self {
        DensityOptions {
            steps_til_growth: 60000,
            steps_to_split: 600,
            initial_width: 10,
            granularity: 1,
            start_step: 0,
            end_step: 60000,
        }
    }
}

/// Column-averaged concentrations per cell row over time, arranged so
/// every cell that ever exists has its own row.
#[derive(Debug, Clone)]
pub struct DensityTable {
    /// Indexed `[cell row][time column]` after cropping.
    pub rows: Vec<Vec<f64>>,
    pub total_width: usize,
    pub steps: usize,
    pub min_con: f64,
    pub max_con: f64,
}

fn bad_options(detail: String) -> ToolError {
    ToolError::BadFormat {
        what: "density options",
        detail,
    }
}

/// Collapse the dump into per-row averages, tracking the growth phase
/// (the posterior-most cell is always the data's first column, so rows
/// shift as cells split off) and the arrest phase after the tissue is
/// full, where the oldest live row freezes at every split interval.
pub fn build_density_table(data: &ConsData, opts: &DensityOptions) -> Result<DensityTable> {
    let width = data.width;
    let height = data.height;
    if opts.granularity == 0 {
        return Err(bad_options("granularity must be at least 1".to_string()));
    }
    if opts.initial_width == 0 || opts.initial_width > width {
        return Err(bad_options(format!(
            "initial width {} does not fit a {}-cell-wide tissue",
            opts.initial_width, width
        )));
    }
    let split = opts.steps_to_split / opts.granularity;
    if split == 0 {
        return Err(bad_options(format!(
            "granularity {} swallows the {}-step split interval",
            opts.granularity, opts.steps_to_split
        )));
    }
    if data.steps.len() < opts.steps_til_growth {
        return Err(bad_options(format!(
            "file has {} steps but growth starts at {}",
            data.steps.len(),
            opts.steps_til_growth
        )));
    }

    let levels: Vec<&Vec<f32>> = data.steps[opts.steps_til_growth..]
        .iter()
        .step_by(opts.granularity)
        .map(|step| &step.levels)
        .collect();
    let total_steps = levels.len();
    let steps_when_full = (width - opts.initial_width) * split;
    if total_steps < steps_when_full {
        return Err(bad_options(format!(
            "growth takes {} steps but the file only covers {}",
            steps_when_full, total_steps
        )));
    }
    let total_width = width + (total_steps - steps_when_full) / split;

    let mut table = vec![vec![0.0f64; total_steps]; total_width];
    let mut min_con = f64::INFINITY;
    let mut max_con = 0.0f64;
    let column_average = |column: usize, cell_x: usize| -> f64 {
        let sum: f64 = (0..height)
            .map(|cell_y| levels[column][cell_y * width + cell_x] as f64)
            .sum();
        sum / height as f64
    };

    // Growth: the tissue widens by one cell every split interval, and
    // the newest cell is always the first in the data row.
    let mut current_width = opts.initial_width;
    let mut row_start = current_width - 1;
    let mut steps_elapsed = 0;
    for column in 0..steps_when_full {
        for row in 0..current_width {
            let avg = column_average(column, row_start - row);
            table[row][column] = avg;
            min_con = min_con.min(avg);
            max_con = max_con.max(avg);
        }
        for row in current_width..total_width {
            table[row][column] = NO_CELL;
        }
        steps_elapsed += 1;
        if steps_elapsed == split {
            current_width += 1;
            row_start += 1;
            steps_elapsed = 0;
        }
    }

    // Arrest: the tissue stays `width` cells wide but drifts upward in
    // the table as anterior rows freeze.
    let mut arrested: Vec<usize> = Vec::new();
    let row_start = width - 1;
    let mut row_offset = 0;
    for column in steps_when_full..total_steps {
        for row in width..total_width {
            table[row][column] = NO_CELL;
        }
        for row in 0..width {
            let avg = column_average(column, (row_start - row) % width);
            table[row + row_offset][column] = avg;
            min_con = min_con.min(avg);
            max_con = max_con.max(avg);
        }
        for &row in &arrested {
            table[row][column] = NO_CELL;
        }
        steps_elapsed += 1;
        if steps_elapsed == split {
            arrested.push(row_offset);
            row_offset += 1;
            steps_elapsed = 0;
        }
    }
    // keep the top shade below pure white
    max_con += 1.0;

    let start = opts.start_step / opts.granularity;
    let end = opts.end_step / opts.granularity;
    if start > end || end > total_steps {
        return Err(bad_options(format!(
            "crop window [{}, {}) does not fit the {} recorded steps",
            start, end, total_steps
        )));
    }
    let rows: Vec<Vec<f64>> = table.iter().map(|row| row[start..end].to_vec()).collect();

    Ok(DensityTable {
        rows,
        total_width,
        steps: end - start,
        min_con,
        max_con,
    })
}

/// Paint the table into a pixel raster, oldest cells at the bottom.
pub fn render_density(
    path: &Path,
    table: &DensityTable,
    image_width: u32,
    image_height: u32,
) -> Result<()> {
    draw_density(path, table, image_width, image_height).map_err(crate::plot::render_error)
}

fn draw_density(
    path: &Path,
    table: &DensityTable,
    image_width: u32,
    image_height: u32,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (image_width, image_height)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_factor = table.steps as f64 / image_width as f64;
    let y_factor = table.total_width as f64 / image_height as f64;
    for i in 0..image_width {
        let x = (i as f64 * x_factor) as usize;
        for j in 0..image_height {
            let reverse_j = image_height - j - 1;
            let y = (reverse_j as f64 * y_factor) as usize;
            let con = table.rows[y][x];
            let color = if con == NO_CELL {
                MISSING_CELL
            } else {
                RED_SHADES[shade_index(con, table.min_con, table.max_con, RED_SHADES.len() - 1)]
            };
            root.draw_pixel((i as i32, j as i32), &color)?;
        }
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cons::ConsStep;

    /// 3-wide, 1-tall tissue over six steps, each cell's value encoding
    /// `step * 10 + position`.
    fn growth_fixture() -> ConsData {
        let steps = (0..6)
            .map(|s| ConsStep {
                time: s,
                levels: (0..3).map(|x| (s * 10 + x) as f32).collect(),
            })
            .collect();
        ConsData {
            width: 3,
            height: 1,
            steps,
        }
    }

    fn fixture_options() -> DensityOptions {
        DensityOptions {
            steps_til_growth: 0,
            steps_to_split: 2,
            initial_width: 2,
            granularity: 1,
            start_step: 0,
            end_step: 6,
        }
    }

    #[test]
    fn growth_and_arrest_lay_out_the_rows() {
        let table = build_density_table(&growth_fixture(), &fixture_options()).unwrap();
        assert_eq!(table.total_width, 5);
        assert_eq!(table.steps, 6);
        // newest cells stay in the low rows during growth, then rows
        // shift up as the anterior arrests
        assert_eq!(table.rows[0], vec![1.0, 11.0, 22.0, 32.0, -10.0, -10.0]);
        assert_eq!(table.rows[1], vec![0.0, 10.0, 21.0, 31.0, 42.0, 52.0]);
        assert_eq!(table.rows[2], vec![-10.0, -10.0, 20.0, 30.0, 41.0, 51.0]);
        assert_eq!(table.rows[3], vec![-10.0, -10.0, -10.0, -10.0, 40.0, 50.0]);
        assert_eq!(table.rows[4], vec![-10.0; 6]);
        assert_eq!(table.min_con, 0.0);
        // one past the true maximum so the darkest shade stays in range
        assert_eq!(table.max_con, 53.0);
    }

    #[test]
    fn crop_window_trims_the_columns() {
        let mut opts = fixture_options();
        opts.start_step = 2;
        opts.end_step = 4;
        let table = build_density_table(&growth_fixture(), &opts).unwrap();
        assert_eq!(table.steps, 2);
        assert_eq!(table.rows[1], vec![21.0, 31.0]);
    }

    #[test]
    fn granularity_subsamples_before_phases() {
        let mut opts = fixture_options();
        opts.granularity = 2;
        opts.steps_to_split = 2;
        opts.end_step = 6;
        // 6 steps become 3, the split interval becomes 1
        let table = build_density_table(&growth_fixture(), &opts).unwrap();
        assert_eq!(table.steps, 3);
        assert_eq!(table.total_width, 3 + (3 - 1) / 1);
    }

    #[test]
    fn short_file_is_rejected() {
        let mut opts = fixture_options();
        opts.steps_til_growth = 10;
        let err = build_density_table(&growth_fixture(), &opts).unwrap_err();
        assert!(err.to_string().contains("growth starts at 10"));

        let mut opts = fixture_options();
        opts.initial_width = 1;
        // growth now takes (3 - 1) * 2 = 4 steps, file has 6, fine;
        // but an 8-step growth phase is too long
        opts.steps_to_split = 4;
        let err = build_density_table(&growth_fixture(), &opts).unwrap_err();
        assert!(err.to_string().contains("only covers"));
    }

    #[test]
    fn bad_crop_window_is_rejected() {
        let mut opts = fixture_options();
        opts.end_step = 99;
        assert!(build_density_table(&growth_fixture(), &opts).is_err());
    }

    #[test]
    fn density_renders_to_png() {
        let table = build_density_table(&growth_fixture(), &fixture_options()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("st.png");
        render_density(&path, &table, 24, 10).unwrap();
        assert!(path.exists());
    }
}
