use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::warn;

use crate::cons::ConsData;
use crate::error::{Result, ToolError};
use crate::plot::palette::{shade_index, CELL_BORDER, RED_SHADES};

/// Time steps before this one never get a snapshot.
const FIRST_SNAPSHOT_STEP: usize = 50000;
/// Keep one frame out of every this many steps.
const SNAPSHOT_STRIDE: usize = 10;
/// Frame width in pixels, sized for 300 dpi print figures.
const FRAME_WIDTH: f64 = 960.0;

/// Render one hexagon-grid frame per sampled time step into
/// `directory`, named `0000.png` onward. Returns the written paths in
/// frame order.
pub fn render_snapshots(directory: &Path, data: &ConsData) -> Result<Vec<PathBuf>> {
    data.check_tissue_size()?;
    std::fs::create_dir_all(directory)
        .map_err(|source| ToolError::file_access(directory, source))?;
    let (min_con, max_con) = data.level_range();
    let mut written = Vec::new();
    for (index, step) in data.steps.iter().enumerate() {
        if index % SNAPSHOT_STRIDE != 0 || index < FIRST_SNAPSHOT_STEP {
            continue;
        }
        let frame = (index - FIRST_SNAPSHOT_STEP) / SNAPSHOT_STRIDE;
        let path = directory.join(format!("{frame:04}.png"));
        draw_frame(&path, data, &step.levels, min_con, max_con)
            .map_err(crate::plot::render_error)?;
        written.push(path);
    }
    Ok(written)
}

fn frame_geometry(width: usize, height: usize) -> (f64, (u32, u32)) {
    let edge = 2.0 * FRAME_WIDTH / (3 * width + 1) as f64;
    let size = (FRAME_WIDTH as u32, (edge * 1.73 * height as f64) as u32);
    (edge, size)
}

fn draw_frame(
    path: &Path,
    data: &ConsData,
    levels: &[f32],
    min_con: f32,
    max_con: f32,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (edge, size) = frame_geometry(data.width, data.height);
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let begin = (edge, edge * 1.73 / 2.0);
    let mut center = begin;
    for i in 0..data.height {
        for j in 0..data.width {
            // odd columns wrap: half of their last-row cell pokes out
            // above the first row
            if i == 0 && j % 2 == 1 {
                let wrapped = (data.height - 1) * data.width + j;
                draw_cell(&root, levels[wrapped], edge, (center.0, 0.0), min_con, max_con)?;
            }
            draw_cell(&root, levels[i * data.width + j], edge, center, min_con, max_con)?;
            if j % 2 == 0 {
                center = (center.0 + edge * 1.5, center.1 + edge * 1.73 / 2.0);
            } else {
                center = (center.0 + edge * 1.5, center.1 - edge * 1.73 / 2.0);
            }
        }
        center = (begin.0, begin.1 + edge * 1.73 * (i + 1) as f64);
    }

    root.present()?;
    Ok(())
}

fn draw_cell(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    level: f32,
    edge: f64,
    center: (f64, f64),
    min_con: f32,
    max_con: f32,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    if level != 0.0 && (level < min_con || level > max_con) {
        warn!(level, min_con, max_con, "concentration outside the color range");
    }
    let shade = cell_shade(level, min_con, max_con);
    root.draw(&Polygon::new(hexagon(center, edge), CELL_BORDER.filled()))?;
    root.draw(&Polygon::new(hexagon(center, edge - 2.0), RED_SHADES[shade].filled()))?;
    Ok(())
}

/// Zero concentration renders white; everything else maps onto the red
/// gradient.
fn cell_shade(level: f32, min_con: f32, max_con: f32) -> usize {
    if level == 0.0 {
        RED_SHADES.len() - 1
    } else {
        shade_index(level as f64, min_con as f64, max_con as f64, RED_SHADES.len() - 2)
    }
}

fn hexagon(center: (f64, f64), edge: f64) -> Vec<(i32, i32)> {
    let half = edge / 2.0;
    let rad = edge * 1.73 / 2.0;
    let (x, y) = center;
    [
        (x - half, y - rad),
        (x + half, y - rad),
        (x + edge, y),
        (x + half, y + rad),
        (x - half, y + rad),
        (x - edge, y),
    ]
    .iter()
    .map(|&(px, py)| (px as i32, py as i32))
    .collect()
}
