//! PNG rendering for every chart the tools produce. Drawing goes
//! through the `plotters` bitmap backend; each submodule wraps the
//! backend errors into [`ToolError::Render`] so callers stay on the
//! crate's own error type.

pub mod bars;
pub mod density;
pub mod errorbars;
pub mod lines;
pub mod palette;
pub mod snapshots;

use crate::error::ToolError;

pub use bars::{sensitivity_bars, write_bar_data};
pub use density::{build_density_table, render_density, DensityOptions, DensityTable};
pub use errorbars::{error_bar_chart, write_mutant_csv, LegendCorner, MutantSeries};
pub use lines::{average_trace, cell_traces, elasticity_lines};
pub use snapshots::render_snapshots;

/// Fixed y-axis bounds from the command line. A lone minimum or
/// maximum implies the other end the same way the charts always have:
/// `min` alone caps at `max(1.5, 2*min)`, `max` alone floors at
/// `min(0, 2*max)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl YBounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        YBounds { min, max }
    }

    /// Pick the final axis range, falling back to the autoscaled one.
    pub fn resolve(&self, auto_min: f64, auto_max: f64) -> (f64, f64) {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => (lo, hi),
            (Some(lo), None) => (lo, (2.0 * lo).max(1.5)),
            (None, Some(hi)) => ((2.0 * hi).min(0.0), hi),
            (None, None) => (auto_min, auto_max),
        }
    }
}

/// Pad an autoscaled range so lines do not sit on the frame.
pub(crate) fn padded(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let range = (max - min).abs();
    let pad = if range > 1e-6 {
        0.1 * range
    } else {
        0.1 * max.abs().max(1.0)
    };
    (min - pad, max + pad)
}

pub(crate) fn render_error(err: Box<dyn std::error::Error>) -> ToolError {
    ToolError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_fill_in_the_missing_end() {
        let only_min = YBounds::new(Some(0.5), None);
        assert_eq!(only_min.resolve(-2.0, 2.0), (0.5, 1.5));
        let big_min = YBounds::new(Some(4.0), None);
        assert_eq!(big_min.resolve(-2.0, 2.0), (4.0, 8.0));

        let only_max = YBounds::new(None, Some(10.0));
        assert_eq!(only_max.resolve(-2.0, 2.0), (0.0, 10.0));
        let negative_max = YBounds::new(None, Some(-1.0));
        assert_eq!(negative_max.resolve(-2.0, 2.0), (-2.0, -1.0));
    }

    #[test]
    fn both_bounds_win_over_autoscale() {
        let both = YBounds::new(Some(-1.0), Some(1.0));
        assert_eq!(both.resolve(-50.0, 50.0), (-1.0, 1.0));
    }

    #[test]
    fn unset_bounds_autoscale() {
        let auto = YBounds::default();
        assert_eq!(auto.resolve(-2.0, 2.0), (-2.0, 2.0));
    }

    #[test]
    fn padding_keeps_degenerate_ranges_usable() {
        let (lo, hi) = padded(5.0, 5.0);
        assert!(lo < 5.0 && hi > 5.0);
        let (lo, hi) = padded(f64::INFINITY, 0.0);
        assert_eq!((lo, hi), (0.0, 1.0));
    }
}
