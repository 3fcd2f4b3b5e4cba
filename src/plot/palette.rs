use plotters::style::RGBColor;

/// Concentration shades from faint pink to black. The trailing white is
/// reserved for cells with no protein at all; the normal shade index
/// never reaches it.
pub const RED_SHADES: [RGBColor; 10] = [
    RGBColor(0xFE, 0xB4, 0xEF),
    RGBColor(0xFE, 0xB4, 0xEF),
    RGBColor(0xFE, 0x5A, 0x77),
    RGBColor(0xFE, 0x2D, 0x3B),
    RGBColor(0xFF, 0x00, 0x00),
    RGBColor(0xBF, 0x00, 0x00),
    RGBColor(0x7F, 0x00, 0x00),
    RGBColor(0x3F, 0x00, 0x00),
    RGBColor(0x00, 0x00, 0x00),
    RGBColor(0xFF, 0xFF, 0xFF),
];

/// Fill for cells that do not exist at a time step.
pub const MISSING_CELL: RGBColor = RGBColor(0xEE, 0xE5, 0xDE);

/// Hexagon outline in the tissue snapshots.
pub const CELL_BORDER: RGBColor = RGBColor(0xFC, 0xC7, 0x5E);

/// The six mutants every feature plot covers, in plotting order.
/// Wildtype comes first: it sets the normalization and the
/// spreadsheet headers.
pub const MUTANTS: [&str; 6] = ["wildtype", "delta", "her1", "her7", "her7her13", "her13"];

/// Line colors matching [`MUTANTS`].
pub const MUTANT_COLORS: [RGBColor; 6] = [
    RGBColor(0, 0, 0),
    RGBColor(0, 0, 255),
    RGBColor(0, 128, 0),
    RGBColor(255, 0, 0),
    RGBColor(0, 255, 255),
    RGBColor(255, 0, 255),
];

/// Cell-trace colors cycle red, green, blue, cyan by column.
pub const TRACE_COLORS: [RGBColor; 4] = [
    RGBColor(255, 0, 0),
    RGBColor(0, 128, 0),
    RGBColor(0, 0, 255),
    RGBColor(0, 255, 255),
];

/// Each nominal set gets its own line color in the elasticity plots,
/// spread over the red channel with a scrambled blue channel.
pub fn nominal_set_color(index: usize, total: usize) -> RGBColor {
    let r = index as f64 / total.max(1) as f64;
    let b = ((index * index) % 17) as f64 / 17.0;
    RGBColor((r * 255.0) as u8, (0.1 * 255.0) as u8, (b * 255.0) as u8)
}

/// Sensitivity bars redden as the error bar grows relative to the bar.
pub fn error_ratio_color(mean: f64, error: f64) -> RGBColor {
    let ratio = (error / mean.abs().max(0.00001)).abs().min(1.0);
    RGBColor((ratio * 255.0) as u8, (0.4 * 255.0) as u8, (0.6 * 255.0) as u8)
}

/// Map a concentration onto `shades` spread over `[min, max]`. `steps`
/// is how many shades the top of the range lands on; the density plot
/// spreads over all ten while the snapshots stop short of white.
pub fn shade_index(value: f64, min: f64, max: f64, steps: usize) -> usize {
    let spread = max - min;
    if spread <= 0.0 {
        return 0;
    }
    let index = ((value - min) / spread * steps as f64) as i64;
    index.clamp(0, RED_SHADES.len() as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shade_index_spreads_over_range() {
        assert_eq!(shade_index(0.0, 0.0, 10.0, 9), 0);
        assert_eq!(shade_index(5.0, 0.0, 10.0, 9), 4);
        // the density table adds one to its max, so the top shade
        // stays short of white
        assert_eq!(shade_index(9.0, 0.0, 10.0, 9), 8);
    }

    #[test]
    fn shade_index_clamps_out_of_range() {
        assert_eq!(shade_index(-3.0, 0.0, 10.0, 9), 0);
        assert_eq!(shade_index(99.0, 0.0, 10.0, 9), 9);
        // degenerate range falls back to the first shade
        assert_eq!(shade_index(5.0, 5.0, 5.0, 9), 0);
    }

    #[test]
    fn error_color_saturates() {
        let flat = error_ratio_color(10.0, 0.0);
        assert_eq!(flat.0, 0);
        let noisy = error_ratio_color(0.5, 5.0);
        assert_eq!(noisy.0, 255);
        // zero mean divides by the floor instead
        let zero_mean = error_ratio_color(0.0, 1.0);
        assert_eq!(zero_mean.0, 255);
    }

    #[test]
    fn nominal_colors_differ_between_sets() {
        let a = nominal_set_color(0, 5);
        let b = nominal_set_color(3, 5);
        assert_ne!((a.0, a.2), (b.0, b.2));
    }
}
