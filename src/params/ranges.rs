use std::path::Path;

use crate::error::{parse_float, Result, ToolError};

/// One named parameter range, `name [low,high]` on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamRange {
    pub name: String,
    pub low: f64,
    pub high: f64,
}

/// Parse a ranges file. Blank lines and `#` comments are skipped, and
/// tabs count as spaces around the name.
pub fn read_ranges(path: &Path) -> Result<Vec<ParamRange>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ToolError::file_access(path, e))?;
    let mut ranges = Vec::new();
    for line in text.lines() {
        let line = line.replace('\t', " ");
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        ranges.push(parse_range_line(line)?);
    }
    Ok(ranges)
}

fn parse_range_line(line: &str) -> Result<ParamRange> {
    let open = line.find('[').ok_or_else(|| ToolError::BadFormat {
        what: "parameter range",
        detail: format!("no '[' in {:?}", line),
    })?;
    let close = line.rfind(']').ok_or_else(|| ToolError::BadFormat {
        what: "parameter range",
        detail: format!("no ']' in {:?}", line),
    })?;
    let name = line[..open].trim().to_string();
    let body = &line[open + 1..close];
    let (low, high) = body.split_once(',').ok_or_else(|| ToolError::BadFormat {
        what: "parameter range",
        detail: format!("no ',' between bounds in {:?}", line),
    })?;
    Ok(ParamRange {
        name,
        low: parse_float(low)?,
        high: parse_float(high)?,
    })
}

/// Write ranges in the same `name [low,high]` layout they were read in.
pub fn write_ranges(path: &Path, ranges: &[ParamRange]) -> Result<()> {
    let mut out = String::new();
    for range in ranges {
        out.push_str(&format!("{} [{},{}]\n", range.name, range.low, range.high));
    }
    std::fs::write(path, out).map_err(|e| ToolError::file_access(path, e))
}

/// Round half away from zero at `digits` decimal places.
fn round_to_digits(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Narrow each range around the surviving sets: the new bounds are the
/// per-parameter mean plus/minus `deviations` standard deviations,
/// clamped so a range never grows past its current bounds.
pub fn refine(
    ranges: &[ParamRange],
    sets: &[Vec<f64>],
    deviations: f64,
    digits: i32,
) -> Result<Vec<ParamRange>> {
    for set in sets {
        if set.len() != ranges.len() {
            return Err(ToolError::BadFormat {
                what: "parameter sets",
                detail: format!(
                    "set has {} values but there are {} ranges",
                    set.len(),
                    ranges.len()
                ),
            });
        }
    }
    if sets.is_empty() {
        return Err(ToolError::BadFormat {
            what: "parameter sets",
            detail: "no sets to refine from".to_string(),
        });
    }

    let count = sets.len() as f64;
    let mut refined = Vec::with_capacity(ranges.len());
    for (i, range) in ranges.iter().enumerate() {
        let mean = sets.iter().map(|set| set[i]).sum::<f64>() / count;
        let variance =
            sets.iter().map(|set| (set[i] - mean).powi(2)).sum::<f64>() / count;
        let spread = deviations * variance.sqrt();
        refined.push(ParamRange {
            name: range.name.clone(),
            low: range.low.max(round_to_digits(mean - spread, digits)),
            high: range.high.min(round_to_digits(mean + spread, digits)),
        });
    }
    Ok(refined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_names_and_bounds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# synthesis rates").unwrap();
        writeln!(file, "msh1 [30.0,65.0]").unwrap();
        writeln!(file, "msh7\t[28.0,63.0]").unwrap();
        writeln!(file).unwrap();
        let ranges = read_ranges(file.path()).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].name, "msh1");
        assert_eq!(ranges[0].low, 30.0);
        assert_eq!(ranges[1].name, "msh7");
        assert_eq!(ranges[1].high, 63.0);
    }

    #[test]
    fn rejects_lines_without_brackets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "msh1 30.0,65.0").unwrap();
        let err = read_ranges(file.path()).unwrap_err();
        assert!(err.to_string().contains('['));
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_to_digits(0.000125, 5), 0.00013);
        assert_eq!(round_to_digits(-0.000125, 5), -0.00013);
        assert_eq!(round_to_digits(1.234567, 2), 1.23);
    }

    #[test]
    fn refine_narrows_around_the_mean() {
        let ranges = vec![ParamRange {
            name: "msh1".to_string(),
            low: 0.0,
            high: 100.0,
        }];
        let sets = vec![vec![40.0], vec![50.0], vec![60.0]];
        let refined = refine(&ranges, &sets, 2.0, 5).unwrap();
        // mean 50, population stddev sqrt(200/3) ~= 8.16497
        assert_eq!(refined[0].low, 33.67007);
        assert_eq!(refined[0].high, 66.32993);
    }

    #[test]
    fn refine_never_widens_past_current_bounds() {
        let ranges = vec![ParamRange {
            name: "msh1".to_string(),
            low: 45.0,
            high: 55.0,
        }];
        let sets = vec![vec![10.0], vec![90.0]];
        let refined = refine(&ranges, &sets, 2.0, 5).unwrap();
        assert_eq!(refined[0].low, 45.0);
        assert_eq!(refined[0].high, 55.0);
    }

    #[test]
    fn refine_checks_set_width() {
        let ranges = vec![ParamRange {
            name: "msh1".to_string(),
            low: 0.0,
            high: 1.0,
        }];
        let err = refine(&ranges, &[vec![0.5, 0.5]], 2.0, 5).unwrap_err();
        assert!(err.to_string().contains("1 ranges"));
    }

    #[test]
    fn write_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranges.txt");
        let ranges = vec![ParamRange {
            name: "psh1".to_string(),
            low: 0.004,
            high: 0.3,
        }];
        write_ranges(&path, &ranges).unwrap();
        assert_eq!(read_ranges(&path).unwrap(), ranges);
    }
}
