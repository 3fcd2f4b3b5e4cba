use std::path::Path;

use crate::error::{Result, ToolError};
use crate::params::sets;

/// Number of rates in the master layout.
pub const MASTER_SIZE: usize = 88;

// Each layout lists, per position, the equivalent rate index in the
// master (88-rate) layout.
const FORMAT_27: [usize; 27] = [
    0, 1, 3, 5, 6, 7, 9, 11, 12, 13, 15, 17, 18, 19, 21, 23, 69, 70, 72, 74, 75, 76, 78, 80, 81,
    82, 87,
];

const FORMAT_45: [usize; 45] = [
    0, 1, 3, 5, 6, 7, 9, 11, 12, 13, 15, 17, 18, 19, 21, 23, 24, 25, 27, 29, 31, 36, 39, 40, 42,
    44, 46, 51, 54, 55, 57, 59, 61, 66, 69, 70, 72, 74, 75, 76, 78, 80, 81, 82, 87,
];

const FORMAT_65: [usize; 65] = [
    0, 1, 2, 3, 5, 6, 7, 8, 9, 11, 12, 13, 14, 15, 17, 18, 19, 20, 21, 23, 24, 25, 26, 27, 29, 30,
    31, 33, 34, 36, 39, 40, 41, 42, 44, 45, 46, 48, 49, 51, 54, 55, 56, 57, 59, 60, 61, 63, 64,
    66, 69, 70, 71, 72, 74, 75, 76, 77, 78, 80, 81, 82, 83, 84, 87,
];

const FORMAT_88: [usize; 88] = {
    let mut identity = [0; 88];
    let mut i = 0;
    while i < 88 {
        identity[i] = i;
        i += 1;
    }
    identity
};

/// The master-layout index map for a set layout, keyed by its size.
pub fn layout(size: usize) -> Option<&'static [usize]> {
    match size {
        27 => Some(&FORMAT_27),
        45 => Some(&FORMAT_45),
        65 => Some(&FORMAT_65),
        88 => Some(&FORMAT_88),
        _ => None,
    }
}

/// Convert one set between layouts. Positions the source layout never
/// maps stay `"0"` in the master, so narrowing and widening both work.
pub fn convert_set(values: &[String], output_size: usize) -> Result<Vec<String>> {
    let input_layout =
        layout(values.len()).ok_or(ToolError::UnknownSetLayout(values.len()))?;
    let output_layout = layout(output_size).ok_or(ToolError::UnknownSetLayout(output_size))?;

    let mut master = vec!["0".to_string(); MASTER_SIZE];
    for (value, &slot) in values.iter().zip(input_layout) {
        master[slot] = value.clone();
    }
    Ok(output_layout.iter().map(|&slot| master[slot].clone()).collect())
}

/// Convert a whole parameter-set file; the input layout is inferred from
/// the first set. Returns how many sets were converted.
pub fn convert_file(input: &Path, output: &Path, output_size: usize) -> Result<usize> {
    let input_sets = sets::read_sets(input)?;
    let mut converted = Vec::with_capacity(input_sets.len());
    let mut input_size = None;
    for set in &input_sets {
        match input_size {
            None => input_size = Some(set.len()),
            Some(size) if size != set.len() => {
                return Err(ToolError::BadFormat {
                    what: "parameter sets",
                    detail: format!(
                        "sets of mixed sizes: expected {} values, found {}",
                        size,
                        set.len()
                    ),
                });
            }
            Some(_) => {}
        }
        converted.push(convert_set(set, output_size)?);
    }
    sets::write_sets(output, &converted)?;
    Ok(converted.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stringify(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn every_layout_is_strictly_increasing() {
        for size in [27, 45, 65, 88] {
            let map = layout(size).unwrap();
            assert_eq!(map.len(), size);
            for pair in map.windows(2) {
                assert!(pair[0] < pair[1]);
            }
            assert!(*map.last().unwrap() < MASTER_SIZE);
        }
    }

    #[test]
    fn widening_fills_unmapped_slots_with_zero() {
        let narrow: Vec<String> = (0..27).map(|i| format!("v{}", i)).collect();
        let wide = convert_set(&narrow, 88).unwrap();
        assert_eq!(wide.len(), 88);
        // Mapped positions carry their values; position 2 is unmapped in
        // the 27-rate layout.
        assert_eq!(wide[0], "v0");
        assert_eq!(wide[1], "v1");
        assert_eq!(wide[2], "0");
        assert_eq!(wide[3], "v2");
        assert_eq!(wide[87], "v26");
    }

    #[test]
    fn widen_then_narrow_is_identity() {
        let original: Vec<String> = (0..45).map(|i| format!("{}.5", i)).collect();
        let wide = convert_set(&original, 88).unwrap();
        let back = convert_set(&wide, 45).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn narrowing_drops_unshared_rates() {
        let wide = stringify(&["a"; 88]);
        let narrow = convert_set(&wide, 27).unwrap();
        assert_eq!(narrow.len(), 27);
        assert!(narrow.iter().all(|v| v == "a"));
    }

    #[test]
    fn unknown_layout_is_an_error() {
        let odd = stringify(&["1", "2", "3"]);
        assert!(matches!(
            convert_set(&odd, 88),
            Err(ToolError::UnknownSetLayout(3))
        ));
        let fine = stringify(&["1"; 45]);
        assert!(matches!(
            convert_set(&fine, 48),
            Err(ToolError::UnknownSetLayout(48))
        ));
    }

    #[test]
    fn convert_file_reports_mixed_sizes() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let set27 = vec!["1"; 27].join(",");
        let set45 = vec!["1"; 45].join(",");
        writeln!(file, "{}\n{}", set27, set45).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.params");
        let err = convert_file(file.path(), &out, 88).unwrap_err();
        assert!(err.to_string().contains("mixed sizes"));
    }
}
