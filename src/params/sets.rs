use std::path::Path;

use crate::error::{parse_float, Result, ToolError};

/// Read a parameter-set file: one comma-separated set per line, with
/// blank lines and `#` comments skipped. Values stay as the exact text
/// they were written with.
pub fn read_sets(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = std::fs::read_to_string(path).map_err(|e| ToolError::file_access(path, e))?;
    Ok(text
        .lines()
        .filter(|line| is_set_line(line))
        .map(|line| line.split(',').map(|v| v.trim().to_string()).collect())
        .collect())
}

/// Read a parameter-set file with every value parsed as a float.
pub fn read_float_sets(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = std::fs::read_to_string(path).map_err(|e| ToolError::file_access(path, e))?;
    text.lines()
        .filter(|line| is_set_line(line))
        .map(|line| line.split(',').map(parse_float).collect())
        .collect()
}

/// Write one set per line, values joined with commas.
pub fn write_sets(path: &Path, sets: &[Vec<String>]) -> Result<()> {
    let mut out = String::new();
    for set in sets {
        out.push_str(&set.join(","));
        out.push('\n');
    }
    std::fs::write(path, out).map_err(|e| ToolError::file_access(path, e))
}

fn is_set_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let file = write_temp("# header comment\n1,2,3\n\n4,5,6\n");
        let sets = read_sets(file.path()).unwrap();
        assert_eq!(sets, vec![vec!["1", "2", "3"], vec!["4", "5", "6"]]);
    }

    #[test]
    fn values_keep_their_exact_text() {
        let file = write_temp("0.0050,63.70,1e-4\n");
        let sets = read_sets(file.path()).unwrap();
        assert_eq!(sets[0], vec!["0.0050", "63.70", "1e-4"]);
    }

    #[test]
    fn float_sets_parse_or_report_the_value() {
        let file = write_temp("1.5,2.5\n");
        assert_eq!(read_float_sets(file.path()).unwrap(), vec![vec![1.5, 2.5]]);

        let bad = write_temp("1.5,abc\n");
        let err = read_float_sets(bad.path()).unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_sets(Path::new("/no/such/sets.params")).unwrap_err();
        assert!(err.to_string().contains("/no/such/sets.params"));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.params");
        let sets = vec![vec!["1".to_string(), "2".to_string()]];
        write_sets(&path, &sets).unwrap();
        assert_eq!(read_sets(&path).unwrap(), sets);
    }
}
