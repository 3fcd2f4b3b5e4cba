use std::path::Path;

use crate::error::{Result, ToolError};

/// Pull the parameter sets out of an evolutionary-search log: each
/// `Found a good set` marker is followed by a line of the form
/// `score,v1,v2,...`; everything after the first comma is the set.
/// Returns how many sets were written.
pub fn extract_good_sets(input: &Path, output: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(input)
        .map_err(|e| ToolError::file_access(input, e))?;
    let lines: Vec<&str> = text.lines().collect();

    let mut sets = String::new();
    let mut found = 0;
    for (i, line) in lines.iter().enumerate() {
        if !line.contains("Found a good set") {
            continue;
        }
        // a marker on the last line has no set to collect
        let Some(next) = lines.get(i + 1) else {
            continue;
        };
        let set = match next.find(',') {
            Some(comma) => &next[comma + 1..],
            None => next,
        };
        sets.push_str(set);
        sets.push('\n');
        found += 1;
    }
    std::fs::write(output, sets).map_err(|e| ToolError::file_access(output, e))?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(log: &str) -> (usize, String) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("search.log");
        let output = dir.path().join("good.params");
        std::fs::write(&input, log).unwrap();
        let found = extract_good_sets(&input, &output).unwrap();
        (found, std::fs::read_to_string(&output).unwrap())
    }

    #[test]
    fn collects_the_line_after_each_marker() {
        let (found, sets) = extract(
            "generation 12\n\
             Found a good set:\n\
             0.000000,30.5,45.1,0.34\n\
             generation 13\n\
             Found a good set:\n\
             0.000000,29.9,44.8,0.33\n",
        );
        assert_eq!(found, 2);
        assert_eq!(sets, "30.5,45.1,0.34\n29.9,44.8,0.33\n");
    }

    #[test]
    fn line_without_a_comma_is_kept_whole() {
        let (found, sets) = extract("Found a good set\n30.5 45.1\n");
        assert_eq!(found, 1);
        assert_eq!(sets, "30.5 45.1\n");
    }

    #[test]
    fn marker_on_the_last_line_is_skipped() {
        let (found, sets) = extract("noise\nFound a good set:");
        assert_eq!(found, 0);
        assert_eq!(sets, "");
    }
}
