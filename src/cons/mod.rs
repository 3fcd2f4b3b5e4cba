//! Readers for the simulation's concentration dumps. ASCII `.cons`
//! files start with `width height` on the first line; every later line
//! is a time step followed by `width * height` space-separated levels.
//! Binary `.bcons` files hold the same data as little-endian `i32`
//! dimensions, then per step an `i32` time and `width * height` `f32`
//! levels.

use std::path::Path;

use crate::error::{parse_float, parse_int, Result, ToolError};

/// One recorded time step, levels laid out row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsStep {
    pub time: i32,
    pub levels: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsData {
    pub width: usize,
    pub height: usize,
    pub steps: Vec<ConsStep>,
}

impl ConsData {
    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    /// The level of the cell at `(column, row)` during a step.
    pub fn level(&self, step: usize, column: usize, row: usize) -> f32 {
        self.steps[step].levels[row * self.width + column]
    }

    /// Smallest and largest level over every step. The maximum never
    /// drops below zero so an all-negative file still yields a usable
    /// shade range.
    pub fn level_range(&self) -> (f32, f32) {
        let mut min = f32::INFINITY;
        let mut max = 0.0f32;
        for step in &self.steps {
            for &level in &step.levels {
                min = min.min(level);
                max = max.max(level);
            }
        }
        (min, max)
    }

    /// Hexagon tissue renders need at least 4x4 cells and even
    /// dimensions so the honeycomb rows pair up.
    pub fn check_tissue_size(&self) -> Result<()> {
        if self.width < 4 || self.height < 4 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ToolError::TissueSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Read a concentrations file, picking the decoder from the extension.
pub fn read_cons(path: &Path) -> Result<ConsData> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bcons") => read_binary(path),
        _ => read_ascii(path),
    }
}

pub fn read_ascii(path: &Path) -> Result<ConsData> {
    let text =
        std::fs::read_to_string(path).map_err(|e| ToolError::file_access(path, e))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or_else(|| ToolError::BadFormat {
        what: "concentrations file",
        detail: format!("{} is empty", path.display()),
    })?;
    let mut dims = header.split_whitespace();
    let (width, height) = match (dims.next(), dims.next()) {
        (Some(w), Some(h)) => (parse_int(w)? as usize, parse_int(h)? as usize),
        _ => {
            return Err(ToolError::BadFormat {
                what: "concentrations file",
                detail: format!("header {:?} is not 'width height'", header),
            });
        }
    };

    let cells = width * height;
    let mut steps = Vec::new();
    for line in lines {
        let mut fields = line.split_whitespace();
        let time = match fields.next() {
            Some(t) => parse_int(t)? as i32,
            None => continue,
        };
        let mut levels = Vec::with_capacity(cells);
        for field in fields {
            levels.push(parse_float(field)? as f32);
        }
        if levels.len() != cells {
            return Err(ToolError::BadFormat {
                what: "concentrations file",
                detail: format!(
                    "step {} has {} levels, expected {}x{}",
                    time,
                    levels.len(),
                    width,
                    height
                ),
            });
        }
        steps.push(ConsStep { time, levels });
    }
    Ok(ConsData {
        width,
        height,
        steps,
    })
}

pub fn read_binary(path: &Path) -> Result<ConsData> {
    let bytes = std::fs::read(path).map_err(|e| ToolError::file_access(path, e))?;
    let mut reader = ByteReader::new(&bytes);

    let truncated = |what: &str| ToolError::BadFormat {
        what: "concentrations file",
        detail: format!("{} ends inside {}", path.display(), what),
    };
    let width = reader.i32().ok_or_else(|| truncated("the header"))? as usize;
    let height = reader.i32().ok_or_else(|| truncated("the header"))? as usize;

    let cells = width * height;
    let mut steps = Vec::new();
    while !reader.is_empty() {
        let time = reader.i32().ok_or_else(|| truncated("a time step"))?;
        let mut levels = Vec::with_capacity(cells);
        for _ in 0..cells {
            levels.push(reader.f32().ok_or_else(|| truncated("a time step"))?);
        }
        steps.push(ConsStep { time, levels });
    }
    Ok(ConsData {
        width,
        height,
        steps,
    })
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take4(&mut self) -> Option<[u8; 4]> {
        let chunk = self.bytes.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        Some([chunk[0], chunk[1], chunk[2], chunk[3]])
    }

    fn i32(&mut self) -> Option<i32> {
        self.take4().map(i32::from_le_bytes)
    }

    fn f32(&mut self) -> Option<f32> {
        self.take4().map(f32::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_fixture(width: i32, height: i32, steps: &[(i32, Vec<f32>)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        for (time, levels) in steps {
            bytes.extend_from_slice(&time.to_le_bytes());
            for level in levels {
                bytes.extend_from_slice(&level.to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn reads_ascii_with_trailing_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set_0.cons");
        // the simulation leaves a space before each newline
        std::fs::write(&path, "2 2\n0 1.5 2.5 3.5 4.5 \n60 5 6 7 8 \n").unwrap();
        let data = read_ascii(&path).unwrap();
        assert_eq!(data.width, 2);
        assert_eq!(data.height, 2);
        assert_eq!(data.steps.len(), 2);
        assert_eq!(data.steps[0].time, 0);
        assert_eq!(data.level(0, 1, 1), 4.5);
        assert_eq!(data.steps[1].levels, vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn short_row_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set_0.cons");
        std::fs::write(&path, "2 2\n0 1.5 2.5 \n").unwrap();
        let err = read_ascii(&path).unwrap_err();
        assert!(err.to_string().contains("expected 2x2"));
    }

    #[test]
    fn binary_and_ascii_agree() {
        let dir = tempfile::tempdir().unwrap();
        let ascii = dir.path().join("set_0.cons");
        let binary = dir.path().join("set_0.bcons");
        std::fs::write(&ascii, "2 1\n0 1.5 2.5 \n10 3 4 \n").unwrap();
        std::fs::write(
            &binary,
            binary_fixture(2, 1, &[(0, vec![1.5, 2.5]), (10, vec![3.0, 4.0])]),
        )
        .unwrap();
        assert_eq!(read_cons(&ascii).unwrap(), read_cons(&binary).unwrap());
    }

    #[test]
    fn truncated_binary_step_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set_0.bcons");
        let mut bytes = binary_fixture(2, 2, &[(0, vec![1.0, 2.0, 3.0, 4.0])]);
        bytes.extend_from_slice(&60i32.to_le_bytes());
        bytes.extend_from_slice(&9.0f32.to_le_bytes());
        std::fs::write(&path, bytes).unwrap();
        let err = read_binary(&path).unwrap_err();
        assert!(err.to_string().contains("ends inside"));
    }

    #[test]
    fn level_range_covers_every_step() {
        let data = ConsData {
            width: 2,
            height: 1,
            steps: vec![
                ConsStep {
                    time: 0,
                    levels: vec![1.0, 3.0],
                },
                ConsStep {
                    time: 60,
                    levels: vec![0.5, 8.0],
                },
            ],
        };
        assert_eq!(data.level_range(), (0.5, 8.0));
    }

    #[test]
    fn tissue_size_rules() {
        let ok = ConsData {
            width: 4,
            height: 4,
            steps: Vec::new(),
        };
        assert!(ok.check_tissue_size().is_ok());

        for (width, height) in [(3, 4), (4, 3), (5, 4), (4, 7), (2, 2)] {
            let bad = ConsData {
                width,
                height,
                steps: Vec::new(),
            };
            let err = bad.check_tissue_size().unwrap_err();
            assert_eq!(err.exit_code(), 2);
        }
    }
}
