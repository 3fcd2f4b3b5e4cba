use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Couldn't open file {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't parse {value:?} as {wanted}")]
    BadNumber { value: String, wanted: &'static str },

    #[error("Malformed {what}: {detail}")]
    BadFormat { what: &'static str, detail: String },

    #[error("Unrecognized parameter set layout: {0} values per set")]
    UnknownSetLayout(usize),

    #[error(
        "The tissue must be at least 4x4 with an even width and height, got {width}x{height}"
    )]
    TissueSize { width: usize, height: usize },

    #[error("Queue command failed: {0}")]
    Queue(String),

    #[error("Worker process failed to start: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Rendering failed: {0}")]
    Render(String),
}

impl ToolError {
    /// Exit code for the CLI: file trouble is 1, bad numeric input is 2,
    /// everything else also maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::BadNumber { .. } | ToolError::TissueSize { .. } => 2,
            _ => 1,
        }
    }

    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn bad_number(value: impl Into<String>, wanted: &'static str) -> Self {
        ToolError::BadNumber {
            value: value.into(),
            wanted,
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// Parse an integer field, reporting the offending text on failure.
pub fn parse_int(value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ToolError::bad_number(value, "an integer"))
}

/// Parse a float field, reporting the offending text on failure.
pub fn parse_float(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ToolError::bad_number(value, "a number"))
}
