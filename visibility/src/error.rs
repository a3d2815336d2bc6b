//! Configuration errors shared across the pipeline stages.

use std::path::PathBuf;
use thiserror::Error;

use crate::grid::GridShape;

/// Invalid user input, detected before any file is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid number of padding points")]
    InvalidPadding,
    #[error("degenerate grid shape {0}")]
    DegenerateShape(GridShape),
    #[error("number of pixels {0} outside 1..={max}", max = crate::models::MAX_PIXELS)]
    PixelCount(usize),
    #[error("invalid pixel size {0}")]
    PixelSize(f64),
    #[error("cannot load config file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },
}
