//! Grid dimensions and the shared (row, col) -> linear offset convention.
//!
//! Every stage of the pipeline (embedding, centroid accumulation, transform,
//! quadrant swap and output) addresses samples through [`GridShape::offset`].
//! Grids are stored as `ndarray::Array2` in standard layout, so the linear
//! slice returned by `as_slice()` is laid out exactly as `offset` expects:
//! rows are the slower-varying index.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ConfigError;

/// Number of rows and columns of a 2D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of rows (y-axis, NAXIS2)
    pub rows: usize,
    /// Number of columns (x-axis, NAXIS1)
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Shape of an ndarray `dim()` tuple, which is `(rows, cols)`.
    pub fn from_dim(dim: (usize, usize)) -> Self {
        Self::new(dim.0, dim.1)
    }

    /// `(rows, cols)` for ndarray constructors.
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Linear offset of the 1-based (row, col) sample: `(row-1)*cols + (col-1)`.
    ///
    /// # Panics
    /// If either index is zero or past the end of its axis.
    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row >= 1 && row <= self.rows && col >= 1 && col <= self.cols,
            "grid index ({row}, {col}) outside {self}"
        );
        (row - 1) * self.cols + (col - 1)
    }

    /// Geometric center `(cols/2, rows/2)` as floating point `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (self.cols as f64 / 2.0, self.rows as f64 / 2.0)
    }

    /// Reject grids with an empty axis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::DegenerateShape(*self));
        }
        Ok(())
    }
}

impl From<(usize, usize)> for GridShape {
    fn from(dim: (usize, usize)) -> Self {
        Self::from_dim(dim)
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_offset_is_row_major_one_based() {
        let shape = GridShape::new(3, 4);
        assert_eq!(shape.offset(1, 1), 0);
        assert_eq!(shape.offset(1, 4), 3);
        assert_eq!(shape.offset(2, 1), 4);
        assert_eq!(shape.offset(3, 4), 11);
    }

    #[test]
    fn test_offset_matches_ndarray_standard_layout() {
        let shape = GridShape::new(5, 7);
        let array = Array2::from_shape_fn(shape.dim(), |(r, c)| (r * 100 + c) as f64);
        let flat = array.as_slice().unwrap();

        for row in 1..=shape.rows {
            for col in 1..=shape.cols {
                assert_eq!(flat[shape.offset(row, col)], array[[row - 1, col - 1]]);
            }
        }
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_offset_rejects_zero_index() {
        GridShape::new(2, 2).offset(0, 1);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_offset_rejects_past_end() {
        GridShape::new(2, 2).offset(2, 3);
    }

    #[test]
    fn test_center_and_display() {
        let shape = GridShape::new(10, 20);
        assert_eq!(shape.center(), (10.0, 5.0));
        assert_eq!(shape.to_string(), "20x10");
        assert_eq!(shape.pixel_count(), 200);
    }

    #[test]
    fn test_validate_rejects_empty_axis() {
        assert!(GridShape::new(0, 4).validate().is_err());
        assert!(GridShape::new(4, 0).validate().is_err());
        assert!(GridShape::new(1, 1).validate().is_ok());
    }
}
