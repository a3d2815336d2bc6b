//! Padded grid planning.
//!
//! The transform grid along each axis is the larger of the image extent and
//! the requested pad size. When an axis grows, the image sits after a margin
//! of `(pad - len) / 2` cells so it stays centered in the padded grid.

use serde::{Deserialize, Serialize};

use crate::grid::GridShape;

/// Padded grid size and the 1-based position of the image inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingSpec {
    /// Shape of the original image
    pub original: GridShape,
    /// Shape of the zero-padded transform grid
    pub padded: GridShape,
    /// First padded row holding image data (1-based)
    pub row_start: usize,
    /// First padded column holding image data (1-based)
    pub col_start: usize,
}

/// Plan one axis: `(padded length, 1-based start)`.
fn plan_axis(len: usize, pad_size: usize) -> (usize, usize) {
    if pad_size > len {
        (pad_size, (pad_size - len) / 2 + 1)
    } else {
        (len, 1)
    }
}

impl PaddingSpec {
    /// Plan the padded grid for `original` given a requested minimum size.
    ///
    /// A `pad_size` of zero (or anything not larger than an axis) leaves
    /// that axis unpadded.
    pub fn plan(original: GridShape, pad_size: usize) -> Self {
        let (rows, row_start) = plan_axis(original.rows, pad_size);
        let (cols, col_start) = plan_axis(original.cols, pad_size);

        Self {
            original,
            padded: GridShape::new(rows, cols),
            row_start,
            col_start,
        }
    }

    /// Whether either axis grew.
    pub fn is_padded(&self) -> bool {
        self.padded != self.original
    }

    /// Padded-grid (row, col) of the 1-based original image pixel (row, col).
    #[inline]
    pub fn to_padded(&self, row: usize, col: usize) -> (usize, usize) {
        (self.row_start + row - 1, self.col_start + col - 1)
    }
}
