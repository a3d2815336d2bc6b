//! Conversion of the raw transform into centered amplitude and phase maps.
//!
//! The raw transform has its zero-frequency sample at the grid origin and its
//! phases referenced to the first pixel of the padded grid. This module swaps
//! quadrants so the zero-frequency term sits at 0-based `(rows/2, cols/2)`,
//! re-references every phase to a chosen image center, and converts the
//! image pixel scale into u-v pixel scale.

use ndarray::Array2;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::grid::GridShape;
use crate::image::PixelScale;
use crate::transform::BrightnessCentroid;

/// Amplitudes below this fraction of the zero-baseline amplitude get phase 0.
pub const MIN_AMPLITUDE_FRACTION: f64 = 1e-12;

/// Which image point phases are referenced to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterMode {
    /// Center of the padded grid
    #[default]
    Geometric,
    /// Flux-weighted center of brightness, falling back to geometric when
    /// the image has no net flux
    Brightness,
}

impl fmt::Display for CenterMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CenterMode::Geometric => write!(f, "geometric"),
            CenterMode::Brightness => write!(f, "brightness"),
        }
    }
}

/// Phase reference point in 1-based padded-grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCenter {
    pub x: f64,
    pub y: f64,
    /// True when the point is the brightness centroid
    pub from_brightness: bool,
}

impl ReferenceCenter {
    /// Pick the reference for `mode`; the geometric center is `(cols/2, rows/2)`.
    pub fn choose(mode: CenterMode, centroid: &BrightnessCentroid, padded: GridShape) -> Self {
        if mode == CenterMode::Brightness {
            if let Some((x, y)) = centroid.center() {
                return Self {
                    x,
                    y,
                    from_brightness: true,
                };
            }
        }
        let (x, y) = padded.center();
        Self {
            x,
            y,
            from_brightness: false,
        }
    }
}

/// Size of one u-v pixel along each axis, in wavelengths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvScale {
    pub u: f64,
    pub v: f64,
}

impl UvScale {
    /// `u = 180 / (cols * x_deg * pi)`, `v = 180 / (rows * y_deg * pi)`.
    pub fn from_image_scale(padded: GridShape, scale: PixelScale) -> Self {
        Self {
            u: 180.0 / (padded.cols as f64 * scale.x_deg * PI),
            v: 180.0 / (padded.rows as f64 * scale.y_deg * PI),
        }
    }
}

/// Centered visibility amplitude and phase maps.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityMap {
    /// Visibility amplitudes, `[row, col]`, zero frequency at `(rows/2, cols/2)`
    pub amplitude: Array2<f64>,
    /// Visibility phases in radians, each in `(-pi, pi]`
    pub phase: Array2<f64>,
    pub uv_scale: UvScale,
    /// Magnitude of the unshifted zero-frequency sample
    pub zero_baseline_amplitude: f64,
    pub reference: ReferenceCenter,
}

impl VisibilityMap {
    pub fn shape(&self) -> GridShape {
        GridShape::from_dim(self.amplitude.dim())
    }

    /// Amplitude at the zero-frequency position of the centered map.
    pub fn center_amplitude(&self) -> f64 {
        let shape = self.shape();
        self.amplitude[[shape.rows / 2, shape.cols / 2]]
    }
}

/// 0-based source index of the quadrant swap for 0-based destination `dest`.
///
/// For even `n` this is `dest + n/2` in the first half and `dest - n/2` in the
/// second half. For odd `n` it is the same roll by `n/2`, which keeps the
/// mapping a permutation.
#[inline]
pub fn shift_source(dest: usize, n: usize) -> usize {
    (dest + n - n / 2) % n
}

/// Wrap any angle into `(-pi, pi]`.
pub fn wrap_phase(angle: f64) -> f64 {
    let wrapped = angle.sin().atan2(angle.cos());
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

fn below_noise_floor(amplitude: f64, zero_baseline: f64) -> bool {
    if zero_baseline > 0.0 {
        amplitude / zero_baseline < MIN_AMPLITUDE_FRACTION
    } else {
        // No zero-baseline reference: only exactly-zero samples are phaseless
        amplitude == 0.0
    }
}

/// Build the centered amplitude/phase maps from a raw forward transform.
///
/// The complex grid is consumed and released before this returns.
pub fn correct(
    transformed: Array2<Complex64>,
    reference: ReferenceCenter,
    scale: PixelScale,
) -> VisibilityMap {
    let transformed = if transformed.is_standard_layout() {
        transformed
    } else {
        transformed.as_standard_layout().into_owned()
    };
    let shape = GridShape::from_dim(transformed.dim());
    let raw = transformed
        .as_slice()
        .expect("standard layout grid is contiguous");

    let zero_baseline_amplitude = raw.first().map_or(0.0, |dc| dc.norm());

    let mut amplitude = Array2::<f64>::zeros(shape.dim());
    let mut phase = Array2::<f64>::zeros(shape.dim());
    {
        let amp_out = amplitude
            .as_slice_mut()
            .expect("freshly allocated grid is contiguous");
        let phase_out = phase
            .as_slice_mut()
            .expect("freshly allocated grid is contiguous");

        let (rows, cols) = (shape.rows, shape.cols);
        let (half_rows, half_cols) = ((rows / 2) as f64, (cols / 2) as f64);
        let x_ramp = 2.0 * PI * (reference.x - 1.0) / cols as f64;
        let y_ramp = 2.0 * PI * (reference.y - 1.0) / rows as f64;

        for row in 1..=rows {
            let src_row = shift_source(row - 1, rows) + 1;
            let v_index = (row - 1) as f64 - half_rows;

            for col in 1..=cols {
                let src_col = shift_source(col - 1, cols) + 1;
                let value = raw[shape.offset(src_row, src_col)];
                let to = shape.offset(row, col);

                let amp = value.norm();
                amp_out[to] = amp;

                phase_out[to] = if below_noise_floor(amp, zero_baseline_amplitude) {
                    0.0
                } else {
                    let u_index = (col - 1) as f64 - half_cols;
                    let shifted = value.im.atan2(value.re) + x_ramp * u_index + y_ramp * v_index;
                    wrap_phase(shifted)
                };
            }
        }
    }

    VisibilityMap {
        amplitude,
        phase,
        uv_scale: UvScale::from_image_scale(shape, scale),
        zero_baseline_amplitude,
        reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shift_source_even_swaps_halves() {
        let n = 6;
        let sources: Vec<usize> = (0..n).map(|d| shift_source(d, n)).collect();
        assert_eq!(sources, vec![3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn test_shift_source_odd_is_permutation_with_dc_at_half() {
        for n in [1usize, 3, 5, 7, 9] {
            let mut seen: Vec<usize> = (0..n).map(|d| shift_source(d, n)).collect();
            assert_eq!(shift_source(n / 2, n), 0);
            seen.sort_unstable();
            assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_wrap_phase_range() {
        assert_relative_eq!(wrap_phase(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_phase(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_phase(PI), PI, epsilon = 1e-12);
        for i in -200..200 {
            let p = wrap_phase(i as f64 * 0.137);
            assert!(p > -PI && p <= PI, "phase {p} out of range");
        }
    }

    #[test]
    fn test_reference_center_choice() {
        let shape = GridShape::new(10, 20);
        let centroid = BrightnessCentroid {
            flux_x: 30.0,
            flux_y: 12.0,
            flux_total: 6.0,
        };

        let geo = ReferenceCenter::choose(CenterMode::Geometric, &centroid, shape);
        assert_eq!((geo.x, geo.y, geo.from_brightness), (10.0, 5.0, false));

        let bright = ReferenceCenter::choose(CenterMode::Brightness, &centroid, shape);
        assert_eq!(
            (bright.x, bright.y, bright.from_brightness),
            (5.0, 2.0, true)
        );

        let empty = BrightnessCentroid::default();
        let fallback = ReferenceCenter::choose(CenterMode::Brightness, &empty, shape);
        assert_eq!(
            (fallback.x, fallback.y, fallback.from_brightness),
            (10.0, 5.0, false)
        );
    }

    #[test]
    fn test_uv_scale_conversion() {
        let scale = UvScale::from_image_scale(GridShape::new(100, 100), PixelScale::unit());
        assert_relative_eq!(scale.u, 0.572_957_795_130_823_2, epsilon = 1e-12);
        assert_relative_eq!(scale.v, scale.u);

        let scale = UvScale::from_image_scale(GridShape::new(50, 200), PixelScale::new(2.0, 0.5));
        assert_relative_eq!(scale.u, 180.0 / (200.0 * 2.0 * PI));
        assert_relative_eq!(scale.v, 180.0 / (50.0 * 0.5 * PI));
    }

    #[test]
    fn test_quadrant_swap_moves_dc_to_center() {
        let mut grid = Array2::from_elem((4, 6), Complex64::new(0.5, 0.0));
        grid[[0, 0]] = Complex64::new(3.0, 4.0);
        let reference = ReferenceCenter::choose(
            CenterMode::Geometric,
            &BrightnessCentroid::default(),
            GridShape::new(4, 6),
        );

        let map = correct(grid, reference, PixelScale::unit());
        assert_relative_eq!(map.zero_baseline_amplitude, 5.0);
        assert_relative_eq!(map.amplitude[[2, 3]], 5.0);
        assert_relative_eq!(map.center_amplitude(), 5.0);
        assert_relative_eq!(map.amplitude[[0, 0]], 0.5);
    }

    #[test]
    fn test_noise_floor_zeroes_phase() {
        let mut grid = Array2::from_elem((4, 4), Complex64::new(0.0, 1e-15));
        grid[[0, 0]] = Complex64::new(16.0, 0.0);
        grid[[1, 1]] = Complex64::new(0.0, 2.0);
        let reference = ReferenceCenter {
            x: 1.7,
            y: 3.2,
            from_brightness: true,
        };

        let map = correct(grid, reference, PixelScale::unit());
        for ((r, c), &p) in map.phase.indexed_iter() {
            let amp = map.amplitude[[r, c]];
            if amp / map.zero_baseline_amplitude < MIN_AMPLITUDE_FRACTION {
                assert_eq!(p, 0.0, "phase at ({r}, {c}) should be suppressed");
            }
        }
        // raw (1,1) lands at (3,3) and keeps a non-trivial phase
        assert!(map.phase[[3, 3]] != 0.0);
    }

    #[test]
    fn test_phase_ramp_formula() {
        // Single non-DC sample so the expected phase can be written out
        let mut grid = Array2::from_elem((8, 8), Complex64::new(0.0, 0.0));
        grid[[0, 0]] = Complex64::new(1.0, 0.0);
        grid[[0, 1]] = Complex64::new(0.0, 1.0);
        let reference = ReferenceCenter {
            x: 3.0,
            y: 4.0,
            from_brightness: false,
        };

        let map = correct(grid, reference, PixelScale::unit());
        // raw column 1 moves to column 5 (0-based) of row 4
        let expected = wrap_phase(PI / 2.0 + 2.0 * PI * (3.0 - 1.0) * (5.0 - 4.0) / 8.0);
        assert_relative_eq!(map.phase[[4, 5]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_grid_has_zero_phases() {
        let grid = Array2::from_elem((5, 5), Complex64::new(0.0, 0.0));
        let reference = ReferenceCenter::choose(
            CenterMode::Geometric,
            &BrightnessCentroid::default(),
            GridShape::new(5, 5),
        );
        let map = correct(grid, reference, PixelScale::unit());
        assert_eq!(map.zero_baseline_amplitude, 0.0);
        assert!(map.phase.iter().all(|&p| p == 0.0));
    }
}
