//! Padded embedding and the forward 2D discrete Fourier transform.
//!
//! Both back ends use the forward sign convention
//! `X[k] = sum_n x[n] * exp(-2*pi*i*k*n/N)` on each axis and apply no
//! normalization, so the zero-frequency sample equals the total flux.

use ndarray::Array2;
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

use crate::image::BrightnessImage;
use crate::padding::PaddingSpec;

/// Flux-weighted sums accumulated while embedding the image.
///
/// Coordinates are 1-based positions in the padded grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BrightnessCentroid {
    /// Sum of `col * flux`
    pub flux_x: f64,
    /// Sum of `row * flux`
    pub flux_y: f64,
    /// Sum of `flux`
    pub flux_total: f64,
}

impl BrightnessCentroid {
    fn accumulate(&mut self, row: usize, col: usize, value: f64) {
        self.flux_x += col as f64 * value;
        self.flux_y += row as f64 * value;
        self.flux_total += value;
    }

    /// Flux-weighted `(x, y)` center, or `None` for an image with no net flux.
    pub fn center(&self) -> Option<(f64, f64)> {
        let total = self.flux_total;
        (total != 0.0).then(|| (self.flux_x / total, self.flux_y / total))
    }
}

/// Zero-padded complex grid holding the image, ready to transform.
#[derive(Debug)]
pub struct EmbeddedGrid {
    pub grid: Array2<Complex64>,
    pub padding: PaddingSpec,
    pub centroid: BrightnessCentroid,
}

/// Copy `image` into a zero-initialized padded complex grid.
///
/// The image is consumed; only the padded grid survives this call.
pub fn embed(image: BrightnessImage, padding: PaddingSpec) -> EmbeddedGrid {
    let shape = padding.padded;
    let mut grid = Array2::<Complex64>::zeros(shape.dim());
    let mut centroid = BrightnessCentroid::default();

    let flat = grid
        .as_slice_mut()
        .expect("freshly allocated grid is contiguous");
    for ((r, c), &value) in image.pixels.indexed_iter() {
        let (row, col) = padding.to_padded(r + 1, c + 1);
        flat[shape.offset(row, col)] = Complex64::new(value, 0.0);
        centroid.accumulate(row, col, value);
    }

    EmbeddedGrid {
        grid,
        padding,
        centroid,
    }
}

/// A forward, unnormalized 2D discrete Fourier transform computed in place.
pub trait ForwardTransform {
    fn name(&self) -> &'static str;

    /// Replace `grid` with its 2D transform. The shape is unchanged.
    fn forward(&mut self, grid: &mut Array2<Complex64>);
}

fn ensure_standard_layout(grid: &mut Array2<Complex64>) {
    if !grid.is_standard_layout() {
        *grid = grid.as_standard_layout().into_owned();
    }
}

/// Run `pass` over every row, then over every column (via a transposed copy).
fn separable_passes<F>(grid: &mut Array2<Complex64>, mut pass: F)
where
    F: FnMut(&mut [Complex64], usize),
{
    ensure_standard_layout(grid);
    let (rows, cols) = grid.dim();

    let flat = grid
        .as_slice_mut()
        .expect("standard layout grid is contiguous");
    pass(flat, cols);

    let mut transposed = grid.t().as_standard_layout().into_owned();
    let flat_t = transposed
        .as_slice_mut()
        .expect("standard layout grid is contiguous");
    pass(flat_t, rows);

    grid.assign(&transposed.t());
}

/// FFT back end built on `rustfft`. Plans are cached by the planner, so one
/// engine can be reused across runs of the same size cheaply.
pub struct RustFftEngine {
    planner: FftPlanner<f64>,
}

impl RustFftEngine {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
}

impl Default for RustFftEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardTransform for RustFftEngine {
    fn name(&self) -> &'static str {
        "rustfft"
    }

    fn forward(&mut self, grid: &mut Array2<Complex64>) {
        if grid.is_empty() {
            return;
        }
        let planner = &mut self.planner;
        separable_passes(grid, |data, len| {
            // process() transforms each consecutive chunk of `len` samples
            let fft = planner.plan_fft_forward(len);
            fft.process(data);
        });
    }
}

/// Direct O(N^2)-per-axis DFT. Slow; serves as a reference back end.
#[derive(Debug, Default)]
pub struct DirectDft;

impl DirectDft {
    fn transform_chunks(data: &mut [Complex64], len: usize) {
        let twiddles: Vec<Complex64> = (0..len)
            .map(|k| Complex64::from_polar(1.0, -2.0 * PI * k as f64 / len as f64))
            .collect();
        let mut out = vec![Complex64::new(0.0, 0.0); len];

        for chunk in data.chunks_exact_mut(len) {
            for (k, slot) in out.iter_mut().enumerate() {
                *slot = chunk
                    .iter()
                    .enumerate()
                    .map(|(n, &x)| x * twiddles[(k * n) % len])
                    .sum();
            }
            chunk.copy_from_slice(&out);
        }
    }
}

impl ForwardTransform for DirectDft {
    fn name(&self) -> &'static str {
        "direct-dft"
    }

    fn forward(&mut self, grid: &mut Array2<Complex64>) {
        if grid.is_empty() {
            return;
        }
        separable_passes(grid, Self::transform_chunks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridShape;
    use crate::image::PixelScale;
    use approx::assert_relative_eq;

    fn image_from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> BrightnessImage {
        BrightnessImage::new(
            Array2::from_shape_fn((rows, cols), |(r, c)| f(r, c)),
            PixelScale::unit(),
        )
    }

    #[test]
    fn test_embed_places_image_at_padding_offset() {
        let image = image_from_fn(2, 3, |r, c| (r * 3 + c + 1) as f64);
        let padding = PaddingSpec::plan(GridShape::new(2, 3), 6);
        let embedded = embed(image, padding);

        assert_eq!(embedded.grid.dim(), (6, 6));
        // rows start at (6-2)/2+1 = 3, cols at (6-3)/2+1 = 2
        assert_eq!(embedded.grid[[2, 1]], Complex64::new(1.0, 0.0));
        assert_eq!(embedded.grid[[3, 3]], Complex64::new(6.0, 0.0));
        assert_eq!(embedded.grid[[0, 0]], Complex64::new(0.0, 0.0));

        let nonzero = embedded.grid.iter().filter(|v| v.norm() > 0.0).count();
        assert_eq!(nonzero, 6);
    }

    #[test]
    fn test_centroid_uses_padded_coordinates() {
        let mut pixels = Array2::zeros((4, 4));
        pixels[[0, 0]] = 2.0;
        pixels[[3, 3]] = 2.0;
        let image = BrightnessImage::new(pixels, PixelScale::unit());
        let padding = PaddingSpec::plan(GridShape::new(4, 4), 8);
        let embedded = embed(image, padding);

        // image starts at padded (3, 3); pixels land at (3,3) and (6,6)
        assert_relative_eq!(embedded.centroid.flux_total, 4.0);
        let (x, y) = embedded.centroid.center().unwrap();
        assert_relative_eq!(x, 4.5);
        assert_relative_eq!(y, 4.5);
    }

    #[test]
    fn test_centroid_absent_without_flux() {
        let image = image_from_fn(3, 3, |_, _| 0.0);
        let embedded = embed(image, PaddingSpec::plan(GridShape::new(3, 3), 0));
        assert!(embedded.centroid.center().is_none());

        // Balanced positive and negative flux also has no center
        let image = image_from_fn(1, 2, |_, c| if c == 0 { 1.0 } else { -1.0 });
        let embedded = embed(image, PaddingSpec::plan(GridShape::new(1, 2), 0));
        assert!(embedded.centroid.center().is_none());
    }

    #[test]
    fn test_dc_term_equals_total_flux() {
        let image = image_from_fn(8, 8, |r, c| (r + 2 * c) as f64 * 0.5);
        let total = image.total_flux();
        let mut grid = embed(image, PaddingSpec::plan(GridShape::new(8, 8), 0)).grid;

        RustFftEngine::new().forward(&mut grid);
        assert_relative_eq!(grid[[0, 0]].re, total, epsilon = 1e-9);
        assert!(grid[[0, 0]].im.abs() < 1e-9);
    }

    #[test]
    fn test_forward_sign_convention() {
        // x[n] = delta(n - 1) along columns -> X[k] = exp(-2*pi*i*k/N)
        let image = image_from_fn(1, 8, |_, c| if c == 1 { 1.0 } else { 0.0 });
        let mut grid = embed(image, PaddingSpec::plan(GridShape::new(1, 8), 0)).grid;
        RustFftEngine::new().forward(&mut grid);

        for k in 0..8 {
            let expected = Complex64::from_polar(1.0, -2.0 * PI * k as f64 / 8.0);
            assert_relative_eq!(grid[[0, k]].re, expected.re, epsilon = 1e-12);
            assert_relative_eq!(grid[[0, k]].im, expected.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fft_matches_direct_dft_non_square() {
        let image = image_from_fn(6, 10, |r, c| ((r * 7 + c * 3) % 5) as f64 - 1.5);
        let padding = PaddingSpec::plan(GridShape::new(6, 10), 0);
        let mut fast = embed(image.clone(), padding).grid;
        let mut slow = embed(image, padding).grid;

        RustFftEngine::new().forward(&mut fast);
        DirectDft.forward(&mut slow);

        for (a, b) in fast.iter().zip(slow.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-9);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_forward_handles_non_standard_layout() {
        let base = Array2::from_shape_fn((4, 6), |(r, c)| Complex64::new((r * 6 + c) as f64, 0.0));
        let mut reference = base.clone();
        RustFftEngine::new().forward(&mut reference);

        let mut reversed = base.t().as_standard_layout().into_owned().reversed_axes();
        assert!(!reversed.is_standard_layout());
        RustFftEngine::new().forward(&mut reversed);

        for (a, b) in reference.iter().zip(reversed.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-9);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-9);
        }
    }
}
