//! Brightness images and the sources that supply them.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::grid::GridShape;
use crate::io::fits::FitsError;
use crate::models::ModelError;
use crate::ConfigError;

/// Angular size of one pixel along each axis, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelScale {
    /// Degrees per pixel along the x-axis (columns, CDELT1)
    pub x_deg: f64,
    /// Degrees per pixel along the y-axis (rows, CDELT2)
    pub y_deg: f64,
}

impl PixelScale {
    pub fn new(x_deg: f64, y_deg: f64) -> Self {
        Self { x_deg, y_deg }
    }

    pub fn unit() -> Self {
        Self::new(1.0, 1.0)
    }

    /// Fall back to 1 degree/pixel on both axes when either scale is missing.
    ///
    /// A zero or non-finite scale would make the u-v scale infinite, so an
    /// uncalibrated image is treated as having unit pixels instead.
    pub fn or_unit(self) -> Self {
        let usable = |s: f64| s.is_finite() && s != 0.0;
        if usable(self.x_deg) && usable(self.y_deg) {
            self
        } else {
            warn!(
                "pixel scale ({}, {}) unusable, defaulting to 1.0 deg/pixel",
                self.x_deg, self.y_deg
            );
            Self::unit()
        }
    }
}

impl Default for PixelScale {
    fn default() -> Self {
        Self::unit()
    }
}

/// Real-valued brightness grid plus its angular pixel scale.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessImage {
    /// Pixel values indexed `[row, col]`
    pub pixels: Array2<f64>,
    pub scale: PixelScale,
}

impl BrightnessImage {
    pub fn new(pixels: Array2<f64>, scale: PixelScale) -> Self {
        Self { pixels, scale }
    }

    pub fn shape(&self) -> GridShape {
        GridShape::from_dim(self.pixels.dim())
    }

    pub fn total_flux(&self) -> f64 {
        self.pixels.sum()
    }
}

/// Errors raised while producing a brightness image.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fits(#[from] FitsError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Anything that can hand the pipeline a brightness grid.
pub trait BrightnessSource {
    /// Produce the image. Called once per pipeline run.
    fn load(&self) -> Result<BrightnessImage, SourceError>;

    /// Short provenance text recorded in the output HISTORY card.
    fn describe(&self) -> String;
}

impl BrightnessSource for BrightnessImage {
    fn load(&self) -> Result<BrightnessImage, SourceError> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory {} image", self.shape())
    }
}
