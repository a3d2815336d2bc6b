//! Analytic brightness models.
//!
//! Two models are known: a sum of elliptical Gaussians and the crescent model
//! of Kamruddin & Dexter (2013), built by subtracting two uniform disks. Both
//! are parametrized on the sky in micro-arcseconds, with x increasing to the
//! east (leftwards in the image) and y increasing upwards in row index.
//!
//! Parameters are given as a comma separated list: the number of components
//! followed by the per-component values, e.g. `1,1.0,0.0,0.0,20.0,20.0,0.`
//! for a single circular Gaussian.

use ndarray::Array2;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::grid::GridShape;
use crate::image::{BrightnessImage, BrightnessSource, PixelScale, SourceError};
use crate::ConfigError;

/// Largest synthetic image side, in pixels
pub const MAX_PIXELS: usize = 4096;
/// Largest parameter list, component count included
pub const MAX_PARAMS: usize = 20;
/// One micro-arcsecond in degrees
pub const MICROARCSEC_TO_DEGREES: f64 = 2.777778e-10;
pub const DEFAULT_PIXELS: usize = 512;
pub const DEFAULT_PIXEL_SIZE_UAS: f64 = 1.0;

/// Errors in model names or parameter lists
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("model name {0:?} not recognized (known models: gauss, crescent)")]
    UnknownModel(String),
    #[error("Invalid number of model components")]
    InvalidComponentCount,
    #[error("Invalid number of model parameters: expected {expected}, got {actual}")]
    ParameterCount { expected: usize, actual: usize },
    #[error("too many model parameters: {0} (at most {MAX_PARAMS})")]
    TooManyParameters(usize),
    #[error("invalid model parameter {0:?}")]
    InvalidNumber(String),
    #[error("invalid model parameters for component(s) {0:?}")]
    InvalidComponents(Vec<usize>),
}

/// Registry of analytic models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Gaussian,
    Crescent,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Gaussian, ModelKind::Crescent];

    /// Name used on the command line and in FITS history
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Gaussian => "gauss",
            ModelKind::Crescent => "crescent",
        }
    }

    pub fn params_per_component(&self) -> usize {
        self.param_descriptions().len()
    }

    /// Human-readable description of each per-component parameter, in order.
    pub fn param_descriptions(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Gaussian => &[
                "Total Flux",
                "x-location of center (x_0)",
                "y-location of center (y_0)",
                "Dispersion along major axis (sigma_x)",
                "Dispersion along minor axis (sigma_y)",
                "Orientation of major axis in degrees E of N (theta)",
            ],
            ModelKind::Crescent => &[
                "Total Flux",
                "x-location of center (x_0)",
                "y-location of center (y_0)",
                "Overall size of the crescent (R)",
                "Relative thickness (0<psi<=1)",
                "Relative asymmetry (0<=tau<1)",
                "Relative orientation in radians (phi)",
            ],
        }
    }

    pub fn default_params(&self) -> ModelParams {
        let values = match self {
            ModelKind::Gaussian => vec![1.0, 0.0, 0.0, 20.0, 20.0, 0.0],
            ModelKind::Crescent => vec![1.0, 0.0, 0.0, 10.0, 0.5, 0.5, 0.0],
        };
        ModelParams {
            components: 1,
            values,
        }
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed parameter list: component count plus the flat per-component values.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub components: usize,
    pub values: Vec<f64>,
}

impl ModelParams {
    /// Check the value count against what `kind` needs for `components`.
    pub fn check(&self, kind: ModelKind) -> Result<(), ModelError> {
        let expected = self.components * kind.params_per_component();
        if self.values.len() != expected {
            return Err(ModelError::ParameterCount {
                expected,
                actual: self.values.len(),
            });
        }
        Ok(())
    }

    fn component(&self, kind: ModelKind, index: usize) -> &[f64] {
        let n = kind.params_per_component();
        &self.values[index * n..(index + 1) * n]
    }
}

impl FromStr for ModelParams {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split(',').map(str::trim);

        let components = tokens
            .next()
            .and_then(|t| t.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .ok_or(ModelError::InvalidComponentCount)?;

        let values = tokens
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| ModelError::InvalidNumber(t.to_string()))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if values.len() + 1 > MAX_PARAMS {
            return Err(ModelError::TooManyParameters(values.len() + 1));
        }

        Ok(Self { components, values })
    }
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.components)?;
        for v in &self.values {
            write!(f, ",{v}")?;
        }
        Ok(())
    }
}

/// One elliptical Gaussian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianComponent {
    pub flux: f64,
    pub x0: f64,
    pub y0: f64,
    pub sigma_x: f64,
    pub sigma_y: f64,
    /// Major-axis orientation, degrees east of north
    pub theta_deg: f64,
}

impl GaussianComponent {
    fn from_slice(p: &[f64]) -> Self {
        Self {
            flux: p[0],
            x0: p[1],
            y0: p[2],
            sigma_x: p[3],
            sigma_y: p[4],
            theta_deg: p[5],
        }
    }

    pub fn brightness(&self, x: f64, y: f64) -> f64 {
        let theta = self.theta_deg.to_radians();
        let (sin_th, cos_th) = theta.sin_cos();
        let dx = x - self.x0;
        let dy = y - self.y0;
        let xp = dx * sin_th + dy * cos_th;
        let yp = dx * cos_th - dy * sin_th;

        let norm = self.flux / (2.0 * PI * self.sigma_x * self.sigma_y);
        norm * (-0.5 * xp * xp / (self.sigma_x * self.sigma_x)
            - 0.5 * yp * yp / (self.sigma_y * self.sigma_y))
            .exp()
    }
}

/// One crescent: an outer disk minus a displaced inner disk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrescentComponent {
    pub flux: f64,
    pub x0: f64,
    pub y0: f64,
    /// Outer radius R
    pub radius: f64,
    /// Relative thickness, inner radius is R(1-psi)
    pub psi: f64,
    /// Degree of asymmetry
    pub tau: f64,
    /// Orientation in radians
    pub phi: f64,
}

impl CrescentComponent {
    fn from_slice(p: &[f64]) -> Self {
        Self {
            flux: p[0],
            x0: p[1],
            y0: p[2],
            radius: p[3],
            psi: p[4],
            tau: p[5],
            phi: p[6],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.flux > 0.0
            && self.radius > 0.0
            && self.psi > 0.0
            && self.psi <= 1.0
            && self.tau >= 0.0
            && self.tau < 1.0
    }

    /// Surface brightness of the lit region.
    pub fn surface_brightness(&self) -> f64 {
        self.flux / (PI * self.radius * self.radius * self.psi * (2.0 - self.psi))
    }

    pub fn brightness(&self, x: f64, y: f64) -> f64 {
        let inner_radius = self.radius * (1.0 - self.psi);
        let offset = self.radius * (1.0 - self.tau) * self.psi;
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (a, b) = (offset * sin_phi, offset * cos_phi);

        let r_out = (x - self.x0).hypot(y - self.y0);
        let r_in = (x - self.x0 - a).hypot(y - self.y0 - b);

        if r_out < self.radius && r_in > inner_radius {
            self.surface_brightness()
        } else {
            0.0
        }
    }
}

/// A fully parametrized analytic model.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageModel {
    Gaussian(Vec<GaussianComponent>),
    Crescent(Vec<CrescentComponent>),
}

impl ImageModel {
    pub fn from_params(kind: ModelKind, params: &ModelParams) -> Result<Self, ModelError> {
        params.check(kind)?;
        let components = 0..params.components;

        match kind {
            ModelKind::Gaussian => Ok(ImageModel::Gaussian(
                components
                    .map(|i| GaussianComponent::from_slice(params.component(kind, i)))
                    .collect(),
            )),
            ModelKind::Crescent => {
                let crescents: Vec<CrescentComponent> = components
                    .map(|i| CrescentComponent::from_slice(params.component(kind, i)))
                    .collect();
                let invalid: Vec<usize> = crescents
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| !c.is_valid())
                    .map(|(i, _)| i + 1)
                    .collect();
                if !invalid.is_empty() {
                    return Err(ModelError::InvalidComponents(invalid));
                }
                Ok(ImageModel::Crescent(crescents))
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ImageModel::Gaussian(_) => ModelKind::Gaussian,
            ImageModel::Crescent(_) => ModelKind::Crescent,
        }
    }

    /// Summed brightness of all components at sky position `(x, y)`.
    pub fn brightness(&self, x: f64, y: f64) -> f64 {
        match self {
            ImageModel::Gaussian(parts) => parts.iter().map(|g| g.brightness(x, y)).sum(),
            ImageModel::Crescent(parts) => parts.iter().map(|c| c.brightness(x, y)).sum(),
        }
    }

    /// Sample the model on an `npixel` x `npixel` grid.
    ///
    /// Pixel (row `iy`, col `ix`), 1-based, sits at
    /// `x = -(ix - npixel/2) * size`, `y = (iy - npixel/2) * size`.
    pub fn render(&self, npixel: usize, pixel_size_uas: f64) -> Array2<f64> {
        let shape = GridShape::new(npixel, npixel);
        let half = (npixel / 2) as f64;
        let mut pixels = Array2::<f64>::zeros(shape.dim());
        let flat = pixels
            .as_slice_mut()
            .expect("freshly allocated grid is contiguous");

        for iy in 1..=npixel {
            let y = (iy as f64 - half) * pixel_size_uas;
            for ix in 1..=npixel {
                let x = -(ix as f64 - half) * pixel_size_uas;
                flat[shape.offset(iy, ix)] = self.brightness(x, y);
            }
        }
        pixels
    }
}

/// Brightness source backed by an analytic model.
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub model: ImageModel,
    pub npixel: usize,
    pub pixel_size_uas: f64,
}

impl ModelSource {
    pub fn new(model: ImageModel, npixel: usize, pixel_size_uas: f64) -> Self {
        Self {
            model,
            npixel,
            pixel_size_uas,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.npixel == 0 || self.npixel > MAX_PIXELS {
            return Err(ConfigError::PixelCount(self.npixel));
        }
        if !(self.pixel_size_uas.is_finite() && self.pixel_size_uas > 0.0) {
            return Err(ConfigError::PixelSize(self.pixel_size_uas));
        }
        Ok(())
    }

    /// Pixel scale of the rendered image, in degrees.
    pub fn pixel_scale(&self) -> PixelScale {
        let deg = self.pixel_size_uas * MICROARCSEC_TO_DEGREES;
        PixelScale::new(deg, deg)
    }
}

impl BrightnessSource for ModelSource {
    fn load(&self) -> Result<BrightnessImage, SourceError> {
        self.validate()?;
        Ok(BrightnessImage::new(
            self.model.render(self.npixel, self.pixel_size_uas),
            self.pixel_scale(),
        ))
    }

    fn describe(&self) -> String {
        format!("synthetic image from model {}", self.model.kind())
    }
}
