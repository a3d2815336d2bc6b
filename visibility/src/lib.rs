//! Visibility amplitude and phase maps from sky brightness images.
//!
//! A brightness image (read from FITS or rendered from an analytic model)
//! is zero-padded, Fourier transformed, re-centered and phase referenced to
//! a chosen image center, then written as a two-HDU FITS file.

pub mod centering;
pub mod config;
pub mod error;
pub mod grid;
pub mod image;
pub mod io;
pub mod logging;
pub mod models;
pub mod padding;
pub mod pipeline;
pub mod prompt;
pub mod transform;

pub use centering::{CenterMode, ReferenceCenter, UvScale, VisibilityMap};
pub use config::Image2UvConfig;
pub use error::ConfigError;
pub use grid::GridShape;
pub use image::{BrightnessImage, BrightnessSource, PixelScale, SourceError};
pub use io::fits::{FitsError, FitsImageSource};
pub use models::{ImageModel, ModelError, ModelKind, ModelParams, ModelSource};
pub use padding::PaddingSpec;
pub use pipeline::{image_to_uv, Pipeline, PipelineConfig, PipelineError};
pub use transform::{DirectDft, ForwardTransform, RustFftEngine};
