//! The image-to-visibility run: load, pad and embed, transform, center, write.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::centering::{correct, CenterMode, ReferenceCenter, VisibilityMap};
use crate::error::ConfigError;
use crate::grid::GridShape;
use crate::image::{BrightnessImage, BrightnessSource, SourceError};
use crate::io::fits::{write_visibility, FitsError, FitsImageSource};
use crate::padding::PaddingSpec;
use crate::transform::{embed, ForwardTransform, RustFftEngine};

/// Settings for one image-to-visibility run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum padded grid size per axis, 0 for no padding
    #[serde(default)]
    pub pad_size: usize,
    #[serde(default)]
    pub center: CenterMode,
}

impl PipelineConfig {
    pub fn new(pad_size: usize, center: CenterMode) -> Self {
        Self { pad_size, center }
    }

    /// Check `original` and plan its padded grid.
    pub fn plan(&self, original: GridShape) -> Result<PaddingSpec, ConfigError> {
        original.validate()?;
        Ok(PaddingSpec::plan(original, self.pad_size))
    }
}

/// Run failure, tagged with the stage that raised it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error")]
    Configuration(#[from] ConfigError),
    #[error("read error")]
    Source(#[from] SourceError),
    #[error("write error")]
    Write(#[source] FitsError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Source(_) => "read",
            PipelineError::Write(_) => "write",
        }
    }
}

/// Image to visibility pipeline over a forward transform back end.
pub struct Pipeline<T: ForwardTransform = RustFftEngine> {
    config: PipelineConfig,
    engine: T,
}

impl Pipeline<RustFftEngine> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_engine(config, RustFftEngine::new())
    }
}

impl<T: ForwardTransform> Pipeline<T> {
    pub fn with_engine(config: PipelineConfig, engine: T) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transform an in-memory image into centered visibility maps.
    ///
    /// The image and the padded complex grid are both released before
    /// this returns; only the output maps survive.
    pub fn run(&mut self, image: BrightnessImage) -> Result<VisibilityMap, PipelineError> {
        let padding = self.config.plan(image.shape())?;
        let scale = image.scale.or_unit();
        if padding.is_padded() {
            debug!(
                "padding {} image to {}, content starts at row {} col {}",
                padding.original, padding.padded, padding.row_start, padding.col_start
            );
        }

        let mut embedded = embed(image, padding);
        self.engine.forward(&mut embedded.grid);
        debug!(
            "{} forward transform of {} grid complete",
            self.engine.name(),
            padding.padded
        );

        let reference =
            ReferenceCenter::choose(self.config.center, &embedded.centroid, padding.padded);
        if reference.from_brightness {
            info!(
                "phases referenced to brightness center ({:.3}, {:.3})",
                reference.x, reference.y
            );
        } else if self.config.center == CenterMode::Brightness {
            info!("image has no net flux, using geometric center");
        }

        let map = correct(embedded.grid, reference, scale);
        info!(
            "zero-baseline amplitude {:e}, u-v scale {:e} x {:e} wavelengths",
            map.zero_baseline_amplitude, map.uv_scale.u, map.uv_scale.v
        );
        Ok(map)
    }

    /// Load an image from `source` and run it.
    pub fn run_source<S>(&mut self, source: &S) -> Result<VisibilityMap, PipelineError>
    where
        S: BrightnessSource + ?Sized,
    {
        let image = source.load()?;
        info!("loaded {} image ({})", image.shape(), source.describe());
        self.run(image)
    }
}

/// Read a FITS brightness image, transform it and write the visibility maps.
///
/// # Arguments
/// * `input` - FITS brightness image
/// * `output` - Visibility file to create; an existing file is an error
/// * `config` - Padding and phase-center settings
///
/// # Returns
/// The centered visibility maps that were written, or the failing stage as
/// a `PipelineError`.
pub fn image_to_uv<P, Q>(
    input: P,
    output: Q,
    config: PipelineConfig,
) -> Result<VisibilityMap, PipelineError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let output = output.as_ref();
    let source = FitsImageSource::new(input.as_ref());
    let map = Pipeline::new(config).run_source(&source)?;

    write_visibility(output, &map, &source.describe()).map_err(PipelineError::Write)?;
    info!("visibility maps written to {}", output.display());
    Ok(map)
}
