//! Run settings for `image2uv`, loadable from a JSON file.
//!
//! Every field is optional so a file can set only what it cares about;
//! values given on the command line take precedence over the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::centering::CenterMode;
use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;

/// Output file used when none is configured
pub const DEFAULT_OUTPUT: &str = "uvout.fits";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Image2UvConfig {
    pub output: Option<PathBuf>,
    pub pad_size: Option<usize>,
    pub center_on_brightness: Option<bool>,
}

impl Image2UvConfig {
    /// Load settings from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_error = |reason: String| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| file_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pad_size == Some(0) {
            return Err(ConfigError::InvalidPadding);
        }
        Ok(())
    }

    /// Layer `overrides` on top of `self`; fields set in `overrides` win.
    pub fn merged_with(self, overrides: Image2UvConfig) -> Self {
        Self {
            output: overrides.output.or(self.output),
            pad_size: overrides.pad_size.or(self.pad_size),
            center_on_brightness: overrides.center_on_brightness.or(self.center_on_brightness),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let center = if self.center_on_brightness.unwrap_or(false) {
            CenterMode::Brightness
        } else {
            CenterMode::Geometric
        };
        PipelineConfig::new(self.pad_size.unwrap_or(0), center)
    }
}

/// Parse a `-p` padding argument; it must be a positive integer.
pub fn parse_pad_size(arg: &str) -> Result<usize, ConfigError> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidPadding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_pad_size() {
        assert_eq!(parse_pad_size("256").unwrap(), 256);
        assert_eq!(parse_pad_size(" 30 ").unwrap(), 30);

        for bad in ["0", "-4", "abc", ""] {
            let err = parse_pad_size(bad).unwrap_err();
            assert_eq!(err.to_string(), "Invalid number of padding points");
        }
    }

    #[test]
    fn test_defaults() {
        let config = Image2UvConfig::default();
        assert_eq!(config.output_path(), PathBuf::from("uvout.fits"));
        assert_eq!(config.pipeline_config(), PipelineConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(r#"{ "pad_size": 512, "center_on_brightness": true }"#);
        let config = Image2UvConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.output, None);
        assert_eq!(
            config.pipeline_config(),
            PipelineConfig::new(512, CenterMode::Brightness)
        );
    }

    #[test]
    fn test_load_rejects_zero_padding() {
        let file = write_config(r#"{ "pad_size": 0 }"#);
        assert!(matches!(
            Image2UvConfig::load_from_file(file.path()),
            Err(ConfigError::InvalidPadding)
        ));
    }

    #[test]
    fn test_load_reports_bad_files() {
        let file = write_config(r#"{ "padding": 12 }"#);
        let err = Image2UvConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigFile { .. }));

        let err = Image2UvConfig::load_from_file("/nonexistent/image2uv.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/image2uv.json"));
    }

    #[test]
    fn test_command_line_overrides_file() {
        let file = Image2UvConfig {
            output: Some(PathBuf::from("from_file.fits")),
            pad_size: Some(128),
            center_on_brightness: Some(true),
        };
        let cli = Image2UvConfig {
            pad_size: Some(64),
            ..Default::default()
        };

        let merged = file.merged_with(cli);
        assert_eq!(merged.output_path(), PathBuf::from("from_file.fits"));
        assert_eq!(merged.pad_size, Some(64));
        assert_eq!(merged.center_on_brightness, Some(true));
    }
}
