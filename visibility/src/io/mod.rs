//! File format adapters.

pub mod fits;

pub use fits::{
    read_brightness_image, read_visibility, write_brightness_image, write_visibility, FitsError,
    FitsImageSource, StoredVisibility,
};
