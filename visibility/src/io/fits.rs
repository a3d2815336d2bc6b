//! FITS adapters for brightness images and visibility maps.
//!
//! Images are stored row-major with NAXIS1 as columns, so row `i` of an
//! `Array2` is FITS row `i` with no flipping. Writers never overwrite an
//! existing file, and remove their own output again if any step fails.

use chrono::Utc;
use fitsio::errors::check_status;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;
use std::ffi::{CString, NulError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::centering::{UvScale, VisibilityMap};
use crate::grid::GridShape;
use crate::image::{BrightnessImage, BrightnessSource, PixelScale, SourceError};

/// Errors that can occur during FITS file operations
#[derive(Error, Debug)]
pub enum FitsError {
    #[error("FITS I/O error")]
    FitsIo(#[from] fitsio::errors::Error),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("output file {0} already exists")]
    DestinationExists(PathBuf),
    #[error("only 2D images and 4D cubes are supported, found NAXIS = {0}")]
    UnsupportedDimensions(i64),
    #[error("image data holds {actual} pixels, header says {expected}")]
    DimensionMismatch { expected: GridShape, actual: usize },
    #[error("HDU not found: {0}")]
    HduNotFound(String),
    #[error("header text contains a NUL byte")]
    InvalidText(#[from] NulError),
}

/// Free-text cards that rust-fitsio has no API for.
enum TextCard<'a> {
    Comment(&'a str),
    History(&'a str),
}

/// cfitsio status for a keyword that is not in the header
const KEY_NO_EXIST: i32 = 202;

/// Append a COMMENT or HISTORY card to HDU `hdu_index`.
fn write_text_card(
    fptr: &mut FitsFile,
    hdu_index: usize,
    card: TextCard<'_>,
) -> Result<(), FitsError> {
    // Selecting the HDU makes it current for the raw cfitsio call below
    fptr.hdu(hdu_index)?;

    let mut status = 0;
    match card {
        TextCard::Comment(text) => {
            let text = CString::new(text)?;
            unsafe {
                fitsio_sys::ffpcom(
                    fptr.as_raw(), /* I - FITS file pointer  */
                    text.as_ptr(), /* I - comment string     */
                    &mut status,   /* IO - error status      */
                );
            }
        }
        TextCard::History(text) => {
            let text = CString::new(text)?;
            unsafe {
                fitsio_sys::ffphis(
                    fptr.as_raw(), /* I - FITS file pointer  */
                    text.as_ptr(), /* I - history string     */
                    &mut status,   /* IO - error status      */
                );
            }
        }
    }
    check_status(status)?;
    Ok(())
}

/// Write a floating point keyword with a comment, 15 significant digits.
fn write_f64_key_with_comment(
    fptr: &mut FitsFile,
    hdu_index: usize,
    key: &str,
    value: f64,
    comment: &str,
) -> Result<(), FitsError> {
    fptr.hdu(hdu_index)?;

    let key = CString::new(key)?;
    let comment = CString::new(comment)?;
    let mut status = 0;
    unsafe {
        fitsio_sys::ffpkyd(
            fptr.as_raw(),    /* I - FITS file pointer        */
            key.as_ptr(),     /* I - keyword name             */
            value,            /* I - keyword value            */
            -15,              /* I - number of decimal places */
            comment.as_ptr(), /* I - keyword comment          */
            &mut status,      /* IO - error status            */
        );
    }
    check_status(status)?;
    Ok(())
}

/// Delete the first `key` card of HDU `hdu_index`, if there is one.
fn delete_key_if_present(
    fptr: &mut FitsFile,
    hdu_index: usize,
    key: &str,
) -> Result<bool, FitsError> {
    fptr.hdu(hdu_index)?;

    let key = CString::new(key)?;
    let mut status = 0;
    unsafe {
        fitsio_sys::ffdkey(
            fptr.as_raw(), /* I - FITS file pointer  */
            key.as_ptr(),  /* I - keyword name       */
            &mut status,   /* IO - error status      */
        );
    }
    if status == KEY_NO_EXIST {
        return Ok(false);
    }
    check_status(status)?;
    Ok(true)
}

/// Drop the boilerplate cards cfitsio puts in a new primary HDU: the two
/// standard "FITS (Flexible Image Transport System)" comments and EXTNAME.
fn strip_primary_boilerplate(fptr: &mut FitsFile) -> Result<(), FitsError> {
    for _ in 0..2 {
        delete_key_if_present(fptr, 0, "COMMENT")?;
    }
    delete_key_if_present(fptr, 0, "EXTNAME")?;
    Ok(())
}

fn date_stamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn image_description(shape: &[usize]) -> ImageDescription<'_> {
    ImageDescription {
        data_type: ImageType::Double,
        dimensions: shape,
    }
}

/// Create `path` and run `fill` on it; on failure the new file is removed.
fn create_exclusive<F>(path: &Path, primary: GridShape, fill: F) -> Result<(), FitsError>
where
    F: FnOnce(&mut FitsFile) -> Result<(), FitsError>,
{
    if path.exists() {
        return Err(FitsError::DestinationExists(path.to_path_buf()));
    }

    let dims = [primary.rows, primary.cols];
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&image_description(&dims))
        .open()?;

    let result = fill(&mut fptr);
    drop(fptr);

    if let Err(e) = result {
        warn!("removing incomplete output {}", path.display());
        if let Err(remove_err) = std::fs::remove_file(path) {
            warn!("could not remove {}: {remove_err}", path.display());
        }
        return Err(e);
    }
    Ok(())
}

fn flat_row_major(array: &Array2<f64>) -> Vec<f64> {
    array.iter().copied().collect()
}

/// Shape `data` as a `shape` grid; the one place pixel counts are checked.
fn grid_from_row_major(shape: GridShape, data: Vec<f64>) -> Result<Array2<f64>, FitsError> {
    let actual = data.len();
    Array2::from_shape_vec(shape.dim(), data).map_err(|_| FitsError::DimensionMismatch {
        expected: shape,
        actual,
    })
}

/// Read the primary image of `path` as a brightness image.
///
/// 2D images are read whole; for 4D cubes only the first image plane is
/// read. CDELT1/CDELT2 give the pixel scale in degrees; when either is
/// missing or zero both fall back to 1.0.
///
/// # Arguments
/// * `path` - FITS file whose primary HDU holds the image
///
/// # Returns
/// * `Ok(BrightnessImage)` - pixels indexed `[row, col]` with NAXIS1 as columns
/// * `Err(FitsError)` - unreadable file, unsupported NAXIS or short pixel data
pub fn read_brightness_image<P: AsRef<Path>>(path: P) -> Result<BrightnessImage, FitsError> {
    let path = path.as_ref();
    let mut fptr = FitsFile::open(path)?;
    let hdu = fptr.primary_hdu()?;

    let naxis = hdu.read_key::<i64>(&mut fptr, "NAXIS")?;
    if naxis != 2 && naxis != 4 {
        return Err(FitsError::UnsupportedDimensions(naxis));
    }
    let cols = hdu.read_key::<i64>(&mut fptr, "NAXIS1")?.max(0) as usize;
    let rows = hdu.read_key::<i64>(&mut fptr, "NAXIS2")?.max(0) as usize;
    let shape = GridShape::new(rows, cols);

    let x_deg = hdu.read_key::<f64>(&mut fptr, "CDELT1").unwrap_or(0.0);
    let y_deg = hdu.read_key::<f64>(&mut fptr, "CDELT2").unwrap_or(0.0);
    let scale = PixelScale::new(x_deg, y_deg).or_unit();

    // The first plane of a cube is its first NAXIS1*NAXIS2 samples
    let data: Vec<f64> = hdu.read_section(&mut fptr, 0, shape.pixel_count())?;
    let pixels = grid_from_row_major(shape, data)?;
    debug!(
        "read {} image (NAXIS={}) from {}, scale {:e} x {:e} deg",
        shape,
        naxis,
        path.display(),
        scale.x_deg,
        scale.y_deg
    );

    Ok(BrightnessImage::new(pixels, scale))
}

/// Write visibility amplitudes (primary HDU) and phases (first extension).
///
/// The amplitude HDU carries `CDELT1 = u`, `CDELT2 = v` in wavelengths, a
/// "Visibility Amplitudes" comment, the `history` line and a DATE stamp.
///
/// # Arguments
/// * `path` - Destination; must not exist yet
/// * `map` - Centered amplitude and phase maps with their u-v scale
/// * `history` - Provenance line stored as a HISTORY card
///
/// # Errors
/// `FitsError::DestinationExists` if `path` is taken. Any failure after the
/// file was created removes it again.
pub fn write_visibility<P: AsRef<Path>>(
    path: P,
    map: &VisibilityMap,
    history: &str,
) -> Result<(), FitsError> {
    let path = path.as_ref();
    let shape = map.shape();
    let dims = [shape.rows, shape.cols];

    create_exclusive(path, shape, |fptr| {
        let amplitude_hdu = fptr.primary_hdu()?;
        amplitude_hdu.write_image(fptr, &flat_row_major(&map.amplitude))?;
        strip_primary_boilerplate(fptr)?;
        write_f64_key_with_comment(fptr, 0, "CDELT1", map.uv_scale.u, "in wavelengths")?;
        write_f64_key_with_comment(fptr, 0, "CDELT2", map.uv_scale.v, "in wavelengths")?;
        write_text_card(fptr, 0, TextCard::Comment("Visibility Amplitudes"))?;
        write_text_card(fptr, 0, TextCard::History(history))?;
        amplitude_hdu.write_key(fptr, "DATE", date_stamp())?;

        let phase_hdu = fptr.create_image("PHASE", &image_description(&dims))?;
        phase_hdu.write_image(fptr, &flat_row_major(&map.phase))?;
        write_text_card(fptr, 1, TextCard::Comment("Visibility Phases"))?;
        Ok(())
    })?;

    debug!("wrote {} visibility maps to {}", shape, path.display());
    Ok(())
}

/// Visibility maps as read back from a file written by [`write_visibility`].
#[derive(Debug, Clone)]
pub struct StoredVisibility {
    pub amplitude: Array2<f64>,
    pub phase: Array2<f64>,
    pub uv_scale: UvScale,
}

fn read_image_hdu(fptr: &mut FitsFile, index: usize) -> Result<Array2<f64>, FitsError> {
    let hdu = fptr
        .hdu(index)
        .map_err(|_| FitsError::HduNotFound(format!("HDU {index}")))?;
    let cols = hdu.read_key::<i64>(fptr, "NAXIS1")?.max(0) as usize;
    let rows = hdu.read_key::<i64>(fptr, "NAXIS2")?.max(0) as usize;
    let shape = GridShape::new(rows, cols);

    let data: Vec<f64> = hdu.read_image(fptr)?;
    grid_from_row_major(shape, data)
}

/// Read the amplitude and phase maps plus the u-v pixel scale.
pub fn read_visibility<P: AsRef<Path>>(path: P) -> Result<StoredVisibility, FitsError> {
    let mut fptr = FitsFile::open(path.as_ref())?;
    let amplitude = read_image_hdu(&mut fptr, 0)?;

    let primary = fptr.primary_hdu()?;
    let u = primary.read_key::<f64>(&mut fptr, "CDELT1")?;
    let v = primary.read_key::<f64>(&mut fptr, "CDELT2")?;

    let phase = read_image_hdu(&mut fptr, 1)?;
    Ok(StoredVisibility {
        amplitude,
        phase,
        uv_scale: UvScale { u, v },
    })
}

/// Write a brightness image with its pixel scale in degrees.
pub fn write_brightness_image<P: AsRef<Path>>(
    path: P,
    image: &BrightnessImage,
    history: &str,
) -> Result<(), FitsError> {
    let path = path.as_ref();
    let shape = image.shape();

    create_exclusive(path, shape, |fptr| {
        let hdu = fptr.primary_hdu()?;
        hdu.write_image(fptr, &flat_row_major(&image.pixels))?;
        strip_primary_boilerplate(fptr)?;
        write_f64_key_with_comment(fptr, 0, "CDELT1", image.scale.x_deg, "in degrees")?;
        write_f64_key_with_comment(fptr, 0, "CDELT2", image.scale.y_deg, "in degrees")?;
        write_text_card(fptr, 0, TextCard::History(history))?;
        hdu.write_key(fptr, "DATE", date_stamp())?;
        Ok(())
    })?;

    debug!("wrote {} brightness image to {}", shape, path.display());
    Ok(())
}

/// Brightness source reading a FITS image or the first plane of a 4D cube.
#[derive(Debug, Clone)]
pub struct FitsImageSource {
    pub path: PathBuf,
}

impl FitsImageSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl BrightnessSource for FitsImageSource {
    fn load(&self) -> Result<BrightnessImage, SourceError> {
        Ok(read_brightness_image(&self.path)?)
    }

    fn describe(&self) -> String {
        format!("Created from Image in File: {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_error_display() {
        let error = FitsError::HduNotFound("PHASE".to_string());
        assert!(error.to_string().contains("HDU not found: PHASE"));

        let error = FitsError::UnsupportedDimensions(3);
        assert!(error.to_string().contains("NAXIS = 3"));

        let error = FitsError::DestinationExists(PathBuf::from("uvout.fits"));
        assert_eq!(error.to_string(), "output file uvout.fits already exists");
    }

    #[test]
    fn test_fits_source_history_names_input() {
        let source = FitsImageSource::new("inimage.fits");
        assert_eq!(source.describe(), "Created from Image in File: inimage.fits");
    }

    #[test]
    fn test_pixel_count_checked_against_header() {
        let grid = grid_from_row_major(GridShape::new(2, 3), vec![1.0; 6]).unwrap();
        assert_eq!(grid.dim(), (2, 3));

        let err = grid_from_row_major(GridShape::new(2, 3), vec![1.0; 5]).unwrap_err();
        assert!(matches!(err, FitsError::DimensionMismatch { actual: 5, .. }));
        assert_eq!(err.to_string(), "image data holds 5 pixels, header says 3x2");
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = read_brightness_image(dir.path().join("missing.fits"));
        assert!(matches!(result, Err(FitsError::FitsIo(_))));
    }
}
