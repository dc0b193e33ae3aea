//! 🌫️ Gaussian augmentation — blur every preprocessed image and give it a new name.
//!
//! `raw/train/7.png` becomes `7_blured.png`. Yes, "blured", one `r`. That's the name the
//! downstream training jobs look for, and the spelling is load-bearing now.

use crate::error::PipelineError;
use crate::raster::RasterImage;

const BLUR_SUFFIX: &str = "_blured";

/// 🏷️ Final path segment of `key` with `_blured` in front of its extension.
///
/// The extension is whatever follows the last `.` of the final segment, so `a.b.png` keeps
/// `.png` and `scan.jpeg` keeps `.jpeg`. A segment with no extension (`README`, `.png`, or the
/// empty segment of a folder marker like `raw/train/`) is refused with `UnsupportedKey`.
pub fn augmented_name(key: &str) -> Result<String, PipelineError> {
    let leaf = key.rsplit('/').next().unwrap_or(key);
    match leaf.rfind('.') {
        Some(dot) if dot > 0 => {
            let (stem, extension) = leaf.split_at(dot);
            Ok(format!("{stem}{BLUR_SUFFIX}{extension}"))
        }
        _ => Err(PipelineError::UnsupportedKey {
            key: key.to_string(),
        }),
    }
}

/// 🌫️ Blur `image` with standard deviation `sigma` and derive its output name from `key`.
///
/// The name is checked first, so a key we can't name costs no blur.
pub fn augment(
    key: &str,
    image: &RasterImage,
    sigma: f32,
) -> Result<(String, RasterImage), PipelineError> {
    let name = augmented_name(key)?;
    let blurred = image
        .gaussian_blur(sigma)
        .map_err(|source| PipelineError::Encode {
            key: key.to_string(),
            source,
        })?;
    Ok((name, blurred))
}
