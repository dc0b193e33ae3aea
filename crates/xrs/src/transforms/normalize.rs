//! 📐 Normalization — the admission desk for raw radiographs.
//!
//! In order, and nothing else:
//! 1. 🌑 More than 60% of samples at intensity ≤ 30? Mostly empty film. Rejected.
//! 2. 🔄 Wider than tall? Rotate 90° clockwise.
//! 3. 📏 Width (after the rotation) ≤ 250? Too narrow to be useful. Rejected.
//! 4. 📐 Everyone else is resized to 400 wide by 512 tall with area interpolation.

use tracing::debug;

use crate::raster::{RasterError, RasterImage};

/// 🌑 Samples at or below this intensity count as "black".
pub const NEAR_BLACK_THRESHOLD: u8 = 30;
/// 🚪 Reject when the near-black share is strictly above this. Exactly 0.6 gets in.
pub const MAX_NEAR_BLACK_FRACTION: f64 = 0.6;
/// 📏 Reject when the post-rotation width is at or below this.
pub const MIN_WIDTH_EXCLUSIVE: u32 = 250;
pub const OUTPUT_WIDTH: u32 = 400;
pub const OUTPUT_HEIGHT: u32 = 512;

/// 🙅 Why an image didn't make it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    MostlyEmpty { near_black_fraction: f64 },
    TooNarrow { width: u32 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MostlyEmpty {
                near_black_fraction,
            } => write!(f, "mostly empty ({:.1}% near-black)", near_black_fraction * 100.0),
            RejectReason::TooNarrow { width } => {
                write!(f, "too narrow ({width}px, need > {MIN_WIDTH_EXCLUSIVE})")
            }
        }
    }
}

/// ⚖️ The verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// ✅ Always exactly `OUTPUT_WIDTH` x `OUTPUT_HEIGHT`.
    Accepted(RasterImage),
    Rejected(RejectReason),
}

/// 📐 Run the admission rules on one image.
///
/// The only error is a resize failure, which the batch treats as fatal like any other.
pub fn preprocess(image: &RasterImage) -> Result<NormalizeOutcome, RasterError> {
    let near_black_fraction = image.fraction_at_or_below(NEAR_BLACK_THRESHOLD);
    if near_black_fraction > MAX_NEAR_BLACK_FRACTION {
        debug!("🌑 rejected: {:.3} near-black", near_black_fraction);
        return Ok(NormalizeOutcome::Rejected(RejectReason::MostlyEmpty {
            near_black_fraction,
        }));
    }

    let rotated;
    let upright = if image.width() > image.height() {
        rotated = image.rotate90_clockwise();
        &rotated
    } else {
        image
    };

    if upright.width() <= MIN_WIDTH_EXCLUSIVE {
        debug!("📏 rejected: width {} after orientation", upright.width());
        return Ok(NormalizeOutcome::Rejected(RejectReason::TooNarrow {
            width: upright.width(),
        }));
    }

    let resized = upright.resize_area(OUTPUT_WIDTH, OUTPUT_HEIGHT)?;
    Ok(NormalizeOutcome::Accepted(resized))
}
