//! 🖼️ Raster — the in-memory X-ray, between "bytes from the bucket" and "bytes back to the bucket".
//!
//! 🧠 Knowledge graph:
//! - `RasterImage`: explicit width, height, channel layout and an interleaved row-major `Vec<u8>`.
//!   Validated at construction, so every other function in the crate can trust its shape.
//! - Decode boundary: PNG bytes → `image` crate → narrowed to 8 bits per channel, channel layout
//!   preserved (gray stays gray, RGBA stays RGBA). 16-bit radiographs get squeezed into 0..=255.
//! - Geometry: `rotate90_clockwise` is done by hand (it's a loop, not a research project),
//!   `resize_area` is a box-filter convolution via `fast_image_resize` (box filter == area
//!   averaging when shrinking), `gaussian_blur` borrows the `image` crate's blur.
//! - Encode boundary: always PNG.
//!
//! ⚠️ Lifecycle: created by decode, consumed by a transform, dropped after encode. Nobody keeps
//! one of these around longer than a single loop iteration. They are mayflies with pixels.

use std::io::Cursor;

use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, LumaA, Rgb, Rgba};
use thiserror::Error;

/// 🎨 How many samples live in one pixel, and what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Gray,
    GrayAlpha,
    Rgb,
    Rgba,
}

impl Channels {
    /// 🔢 Samples per pixel.
    pub fn count(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    fn pixel_type(self) -> PixelType {
        match self {
            Self::Gray => PixelType::U8,
            Self::GrayAlpha => PixelType::U8x2,
            Self::Rgb => PixelType::U8x3,
            Self::Rgba => PixelType::U8x4,
        }
    }
}

/// 💀 Codec and geometry failures.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("could not decode image bytes")]
    Decode(#[source] image::ImageError),

    #[error("image has zero area ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} {channels:?}")]
    BufferMismatch {
        width: u32,
        height: u32,
        channels: Channels,
        expected: usize,
        actual: usize,
    },

    #[error("could not encode PNG")]
    Encode(#[source] image::ImageError),

    #[error("could not prepare pixel buffer for resizing")]
    ResizeBuffer(#[source] fast_image_resize::ImageBufferError),

    #[error("could not resize image")]
    Resize(#[source] fast_image_resize::ResizeError),
}

/// 🩻 A decoded 8-bit image with an explicit shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    channels: Channels,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// 🏗️ Build from raw interleaved samples. Rejects zero-area images and buffers that don't
    /// match `width * height * channels`.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        pixels: Vec<u8>,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty { width, height });
        }
        let expected = width as usize * height as usize * channels.count();
        if pixels.len() != expected {
            return Err(RasterError::BufferMismatch {
                width,
                height,
                channels,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// 🎨 Every sample set to `value`. Handy for fixtures and flat-field frames.
    pub fn filled(
        width: u32,
        height: u32,
        channels: Channels,
        value: u8,
    ) -> Result<Self, RasterError> {
        let len = width as usize * height as usize * channels.count();
        Self::new(width, height, channels, vec![value; len])
    }

    /// 📥 Decode PNG bytes. Anything the codec accepts is accepted; deeper bit depths are
    /// narrowed to 8 bits per channel.
    pub fn decode(bytes: &[u8]) -> Result<Self, RasterError> {
        let decoded = image::load_from_memory(bytes).map_err(RasterError::Decode)?;
        Self::from_dynamic(decoded)
    }

    fn from_dynamic(image: DynamicImage) -> Result<Self, RasterError> {
        let (width, height) = (image.width(), image.height());
        let (channels, pixels) = match image {
            DynamicImage::ImageLuma8(buf) => (Channels::Gray, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (Channels::GrayAlpha, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (Channels::Rgb, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (Channels::Rgba, buf.into_raw()),
            // -- 🔽 16-bit and float frames: same layout, fewer bits. The radiologist will never know.
            deeper => match deeper.color().channel_count() {
                1 => (Channels::Gray, deeper.to_luma8().into_raw()),
                2 => (Channels::GrayAlpha, deeper.to_luma_alpha8().into_raw()),
                3 => (Channels::Rgb, deeper.to_rgb8().into_raw()),
                _ => (Channels::Rgba, deeper.to_rgba8().into_raw()),
            },
        };
        Self::new(width, height, channels, pixels)
    }

    fn to_dynamic(&self) -> Result<DynamicImage, RasterError> {
        let (w, h) = (self.width, self.height);
        let pixels = self.pixels.clone();
        let dynamic = match self.channels {
            Channels::Gray => {
                ImageBuffer::<Luma<u8>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8)
            }
            Channels::GrayAlpha => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, pixels)
                .map(DynamicImage::ImageLumaA8),
            Channels::Rgb => {
                ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8)
            }
            Channels::Rgba => {
                ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8)
            }
        };
        dynamic.ok_or(RasterError::BufferMismatch {
            width: w,
            height: h,
            channels: self.channels,
            expected: w as usize * h as usize * self.channels.count(),
            actual: self.pixels.len(),
        })
    }

    /// 📤 Encode as PNG bytes. Same pixels in, same bytes out.
    pub fn encode_png(&self) -> Result<Vec<u8>, RasterError> {
        let dynamic = self.to_dynamic()?;
        let mut out = Cursor::new(Vec::new());
        dynamic
            .write_to(&mut out, ImageFormat::Png)
            .map_err(RasterError::Encode)?;
        Ok(out.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// 🌑 Share of samples (every channel counts) at or below `threshold`.
    ///
    /// Always in `[0, 1]`; construction guarantees a non-empty buffer, so no 0/0 here.
    pub fn fraction_at_or_below(&self, threshold: u8) -> f64 {
        let dark = self.pixels.iter().filter(|&&sample| sample <= threshold).count();
        dark as f64 / self.pixels.len() as f64
    }

    /// 🔄 Rotate 90° clockwise. Width and height swap; the top-left pixel lands top-right.
    pub fn rotate90_clockwise(&self) -> Self {
        let (w, h) = (self.width as usize, self.height as usize);
        let c = self.channels.count();
        let mut rotated = vec![0u8; self.pixels.len()];
        for y in 0..h {
            for x in 0..w {
                let src = (y * w + x) * c;
                // -- source column x becomes destination row x; source row y lands in column h-1-y
                let dst = (x * h + (h - 1 - y)) * c;
                rotated[dst..dst + c].copy_from_slice(&self.pixels[src..src + c]);
            }
        }
        Self {
            width: self.height,
            height: self.width,
            channels: self.channels,
            pixels: rotated,
        }
    }

    /// 📐 Resize to exactly `width` x `height` with area interpolation (box-filter convolution).
    pub fn resize_area(&self, width: u32, height: u32) -> Result<Self, RasterError> {
        let pixel_type = self.channels.pixel_type();
        let src = Image::from_vec_u8(self.width, self.height, self.pixels.clone(), pixel_type)
            .map_err(RasterError::ResizeBuffer)?;
        let mut dst = Image::new(width, height, pixel_type);
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box));
        Resizer::new()
            .resize(&src, &mut dst, &options)
            .map_err(RasterError::Resize)?;
        Self::new(width, height, self.channels, dst.into_vec())
    }

    /// 🌫️ Gaussian blur with standard deviation `sigma`. Deterministic: no RNG, no clock.
    pub fn gaussian_blur(&self, sigma: f32) -> Result<Self, RasterError> {
        let blurred = self.to_dynamic()?.blur(sigma);
        Self::from_dynamic(blurred)
    }
}
