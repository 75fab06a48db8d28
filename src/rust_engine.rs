//! Pure Rust imaging engine on the `image` crate.
//!
//! Everything is statically linked into the binary, so [`probe`] is the
//! trait default and never fails.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image` crate (pure Rust decoders) |
//! | Resample / scale | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Softness (blur > 1) | `DynamicImage::blur` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` (quality driven) |
//! | Encode PNG | `image::codecs::png::PngEncoder` (compression preset) |
//! | Density metadata | crate-internal JFIF APP0 / PNG `pHYs` reader+writer |
//!
//! [`probe`]: crate::engine::ImagingEngine::probe

use crate::density;
use crate::engine::{Compression, EngineError, Geometry, ImagingEngine, Resolution};
use crate::policy::resolve_scale_target;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// Encoder default used when no quality was set, or when quality 0 asks for
/// the codec's own default.
const FALLBACK_JPEG_QUALITY: u8 = 75;

/// Pure Rust engine for JPEG and PNG sources.
///
/// Output format always matches the input format; format conversion is out
/// of scope for this engine.
#[derive(Debug, Clone, Copy)]
pub struct RustEngine;

impl RustEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-image state held between `open` and `write`. Dropping it releases
/// the decoded pixel buffer.
pub struct RasterImage {
    pixels: DynamicImage,
    format: ImageFormat,
    /// Density declared by the source file, if any. Resample ratios are
    /// computed against this value.
    source_density: Option<Resolution>,
    /// Density stamped into the output. Starts as the source density.
    density: Option<Resolution>,
    quality: Option<u32>,
    compression: Compression,
}

impl ImagingEngine for RustEngine {
    type Image = RasterImage;

    fn open(&self, path: &Path) -> Result<RasterImage, EngineError> {
        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes)
            .map_err(|e| EngineError::Decode(format!("{}: {e}", path.display())))?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(EngineError::Unsupported(format!(
                "{}: input format {format:?}",
                path.display()
            )));
        }

        let pixels = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| EngineError::Decode(format!("{}: {e}", path.display())))?;
        let source_density = density::read(&bytes, format);

        Ok(RasterImage {
            pixels,
            format,
            source_density,
            density: source_density,
            quality: None,
            compression: Compression::Undefined,
        })
    }

    fn resolution(&self, image: &RasterImage) -> Result<Resolution, EngineError> {
        image
            .density
            .ok_or_else(|| EngineError::Density("no physical density declared".into()))
    }

    fn set_resolution(&self, image: &mut RasterImage, x: u32, y: u32) {
        image.density = Some(Resolution {
            x: f64::from(x),
            y: f64::from(y),
        });
    }

    fn resample(
        &self,
        image: &mut RasterImage,
        x: u32,
        y: u32,
        blur: i32,
    ) -> Result<(), EngineError> {
        let source = image
            .source_density
            .ok_or_else(|| EngineError::Density("cannot resample without a source density".into()))?;
        if source.x <= 0.0 || source.y <= 0.0 {
            return Err(EngineError::Density(format!(
                "non-positive source density {}x{}",
                source.x, source.y
            )));
        }

        let width = (f64::from(image.pixels.width()) * f64::from(x) / source.x)
            .round()
            .max(1.0) as u32;
        let height = (f64::from(image.pixels.height()) * f64::from(y) / source.y)
            .round()
            .max(1.0) as u32;

        if (width, height) != (image.pixels.width(), image.pixels.height()) {
            image.pixels = image.pixels.resize_exact(width, height, FilterType::Lanczos3);
        }
        if blur > 1 {
            image.pixels = image.pixels.blur((blur - 1) as f32);
        }

        image.density = Some(Resolution {
            x: f64::from(x),
            y: f64::from(y),
        });
        Ok(())
    }

    fn geometry(&self, image: &RasterImage) -> Geometry {
        Geometry {
            width: image.pixels.width(),
            height: image.pixels.height(),
        }
    }

    fn scale(&self, image: &mut RasterImage, width: u32, height: u32) -> Result<(), EngineError> {
        let current = self.geometry(image);
        let target = resolve_scale_target(current, width, height).ok_or_else(|| {
            EngineError::Unsupported(format!("cannot scale {current:?} to {width}x{height}"))
        })?;

        if target != current {
            image.pixels = image
                .pixels
                .resize_exact(target.width, target.height, FilterType::Lanczos3);
        }
        Ok(())
    }

    fn set_compression(&self, image: &mut RasterImage, scheme: Compression) {
        image.compression = scheme;
    }

    fn set_compression_quality(&self, image: &mut RasterImage, quality: u32) {
        image.quality = Some(quality);
    }

    /// Decoding keeps pixel data only, and `write` re-encodes from scratch
    /// without copying EXIF, ICC, or comment segments from the source, so
    /// there is nothing left to remove here.
    fn strip_metadata(&self, _image: &mut RasterImage) {}

    fn write(&self, image: &RasterImage, path: &Path) -> Result<(), EngineError> {
        let mut encoded: Vec<u8> = Vec::new();

        match image.format {
            ImageFormat::Jpeg => {
                let quality = match image.quality {
                    None | Some(0) => FALLBACK_JPEG_QUALITY,
                    Some(q) => q.min(100) as u8,
                };
                image
                    .pixels
                    .write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality))
                    .map_err(|e| EngineError::Encode(format!("JPEG encode failed: {e}")))?;
            }
            ImageFormat::Png => {
                let compression = match image.compression {
                    Compression::Undefined => CompressionType::Default,
                    Compression::Fast => CompressionType::Fast,
                    Compression::Best => CompressionType::Best,
                };
                let encoder =
                    PngEncoder::new_with_quality(&mut encoded, compression, PngFilter::Adaptive);
                image
                    .pixels
                    .write_with_encoder(encoder)
                    .map_err(|e| EngineError::Encode(format!("PNG encode failed: {e}")))?;
            }
            other => {
                return Err(EngineError::Unsupported(format!(
                    "output format {other:?}"
                )));
            }
        }

        let stamped = match image.density {
            Some(res) => density::stamp(encoded, image.format, res),
            None => encoded,
        };

        std::fs::write(path, stamped)?;
        Ok(())
    }
}
