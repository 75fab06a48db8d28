//! Imaging engine capability trait and shared value types.
//!
//! [`ImagingEngine`] is the narrow seam between the optimization policy and
//! the codec doing the pixel work: open, read and force density, resample,
//! scale, recompress, strip, write. The production implementation is
//! [`RustEngine`](crate::rust_engine::RustEngine) — pure Rust, statically
//! linked. Tests drive the policy through the recording
//! [`MockEngine`](tests::MockEngine).

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine's imaging capability is not present in this runtime.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
    /// The image declares no usable physical density.
    #[error("density unavailable: {0}")]
    Density(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Physical density metadata in dots per inch, independent of pixel geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub x: f64,
    pub y: f64,
}

/// Pixel geometry: actual width × height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

/// Output compression scheme.
///
/// `Undefined` defers to the format's native default, which is what the
/// optimization policy always selects. `Fast` and `Best` map to encoder
/// presets where the format supports them (PNG); quality-driven formats
/// (JPEG) ignore the scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    Undefined,
    Fast,
    Best,
}

/// Capability interface over an imaging codec.
///
/// A handle returned by [`open`](Self::open) owns whatever per-image state
/// the engine needs and releases it when dropped. Callers scope a handle to
/// a single operation: opened at the start, dropped unconditionally before
/// returning, never retained across calls or shared between concurrent
/// invocations.
pub trait ImagingEngine: Sync {
    /// Per-image state. Dropping the handle releases it.
    type Image;

    /// Check that the imaging capability is present. Engines backed by an
    /// external tool fail here when the tool is missing.
    fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Open and decode an image from disk.
    fn open(&self, path: &Path) -> Result<Self::Image, EngineError>;

    /// The image's declared physical density in DPI. Fails when the file
    /// declares none.
    fn resolution(&self, image: &Self::Image) -> Result<Resolution, EngineError>;

    /// Force the density metadata that will be written to the output.
    fn set_resolution(&self, image: &mut Self::Image, x: u32, y: u32);

    /// Rescale the pixel grid so physical size is preserved relative to the
    /// density the file was opened with. `blur` is a softness knob (1 is
    /// neutral, larger values soften), not a filter selector.
    fn resample(&self, image: &mut Self::Image, x: u32, y: u32, blur: i32)
    -> Result<(), EngineError>;

    /// Current pixel geometry.
    fn geometry(&self, image: &Self::Image) -> Geometry;

    /// Proportional scale. A zero dimension is derived from the other so the
    /// aspect ratio is preserved; a target that resolves to nothing (both
    /// zero, or an empty image) is an error.
    fn scale(&self, image: &mut Self::Image, width: u32, height: u32) -> Result<(), EngineError>;

    /// Select the output compression scheme.
    fn set_compression(&self, image: &mut Self::Image, scheme: Compression);

    /// Encoder quality for lossy output, 0 to 100.
    fn set_compression_quality(&self, image: &mut Self::Image, quality: u32);

    /// Drop non-essential metadata (EXIF, ICC profiles, comments) from the
    /// output.
    fn strip_metadata(&self, image: &mut Self::Image);

    /// Encode and write the image to `path`.
    fn write(&self, image: &Self::Image, path: &Path) -> Result<(), EngineError>;
}
