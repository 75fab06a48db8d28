//! Single-image optimization and the lazy batch wrapper.
//!
//! [`Optimizer`] combines an [`OptimizerConfig`] with an [`ImagingEngine`]
//! and runs the normalization pipeline: force DPI metadata, resample, fit
//! the pixel caps with one proportional scale, recompress, strip metadata,
//! write. Internally every step is `Result`-driven with a three-kind error
//! taxonomy; [`Optimizer::optimize`] collapses the result to the coarse
//! boolean most embedders want.
//!
//! The configuration is read-only for the duration of a call; mutating it
//! requires `&mut self`, so a config cannot change underneath an in-flight
//! call. The engine handle is scoped to one call and dropped before the
//! call returns, on success and on every failure path.

use crate::config::{ConfigOverrides, OptimizerConfig};
use crate::engine::{Compression, EngineError, ImagingEngine};
use crate::policy::plan_scale;
use crate::rust_engine::RustEngine;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Why an optimize call failed. Collapsed to `false` at the
/// [`Optimizer::optimize`] boundary.
#[derive(Error, Debug)]
pub enum OptimizeError {
    /// The imaging capability is not present in this runtime.
    #[error("imaging engine unavailable: {0}")]
    EngineUnavailable(#[source] EngineError),
    /// The source could not be opened or declares no usable density.
    #[error("invalid source image: {0}")]
    InvalidSource(#[source] EngineError),
    /// Resampling, scaling, recompression, stripping, or the final write
    /// failed.
    #[error("encode or write failed: {0}")]
    EncodeOrWrite(#[source] EngineError),
}

/// Web-delivery image normalizer.
///
/// ```no_run
/// use slimage::Optimizer;
/// use std::path::Path;
///
/// let optimizer = Optimizer::new();
/// assert!(optimizer.optimize(Path::new("photo.jpg"), None));
/// ```
#[derive(Debug, Default)]
pub struct Optimizer<E: ImagingEngine = RustEngine> {
    config: OptimizerConfig,
    engine: E,
}

impl Optimizer<RustEngine> {
    /// An optimizer with default configuration: 72×72 DPI, 1920×1080 pixel
    /// caps, quality 70.
    pub fn new() -> Self {
        Self::with_config(OptimizerConfig::default())
    }

    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            config,
            engine: RustEngine::new(),
        }
    }

    /// Build from a named-option map; see
    /// [`OptimizerConfig::from_options`] for the recognized keys.
    pub fn from_options<I, K>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        Self::with_config(OptimizerConfig::from_options(options))
    }

    /// Build from sparse overrides, e.g. deserialized from an embedder's
    /// configuration.
    pub fn with_overrides(overrides: ConfigOverrides) -> Self {
        Self::with_config(OptimizerConfig::with_overrides(overrides))
    }
}

impl<E: ImagingEngine> Optimizer<E> {
    /// Pair a configuration with a custom engine.
    pub fn with_engine(config: OptimizerConfig, engine: E) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Mutable access to the configuration. Requires exclusive access, so
    /// settings cannot change during an outstanding optimize call.
    pub fn config_mut(&mut self) -> &mut OptimizerConfig {
        &mut self.config
    }

    /// Normalize one image for web delivery.
    ///
    /// Writes to `destination`, or back over `source` when `destination` is
    /// `None`. Returns `true` on success; every failure is collapsed to
    /// `false`. Never panics and never propagates an error.
    pub fn optimize(&self, source: &Path, destination: Option<&Path>) -> bool {
        match self.try_optimize(source, destination) {
            Ok(()) => true,
            Err(err) => {
                warn!(source = %source.display(), error = %err, "image optimization failed");
                false
            }
        }
    }

    /// [`optimize`](Self::optimize) with the failure kind preserved.
    pub fn try_optimize(
        &self,
        source: &Path,
        destination: Option<&Path>,
    ) -> Result<(), OptimizeError> {
        self.engine.probe().map_err(OptimizeError::EngineUnavailable)?;

        let mut image = self
            .engine
            .open(source)
            .map_err(OptimizeError::InvalidSource)?;

        // A zero or missing density marks an unusable source; it is not
        // repaired to a default.
        let resolution = self
            .engine
            .resolution(&image)
            .map_err(OptimizeError::InvalidSource)?;
        if resolution.x <= 0.0 || resolution.y <= 0.0 {
            return Err(OptimizeError::InvalidSource(EngineError::Density(format!(
                "non-positive density {}x{}",
                resolution.x, resolution.y
            ))));
        }

        let (res_x, res_y) = self.config.resolution();
        self.engine.set_resolution(&mut image, res_x, res_y);
        self.engine
            .resample(&mut image, res_x, res_y, self.config.blur_level())
            .map_err(OptimizeError::EncodeOrWrite)?;

        let geometry = self.engine.geometry(&image);
        if let Some((width, height)) = plan_scale(geometry, self.config.max_size()) {
            debug!(?geometry, width, height, "downscaling to fit pixel caps");
            self.engine
                .scale(&mut image, width, height)
                .map_err(OptimizeError::EncodeOrWrite)?;
        }

        self.engine.set_compression(&mut image, Compression::Undefined);
        self.engine
            .set_compression_quality(&mut image, self.config.quality());
        self.engine.strip_metadata(&mut image);

        self.engine
            .write(&image, destination.unwrap_or(source))
            .map_err(OptimizeError::EncodeOrWrite)?;

        Ok(())
        // `image` drops here and on every early return above, releasing the
        // engine handle unconditionally.
    }

    /// Lazily optimize a sequence of images in place.
    ///
    /// Each element is produced by an in-place [`optimize`](Self::optimize)
    /// call exactly when the consumer pulls it: nothing runs ahead of the
    /// iteration, a `false` for one path never stops the rest, and dropping
    /// the iterator abandons the remaining work. One flag per input path,
    /// in input order.
    pub fn optimize_all<I, P>(&self, paths: I) -> impl Iterator<Item = bool>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .map(move |path| self.optimize(path.as_ref(), None))
    }
}

/// Optimize a single image with default configuration.
///
/// Convenience wrapper over [`Optimizer::new`]; the algorithm is identical
/// to the per-instance one.
pub fn optimize(source: &Path, destination: Option<&Path>) -> bool {
    Optimizer::new().optimize(source, destination)
}

/// Lazily optimize a sequence of images in place with default configuration.
pub fn optimize_all<I, P>(paths: I) -> impl Iterator<Item = bool>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let optimizer = Optimizer::new();
    paths
        .into_iter()
        .map(move |path| optimizer.optimize(path.as_ref(), None))
}
