//! # slimage
//!
//! Normalizes raster images for web delivery: caps DPI metadata, proportionally
//! downsizes images that exceed configurable pixel caps, recompresses at a
//! configurable quality, and strips non-essential metadata (EXIF, ICC
//! profiles, comments). Images are processed in place or written to a new
//! path.
//!
//! # Usage
//!
//! ```no_run
//! use slimage::{Optimizer, OptimizerConfig};
//! use std::path::Path;
//!
//! // Per-instance configuration.
//! let mut config = OptimizerConfig::default();
//! config.set_quality(80);
//! config.set_max_width(1280);
//!
//! let optimizer = Optimizer::with_config(config);
//! let ok = optimizer.optimize(Path::new("hero.jpg"), Some(Path::new("hero-web.jpg")));
//! assert!(ok);
//!
//! // Or the default-configuration entry points.
//! slimage::optimize(Path::new("photo.png"), None);
//! for result in slimage::optimize_all(vec!["a.jpg", "b.jpg", "c.png"]) {
//!     // Each element is produced only when pulled; a failure for one path
//!     // never stops the rest.
//!     let _ = result;
//! }
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `OptimizerConfig` parameter model: clamped setters, bulk overrides |
//! | [`policy`] | Pure decision math for the proportional downscale policy |
//! | [`engine`] | `ImagingEngine` capability trait and shared value types |
//! | [`rust_engine`] | Production engine on the `image` crate (JPEG + PNG) |
//! | [`optimizer`] | The optimization algorithm, error taxonomy, and lazy batch |
//!
//! # Design Decisions
//!
//! ## Narrow Engine Seam
//!
//! The optimization policy never touches pixels directly. Everything codec
//! shaped goes through the [`engine::ImagingEngine`] trait: open, read and
//! force density, resample, scale, recompress, strip, write. This keeps the
//! policy testable against a recording mock and leaves room for engines
//! backed by external tools.
//!
//! ## Coarse Boolean Boundary
//!
//! [`Optimizer::optimize`] collapses every failure into `false`. Internally
//! the algorithm is `Result`-driven with a three-kind error taxonomy
//! ([`optimizer::OptimizeError`]); embedders that need the kind call
//! [`Optimizer::try_optimize`] instead. The boolean adapter never panics and
//! never propagates.
//!
//! ## Strict Density Policy
//!
//! A source that declares no physical density (or a non-positive one) is
//! treated as unusable, not auto-repaired: `optimize` returns `false` and
//! nothing is written. JFIF aspect-ratio-only headers and PNG `pHYs` chunks
//! with an unspecified unit do not count as physical density.
//!
//! ## No Runtime Surface
//!
//! This is a library. CLI, configuration files, and log subscriber
//! installation belong to the embedding application; the crate only emits
//! `tracing` events.

pub mod config;
mod density;
pub mod engine;
pub mod optimizer;
pub mod policy;
pub mod rust_engine;

pub use config::{ConfigOverrides, OptimizerConfig};
pub use engine::{Compression, EngineError, Geometry, ImagingEngine, Resolution};
pub use optimizer::{OptimizeError, Optimizer, optimize, optimize_all};
pub use rust_engine::RustEngine;
