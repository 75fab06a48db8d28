//! Optimizer parameters: clamped numeric settings and bulk overrides.
//!
//! [`OptimizerConfig`] holds the three knobs of the optimization policy:
//! the DPI metadata forced onto outputs, the pixel caps that trigger a
//! proportional downscale, and the encoder quality. Every setter clamps on
//! write, so a config read anywhere is always in range; getters have no
//! side effects.
//!
//! Bulk construction accepts a named-option map ([`OptimizerConfig::from_options`])
//! or a serde-deserialized [`ConfigOverrides`]. Unrecognized option names are
//! silently ignored so embedders can pass option maps meant for newer
//! versions of this crate.
//!
//! Setters take `i64` rather than an arbitrary value type: earlier renditions
//! of this interface accepted any input and coerced non-numeric values to 0,
//! a behavior superseded by requiring a numeric type at the boundary.

use serde::{Deserialize, Deserializer, Serialize};

/// Inclusive upper bound shared by the resolution axes and quality.
const PERCENT_MAX: i64 = 100;

/// Clamp a resolution axis or quality value to `[0, 100]`.
fn clamp_percent(value: i64) -> u32 {
    value.clamp(0, PERCENT_MAX) as u32
}

/// Clamp a pixel cap below to 0. There is no upper bound.
fn clamp_size(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

/// Optimization parameters.
///
/// Defaults: 72×72 DPI, 1920×1080 pixel caps, quality 70, neutral blur.
/// The same instance may drive many optimize calls; it is read-only for the
/// duration of each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptimizerConfig {
    resolution_x: u32,
    resolution_y: u32,
    max_width: u32,
    max_height: u32,
    quality: u32,
    blur_level: i32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            resolution_x: 72,
            resolution_y: 72,
            max_width: 1920,
            max_height: 1080,
            quality: 70,
            blur_level: 1,
        }
    }
}

impl OptimizerConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a named-option map.
    ///
    /// Recognized keys: `resolution` (both axes), `resolutionX`/`resolution_x`,
    /// `resolutionY`/`resolution_y`, `maxWidth`/`max_width`,
    /// `maxHeight`/`max_height`, `quality`. Values pass through the
    /// corresponding setter and its clamp. Unrecognized keys are ignored
    /// without error.
    pub fn from_options<I, K>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in options {
            match key.as_ref() {
                "resolution" => config.set_resolution(value),
                "resolutionX" | "resolution_x" => config.set_resolution_x(value),
                "resolutionY" | "resolution_y" => config.set_resolution_y(value),
                "maxWidth" | "max_width" => config.set_max_width(value),
                "maxHeight" | "max_height" => config.set_max_height(value),
                "quality" => config.set_quality(value),
                _ => {}
            }
        }
        config
    }

    /// Build a configuration from sparse overrides.
    ///
    /// Overrides are applied through the setters in a fixed order:
    /// `resolution`, then the individual axes, then the pixel caps, then
    /// quality. Later overrides win where they touch the same field, so
    /// `resolution_x` takes precedence over `resolution` for the X axis.
    pub fn with_overrides(overrides: ConfigOverrides) -> Self {
        let mut config = Self::default();
        config.apply_overrides(overrides);
        config
    }

    /// Apply sparse overrides to an existing configuration.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.resolution {
            self.set_resolution(v);
        }
        if let Some(v) = overrides.resolution_x {
            self.set_resolution_x(v);
        }
        if let Some(v) = overrides.resolution_y {
            self.set_resolution_y(v);
        }
        if let Some(v) = overrides.max_width {
            self.set_max_width(v);
        }
        if let Some(v) = overrides.max_height {
            self.set_max_height(v);
        }
        if let Some(v) = overrides.quality {
            self.set_quality(v);
        }
    }

    /// DPI forced onto the output, X axis.
    pub fn resolution_x(&self) -> u32 {
        self.resolution_x
    }

    /// DPI forced onto the output, Y axis.
    pub fn resolution_y(&self) -> u32 {
        self.resolution_y
    }

    /// Both resolution axes as `(x, y)`.
    pub fn resolution(&self) -> (u32, u32) {
        (self.resolution_x, self.resolution_y)
    }

    /// Set both resolution axes to the same value, clamped to `[0, 100]`.
    pub fn set_resolution(&mut self, value: i64) {
        self.set_resolution_x(value);
        self.set_resolution_y(value);
    }

    /// Set the X-axis resolution, clamped to `[0, 100]`.
    pub fn set_resolution_x(&mut self, value: i64) {
        self.resolution_x = clamp_percent(value);
    }

    /// Set the Y-axis resolution, clamped to `[0, 100]`.
    pub fn set_resolution_y(&mut self, value: i64) {
        self.resolution_y = clamp_percent(value);
    }

    /// Largest allowed output width in pixels.
    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Largest allowed output height in pixels.
    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    /// Both pixel caps as `(width, height)`.
    pub fn max_size(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }

    /// Set the width cap. Negative values are stored as 0; there is no
    /// upper clamp.
    pub fn set_max_width(&mut self, value: i64) {
        self.max_width = clamp_size(value);
    }

    /// Set the height cap. Negative values are stored as 0; there is no
    /// upper clamp.
    pub fn set_max_height(&mut self, value: i64) {
        self.max_height = clamp_size(value);
    }

    /// Encoder quality, 0 (smallest) to 100 (highest fidelity).
    pub fn quality(&self) -> u32 {
        self.quality
    }

    /// Set the encoder quality, clamped to `[0, 100]`.
    pub fn set_quality(&mut self, value: i64) {
        self.quality = clamp_percent(value);
    }

    /// Resampling softness knob. 1 is neutral; fixed at construction.
    pub fn blur_level(&self) -> i32 {
        self.blur_level
    }
}

impl<'de> Deserialize<'de> for OptimizerConfig {
    /// Deserializes through [`ConfigOverrides`] so the clamp invariants hold
    /// on this write path too. Unknown keys are ignored.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        ConfigOverrides::deserialize(deserializer).map(Self::with_overrides)
    }
}

/// Sparse configuration overrides.
///
/// Every field is optional; absent fields leave the default untouched.
/// Field names accept both snake_case and camelCase spellings. Unknown keys
/// deserialize without error and are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    /// Sets both resolution axes.
    pub resolution: Option<i64>,
    #[serde(alias = "resolutionX")]
    pub resolution_x: Option<i64>,
    #[serde(alias = "resolutionY")]
    pub resolution_y: Option<i64>,
    #[serde(alias = "maxWidth")]
    pub max_width: Option<i64>,
    #[serde(alias = "maxHeight")]
    pub max_height: Option<i64>,
    pub quality: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(config.resolution(), (72, 72));
        assert_eq!(config.max_size(), (1920, 1080));
        assert_eq!(config.quality(), 70);
        assert_eq!(config.blur_level(), 1);
    }

    #[test]
    fn quality_clamps_on_write() {
        let mut config = OptimizerConfig::default();
        for (input, stored) in [(-50, 0), (-1, 0), (0, 0), (55, 55), (100, 100), (250, 100)] {
            config.set_quality(input);
            assert_eq!(config.quality(), stored, "quality {input}");
        }
    }

    #[test]
    fn resolution_axes_clamp_independently() {
        let mut config = OptimizerConfig::default();
        config.set_resolution_x(-10);
        config.set_resolution_y(300);
        assert_eq!(config.resolution(), (0, 100));

        config.set_resolution_x(96);
        assert_eq!(config.resolution(), (96, 100));
    }

    #[test]
    fn set_resolution_equals_x_then_y() {
        let mut a = OptimizerConfig::default();
        a.set_resolution(150);

        let mut b = OptimizerConfig::default();
        b.set_resolution_x(150);
        b.set_resolution_y(150);

        assert_eq!(a, b);
        assert_eq!(a.resolution(), (100, 100));
    }

    #[test]
    fn size_caps_floor_at_zero_without_upper_clamp() {
        let mut config = OptimizerConfig::default();
        config.set_max_width(-1);
        config.set_max_height(-99999);
        assert_eq!(config.max_size(), (0, 0));

        config.set_max_width(7680);
        config.set_max_height(4320);
        assert_eq!(config.max_size(), (7680, 4320));
    }

    #[test]
    fn from_options_applies_recognized_keys() {
        let config = OptimizerConfig::from_options([
            ("resolution", 90),
            ("maxWidth", 800),
            ("maxHeight", 600),
            ("quality", 55),
        ]);
        assert_eq!(config.resolution(), (90, 90));
        assert_eq!(config.max_size(), (800, 600));
        assert_eq!(config.quality(), 55);
    }

    #[test]
    fn from_options_clamps_through_setters() {
        let config = OptimizerConfig::from_options([("quality", 900), ("maxWidth", -5)]);
        assert_eq!(config.quality(), 100);
        assert_eq!(config.max_width(), 0);
    }

    #[test]
    fn from_options_ignores_unknown_keys() {
        let config = OptimizerConfig::from_options([
            ("quality", 42),
            ("sharpen", 3),
            ("webpLossless", 1),
        ]);
        assert_eq!(config.quality(), 42);
        // Everything else stays at its default.
        assert_eq!(config.resolution(), (72, 72));
        assert_eq!(config.max_size(), (1920, 1080));
    }

    #[test]
    fn from_options_accepts_axis_keys_in_both_spellings() {
        let config = OptimizerConfig::from_options([("resolutionX", 30), ("resolution_y", 40)]);
        assert_eq!(config.resolution(), (30, 40));
    }

    #[test]
    fn overrides_axis_key_wins_over_resolution() {
        let config = OptimizerConfig::with_overrides(ConfigOverrides {
            resolution: Some(90),
            resolution_y: Some(60),
            ..ConfigOverrides::default()
        });
        assert_eq!(config.resolution(), (90, 60));
    }

    #[test]
    fn deserialize_clamps_and_ignores_unknown_keys() {
        let config: OptimizerConfig = serde_json::from_str(
            r#"{"resolution": 400, "maxWidth": -17, "quality": 65, "futureKnob": true}"#,
        )
        .unwrap();
        assert_eq!(config.resolution(), (100, 100));
        assert_eq!(config.max_width(), 0);
        assert_eq!(config.max_height(), 1080);
        assert_eq!(config.quality(), 65);
    }

    #[test]
    fn serialize_then_deserialize_preserves_tuned_fields() {
        let mut config = OptimizerConfig::default();
        config.set_resolution_x(96);
        config.set_max_height(900);
        config.set_quality(81);

        let json = serde_json::to_string(&config).unwrap();
        let restored: OptimizerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.resolution(), config.resolution());
        assert_eq!(restored.max_size(), config.max_size());
        assert_eq!(restored.quality(), config.quality());
    }
}
