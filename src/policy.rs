//! Pure decision math for the proportional downscale policy.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::engine::Geometry;

/// Decide whether and how to downscale `geometry` to fit within `caps`.
///
/// Returns `None` when the image is already within both caps. Otherwise
/// returns the `(width, height)` arguments for a single
/// [`ImagingEngine::scale`](crate::engine::ImagingEngine::scale) call, with
/// one dimension set to 0 meaning "derive proportionally":
///
/// - an image relatively wider than the cap box is fit by height,
///   `(0, max_height)`;
/// - otherwise it is fit by width, `(max_width, 0)`.
///
/// This is an either/or decision, not two independent clamps: exactly one
/// scale call is made, the chosen axis lands exactly on its cap, and the
/// derived axis may still exceed the other cap. That overflow is part of the
/// policy's contract, not a defect.
///
/// Degenerate caps are well-defined under IEEE division: a zero `max_height`
/// makes the box ratio infinite (or NaN when both caps are zero), the
/// comparison selects the width branch, and a resulting zero target is
/// rejected by the engine.
pub fn plan_scale(geometry: Geometry, caps: (u32, u32)) -> Option<(u32, u32)> {
    let (max_width, max_height) = caps;
    if geometry.width <= max_width && geometry.height <= max_height {
        return None;
    }

    let image_ratio = geometry.width as f64 / geometry.height as f64;
    let box_ratio = max_width as f64 / max_height as f64;
    if image_ratio > box_ratio {
        Some((0, max_height))
    } else {
        Some((max_width, 0))
    }
}

/// Resolve a proportional scale target against the current geometry.
///
/// A zero dimension is derived from the other so the aspect ratio is
/// preserved, with `.round()` and a minimum of 1 pixel. Returns `None` when
/// both target dimensions are zero or the geometry is empty; engines treat
/// that as an unscalable request.
pub fn resolve_scale_target(geometry: Geometry, width: u32, height: u32) -> Option<Geometry> {
    if geometry.width == 0 || geometry.height == 0 {
        return None;
    }

    match (width, height) {
        (0, 0) => None,
        (0, h) => {
            let w = (geometry.width as f64 * h as f64 / geometry.height as f64).round();
            Some(Geometry {
                width: w.max(1.0) as u32,
                height: h,
            })
        }
        (w, 0) => {
            let h = (geometry.height as f64 * w as f64 / geometry.width as f64).round();
            Some(Geometry {
                width: w,
                height: h.max(1.0) as u32,
            })
        }
        (w, h) => Some(Geometry {
            width: w,
            height: h,
        }),
    }
}
