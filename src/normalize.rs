//! Centers a loaded scene and scales it to the fixed viewport box, deriving
//! the real-world dimensions reported to the hosting form.

use glam::Vec3;

use crate::error::PreviewError;
use crate::scene::SceneNode;

/// Normalized scenes span this many viewport units along their largest axis.
pub const VIEWPORT_SPAN: f32 = 2.0;

/// Reported dimensions assume 1 modeling unit = 1 meter, published in mm.
pub const UNITS_TO_MM: f32 = 1000.0;

/// Centering translation and uniform scale that fit a scene into the
/// viewport box. The translation has already been applied to the scene root
/// when this is returned; the scale is for the surface's orbit group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedTransform {
    pub translation: Vec3,
    pub uniform_scale: f32,
}

/// Real-world footprint of the previewed model, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

/// Result of one normalization attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizeOutcome {
    Ready {
        transform: NormalizedTransform,
        dimensions: Dimensions,
    },
    /// Geometry has not materialized yet; try again later.
    NotReady,
}

/// Compute the scene's bounding volume, recenter the root on the origin and
/// derive the uniform scale and reported dimensions.
///
/// An empty volume is not an error — geometry can attach to the graph after
/// the load completes, so the caller retries on a schedule. A volume that
/// collapses to a single point can never produce a finite scale and is
/// reported as degenerate instead of dividing by zero.
pub fn normalize(root: &mut SceneNode) -> Result<NormalizeOutcome, PreviewError> {
    let bounds = root.bounds();
    if bounds.is_empty() {
        return Ok(NormalizeOutcome::NotReady);
    }
    if bounds.is_point() {
        return Err(PreviewError::DegenerateGeometry);
    }

    let center = bounds.center();
    root.transform.translation -= center;

    let size = bounds.size();
    let uniform_scale = VIEWPORT_SPAN / bounds.max_extent();

    let transform = NormalizedTransform {
        translation: -center,
        uniform_scale,
    };
    let dimensions = Dimensions {
        width: size.x * uniform_scale * UNITS_TO_MM,
        height: size.y * uniform_scale * UNITS_TO_MM,
        depth: size.z * uniform_scale * UNITS_TO_MM,
    };

    Ok(NormalizeOutcome::Ready {
        transform,
        dimensions,
    })
}
