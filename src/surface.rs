//! Capability contract for the interactive viewport the collaborator
//! provides: it draws a scene tree under an orbit group and reports pointer
//! and orbit-control events back.

use crate::pointer::CursorStyle;
use crate::scene::SceneNode;

/// Discrete input events the render surface reports to the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Pointer entered the surface element.
    PointerEntered,
    /// Pointer left the surface element.
    PointerLeft,
    /// Pointer button pressed on the surface.
    PointerPressed,
    /// Pointer button released on the surface.
    PointerReleased,
    /// Pointer button released anywhere else; catches drags that end
    /// outside the surface bounds.
    GlobalPointerReleased,
    /// Orbit-camera drag began.
    OrbitStarted,
    /// Orbit-camera drag ended.
    OrbitEnded,
}

/// What the surface should draw this frame.
#[derive(Debug)]
pub struct FrameView<'a> {
    /// Scene tree to render, if any. Already recentered when normalized.
    pub scene: Option<&'a SceneNode>,
    /// Rotation of the orbit group around +Y, radians.
    pub orbit_angle: f32,
    /// Uniform scale on the orbit group (from normalization, else 1).
    pub orbit_scale: f32,
    pub background: [f32; 3],
    pub show_grid: bool,
    pub show_axes: bool,
}

/// Rendering capability required from the hosting collaborator.
pub trait RenderSurface {
    /// Draw one frame. A failure here is the runtime-render safety net: the
    /// orchestrator treats it like a load failure.
    fn draw(&mut self, frame: &FrameView) -> Result<(), Box<dyn std::error::Error>>;

    /// Apply cursor feedback to the surface element.
    fn set_cursor(&mut self, cursor: CursorStyle);
}
