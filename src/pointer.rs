//! Pointer engagement tracking for cursor feedback on the render surface.

/// Cursor shown over (or while grabbing from) the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    Grab,
    Grabbing,
}

/// Tracks pointer engagement across three input classes: entering/leaving
/// the surface, pressing/releasing on it, and releases that land outside the
/// surface bounds mid-drag.
///
/// While a drag is held, [`effective_cursor`] pins the cursor to `Grabbing`
/// no matter what enter/leave traffic does, so fast movement off the surface
/// cannot flicker the cursor back. The pin is a field of this instance, not
/// a global style override, and vanishes the instant the drag ends.
///
/// [`effective_cursor`]: PointerInteractionController::effective_cursor
#[derive(Debug, Clone, Copy)]
pub struct PointerInteractionController {
    cursor: CursorStyle,
    dragging: bool,
}

impl PointerInteractionController {
    pub fn new() -> Self {
        Self {
            cursor: CursorStyle::Grab,
            dragging: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Cursor the surface element should show right now.
    pub fn effective_cursor(&self) -> CursorStyle {
        if self.dragging {
            CursorStyle::Grabbing
        } else {
            self.cursor
        }
    }

    /// Pointer entered the surface.
    pub fn surface_entered(&mut self) {
        self.cursor = if self.dragging {
            CursorStyle::Grabbing
        } else {
            CursorStyle::Grab
        };
    }

    /// Pointer left the surface. A held drag keeps its cursor.
    pub fn surface_left(&mut self) {
        if !self.dragging {
            self.cursor = CursorStyle::Default;
        }
    }

    /// Pointer pressed on the surface.
    pub fn pressed(&mut self) {
        self.cursor = CursorStyle::Grabbing;
        self.dragging = true;
    }

    /// Pointer released — on the surface or anywhere else.
    pub fn released(&mut self) {
        self.cursor = CursorStyle::Grab;
        self.dragging = false;
    }

    /// Orbit-control drag started; feeds the same dragging flag.
    pub fn orbit_started(&mut self) {
        self.dragging = true;
    }

    /// Orbit-control drag ended.
    pub fn orbit_ended(&mut self) {
        self.dragging = false;
    }
}

impl Default for PointerInteractionController {
    fn default() -> Self {
        Self::new()
    }
}
