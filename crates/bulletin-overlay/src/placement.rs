//! Overlay placement engine
//!
//! New bubbles land at a uniformly random position inside the surface minus
//! the reserved margin. Overlap with other bubbles is allowed; the user drags
//! them apart. On every redraw a bubble whose right or bottom edge reaches the
//! surface edge is moved to a random position where it fits.
//!
//! The engine holds no bubbles. Callers pass the bubble and the surface in
//! for each operation.

use tracing::{debug, trace};

use crate::bubble::{DragState, MessageBubble};
use crate::config::OverlayConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::geometry::{Bounds, Point};
use crate::random::RandomSource;
use crate::surface::DisplaySurface;

pub struct OverlayPlacementEngine<R: RandomSource> {
    random: R,
    reserved_margin: i32,
}

impl<R: RandomSource> OverlayPlacementEngine<R> {
    pub fn new(random: R, config: &OverlayConfig) -> Self {
        Self::with_margin(random, config.reserved_margin)
    }

    pub fn with_margin(random: R, reserved_margin: i32) -> Self {
        Self {
            random,
            reserved_margin: reserved_margin.max(0),
        }
    }

    pub fn reserved_margin(&self) -> i32 {
        self.reserved_margin
    }

    /// Random origin in `[margin, bounds - margin]` on each axis
    ///
    /// The bubble size is not considered here; an origin that leaves the
    /// bubble hanging off the edge is corrected by
    /// [`OverlayPlacementEngine::check_and_relocate`].
    pub fn place_new(&mut self, bounds: Bounds) -> Point {
        let margin = self.reserved_margin;
        let x = self.random.gen_range_i32(margin, bounds.width - margin);
        let y = self.random.gen_range_i32(margin, bounds.height - margin);
        trace!(x, y, %bounds, "Placed new bubble");
        Point::new(x, y)
    }

    /// Move `bubble` back on screen if it reaches the right or bottom edge
    ///
    /// Returns the new origin when the bubble was relocated.
    pub fn check_and_relocate(
        &mut self,
        bubble: &mut MessageBubble,
        surface: &mut dyn DisplaySurface,
    ) -> Option<Point> {
        let bounds = surface.bounds();
        if bounds.fits(bubble.origin, bubble.size) {
            return None;
        }

        let x = self.draw_fitting(bounds.width, bubble.size.width);
        let y = self.draw_fitting(bounds.height, bubble.size.height);
        let origin = Point::new(x, y);
        debug!(bubble = %bubble.id, from = %bubble.origin, to = %origin, "Relocating bubble inside surface");

        surface.move_to(bubble.id, origin);
        bubble.origin = origin;
        Some(origin)
    }

    /// Record where the pointer grabbed `bubble`
    pub fn begin_drag(&mut self, bubble: &mut MessageBubble, pointer: Point) {
        bubble.drag = Some(DragState {
            offset: pointer - bubble.origin,
        });
    }

    /// Follow the pointer while the primary button is held
    ///
    /// The grab offset is measured against the origin at drag start, so the
    /// new origin is `start origin + (pointer - grab point)`. Committing it on
    /// every call does not compound across calls.
    pub fn continue_drag(
        &mut self,
        bubble: &mut MessageBubble,
        pointer: Point,
        primary_held: bool,
        surface: &mut dyn DisplaySurface,
    ) -> OverlayResult<Option<Point>> {
        let drag = bubble
            .drag
            .ok_or(OverlayError::DragNotStarted { id: bubble.id })?;
        if !primary_held {
            return Ok(None);
        }

        let origin = pointer - drag.offset;
        surface.move_to(bubble.id, origin);
        bubble.origin = origin;
        Ok(Some(origin))
    }

    /// Finish the drag; the current origin becomes the resting position
    pub fn end_drag(&mut self, bubble: &mut MessageBubble) -> OverlayResult<Point> {
        bubble
            .drag
            .take()
            .ok_or(OverlayError::DragNotStarted { id: bubble.id })?;
        debug!(bubble = %bubble.id, origin = %bubble.origin, "Drag ended");
        Ok(bubble.origin)
    }

    /// Coordinate on one axis that keeps `extent` strictly inside `limit`
    ///
    /// Prefers `[margin, limit - extent - margin]`; when the margin leaves no
    /// room the margin gives way before the fit does.
    fn draw_fitting(&mut self, limit: i32, extent: i32) -> i32 {
        let fit_high = limit.saturating_sub(extent).saturating_sub(1);
        let high = limit
            .saturating_sub(extent)
            .saturating_sub(self.reserved_margin)
            .min(fit_high);
        let low = self.reserved_margin.min(high.max(0));
        self.random.gen_range_i32(low, high.max(low))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
