//! In-memory display surface
//!
//! Tracks where every bubble widget sits and records each surface call.

use std::collections::BTreeMap;

use bulletin_overlay::{BubbleId, Bounds, DisplaySurface, Point};

/// One call made on a memory surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceOp {
    Put(BubbleId, Point),
    Move(BubbleId, Point),
    Remove(BubbleId),
    SetVisible(bool),
}

#[derive(Debug, Clone)]
pub struct MemorySurface {
    bounds: Bounds,
    positions: BTreeMap<BubbleId, Point>,
    visible: bool,
    ops: Vec<SurfaceOp>,
}

impl MemorySurface {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            positions: BTreeMap::new(),
            visible: true,
            ops: Vec::new(),
        }
    }

    /// Simulate a screen resize
    pub fn resize(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    pub fn position(&self, id: BubbleId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn widget_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }
}

impl DisplaySurface for MemorySurface {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn put(&mut self, id: BubbleId, origin: Point) {
        self.positions.insert(id, origin);
        self.ops.push(SurfaceOp::Put(id, origin));
    }

    fn move_to(&mut self, id: BubbleId, origin: Point) {
        if let Some(position) = self.positions.get_mut(&id) {
            *position = origin;
        }
        self.ops.push(SurfaceOp::Move(id, origin));
    }

    fn remove(&mut self, id: BubbleId) {
        self.positions.remove(&id);
        self.ops.push(SurfaceOp::Remove(id));
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.ops.push(SurfaceOp::SetVisible(visible));
    }
}
