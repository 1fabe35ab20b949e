//! Bubble board
//!
//! The surface-side collection of message bubbles. The board owns every
//! bubble on the surface and routes placement, redraw relocation and drag
//! events to the engine by bubble id.

use std::collections::BTreeMap;

use bulletin_core::types::ParticipantIdentity;
use tracing::{debug, info};

use crate::bubble::{BubbleId, MessageBubble};
use crate::config::OverlayConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::geometry::Point;
use crate::placement::OverlayPlacementEngine;
use crate::random::RandomSource;
use crate::surface::DisplaySurface;

pub struct BubbleBoard<R: RandomSource, S: DisplaySurface> {
    engine: OverlayPlacementEngine<R>,
    surface: S,
    config: OverlayConfig,
    bubbles: BTreeMap<BubbleId, MessageBubble>,
    next_id: u64,
    visible: bool,
}

impl<R: RandomSource, S: DisplaySurface> BubbleBoard<R, S> {
    pub fn new(random: R, surface: S, config: OverlayConfig) -> Self {
        Self {
            engine: OverlayPlacementEngine::new(random, &config),
            surface,
            config,
            bubbles: BTreeMap::new(),
            next_id: 0,
            visible: true,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn get(&self, id: BubbleId) -> Option<&MessageBubble> {
        self.bubbles.get(&id)
    }

    /// Bubbles in creation order
    pub fn iter(&self) -> impl Iterator<Item = &MessageBubble> {
        self.bubbles.values()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Create a bubble for `text` from `owner` and put it on the surface
    pub fn add(&mut self, owner: ParticipantIdentity, text: &str) -> BubbleId {
        self.next_id += 1;
        let id = BubbleId::new(self.next_id);
        let size = self.config.bubble_size(text);
        let origin = self.engine.place_new(self.surface.bounds());

        let mut bubble = MessageBubble::new(id, origin, size, owner, text);
        self.surface.put(id, origin);
        // First draw
        self.engine.check_and_relocate(&mut bubble, &mut self.surface);

        debug!(bubble = %id, origin = %bubble.origin, %size, "Bubble added");
        self.bubbles.insert(id, bubble);
        id
    }

    /// Remove one bubble, as its close button does
    pub fn dismiss(&mut self, id: BubbleId) -> OverlayResult<MessageBubble> {
        let bubble = self
            .bubbles
            .remove(&id)
            .ok_or(OverlayError::UnknownBubble { id })?;
        self.surface.remove(id);
        debug!(bubble = %id, "Bubble dismissed");
        Ok(bubble)
    }

    /// Remove every bubble; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = core::mem::take(&mut self.bubbles);
        for id in removed.keys() {
            self.surface.remove(*id);
        }
        info!(count = removed.len(), "Cleared bubbles");
        removed.len()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.surface.set_visible(visible);
    }

    /// Re-check every bubble against the surface; returns how many moved
    pub fn redraw(&mut self) -> usize {
        let mut relocated = 0;
        for bubble in self.bubbles.values_mut() {
            if self
                .engine
                .check_and_relocate(bubble, &mut self.surface)
                .is_some()
            {
                relocated += 1;
            }
        }
        relocated
    }

    pub fn begin_drag(&mut self, id: BubbleId, pointer: Point) -> OverlayResult<()> {
        let bubble = self
            .bubbles
            .get_mut(&id)
            .ok_or(OverlayError::UnknownBubble { id })?;
        self.engine.begin_drag(bubble, pointer);
        Ok(())
    }

    pub fn continue_drag(
        &mut self,
        id: BubbleId,
        pointer: Point,
        primary_held: bool,
    ) -> OverlayResult<Option<Point>> {
        let bubble = self
            .bubbles
            .get_mut(&id)
            .ok_or(OverlayError::UnknownBubble { id })?;
        self.engine
            .continue_drag(bubble, pointer, primary_held, &mut self.surface)
    }

    pub fn end_drag(&mut self, id: BubbleId) -> OverlayResult<Point> {
        let bubble = self
            .bubbles
            .get_mut(&id)
            .ok_or(OverlayError::UnknownBubble { id })?;
        self.engine.end_drag(bubble)
    }

    /// Drag a bubble by `delta` in one gesture, grabbing it at its origin
    pub fn drag_by(&mut self, id: BubbleId, delta: Point) -> OverlayResult<Point> {
        let origin = self
            .bubbles
            .get(&id)
            .map(|bubble| bubble.origin)
            .ok_or(OverlayError::UnknownBubble { id })?;
        self.begin_drag(id, origin)?;
        self.continue_drag(id, origin + delta, true)?;
        self.end_drag(id)
    }
}
