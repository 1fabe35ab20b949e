//! Display surface collaborator
//!
//! A fixed-coordinate canvas. Bubbles are put once, moved afterwards and
//! removed when dismissed; the engine never draws anything itself.

use crate::bubble::BubbleId;
use crate::geometry::{Bounds, Point};

pub trait DisplaySurface {
    /// Current visible extent
    fn bounds(&self) -> Bounds;

    /// Place a new bubble widget at `origin`
    fn put(&mut self, id: BubbleId, origin: Point);

    /// Move an existing bubble widget to `origin`
    fn move_to(&mut self, id: BubbleId, origin: Point);

    fn remove(&mut self, id: BubbleId);

    /// Show or hide the whole overlay
    fn set_visible(&mut self, visible: bool);
}
