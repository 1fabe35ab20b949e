//! Bulletin Overlay
//!
//! Places chat messages as free-floating bubbles on a display surface.
//! Placement is random within a reserved margin, bubbles that reach the
//! surface edge are pulled back inside on redraw, and bubbles can be dragged.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod board;
pub mod bubble;
pub mod config;
pub mod error;
pub mod geometry;
pub mod placement;
pub mod random;
pub mod surface;
pub mod text;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use board::BubbleBoard;
pub use bubble::{BubbleId, DragState, MessageBubble};
pub use config::{OverlayConfig, DEFAULT_RESERVED_MARGIN};
pub use error::{OverlayError, OverlayResult};
pub use geometry::{Bounds, Point, Size};
pub use placement::OverlayPlacementEngine;
pub use random::{RandomSource, SeededRandom, SystemRandom};
pub use surface::DisplaySurface;
pub use text::{tokenize, TextSpan};
