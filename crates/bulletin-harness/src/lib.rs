//! Bulletin Harness
//!
//! In-memory collaborators for driving the channel bridge without a real
//! presence service: a loopback text channel with a recording handle, a
//! connection, a buddy directory, a shared activity, a notification sink and
//! a display surface.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod loopback;
pub mod presence;
pub mod surface;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use loopback::{ChannelCall, LoopbackBehavior, LoopbackChannel, LoopbackGroup, LoopbackHandle};
pub use presence::{MemoryActivity, MemoryConnection, MemoryDirectory, RecordingSink};
pub use surface::{MemorySurface, SurfaceOp};
