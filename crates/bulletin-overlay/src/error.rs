//! Overlay errors

use crate::bubble::BubbleId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("No bubble with id {id}")]
    UnknownBubble { id: BubbleId },

    #[error("Bubble {id} is not being dragged")]
    DragNotStarted { id: BubbleId },

    #[error("Invalid overlay configuration: {reason}")]
    Configuration { reason: String },
}

impl OverlayError {
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        OverlayError::Configuration {
            reason: reason.into(),
        }
    }
}

pub type OverlayResult<T> = core::result::Result<T, OverlayError>;
