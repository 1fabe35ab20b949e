//! Overlay Configuration

use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, OverlayResult};
use crate::geometry::Size;

/// Space kept free along the surface edges for the side panels
pub const DEFAULT_RESERVED_MARGIN: i32 = 75;

/// Bubble geometry and placement tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Edge margin excluded from random placement
    pub reserved_margin: i32,
    /// Width of every bubble
    pub bubble_width: i32,
    /// Height added per wrapped line of text
    pub bubble_height_per_line: i32,
    /// Vertical padding around the text
    pub bubble_padding: i32,
    /// Characters that fit on one line of a bubble
    pub chars_per_line: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            reserved_margin: DEFAULT_RESERVED_MARGIN,
            bubble_width: 240,
            bubble_height_per_line: 20,
            bubble_padding: 16,
            chars_per_line: 28,
        }
    }
}

impl OverlayConfig {
    /// Estimated bubble size for `text`
    pub fn bubble_size(&self, text: &str) -> Size {
        let chars = text.chars().count();
        let per_line = self.chars_per_line.max(1);
        let lines = chars.div_ceil(per_line).max(1);
        let lines = i32::try_from(lines).unwrap_or(i32::MAX);
        let height = lines
            .saturating_mul(self.bubble_height_per_line)
            .saturating_add(self.bubble_padding);
        Size::new(self.bubble_width, height)
    }

    pub fn validate(&self) -> OverlayResult<()> {
        if self.reserved_margin < 0 {
            return Err(OverlayError::config_error("reserved_margin must not be negative"));
        }
        if self.bubble_width <= 0 || self.bubble_height_per_line <= 0 {
            return Err(OverlayError::config_error("bubble dimensions must be positive"));
        }
        if self.bubble_padding < 0 {
            return Err(OverlayError::config_error("bubble_padding must not be negative"));
        }
        if self.chars_per_line == 0 {
            return Err(OverlayError::config_error("chars_per_line must be at least 1"));
        }
        Ok(())
    }
}
