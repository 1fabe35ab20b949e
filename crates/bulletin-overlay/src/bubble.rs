//! Message bubbles
//!
//! One bubble per delivered or sent message. A bubble keeps the identity it
//! was drawn for, its colours and its resting origin; the origin only changes
//! through boundary relocation or a drag.

use core::fmt;

use bulletin_core::types::{Color, ParticipantIdentity};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Size};
use crate::text::{tokenize, TextSpan};

/// Identifier of a bubble on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BubbleId(u64);

impl BubbleId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BubbleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-progress drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragState {
    /// Pointer position minus bubble origin at drag start
    pub offset: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBubble {
    pub id: BubbleId,
    pub origin: Point,
    pub size: Size,
    pub fill: Color,
    pub stroke: Color,
    pub text_color: Color,
    pub owner: ParticipantIdentity,
    pub text: String,
    pub spans: Vec<TextSpan>,
    pub drag: Option<DragState>,
}

impl MessageBubble {
    pub fn new(
        id: BubbleId,
        origin: Point,
        size: Size,
        owner: ParticipantIdentity,
        text: &str,
    ) -> Self {
        let fill = owner.fill_color();
        Self {
            id,
            origin,
            size,
            fill,
            stroke: owner.stroke_color(),
            text_color: contrasting_text(fill),
            owner,
            text: text.to_string(),
            spans: tokenize(text),
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.spans
            .iter()
            .filter(|span| span.is_link())
            .map(TextSpan::as_str)
    }
}

/// Black text on light fills, white on dark ones
pub fn contrasting_text(fill: Color) -> Color {
    // Rec. 601 luma, scaled by 1000
    let luma = 299 * u32::from(fill.r) + 587 * u32::from(fill.g) + 114 * u32::from(fill.b);
    if luma > 128 * 1000 {
        Color::BLACK
    } else {
        Color::rgb(0xff, 0xff, 0xff)
    }
}
