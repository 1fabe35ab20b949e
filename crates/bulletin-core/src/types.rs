//! Core types for the channel bridge
//!
//! Newtypes for transport identifiers, the colour pair a participant is drawn
//! with, the buddy records handed out by the presence directory and the
//! normalized [`ParticipantIdentity`] every downstream component consumes.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ColorParseError;

// ----------------------------------------------------------------------------
// Handle
// ----------------------------------------------------------------------------

/// Opaque participant handle, either connection-global or channel-specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(u32);

impl Handle {
    /// The null handle; never names a participant
    pub const NONE: Self = Self(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Message Identifiers
// ----------------------------------------------------------------------------

/// Transport-assigned id of a pending message, used for acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u32);

impl MessageId {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a text channel message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Normal,
    Action,
    Notice,
    AutoReply,
    DeliveryReport,
    Unknown(u32),
}

impl MessageKind {
    pub fn is_normal(&self) -> bool {
        matches!(self, MessageKind::Normal)
    }
}

impl From<u32> for MessageKind {
    fn from(value: u32) -> Self {
        match value {
            0 => MessageKind::Normal,
            1 => MessageKind::Action,
            2 => MessageKind::Notice,
            3 => MessageKind::AutoReply,
            4 => MessageKind::DeliveryReport,
            other => MessageKind::Unknown(other),
        }
    }
}

impl From<MessageKind> for u32 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Normal => 0,
            MessageKind::Action => 1,
            MessageKind::Notice => 2,
            MessageKind::AutoReply => 3,
            MessageKind::DeliveryReport => 4,
            MessageKind::Unknown(other) => other,
        }
    }
}

/// A received message that has not been acknowledged yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub id: MessageId,
    pub timestamp: u64,
    pub sender: Handle,
    pub kind: MessageKind,
    pub flags: u32,
    pub text: String,
}

impl PendingMessage {
    /// Create a normal text message with no flags
    pub fn normal<T: Into<String>>(id: u32, timestamp: u64, sender: Handle, text: T) -> Self {
        Self {
            id: MessageId::new(id),
            timestamp,
            sender,
            kind: MessageKind::Normal,
            flags: 0,
            text: text.into(),
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }
}

// ----------------------------------------------------------------------------
// Colours
// ----------------------------------------------------------------------------

/// 24-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);
    pub const GREY: Self = Self::rgb(0x88, 0x88, 0x88);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as `#rrggbb`
    pub fn to_html(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ColorParseError::InvalidColor(s.to_string());
        let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: core::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// Stroke and fill colour a participant is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorPair {
    pub stroke: Color,
    pub fill: Color,
}

impl Default for ColorPair {
    fn default() -> Self {
        Self {
            stroke: Color::BLACK,
            fill: Color::GREY,
        }
    }
}

impl ColorPair {
    /// Parse an encoded `"stroke,fill"` pair
    pub fn parse(encoded: &str) -> Result<Self, ColorParseError> {
        let mut parts = encoded.split(',');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(stroke), Some(fill), None) => Ok(Self {
                stroke: stroke.parse()?,
                fill: fill.parse()?,
            }),
            _ => Err(ColorParseError::WrongArity(encoded.to_string())),
        }
    }

    /// Parse an optional encoded pair, substituting `fallback` when it is
    /// missing or malformed
    pub fn parse_or(encoded: Option<&str>, fallback: ColorPair) -> Self {
        match encoded {
            Some(encoded) => Self::parse(encoded).unwrap_or_else(|e| {
                warn!(encoded, error = %e, "Malformed colour pair, using fallback");
                fallback
            }),
            None => fallback,
        }
    }

    /// Encode as `"stroke,fill"`
    pub fn encode(&self) -> String {
        format!("{},{}", self.stroke, self.fill)
    }
}

impl FromStr for ColorPair {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ----------------------------------------------------------------------------
// Buddy Records
// ----------------------------------------------------------------------------

/// A buddy as handed out by the presence directory
///
/// Directories report buddies either as typed properties or as a loose
/// string mapping (`"key"`, `"nick"`, `"color"`). Both shapes are normalized
/// into a [`ParticipantIdentity`] at the resolver boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuddyRecord {
    Properties {
        key: String,
        nick: String,
        color: Option<String>,
    },
    Mapping(BTreeMap<String, String>),
}

impl BuddyRecord {
    pub fn new<K: Into<String>, N: Into<String>>(key: K, nick: N, color: Option<&str>) -> Self {
        BuddyRecord::Properties {
            key: key.into(),
            nick: nick.into(),
            color: color.map(str::to_string),
        }
    }

    /// Stable key identifying the buddy across channels
    pub fn key(&self) -> Option<&str> {
        match self {
            BuddyRecord::Properties { key, .. } => Some(key),
            BuddyRecord::Mapping(map) => map.get("key").map(String::as_str),
        }
    }

    pub fn nick(&self) -> Option<&str> {
        match self {
            BuddyRecord::Properties { nick, .. } => Some(nick),
            BuddyRecord::Mapping(map) => map.get("nick").map(String::as_str),
        }
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            BuddyRecord::Properties { color, .. } => color.as_deref(),
            BuddyRecord::Mapping(map) => map.get("color").map(String::as_str),
        }
    }

    /// Whether both records name the same buddy
    pub fn same_buddy(&self, other: &BuddyRecord) -> bool {
        match (self.key(), other.key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

// ----------------------------------------------------------------------------
// Participant Identity
// ----------------------------------------------------------------------------

/// Resolved, stable identity of a chat participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantIdentity {
    pub display_name: String,
    pub colors: ColorPair,
    pub is_self: bool,
}

impl ParticipantIdentity {
    pub fn new<T: Into<String>>(display_name: T, colors: ColorPair, is_self: bool) -> Self {
        Self {
            display_name: display_name.into(),
            colors,
            is_self,
        }
    }

    /// Normalize a directory record; a missing nick becomes `unknown_name`
    pub fn from_record(
        record: &BuddyRecord,
        is_self: bool,
        fallback: ColorPair,
        unknown_name: &str,
    ) -> Self {
        Self {
            display_name: record.nick().unwrap_or(unknown_name).to_string(),
            colors: ColorPair::parse_or(record.color(), fallback),
            is_self,
        }
    }

    /// Placeholder identity for senders that could not be resolved
    pub fn unknown<T: Into<String>>(display_name: T, colors: ColorPair) -> Self {
        Self::new(display_name, colors, false)
    }

    pub fn stroke_color(&self) -> Color {
        self.colors.stroke
    }

    pub fn fill_color(&self) -> Color {
        self.colors.fill
    }
}

/// How widely the local activity is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharingScope {
    Private,
    Invite,
    Neighborhood,
}

impl fmt::Display for SharingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharingScope::Private => write!(f, "private"),
            SharingScope::Invite => write!(f, "invite-only"),
            SharingScope::Neighborhood => write!(f, "neighborhood"),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_pair_parse() {
        let pair = ColorPair::parse("#FF8F00,#00A0FF").unwrap();
        assert_eq!(pair.stroke, Color::rgb(0xff, 0x8f, 0x00));
        assert_eq!(pair.fill, Color::rgb(0x00, 0xa0, 0xff));
        assert_eq!(pair.encode(), "#ff8f00,#00a0ff");
    }

    #[test]
    fn test_color_pair_rejects_malformed() {
        assert!(matches!(
            ColorPair::parse("#FF8F00"),
            Err(ColorParseError::WrongArity(_))
        ));
        assert!(matches!(
            ColorPair::parse("#FF8F00,#00A0FF,#000000"),
            Err(ColorParseError::WrongArity(_))
        ));
        assert!(matches!(
            ColorPair::parse("red,#00A0FF"),
            Err(ColorParseError::InvalidColor(_))
        ));
        assert!(matches!(
            ColorPair::parse("#GG0000,#00A0FF"),
            Err(ColorParseError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_color_pair_fallback() {
        let fallback = ColorPair::default();
        assert_eq!(ColorPair::parse_or(None, fallback), fallback);
        assert_eq!(ColorPair::parse_or(Some("garbage"), fallback), fallback);
        assert_eq!(fallback.encode(), "#000000,#888888");
    }

    #[test]
    fn test_buddy_record_shapes_normalize_alike() {
        let props = BuddyRecord::new("k1", "alice", Some("#000000,#ffffff"));
        let mut map = BTreeMap::new();
        map.insert("key".to_string(), "k1".to_string());
        map.insert("nick".to_string(), "alice".to_string());
        map.insert("color".to_string(), "#000000,#ffffff".to_string());
        let mapping = BuddyRecord::Mapping(map);

        assert!(props.same_buddy(&mapping));
        let a = ParticipantIdentity::from_record(&props, false, ColorPair::default(), "???");
        let b = ParticipantIdentity::from_record(&mapping, false, ColorPair::default(), "???");
        assert_eq!(a, b);
        assert_eq!(a.fill_color(), Color::rgb(0xff, 0xff, 0xff));
    }

    #[test]
    fn test_message_kind_conversion() {
        assert_eq!(MessageKind::from(0), MessageKind::Normal);
        assert_eq!(MessageKind::from(2), MessageKind::Notice);
        assert_eq!(MessageKind::from(42), MessageKind::Unknown(42));
        assert_eq!(u32::from(MessageKind::AutoReply), 3);
    }

    #[test]
    fn test_null_handle() {
        assert!(Handle::NONE.is_none());
        assert!(!Handle::new(3).is_none());
    }
}
