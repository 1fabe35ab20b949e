//! Collaborator interfaces consumed by the bridge
//!
//! The bridge does not speak any wire protocol itself. It drives a text
//! channel through [`TransportChannel`], resolves participants through
//! [`Connection`] and [`PresenceDirectory`], obtains channels from the
//! [`SharedActivity`] it belongs to and reports status through a
//! [`NotificationSink`].
//!
//! Every transport operation is a fire-and-forget request: results that come
//! later arrive as [`Signal`]s, which the host dispatch loop feeds back into
//! the owning session.

use core::fmt;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::TransportError;
use crate::types::{BuddyRecord, Handle, MessageId, MessageKind, PendingMessage, SharingScope};

pub type TransportResult<T> = core::result::Result<T, TransportError>;

// ----------------------------------------------------------------------------
// Signals
// ----------------------------------------------------------------------------

/// Signals a text channel can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Closed,
    Received,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Closed => write!(f, "Closed"),
            SignalKind::Received => write!(f, "Received"),
        }
    }
}

/// A signal delivery from the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// The channel was closed by the transport
    Closed,
    /// A message arrived and is pending acknowledgment
    Received(PendingMessage),
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Closed => SignalKind::Closed,
            Signal::Received(_) => SignalKind::Received,
        }
    }
}

/// Registration token handed out by [`TransportChannel::connect_signal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Text Channel
// ----------------------------------------------------------------------------

/// Group membership flags of a text channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupFlags(u32);

impl GroupFlags {
    /// Handles in this group are only meaningful within the channel
    pub const CHANNEL_SPECIFIC_HANDLES: Self = Self(256);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl core::ops::BitOr for GroupFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Group capability of a multi-party text channel
pub trait GroupMembership {
    /// Our own handle within this group
    fn self_handle(&self) -> Handle;

    fn flags(&self) -> GroupFlags;

    /// Translate channel-specific handles to their connection-level owners.
    /// Untranslatable entries come back as [`Handle::NONE`].
    fn handle_owners(&self, handles: &[Handle]) -> TransportResult<Vec<Handle>>;
}

/// A live text channel
pub trait TransportChannel {
    fn connect_signal(&mut self, kind: SignalKind) -> TransportResult<SubscriptionId>;

    fn disconnect_signal(&mut self, subscription: SubscriptionId) -> TransportResult<()>;

    fn send(&mut self, kind: MessageKind, text: &str) -> TransportResult<()>;

    /// Messages received but not yet acknowledged, in transport order
    fn list_pending(&mut self) -> TransportResult<Vec<PendingMessage>>;

    fn acknowledge(&mut self, ids: &[MessageId]) -> TransportResult<()>;

    fn close(&mut self) -> TransportResult<()>;

    /// `None` for a direct peer-to-peer channel
    fn group(&self) -> Option<&dyn GroupMembership>;
}

// ----------------------------------------------------------------------------
// Connection and Directory
// ----------------------------------------------------------------------------

/// Connection-level identity services
pub trait Connection {
    fn self_handle(&self) -> Handle;

    /// Display aliases for connection-level handles, one per input handle
    fn aliases(&self, handles: &[Handle]) -> TransportResult<Vec<String>>;
}

/// Presence service mapping handles to buddies
pub trait PresenceDirectory {
    fn buddy_by_handle(&self, handle: Handle) -> Option<BuddyRecord>;

    /// The local user
    fn owner(&self) -> BuddyRecord;
}

/// The activity session the channel belongs to
pub trait SharedActivity {
    fn sharing_scope(&self) -> SharingScope;

    /// Whether a shared session already exists
    fn is_shared(&self) -> bool;

    /// Buddies currently in the shared session, possibly including us
    fn joined_buddies(&self) -> Vec<BuddyRecord>;

    /// Obtain the session's group text channel
    fn open_text_channel(&mut self) -> TransportResult<Box<dyn TransportChannel>>;
}

// ----------------------------------------------------------------------------
// Notifications
// ----------------------------------------------------------------------------

/// A dismissible status alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub timeout: Duration,
}

impl Notification {
    pub fn new<T: Into<String>, M: Into<String>>(title: T, message: M, timeout: Duration) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            timeout,
        }
    }
}

pub trait NotificationSink {
    fn notify(&self, notification: Notification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_flags() {
        let flags = GroupFlags::from_bits(256 | 1);
        assert!(flags.contains(GroupFlags::CHANNEL_SPECIFIC_HANDLES));
        assert!(!GroupFlags::empty().contains(GroupFlags::CHANNEL_SPECIFIC_HANDLES));
        assert_eq!((GroupFlags::empty() | GroupFlags::CHANNEL_SPECIFIC_HANDLES).bits(), 256);
    }

    #[test]
    fn test_signal_kind() {
        assert_eq!(Signal::Closed.kind(), SignalKind::Closed);
        let msg = PendingMessage::normal(1, 0, Handle::new(2), "hi");
        assert_eq!(Signal::Received(msg).kind(), SignalKind::Received);
    }
}
