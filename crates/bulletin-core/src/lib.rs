//! Bulletin Core
//!
//! Bridges a shared activity's group text channel to a single message
//! consumer. Sender handles are resolved to participant identities, pending
//! messages are drained in transport order and acknowledged only after
//! delivery, and the channel lifecycle is torn down exactly once.
//!
//! The core is synchronous. The host owns the event loop and feeds transport
//! signals in through [`ChannelSession::handle_signal`] or
//! [`PresenceEventBridge::handle_signal`].

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod presence;
pub mod resolver;
pub mod session;
pub mod stats;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{BridgeConfig, UNKNOWN_DISPLAY_NAME};
pub use dispatcher::{DeliveryOutcome, MessageDispatcher, ReceivedCallback};
pub use errors::{BulletinError, BulletinResult, ColorParseError, Result, TransportError};
pub use presence::{BridgeStatus, PresenceEvent, PresenceEventBridge};
pub use resolver::HandleResolver;
pub use session::{ChannelSession, ClosedCallback, ClosureReason, SessionState, SubscriptionSet};
pub use stats::BridgeStats;
pub use transport::{
    Connection, GroupFlags, GroupMembership, Notification, NotificationSink, PresenceDirectory,
    SharedActivity, Signal, SignalKind, SubscriptionId, TransportChannel, TransportResult,
};
pub use types::{
    BuddyRecord, Color, ColorPair, Handle, MessageId, MessageKind, ParticipantIdentity,
    PendingMessage, SharingScope,
};
