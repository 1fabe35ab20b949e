//! Channel session lifecycle
//!
//! A [`ChannelSession`] owns one text channel and every signal registration
//! made on it. It starts `Open` and has a single transition, `Open → Closed`,
//! taken either when the transport reports the channel closed or when an
//! explicit close request fails because the transport is already gone. Both
//! paths funnel into the same teardown, which runs exactly once: all
//! subscriptions are released, the transport is dropped and the closed
//! callback fires.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::dispatcher::{DeliveryOutcome, MessageDispatcher, ReceivedCallback};
use crate::errors::{BulletinError, Result};
use crate::resolver::HandleResolver;
use crate::stats::BridgeStats;
use crate::transport::{Signal, SignalKind, SubscriptionId, TransportChannel};
use crate::types::MessageKind;

/// Consumer of the closed event
pub type ClosedCallback = Box<dyn FnOnce()>;

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Open,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Open => write!(f, "Open"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Why a session closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureReason {
    /// The transport emitted its closed signal
    Remote,
    /// An explicit close found the transport already gone
    TransportUnavailable(BulletinError),
    /// Wiring the session failed before it was handed out
    SetupFailed(BulletinError),
}

// ----------------------------------------------------------------------------
// Subscription Set
// ----------------------------------------------------------------------------

/// Signal registrations owned by a session
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    entries: Vec<(SignalKind, SubscriptionId)>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: SignalKind, id: SubscriptionId) {
        self.entries.push((kind, id));
    }

    pub fn contains(&self, kind: SignalKind) -> bool {
        self.entries.iter().any(|(k, _)| *k == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unregister every subscription from `channel`, emptying the set
    pub fn release_all(&mut self, channel: Option<&mut Box<dyn TransportChannel>>) {
        let entries = core::mem::take(&mut self.entries);
        let Some(channel) = channel else {
            return;
        };
        for (kind, id) in entries {
            if let Err(e) = channel.disconnect_signal(id) {
                debug!(%kind, subscription = %id, error = %e, "Signal already gone during teardown");
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Channel Session
// ----------------------------------------------------------------------------

/// Lifecycle owner of one group text channel
pub struct ChannelSession {
    state: SessionState,
    transport: Option<Box<dyn TransportChannel>>,
    subscriptions: SubscriptionSet,
    dispatcher: MessageDispatcher,
    closed_callback: Option<ClosedCallback>,
    close_requested: bool,
    closure_reason: Option<ClosureReason>,
}

impl ChannelSession {
    /// Take ownership of `transport` and subscribe to its closed signal
    ///
    /// Received messages are not subscribed here; see
    /// [`ChannelSession::subscribe_received`] and
    /// [`ChannelSession::set_received_callback`].
    pub fn open(
        mut transport: Box<dyn TransportChannel>,
        resolver: HandleResolver,
        config: &BridgeConfig,
    ) -> Result<Self> {
        let closed = transport.connect_signal(SignalKind::Closed)?;
        let mut subscriptions = SubscriptionSet::new();
        subscriptions.insert(SignalKind::Closed, closed);
        debug!(subscription = %closed, "Channel session open");

        Ok(Self {
            state: SessionState::Open,
            transport: Some(transport),
            subscriptions,
            dispatcher: MessageDispatcher::new(resolver, config),
            closed_callback: None,
            close_requested: false,
            closure_reason: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn closure_reason(&self) -> Option<&ClosureReason> {
        self.closure_reason.as_ref()
    }

    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    pub fn stats(&self) -> &BridgeStats {
        self.dispatcher.stats()
    }

    /// Register the single consumer of the closed event
    ///
    /// A callback registered after the session closed never fires.
    pub fn set_closed_callback(&mut self, callback: ClosedCallback) {
        self.closed_callback = Some(callback);
    }

    /// Send a normal text message
    pub fn send(&mut self, text: &str) -> Result<()> {
        let transport = live_transport(self.state, &mut self.transport, "send")?;
        transport.send(MessageKind::Normal, text)?;
        self.dispatcher.stats_mut().sent += 1;
        Ok(())
    }

    /// Request closure of the channel
    ///
    /// The session stays open until the transport's closed signal arrives.
    /// If the request itself fails the transport is treated as gone and the
    /// session closes immediately.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed || self.close_requested {
            debug!("Close already requested");
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        self.close_requested = true;
        if let Err(e) = transport.close() {
            info!(error = %e, "Channel already gone while closing");
            let error = BulletinError::TransportUnavailable {
                reason: e.to_string(),
            };
            self.finish_close(ClosureReason::TransportUnavailable(error));
        }
    }

    /// Subscribe to received messages without attaching a consumer
    ///
    /// Does nothing when there is no live transport or the subscription
    /// already exists.
    pub fn subscribe_received(&mut self) -> Result<()> {
        if self.subscriptions.contains(SignalKind::Received) {
            return Ok(());
        }
        let Some(transport) = self.transport.as_mut() else {
            debug!("No live transport, not subscribing to received messages");
            return Ok(());
        };

        let id = transport.connect_signal(SignalKind::Received)?;
        self.subscriptions.insert(SignalKind::Received, id);
        Ok(())
    }

    /// Attach the message consumer
    ///
    /// Messages held while no consumer was attached are delivered by a
    /// pending drain, so they arrive in transport order even when the
    /// buffer evicted some of them.
    pub fn set_received_callback(&mut self, callback: ReceivedCallback) -> Result<()> {
        self.dispatcher.set_callback(callback);
        self.subscribe_received()?;
        if self.is_open() && self.dispatcher.undelivered_len() > 0 {
            self.drain_pending()?;
        }
        Ok(())
    }

    /// Detach the message consumer; the received subscription stays
    pub fn clear_received_callback(&mut self) -> Option<ReceivedCallback> {
        self.dispatcher.take_callback()
    }

    /// Replay unacknowledged messages through the delivery path
    pub fn drain_pending(&mut self) -> Result<usize> {
        let transport = live_transport(self.state, &mut self.transport, "drain pending messages")?;
        self.dispatcher.drain_pending(transport.as_mut())
    }

    /// Tear the session down at once, releasing every subscription
    ///
    /// Used when the session cannot be completed; the transport is not asked
    /// to close.
    pub fn abort(&mut self, error: BulletinError) {
        self.finish_close(ClosureReason::SetupFailed(error));
    }

    /// Feed a signal delivery from the dispatch loop
    ///
    /// Signals without a matching subscription, and any signal after
    /// closure, are ignored.
    pub fn handle_signal(&mut self, signal: Signal) -> Option<DeliveryOutcome> {
        if self.state == SessionState::Closed {
            debug!(kind = %signal.kind(), "Ignoring signal on closed session");
            return None;
        }
        if !self.subscriptions.contains(signal.kind()) {
            debug!(kind = %signal.kind(), "Ignoring signal without subscription");
            return None;
        }

        match signal {
            Signal::Closed => {
                self.finish_close(ClosureReason::Remote);
                None
            }
            Signal::Received(message) => {
                let transport = self.transport.as_mut()?;
                Some(self.dispatcher.deliver(transport.as_mut(), message))
            }
        }
    }

    fn finish_close(&mut self, reason: ClosureReason) {
        if self.state == SessionState::Closed {
            return;
        }

        self.state = SessionState::Closed;
        let mut transport = self.transport.take();
        self.subscriptions.release_all(transport.as_mut());
        drop(transport);

        match &reason {
            ClosureReason::Remote => info!("Channel closed"),
            ClosureReason::TransportUnavailable(e) => warn!(error = %e, "Channel closed"),
            ClosureReason::SetupFailed(e) => warn!(error = %e, "Channel abandoned during setup"),
        }
        self.closure_reason = Some(reason);

        if let Some(callback) = self.closed_callback.take() {
            callback();
        }
    }
}

/// The transport of an open session, or `ChannelClosed` for `operation`
fn live_transport<'a>(
    state: SessionState,
    transport: &'a mut Option<Box<dyn TransportChannel>>,
    operation: &str,
) -> Result<&'a mut Box<dyn TransportChannel>> {
    match (state, transport.as_mut()) {
        (SessionState::Open, Some(transport)) => Ok(transport),
        _ => Err(BulletinError::channel_closed(operation)),
    }
}

impl fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSession")
            .field("state", &self.state)
            .field("subscriptions", &self.subscriptions)
            .field("close_requested", &self.close_requested)
            .field("closure_reason", &self.closure_reason)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_set_release_without_transport() {
        let mut set = SubscriptionSet::new();
        set.insert(SignalKind::Closed, SubscriptionId(1));
        set.insert(SignalKind::Received, SubscriptionId(2));
        assert!(set.contains(SignalKind::Received));
        assert_eq!(set.len(), 2);

        set.release_all(None);
        assert!(set.is_empty());
        assert!(!set.contains(SignalKind::Closed));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Open.to_string(), "Open");
        assert_eq!(SessionState::Closed.to_string(), "Closed");
    }
}
