//! Loopback Text Channel
//!
//! An in-memory [`TransportChannel`] that records every call made on it and
//! queues the signals a real channel would emit. The channel itself is moved
//! into a session; a cloned [`LoopbackHandle`] stays with the test or host
//! loop to inject traffic, pop signals and inspect what happened.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bulletin_core::errors::TransportError;
use bulletin_core::transport::{
    GroupFlags, GroupMembership, Signal, SignalKind, SubscriptionId, TransportChannel,
    TransportResult,
};
use bulletin_core::types::{Handle, MessageId, MessageKind, PendingMessage};
use tracing::{debug, trace};

// ----------------------------------------------------------------------------
// Recorded Calls
// ----------------------------------------------------------------------------

/// One call made on a loopback channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Connect(SignalKind),
    Disconnect(SubscriptionId),
    Send(MessageKind, String),
    ListPending,
    Acknowledge(Vec<MessageId>),
    Close,
}

/// Failure injection for a loopback channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackBehavior {
    /// `close` fails as if the channel had already gone away
    pub fail_close: bool,
    /// `acknowledge` is rejected
    pub fail_acknowledge: bool,
    /// `connect_signal` is rejected
    pub fail_connect: bool,
    /// `list_pending` reports the channel unavailable
    pub fail_list_pending: bool,
}

impl LoopbackBehavior {
    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }
}

// ----------------------------------------------------------------------------
// Group Membership
// ----------------------------------------------------------------------------

/// Static group membership attached to a loopback channel
#[derive(Debug, Clone)]
pub struct LoopbackGroup {
    self_handle: Handle,
    flags: GroupFlags,
    owners: HashMap<Handle, Handle>,
}

impl LoopbackGroup {
    pub fn new(self_handle: Handle, flags: GroupFlags) -> Self {
        Self {
            self_handle,
            flags,
            owners: HashMap::new(),
        }
    }

    /// Group with channel-specific handles
    pub fn channel_specific(self_handle: Handle) -> Self {
        Self::new(self_handle, GroupFlags::CHANNEL_SPECIFIC_HANDLES)
    }

    /// Map a channel-specific handle to its connection-level owner
    pub fn with_owner(mut self, channel_handle: Handle, owner: Handle) -> Self {
        self.owners.insert(channel_handle, owner);
        self
    }
}

impl GroupMembership for LoopbackGroup {
    fn self_handle(&self) -> Handle {
        self.self_handle
    }

    fn flags(&self) -> GroupFlags {
        self.flags
    }

    fn handle_owners(&self, handles: &[Handle]) -> TransportResult<Vec<Handle>> {
        Ok(handles
            .iter()
            .map(|handle| self.owners.get(handle).copied().unwrap_or(Handle::NONE))
            .collect())
    }
}

// ----------------------------------------------------------------------------
// Shared State
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct LoopbackState {
    next_subscription: u64,
    next_message_id: u32,
    clock: u64,
    subscriptions: Vec<(SubscriptionId, SignalKind)>,
    pending: Vec<PendingMessage>,
    signals: VecDeque<Signal>,
    calls: Vec<ChannelCall>,
    closed: bool,
    behavior: LoopbackBehavior,
}

impl LoopbackState {
    fn subscribed(&self, kind: SignalKind) -> bool {
        self.subscriptions.iter().any(|(_, k)| *k == kind)
    }

    fn emit(&mut self, signal: Signal) {
        if self.subscribed(signal.kind()) {
            self.signals.push_back(signal);
        } else {
            trace!(kind = %signal.kind(), "No subscriber, signal not emitted");
        }
    }

    fn allocate_message(&mut self, sender: Handle, text: &str) -> PendingMessage {
        self.next_message_id += 1;
        self.clock += 1;
        PendingMessage::normal(self.next_message_id, self.clock, sender, text)
    }
}

fn lock(state: &Mutex<LoopbackState>) -> MutexGuard<'_, LoopbackState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Loopback Channel
// ----------------------------------------------------------------------------

/// In-memory text channel
#[derive(Debug)]
pub struct LoopbackChannel {
    state: Arc<Mutex<LoopbackState>>,
    group: Option<LoopbackGroup>,
}

impl LoopbackChannel {
    /// Peer-to-peer channel with no group capability
    pub fn new() -> (Self, LoopbackHandle) {
        Self::build(None)
    }

    pub fn with_group(group: LoopbackGroup) -> (Self, LoopbackHandle) {
        Self::build(Some(group))
    }

    fn build(group: Option<LoopbackGroup>) -> (Self, LoopbackHandle) {
        let state = Arc::new(Mutex::new(LoopbackState::default()));
        let handle = LoopbackHandle {
            state: Arc::clone(&state),
        };
        (Self { state, group }, handle)
    }
}

impl TransportChannel for LoopbackChannel {
    fn connect_signal(&mut self, kind: SignalKind) -> TransportResult<SubscriptionId> {
        let mut state = lock(&self.state);
        state.calls.push(ChannelCall::Connect(kind));
        if state.closed {
            return Err(TransportError::unavailable("channel closed"));
        }
        if state.behavior.fail_connect {
            return Err(TransportError::rejected("connect_signal", "injected failure"));
        }

        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.subscriptions.push((id, kind));
        debug!(%kind, subscription = %id, "Loopback subscription");
        Ok(id)
    }

    fn disconnect_signal(&mut self, subscription: SubscriptionId) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(ChannelCall::Disconnect(subscription));
        let before = state.subscriptions.len();
        state.subscriptions.retain(|(id, _)| *id != subscription);
        if state.subscriptions.len() == before {
            return Err(TransportError::rejected(
                "disconnect_signal",
                format!("unknown subscription {}", subscription),
            ));
        }
        Ok(())
    }

    fn send(&mut self, kind: MessageKind, text: &str) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(ChannelCall::Send(kind, text.to_string()));
        if state.closed {
            return Err(TransportError::unavailable("channel closed"));
        }
        Ok(())
    }

    fn list_pending(&mut self) -> TransportResult<Vec<PendingMessage>> {
        let mut state = lock(&self.state);
        state.calls.push(ChannelCall::ListPending);
        if state.behavior.fail_list_pending {
            return Err(TransportError::unavailable("pending list unavailable"));
        }
        Ok(state.pending.clone())
    }

    fn acknowledge(&mut self, ids: &[MessageId]) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(ChannelCall::Acknowledge(ids.to_vec()));
        if state.behavior.fail_acknowledge {
            return Err(TransportError::rejected("acknowledge", "injected failure"));
        }
        state.pending.retain(|message| !ids.contains(&message.id));
        Ok(())
    }

    fn close(&mut self) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(ChannelCall::Close);
        if state.closed || state.behavior.fail_close {
            return Err(TransportError::unavailable("channel already gone"));
        }
        state.closed = true;
        state.emit(Signal::Closed);
        Ok(())
    }

    fn group(&self) -> Option<&dyn GroupMembership> {
        self.group.as_ref().map(|group| group as &dyn GroupMembership)
    }
}

// ----------------------------------------------------------------------------
// Loopback Handle
// ----------------------------------------------------------------------------

/// Test-side view of a [`LoopbackChannel`]
#[derive(Debug, Clone)]
pub struct LoopbackHandle {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackHandle {
    pub fn set_behavior(&self, behavior: LoopbackBehavior) {
        lock(&self.state).behavior = behavior;
    }

    /// A message that arrived before anyone listened; no signal is emitted
    pub fn queue_pending(&self, sender: Handle, text: &str) -> MessageId {
        self.queue_pending_kind(sender, MessageKind::Normal, text)
    }

    /// Like [`LoopbackHandle::queue_pending`] with an explicit kind
    pub fn queue_pending_kind(&self, sender: Handle, kind: MessageKind, text: &str) -> MessageId {
        let mut state = lock(&self.state);
        let message = state.allocate_message(sender, text).with_kind(kind);
        let id = message.id;
        state.pending.push(message);
        id
    }

    /// A normal text message arriving now
    pub fn receive(&self, sender: Handle, text: &str) -> MessageId {
        let mut state = lock(&self.state);
        let message = state.allocate_message(sender, text);
        let id = message.id;
        state.pending.push(message.clone());
        state.emit(Signal::Received(message));
        id
    }

    /// A message of a non-text kind arriving now
    pub fn receive_kind(&self, sender: Handle, kind: MessageKind, text: &str) -> MessageId {
        let mut state = lock(&self.state);
        let message = state.allocate_message(sender, text).with_kind(kind);
        let id = message.id;
        state.pending.push(message.clone());
        state.emit(Signal::Received(message));
        id
    }

    /// The remote side closes the channel
    pub fn close_remotely(&self) {
        let mut state = lock(&self.state);
        if state.closed {
            return;
        }
        state.closed = true;
        state.emit(Signal::Closed);
    }

    /// Queue a signal regardless of subscriptions
    pub fn push_signal(&self, signal: Signal) {
        lock(&self.state).signals.push_back(signal);
    }

    pub fn next_signal(&self) -> Option<Signal> {
        lock(&self.state).signals.pop_front()
    }

    pub fn drain_signals(&self) -> Vec<Signal> {
        lock(&self.state).signals.drain(..).collect()
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Texts handed to `send`, including rejected ones
    pub fn sent(&self) -> Vec<String> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Send(_, text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every id acknowledged, in call order
    pub fn acknowledged(&self) -> Vec<MessageId> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Acknowledge(ids) => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn count_calls(&self, matches: impl Fn(&ChannelCall) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|call| matches(call)).count()
    }

    pub fn pending(&self) -> Vec<PendingMessage> {
        lock(&self.state).pending.clone()
    }

    pub fn active_subscriptions(&self) -> Vec<SignalKind> {
        lock(&self.state)
            .subscriptions
            .iter()
            .map(|(_, kind)| *kind)
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_only_reach_subscribers() {
        let (mut channel, handle) = LoopbackChannel::new();
        handle.receive(Handle::new(5), "unheard");
        assert!(handle.next_signal().is_none());

        channel.connect_signal(SignalKind::Received).unwrap();
        let id = handle.receive(Handle::new(5), "heard");
        match handle.next_signal() {
            Some(Signal::Received(message)) => assert_eq!(message.id, id),
            other => panic!("unexpected signal {:?}", other),
        }
        assert_eq!(handle.pending().len(), 2);
    }

    #[test]
    fn test_acknowledge_removes_pending() {
        let (mut channel, handle) = LoopbackChannel::new();
        let a = handle.queue_pending(Handle::new(1), "a");
        let b = handle.queue_pending(Handle::new(1), "b");
        channel.acknowledge(&[a]).unwrap();

        let pending = channel.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b);
        assert_eq!(handle.acknowledged(), vec![a]);
    }

    #[test]
    fn test_close_emits_closed_once() {
        let (mut channel, handle) = LoopbackChannel::new();
        channel.connect_signal(SignalKind::Closed).unwrap();
        channel.close().unwrap();
        assert!(channel.close().is_err());
        assert_eq!(handle.drain_signals(), vec![Signal::Closed]);
    }

    #[test]
    fn test_disconnect_unknown_subscription_is_rejected() {
        let (mut channel, _handle) = LoopbackChannel::new();
        assert!(channel.disconnect_signal(SubscriptionId(42)).is_err());
    }
}
