//! Inbound message dispatch
//!
//! [`MessageDispatcher`] runs the delivery path for every received record,
//! whether it arrived live through the received signal or was replayed from
//! the transport's pending list:
//!
//! 1. records that are not normal text are discarded, never acknowledged;
//! 2. ids acknowledged recently are skipped so a replay cannot deliver twice;
//! 3. without a consumer the record is buffered, unacknowledged;
//! 4. otherwise the sender is resolved, the consumer is invoked and the id is
//!    acknowledged afterwards.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::errors::Result;
use crate::resolver::HandleResolver;
use crate::stats::BridgeStats;
use crate::transport::TransportChannel;
use crate::types::{MessageId, ParticipantIdentity, PendingMessage};

/// Consumer of delivered messages
pub type ReceivedCallback = Arc<dyn Fn(&ParticipantIdentity, &str)>;

/// What happened to one inbound record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Handed to the consumer and acknowledged
    Delivered,
    /// Not a normal text message
    Filtered,
    /// Held until a consumer attaches
    Buffered,
    /// Already delivered and acknowledged
    Duplicate,
}

// ----------------------------------------------------------------------------
// Acknowledged Window
// ----------------------------------------------------------------------------

/// Bounded memory of recently acknowledged ids
#[derive(Debug)]
struct AcknowledgedWindow {
    order: VecDeque<MessageId>,
    ids: HashSet<MessageId>,
    capacity: usize,
}

impl AcknowledgedWindow {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    fn contains(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    fn insert(&mut self, id: MessageId) {
        if !self.ids.insert(id) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Message Dispatcher
// ----------------------------------------------------------------------------

/// Routes inbound records to the single registered consumer
pub struct MessageDispatcher {
    resolver: HandleResolver,
    callback: Option<ReceivedCallback>,
    undelivered: VecDeque<PendingMessage>,
    buffer_capacity: usize,
    acknowledged: AcknowledgedWindow,
    stats: BridgeStats,
}

impl MessageDispatcher {
    pub fn new(resolver: HandleResolver, config: &BridgeConfig) -> Self {
        Self {
            resolver,
            callback: None,
            undelivered: VecDeque::new(),
            buffer_capacity: config.undelivered_buffer_capacity,
            acknowledged: AcknowledgedWindow::new(config.acknowledged_window),
            stats: BridgeStats::default(),
        }
    }

    /// Install the consumer, returning the one it replaces
    pub fn set_callback(&mut self, callback: ReceivedCallback) -> Option<ReceivedCallback> {
        self.callback.replace(callback)
    }

    /// Detach the consumer; later records are buffered
    pub fn take_callback(&mut self) -> Option<ReceivedCallback> {
        self.callback.take()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub fn resolver(&self) -> &HandleResolver {
        &self.resolver
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut BridgeStats {
        &mut self.stats
    }

    /// Records held for a consumer that has not attached yet
    pub fn undelivered_len(&self) -> usize {
        self.undelivered.len()
    }

    /// Run the delivery path for one record
    pub fn deliver(
        &mut self,
        channel: &mut dyn TransportChannel,
        message: PendingMessage,
    ) -> DeliveryOutcome {
        if !message.kind.is_normal() {
            debug!(message_id = %message.id, kind = ?message.kind, "Ignoring non-text message");
            self.stats.filtered += 1;
            return DeliveryOutcome::Filtered;
        }

        if self.acknowledged.contains(message.id) {
            debug!(message_id = %message.id, "Skipping already acknowledged message");
            self.stats.duplicates += 1;
            return DeliveryOutcome::Duplicate;
        }

        let Some(callback) = self.callback.clone() else {
            self.hold(message);
            return DeliveryOutcome::Buffered;
        };

        let identity = match self.resolver.resolve(&*channel, message.sender) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(sender = %message.sender, error = %e, "Unable to resolve sender, using unknown identity");
                self.stats.resolution_fallbacks += 1;
                self.resolver.unknown_identity()
            }
        };

        callback(&identity, &message.text);
        self.stats.delivered += 1;

        // The id is remembered even if the acknowledgment fails: the
        // transport will replay it and the replay must not reach the consumer.
        self.acknowledged.insert(message.id);
        match channel.acknowledge(&[message.id]) {
            Ok(()) => self.stats.acknowledged += 1,
            Err(e) => warn!(message_id = %message.id, error = %e, "Acknowledgment failed"),
        }

        DeliveryOutcome::Delivered
    }

    /// Replay the transport's unacknowledged messages in the order returned
    ///
    /// Buffered copies of listed messages are dropped first so the pending
    /// order wins. Buffered messages the transport no longer lists follow.
    pub fn drain_pending(&mut self, channel: &mut dyn TransportChannel) -> Result<usize> {
        let pending = channel.list_pending()?;
        debug!(count = pending.len(), "Draining pending messages");

        if self.has_callback() {
            self.undelivered
                .retain(|held| !pending.iter().any(|message| message.id == held.id));
        }

        let mut delivered = 0;
        for message in pending {
            if self.deliver(channel, message) == DeliveryOutcome::Delivered {
                delivered += 1;
            }
        }
        Ok(delivered + self.flush_undelivered(channel))
    }

    fn flush_undelivered(&mut self, channel: &mut dyn TransportChannel) -> usize {
        if !self.has_callback() {
            return 0;
        }

        let held: Vec<PendingMessage> = self.undelivered.drain(..).collect();
        let mut delivered = 0;
        for message in held {
            if self.deliver(channel, message) == DeliveryOutcome::Delivered {
                delivered += 1;
            }
        }
        if delivered > 0 {
            debug!(delivered, "Flushed buffered messages");
        }
        delivered
    }

    fn hold(&mut self, message: PendingMessage) {
        if self.undelivered.iter().any(|held| held.id == message.id) {
            return;
        }

        debug!(message_id = %message.id, "No consumer registered, holding message unacknowledged");
        if self.buffer_capacity == 0 {
            warn!(message_id = %message.id, "Dropped message: no consumer and no buffer");
            self.stats.evicted += 1;
            return;
        }

        if self.undelivered.len() >= self.buffer_capacity {
            if let Some(evicted) = self.undelivered.pop_front() {
                warn!(message_id = %evicted.id, "Undelivered buffer full, evicting oldest message");
                self.stats.evicted += 1;
            }
        }
        self.undelivered.push_back(message);
        self.stats.buffered += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledged_window_is_bounded() {
        let mut window = AcknowledgedWindow::new(2);
        window.insert(MessageId::new(1));
        window.insert(MessageId::new(2));
        window.insert(MessageId::new(2));
        assert!(window.contains(MessageId::new(1)));

        window.insert(MessageId::new(3));
        assert!(!window.contains(MessageId::new(1)));
        assert!(window.contains(MessageId::new(2)));
        assert!(window.contains(MessageId::new(3)));
        assert_eq!(window.order.len(), 2);
    }
}
