//! Delivery counters for the bridge

use serde::{Deserialize, Serialize};

/// Counters accumulated while a bridge runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStats {
    /// Messages handed to the consumer
    pub delivered: u64,
    /// Acknowledgments issued to the transport
    pub acknowledged: u64,
    /// Non-text messages discarded by kind
    pub filtered: u64,
    /// Messages held because no consumer was attached
    pub buffered: u64,
    /// Buffered messages evicted to make room
    pub evicted: u64,
    /// Deliveries suppressed because the id was already acknowledged
    pub duplicates: u64,
    /// Senders replaced by the unknown identity
    pub resolution_fallbacks: u64,
    /// Messages handed to the transport
    pub sent: u64,
    /// Sends refused because no channel was open
    pub failed_sends: u64,
}

impl BridgeStats {
    /// Add another set of counters to this one
    pub fn merge(&mut self, other: &BridgeStats) {
        self.delivered += other.delivered;
        self.acknowledged += other.acknowledged;
        self.filtered += other.filtered;
        self.buffered += other.buffered;
        self.evicted += other.evicted;
        self.duplicates += other.duplicates;
        self.resolution_fallbacks += other.resolution_fallbacks;
        self.sent += other.sent;
        self.failed_sends += other.failed_sends;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut a = BridgeStats {
            delivered: 2,
            sent: 1,
            ..BridgeStats::default()
        };
        let b = BridgeStats {
            delivered: 3,
            failed_sends: 4,
            ..BridgeStats::default()
        };
        a.merge(&b);
        assert_eq!(a.delivered, 5);
        assert_eq!(a.sent, 1);
        assert_eq!(a.failed_sends, 4);
    }
}
