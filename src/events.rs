// 11.0: every state change produces an event. fills, cancels and registry
// mutations each name the identity that performed them.

use crate::types::{Address, OrderHash, PoolId, Timestamp, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Fill events
    LimitOrderFilled(LimitOrderFilledEvent),
    RfqOrderFilled(RfqOrderFilledEvent),
    OtcOrderFilled(OtcOrderFilledEvent),

    // Cancellation events
    OrderCancelled(OrderCancelledEvent),
    PairCancelledLimitOrders(PairCancelledEvent),
    PairCancelledRfqOrders(PairCancelledEvent),

    // Registry events
    OrderSignerRegistered(OrderSignerRegisteredEvent),
    RfqOrderOriginsAllowed(RfqOrderOriginsAllowedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrderFilledEvent {
    pub order_hash: OrderHash,
    pub maker: Address,
    pub taker: Address,
    pub fee_recipient: Address,
    pub base_token: Address,
    pub quote_token: Address,
    pub quote_filled: u128,
    pub base_filled: u128,
    pub quote_fee_filled: u128,
    pub protocol_fee_paid: u128,
    pub pool: PoolId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfqOrderFilledEvent {
    pub order_hash: OrderHash,
    pub maker: Address,
    pub taker: Address,
    pub base_token: Address,
    pub quote_token: Address,
    pub quote_filled: u128,
    pub base_filled: u128,
    pub pool: PoolId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtcOrderFilledEvent {
    pub order_hash: OrderHash,
    pub maker: Address,
    pub taker: Address,
    pub base_token: Address,
    pub quote_token: Address,
    pub quote_filled: u128,
    pub base_filled: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order_hash: OrderHash,
    pub maker: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairCancelledEvent {
    pub maker: Address,
    pub base_token: Address,
    pub quote_token: Address,
    pub min_valid_salt: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSignerRegisteredEvent {
    pub maker: Address,
    pub signer: Address,
    pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfqOrderOriginsAllowedEvent {
    pub origin: Address,
    pub addrs: Vec<Address>,
    pub allowed: bool,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

/// Bounded in-memory event log. Oldest events are dropped past `max_events`.
#[derive(Debug, Clone)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCollector {
    pub fn new() -> Self {
        Self::with_retention(usize::MAX)
    }

    pub fn with_retention(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends `event` and returns whatever retention pushed out.
    pub fn push(&mut self, event: Event) -> Vec<Event> {
        self.events.push(event);

        if self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            return self.events.drain(0..drain_count).collect();
        }
        Vec::new()
    }

    /// Reverses the last `push` of the newest id: drops that event, puts the
    /// evicted ones back in front and releases the id.
    pub fn retract(&mut self, mut evicted: Vec<Event>) {
        let newest = EventId(self.next_id.saturating_sub(1));
        if self.events.last().map(|e| e.id) == Some(newest) {
            self.events.pop();
        } else {
            // zero retention evicts the event that was just pushed
            evicted.retain(|e| e.id != newest);
        }
        self.next_id = newest.0;
        if !evicted.is_empty() {
            self.events.splice(0..0, evicted);
        }
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::B256;

    #[test]
    fn event_collector() {
        let mut collector = EventCollector::new();

        let event = Event::new(
            collector.next_id(),
            Timestamp::from_secs(1000),
            EventPayload::OrderCancelled(OrderCancelledEvent {
                order_hash: OrderHash(B256::repeat_byte(1)),
                maker: Address::repeat_byte(2),
            }),
        );

        collector.emit(event);
        assert_eq!(collector.events().len(), 1);
        assert_eq!(collector.next_id(), EventId(2));

        collector.clear();
        assert!(collector.events().is_empty());
    }

    #[test]
    fn retention_drops_oldest() {
        let mut collector = EventCollector::with_retention(2);
        for maker in 1..=3u8 {
            let id = collector.next_id();
            collector.emit(Event::new(
                id,
                Timestamp::from_secs(0),
                EventPayload::OrderSignerRegistered(OrderSignerRegisteredEvent {
                    maker: Address::repeat_byte(maker),
                    signer: Address::ZERO,
                    allowed: true,
                }),
            ));
        }
        assert_eq!(collector.events().len(), 2);
        assert_eq!(collector.events()[0].id, EventId(2));
        assert_eq!(collector.recent(1)[0].id, EventId(3));
    }

    #[test]
    fn retract_undoes_push_with_eviction() {
        let mut collector = EventCollector::with_retention(1);
        let mut pushed = Vec::new();
        for maker in 1..=2u8 {
            let id = collector.next_id();
            pushed.push(collector.push(Event::new(
                id,
                Timestamp::from_secs(0),
                EventPayload::OrderSignerRegistered(OrderSignerRegisteredEvent {
                    maker: Address::repeat_byte(maker),
                    signer: Address::ZERO,
                    allowed: true,
                }),
            )));
        }
        assert_eq!(pushed[1].len(), 1);

        collector.retract(pushed.pop().unwrap());
        assert_eq!(collector.events().len(), 1);
        assert_eq!(collector.events()[0].id, EventId(1));
        assert_eq!(collector.next_id(), EventId(2));
    }

    #[test]
    fn events_serialize() {
        let payload = EventPayload::PairCancelledRfqOrders(PairCancelledEvent {
            maker: Address::repeat_byte(1),
            base_token: Address::repeat_byte(2),
            quote_token: Address::repeat_byte(3),
            min_valid_salt: U256::from(9u8),
        });
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("PairCancelledRfqOrders"));
    }
}
