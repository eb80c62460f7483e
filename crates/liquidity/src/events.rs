// liquidity/src/events.rs

use serde::{Deserialize, Serialize};
use swap_primitives::{Address, Amount, Timestamp};
use tokio::sync::broadcast;

/// Capacity of the live event channel; slow subscribers see `Lagged`
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable pool state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PoolEvent {
    LiquidityAdded {
        provider: Address,
        to: Address,
        amount_a: Amount,
        amount_b: Amount,
        minted: Amount,
    },
    LiquidityRemoved {
        provider: Address,
        to: Address,
        amount_a: Amount,
        amount_b: Amount,
        shares: Amount,
    },
    Swap {
        trader: Address,
        to: Address,
        token_in: Address,
        token_out: Address,
        amount_in: Amount,
        amount_out: Amount,
    },
}

/// A logged event with its position and time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, starting at 0
    pub sequence: u64,
    /// Block time at which the call committed
    pub timestamp: Timestamp,
    /// Emitting pool
    pub pool: Address,
    pub event: PoolEvent,
}

/// Append-only event log
///
/// Records are only appended after a call has fully settled, so observers
/// never see events for rolled-back calls.
#[derive(Debug)]
pub struct EventLog {
    records: Vec<EventRecord>,
    notifier: broadcast::Sender<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        let (notifier, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: Vec::new(),
            notifier,
        }
    }

    pub(crate) fn append(
        &mut self,
        pool: Address,
        timestamp: Timestamp,
        event: PoolEvent,
    ) -> &EventRecord {
        let record = EventRecord {
            sequence: self.records.len() as u64,
            timestamp,
            pool,
            event,
        };
        // No live subscribers is not an error
        let _ = self.notifier.send(record.clone());
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `sequence >= from`
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = (from as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live feed of records appended after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.notifier.subscribe()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap_event(amount_in: u64) -> PoolEvent {
        PoolEvent::Swap {
            trader: Address::from_label("alice"),
            to: Address::from_label("alice"),
            token_in: Address::from_label("TKNA"),
            token_out: Address::from_label("TKNB"),
            amount_in: Amount::from_u64(amount_in),
            amount_out: Amount::from_u64(1),
        }
    }

    #[test]
    fn test_sequence_numbers() {
        let mut log = EventLog::new();
        let pool = Address::from_label("pool");
        assert!(log.is_empty());

        log.append(pool, 10, swap_event(1));
        log.append(pool, 11, swap_event(2));
        log.append(pool, 12, swap_event(3));

        assert_eq!(log.len(), 3);
        assert_eq!(log.since(1).len(), 2);
        assert_eq!(log.since(1)[0].sequence, 1);
        assert!(log.since(99).is_empty());
        assert_eq!(log.last().unwrap().timestamp, 12);
    }

    #[tokio::test]
    async fn test_subscribers_receive_new_records() {
        let mut log = EventLog::new();
        let pool = Address::from_label("pool");
        log.append(pool, 1, swap_event(1));

        let mut rx = log.subscribe();
        log.append(pool, 2, swap_event(2));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.sequence, 1);
        assert_eq!(received.event, swap_event(2));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(swap_event(5)).unwrap();
        assert_eq!(json["type"], "Swap");
        assert_eq!(json["amount_in"], "5");
    }
}
