//! Push fan-out to every connected viewer.
//!
//! Delivery is best-effort: no acknowledgment, no buffering, no replay. A
//! payload is a hint that something changed; clients treat the merged view
//! as the source of truth and refetch when the per-match `seq` shows a gap.

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// Fan-out channel depth. A subscriber this far behind is lagging
/// hopelessly and gets dropped by the channel rather than stalling the
/// mutation path.
const CHANNEL_CAPACITY: usize = 256;

/// Fire-and-forget broadcast of change deltas.
///
/// Every subscriber sees every payload and filters by `id` itself; the
/// publisher never filters. `seq` is monotonic per match so a reconnecting
/// client can detect missed pushes.
pub struct Broadcaster {
    tx: broadcast::Sender<Value>,
    seqs: DashMap<String, u64>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            seqs: DashMap::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish `{id, seq, ...delta}` to all subscribers. No subscribers is
    /// not an error; a dead connection is the websocket task's problem,
    /// not the mutation path's. Returns the sequence number assigned.
    pub fn publish(&self, match_id: &str, mut delta: Map<String, Value>) -> u64 {
        let seq = {
            let mut entry = self.seqs.entry(match_id.to_owned()).or_insert(0);
            *entry += 1;
            *entry
        };
        delta.insert("id".to_owned(), Value::String(match_id.to_owned()));
        delta.insert("seq".to_owned(), Value::from(seq));
        let _ = self.tx.send(Value::Object(delta));
        seq
    }

    /// Legacy singleton pushes carry no match id; they go out as-is.
    pub fn publish_raw(&self, payload: Value) {
        let _ = self.tx.send(payload);
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
