//! Process-local realtime pub/sub bus.
//!
//! Single writer (the dispatcher), many subscribers. Rooms are named
//! `pipeline:{id}`; each room is a bounded broadcast channel, so a slow
//! subscriber lags and drops the oldest messages instead of blocking the
//! dispatcher. Best-effort: no persistence, no retry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use schema::OutputRecord;
use serde_json::{json, Value as Json};
use tokio::sync::broadcast;

pub type PushMessage = Arc<Json>;

const DEFAULT_CAPACITY: usize = 256;

pub struct RealtimeBus {
    rooms: RwLock<HashMap<String, broadcast::Sender<PushMessage>>>,
    capacity: usize,
}

impl RealtimeBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    fn room_key(pipeline_id: &str) -> String {
        format!("pipeline:{pipeline_id}")
    }

    /// Join the room for a pipeline; the receiver sees every message
    /// published after this call.
    pub fn subscribe(&self, pipeline_id: &str) -> broadcast::Receiver<PushMessage> {
        let key = Self::room_key(pipeline_id);
        {
            let rooms = self.rooms.read().unwrap();
            if let Some(sender) = rooms.get(&key) {
                return sender.subscribe();
            }
        }
        let mut rooms = self.rooms.write().unwrap();
        rooms
            .entry(key)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Broadcast one message to every subscriber of the pipeline's room.
    /// Returns the number of receivers reached; rooms with no subscribers
    /// are pruned.
    pub fn publish(&self, pipeline_id: &str, payload: Json) -> usize {
        let key = Self::room_key(pipeline_id);
        let message: PushMessage = Arc::new(payload);

        let delivered = {
            let rooms = self.rooms.read().unwrap();
            match rooms.get(&key) {
                Some(sender) => sender.send(message).unwrap_or(0),
                None => return 0,
            }
        };

        if delivered == 0 {
            let mut rooms = self.rooms.write().unwrap();
            if rooms.get(&key).map(|s| s.receiver_count() == 0).unwrap_or(false) {
                rooms.remove(&key);
            }
        }

        delivered
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap().len()
    }
}

impl Default for RealtimeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// The realtime payload: envelope fields flattened next to the output data.
pub fn push_payload(output: &OutputRecord) -> Json {
    let mut payload = json!({
        "type": "event",
        "id": output.id,
        "signature": output.signature,
        "timestamp": output.timestamp,
        "program": output.program,
        "pipelineId": output.pipeline_id,
    });
    if let Json::Object(object) = &mut payload {
        for (key, value) in &output.data {
            object.entry(key.clone()).or_insert_with(|| value.to_json());
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{DataMap, ProgramId, Value};

    fn output(pipeline_id: &str) -> OutputRecord {
        let mut data = DataMap::new();
        data.insert("direction".into(), Value::Str("buy".into()));
        OutputRecord {
            id: "sig:addr:0".into(),
            pipeline_id: pipeline_id.into(),
            program: ProgramId::Pumpfun,
            signature: "sig".into(),
            timestamp: 1_700_000_000_000,
            data,
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_subscribers_only() {
        let bus = RealtimeBus::new();
        let mut sub_a = bus.subscribe("P");
        let mut sub_b = bus.subscribe("P");
        let mut outsider = bus.subscribe("Q");

        let delivered = bus.publish("P", push_payload(&output("P")));
        assert_eq!(delivered, 2);

        let got_a = sub_a.recv().await.unwrap();
        let got_b = sub_b.recv().await.unwrap();
        assert_eq!(got_a["type"], "event");
        assert_eq!(got_a["pipelineId"], "P");
        assert_eq!(got_b["direction"], "buy");

        // No cross-room leakage.
        assert!(matches!(
            outsider.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = RealtimeBus::new();
        assert_eq!(bus.publish("P", json!({"x": 1})), 0);
        assert_eq!(bus.room_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_and_drops_oldest() {
        let bus = RealtimeBus::with_capacity(2);
        let mut sub = bus.subscribe("P");

        for i in 0..5 {
            bus.publish("P", json!({"seq": i}));
        }

        // The first recv reports the lag, subsequent recvs see the newest
        // retained messages.
        match sub.recv().await {
            Err(broadcast::error::RecvError::Lagged(skipped)) => assert_eq!(skipped, 3),
            other => panic!("expected lag, got {other:?}"),
        }
        let newest = sub.recv().await.unwrap();
        assert_eq!(newest["seq"], 3);
    }
}
