//! In-process room event bus.
//!
//! One bounded `broadcast` channel per room, created lazily on first
//! subscribe or publish. This is the reference pub-sub semantics: at-least-
//! once delivery to whoever is currently subscribed, with lagging receivers
//! dropped rather than backed up, generalizing the teacher's per-connection
//! broadcast fan-out to a per-room channel keyed by room id.

use crate::rooms::model::{Room, RoomId};
use crate::rooms::snapshot::{Progress, RoomSnapshot};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename = "room.snapshot")]
    RoomSnapshot {
        room_snapshot: RoomSnapshot,
        progress: Progress,
    },
    #[serde(rename = "room.expired")]
    RoomExpired { room_snapshot: RoomSnapshot },
}

impl ServerMessage {
    pub fn snapshot_of(room: &Room) -> Self {
        Self::RoomSnapshot {
            room_snapshot: RoomSnapshot::from(room),
            progress: Progress::from(room),
        }
    }

    pub fn expired_of(room: &Room) -> Self {
        Self::RoomExpired {
            room_snapshot: RoomSnapshot::from(room),
        }
    }
}

pub struct EventBus {
    channels: DashMap<RoomId, broadcast::Sender<Arc<ServerMessage>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    fn sender_for(&self, room_id: RoomId) -> broadcast::Sender<Arc<ServerMessage>> {
        self.channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribe to a room's event stream, creating the channel if this is
    /// the first subscriber.
    pub fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<Arc<ServerMessage>> {
        self.sender_for(room_id).subscribe()
    }

    /// Publish a snapshot. Errors (no active receivers) are expected and
    /// silently ignored, this is at-least-once delivery to whoever is
    /// currently listening, not a durable log.
    pub fn publish_snapshot(&self, room: &Room) {
        let _ = self
            .sender_for(room.room_id)
            .send(Arc::new(ServerMessage::snapshot_of(room)));
    }

    pub fn publish_expired(&self, room: &Room) {
        let _ = self
            .sender_for(room.room_id)
            .send(Arc::new(ServerMessage::expired_of(room)));
    }

    /// Drop a room's channel once the room itself has been removed from the
    /// store. Any still-subscribed sessions simply see the channel closed.
    pub fn remove(&self, room_id: RoomId) {
        self.channels.remove(&room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::model::Room;
    use uuid::Uuid;

    fn sample_room(room_id: RoomId) -> Room {
        Room::new(room_id, "ABCDEF".to_string(), Uuid::new_v4(), "tok".to_string())
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish_snapshot(&sample_room(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn subscriber_receives_published_snapshot() {
        let bus = EventBus::new(16);
        let room_id = Uuid::new_v4();
        let mut rx = bus.subscribe(room_id);

        bus.publish_snapshot(&sample_room(room_id));
        let message = rx.recv().await.unwrap();
        assert!(matches!(&*message, ServerMessage::RoomSnapshot { .. }));
    }

    #[tokio::test]
    async fn lagging_receiver_is_reported_as_lagged_not_blocked() {
        let bus = EventBus::new(1);
        let room_id = Uuid::new_v4();
        let mut rx = bus.subscribe(room_id);
        let room = sample_room(room_id);

        bus.publish_snapshot(&room);
        bus.publish_snapshot(&room);
        bus.publish_snapshot(&room);

        let result = rx.recv().await;
        assert!(matches!(result, Err(broadcast::error::RecvError::Lagged(_))));
    }
}
