//! # Realtime Fan-out
//!
//! Per-meeting subscriber registry and broadcast. Subscribers are actix
//! actor recipients (one per WebSocket connection); delivery is a
//! non-blocking mailbox handoff, so a slow subscriber never stalls the
//! state mutation path that triggered the broadcast.

use actix::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// A serialized JSON envelope on its way to one subscriber.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct Outbound(pub String);

/// Registry of live subscribers, keyed by meeting id. A meeting's entry
/// is removed entirely once its last subscriber disconnects.
#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, HashMap<Uuid, Recipient<Outbound>>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for a meeting. Called after the WebSocket
    /// handshake completed, so the recipient is immediately usable for
    /// delivery. Returns the handle used to disconnect later.
    pub fn connect(&self, meeting_id: &str, subscriber: Recipient<Outbound>) -> Uuid {
        let handle = Uuid::new_v4();
        let mut connections = self.connections.write().unwrap();
        connections
            .entry(meeting_id.to_string())
            .or_default()
            .insert(handle, subscriber);

        debug!(meeting_id = %meeting_id, handle = %handle, "Subscriber connected");
        handle
    }

    /// Remove one subscriber. Dropping the last subscriber of a meeting
    /// removes the meeting's registry entry entirely.
    pub fn disconnect(&self, meeting_id: &str, handle: Uuid) {
        let mut connections = self.connections.write().unwrap();
        if let Some(subscribers) = connections.get_mut(meeting_id) {
            subscribers.remove(&handle);
            if subscribers.is_empty() {
                connections.remove(meeting_id);
            }
        }

        debug!(meeting_id = %meeting_id, handle = %handle, "Subscriber disconnected");
    }

    /// Deliver `message` to every current subscriber of the meeting.
    /// Broadcasting to a meeting with no subscribers is a no-op. A failed
    /// send to one subscriber is logged, treated as an implicit
    /// disconnect, and never prevents delivery to the others.
    pub fn broadcast(&self, meeting_id: &str, message: &impl Serialize) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                error!(meeting_id = %meeting_id, error = %err, "Failed to serialize broadcast payload");
                return;
            }
        };

        // Snapshot the recipients so the lock is not held while sending.
        let recipients: Vec<(Uuid, Recipient<Outbound>)> = match self
            .connections
            .read()
            .unwrap()
            .get(meeting_id)
        {
            Some(subscribers) => subscribers
                .iter()
                .map(|(handle, recipient)| (*handle, recipient.clone()))
                .collect(),
            None => return,
        };

        let mut failed = Vec::new();
        for (handle, recipient) in recipients {
            if recipient.try_send(Outbound(payload.clone())).is_err() {
                warn!(
                    meeting_id = %meeting_id,
                    handle = %handle,
                    "Dropping subscriber after failed delivery"
                );
                failed.push(handle);
            }
        }

        for handle in failed {
            self.disconnect(meeting_id, handle);
        }
    }

    /// Current subscriber count for one meeting. Zero once (or before)
    /// the registry entry exists.
    pub fn subscriber_count(&self, meeting_id: &str) -> usize {
        self.connections
            .read()
            .unwrap()
            .get(meeting_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Number of meetings that currently have at least one subscriber.
    pub fn meeting_count(&self) -> usize {
        self.connections.read().unwrap().len()
    }
}
