//! # Meeting WebSocket Handler
//!
//! Realtime observer endpoint for one meeting. Clients connect to
//! `/ws/meetings/{meeting_id}` and receive JSON envelopes; they may also
//! push transcript segments and ad-hoc questions over the same socket.
//!
//! ## Protocol:
//! 1. **Connect**: after the handshake the server sends a
//!    `meeting.connected` acknowledgment followed by a `meeting.state`
//!    snapshot of the current live state.
//! 2. **Inbound events**: `transcript.segment` (`{text, speaker|null}`)
//!    and `user.question` (`{question}`), tagged with a `type` field.
//! 3. **Outbound envelopes**: `meeting.delta` after every
//!    rate-limit-gated recompute and `bot.answer` for every question,
//!    both broadcast to *all* subscribers of the meeting.
//!
//! The envelope `type` tags are a wire contract with the transport
//! clients and must remain stable strings.
//!
//! Each connection is one actor; per-meeting ordering of state mutations
//! is enforced by the live state manager, and broadcasts travel through
//! actor mailboxes so delivery never blocks ingestion.

use crate::fanout::Outbound;
use crate::live::manager::{MeetingDelta, StateSnapshot};
use crate::state::AppState;
use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// How often the server pings idle connections.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// How long without any client frame before the connection is dropped.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Stable envelope type tags (wire contract).
pub const EVENT_CONNECTED: &str = "meeting.connected";
pub const EVENT_STATE: &str = "meeting.state";
pub const EVENT_DELTA: &str = "meeting.delta";
pub const EVENT_ANSWER: &str = "bot.answer";

/// Tagged envelope delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub meeting_id: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    fn new(event_type: &'static str, meeting_id: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type,
            meeting_id: meeting_id.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Connection acknowledgment, sent once right after the handshake.
    pub fn connected(meeting_id: &str) -> Self {
        Self::new(EVENT_CONNECTED, meeting_id, json!({}))
    }

    /// Full state snapshot for a freshly connected subscriber.
    pub fn state(meeting_id: &str, snapshot: &StateSnapshot) -> Self {
        Self::new(EVENT_STATE, meeting_id, to_payload(meeting_id, snapshot))
    }

    /// Incremental update after a summary recompute.
    pub fn delta(meeting_id: &str, delta: &MeetingDelta) -> Self {
        Self::new(EVENT_DELTA, meeting_id, to_payload(meeting_id, delta))
    }

    /// Answer to an ad-hoc user question.
    pub fn answer(meeting_id: &str, question: &str, answer: &str) -> Self {
        Self::new(
            EVENT_ANSWER,
            meeting_id,
            json!({ "question": question, "answer": answer }),
        )
    }
}

/// Envelope payload from any serializable value. A serialization
/// failure is logged and degrades to an empty object rather than
/// dropping the envelope.
fn to_payload(meeting_id: &str, value: &impl Serialize) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        warn!(
            meeting_id = %meeting_id,
            error = %err,
            "Failed to serialize envelope payload"
        );
        json!({})
    })
}

/// Events clients send over the socket. Extra fields (meeting id,
/// timestamps) are accepted and ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum InboundEvent {
    #[serde(rename = "transcript.segment")]
    TranscriptSegment {
        #[serde(default)]
        payload: TranscriptSegmentPayload,
    },
    #[serde(rename = "user.question")]
    UserQuestion {
        #[serde(default)]
        payload: QuestionPayload,
    },
}

#[derive(Debug, Default, Deserialize)]
struct TranscriptSegmentPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    speaker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuestionPayload {
    #[serde(default)]
    question: String,
}

/// One WebSocket connection observing (and feeding) one meeting.
pub struct MeetingWebSocket {
    meeting_id: String,
    /// Fan-out registration handle, set once the actor has started.
    handle: Option<Uuid>,
    app_state: AppState,
    last_heartbeat: Instant,
}

impl MeetingWebSocket {
    pub fn new(meeting_id: String, app_state: AppState) -> Self {
        Self {
            meeting_id,
            handle: None,
            app_state,
            last_heartbeat: Instant::now(),
        }
    }

    /// Send one envelope to this connection only.
    fn send_envelope(&self, ctx: &mut ws::WebsocketContext<Self>, envelope: &Envelope) {
        match serde_json::to_string(envelope) {
            Ok(json) => ctx.text(json),
            Err(err) => warn!(
                meeting_id = %self.meeting_id,
                error = %err,
                "Failed to serialize envelope"
            ),
        }
    }

    /// Ingest a transcript segment and broadcast the resulting delta, if
    /// the rate limiter produced one. Empty text is silently ignored.
    fn handle_transcript_segment(&self, payload: TranscriptSegmentPayload) {
        let text = payload.text.trim();
        if text.is_empty() {
            return;
        }

        let speaker = payload
            .speaker
            .as_deref()
            .map(str::trim)
            .filter(|speaker| !speaker.is_empty());

        let delta = self
            .app_state
            .live
            .process_transcript_segment(&self.meeting_id, text, speaker);

        if let Some(delta) = delta {
            self.app_state
                .connections
                .broadcast(&self.meeting_id, &Envelope::delta(&self.meeting_id, &delta));
        }
    }

    /// Answer a question over the current state and broadcast the answer
    /// to every subscriber of the meeting.
    fn handle_user_question(&self, payload: QuestionPayload) {
        let question = payload.question.trim();
        if question.is_empty() {
            return;
        }

        let answer = self.app_state.live.answer_question(&self.meeting_id, question);
        self.app_state.connections.broadcast(
            &self.meeting_id,
            &Envelope::answer(&self.meeting_id, question, &answer),
        );
    }
}

impl Actor for MeetingWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(meeting_id = %self.meeting_id, "WebSocket observer connected");
        self.app_state.increment_active_connections();

        // Register with the fan-out only after the handshake completed;
        // from here on the recipient is usable for delivery.
        let handle = self
            .app_state
            .connections
            .connect(&self.meeting_id, ctx.address().recipient());
        self.handle = Some(handle);

        self.send_envelope(ctx, &Envelope::connected(&self.meeting_id));

        let snapshot = self.app_state.live.snapshot(&self.meeting_id);
        self.send_envelope(ctx, &Envelope::state(&self.meeting_id, &snapshot));

        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(meeting_id = %act.meeting_id, "WebSocket heartbeat timeout, closing connection");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(handle) = self.handle.take() {
            self.app_state.connections.disconnect(&self.meeting_id, handle);
        }
        self.app_state.decrement_active_connections();
        info!(meeting_id = %self.meeting_id, "WebSocket observer disconnected");
    }
}

/// Deliver broadcast envelopes queued in this connection's mailbox.
impl Handler<Outbound> for MeetingWebSocket {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for MeetingWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match serde_json::from_str::<InboundEvent>(&text) {
                    Ok(InboundEvent::TranscriptSegment { payload }) => {
                        self.handle_transcript_segment(payload)
                    }
                    Ok(InboundEvent::UserQuestion { payload }) => {
                        self.handle_user_question(payload)
                    }
                    Err(err) => {
                        // A stray frame is not worth killing a live
                        // observer over; skip it.
                        warn!(
                            meeting_id = %self.meeting_id,
                            error = %err,
                            "Ignoring malformed WebSocket event"
                        );
                    }
                }
            }
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Binary(_)) => {
                warn!(meeting_id = %self.meeting_id, "Ignoring unexpected binary frame");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(_) => {}
            Err(err) => {
                warn!(meeting_id = %self.meeting_id, error = %err, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

/// HTTP route that upgrades to the meeting WebSocket.
pub async fn meeting_websocket(
    req: HttpRequest,
    stream: web::Payload,
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let meeting_id = path.into_inner();
    info!(
        meeting_id = %meeting_id,
        peer = ?req.connection_info().peer_addr(),
        "New WebSocket connection request"
    );

    let websocket = MeetingWebSocket::new(meeting_id, app_state.get_ref().clone());
    ws::start(websocket, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_transcript_segment_parses() {
        let raw = r#"{
            "type": "transcript.segment",
            "meeting_id": "m1",
            "payload": {"text": "Decision: ship v1", "speaker": "Alice"}
        }"#;

        match serde_json::from_str::<InboundEvent>(raw).unwrap() {
            InboundEvent::TranscriptSegment { payload } => {
                assert_eq!(payload.text, "Decision: ship v1");
                assert_eq!(payload.speaker.as_deref(), Some("Alice"));
            }
            other => panic!("wrong event parsed: {:?}", other),
        }
    }

    #[test]
    fn test_inbound_question_without_extra_fields() {
        let raw = r#"{"type": "user.question", "payload": {"question": "List decisions"}}"#;

        match serde_json::from_str::<InboundEvent>(raw).unwrap() {
            InboundEvent::UserQuestion { payload } => {
                assert_eq!(payload.question, "List decisions");
            }
            other => panic!("wrong event parsed: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let raw = r#"{"type": "meeting.command", "payload": {}}"#;
        assert!(serde_json::from_str::<InboundEvent>(raw).is_err());
    }

    #[test]
    fn test_envelope_type_tags_are_stable() {
        let envelope = Envelope::connected("m1");
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "meeting.connected");
        assert_eq!(json["meeting_id"], "m1");
        assert!(json["timestamp"].is_string());

        let answer = Envelope::answer("m1", "q?", "a.");
        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["type"], "bot.answer");
        assert_eq!(json["payload"]["question"], "q?");
        assert_eq!(json["payload"]["answer"], "a.");
    }

    #[test]
    fn test_unserializable_payload_falls_back_to_empty_object() {
        // Maps with non-string keys cannot become JSON objects.
        let mut bad = std::collections::BTreeMap::new();
        bad.insert(vec![0u8], 1u8);
        assert_eq!(to_payload("m1", &bad), json!({}));
    }

    #[test]
    fn test_state_envelope_carries_snapshot_shape() {
        let snapshot = StateSnapshot {
            transcript_lines: vec!["Alice: hello".to_string()],
            summary: String::new(),
            insights: Default::default(),
            updated_at: None,
        };

        let envelope = Envelope::state("m2", &snapshot);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "meeting.state");
        assert_eq!(json["payload"]["transcript_lines"][0], "Alice: hello");
        assert_eq!(json["payload"]["summary"], "");
        assert!(json["payload"]["insights"]["decisions"]
            .as_array()
            .unwrap()
            .is_empty());
        assert!(json["payload"]["updated_at"].is_null());
    }
}
