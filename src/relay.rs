//! The broadcast adapter (spec §6): the external collaborator that calls
//! into the CRDT core and fans edits out to connected peers. This module is
//! the boundary only — it holds no CRDT logic of its own beyond translating
//! the wire envelope into `Document` calls.

use crate::char::{Character, SerializableChar};
use crate::document::Document;
use crate::pid::PositionId;
use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// A connection id reserved for messages that did not originate from a
/// WebSocket peer (one-shot HTTP clients), so broadcast fan-out never has to
/// special-case "no sender".
const NO_SENDER: u64 = u64::MAX;
const BROADCAST_CAPACITY: usize = 1024;

/// The JSON message envelope from spec §6. Unlike a tagged enum, this stays
/// a flat struct with optional fields, mirroring the wire shape exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<PositionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<PositionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PositionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SnapshotResponse {
    #[serde(rename = "type")]
    kind: &'static str,
    content: String,
    chars: Vec<SerializableChar>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

/// Errors the relay boundary rejects before the core ever sees them.
#[derive(Debug)]
pub enum RelayError {
    MalformedBody,
    MissingField(&'static str),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let message = match self {
            RelayError::MalformedBody => "malformed request body".to_string(),
            RelayError::MissingField(field) => format!("missing required field: {field}"),
        };
        (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    doc: Arc<RwLock<Document>>,
    peers: broadcast::Sender<(u64, String)>,
    next_peer_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(doc: Arc<RwLock<Document>>) -> Self {
        let (peers, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            doc,
            peers,
            next_peer_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/insert", post(insert_handler))
        .route("/delete", post(delete_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

fn insert_char_from(envelope: &Envelope) -> Result<Character, RelayError> {
    let left = envelope.left.as_ref().ok_or(RelayError::MissingField("left"))?;
    let value = envelope
        .value
        .as_ref()
        .and_then(|v| v.chars().next())
        .ok_or(RelayError::MissingField("value"))?;
    let site = envelope.site.clone().ok_or(RelayError::MissingField("site"))?;
    let counter = envelope.counter.ok_or(RelayError::MissingField("counter"))?;

    // The new character's position is carried directly in `left` (the
    // client has already run the allocator against its local view); `right`
    // is accepted for schema completeness but unused here, matching the
    // reference relay.
    Ok(Character::new(PositionId::new(left.path.clone(), site, counter), value))
}

fn delete_id_from(envelope: &Envelope) -> Result<PositionId, RelayError> {
    envelope.id.clone().ok_or(RelayError::MissingField("id"))
}

fn snapshot_of(doc: &Document) -> SnapshotResponse {
    SnapshotResponse {
        kind: "snapshot",
        content: doc.to_string_content(),
        chars: doc.raw_chars(),
    }
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let peer_id = state.next_peer_id.fetch_add(1, Ordering::Relaxed);
    info!(peer_id, "peer connected");

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.peers.subscribe();

    let snapshot = {
        let doc = state.doc.read().expect("document lock poisoned");
        serde_json::to_string(&snapshot_of(&doc)).expect("snapshot always serializes")
    };
    if sender.send(WsMessage::Text(snapshot)).await.is_err() {
        return;
    }

    let mut forward_task = tokio::spawn(async move {
        while let Ok((sender_id, msg)) = rx.recv().await {
            if sender_id == peer_id {
                continue;
            }
            if sender.send(WsMessage::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let state_for_reads = state.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let WsMessage::Text(text) = msg else { continue };
            let envelope: Envelope = match serde_json::from_str(&text) {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "dropping malformed envelope from peer");
                    continue;
                }
            };

            let applied = match envelope.kind.as_str() {
                "insert" => apply_insert(&state_for_reads, &envelope).is_ok(),
                "delete" => apply_delete(&state_for_reads, &envelope).is_ok(),
                other => {
                    debug!(kind = other, "ignoring unknown envelope type");
                    false
                }
            };

            if applied {
                let _ = state_for_reads.peers.send((peer_id, text));
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => read_task.abort(),
        _ = &mut read_task => forward_task.abort(),
    }

    info!(peer_id, "peer disconnected");
}

fn apply_insert(state: &AppState, envelope: &Envelope) -> Result<(), RelayError> {
    let c = insert_char_from(envelope)?;
    let mut doc = state.doc.write().expect("document lock poisoned");
    doc.apply_remote_insert(c);
    Ok(())
}

fn apply_delete(state: &AppState, envelope: &Envelope) -> Result<(), RelayError> {
    let id = delete_id_from(envelope)?;
    let mut doc = state.doc.write().expect("document lock poisoned");
    doc.apply_remote_delete(id);
    Ok(())
}

async fn insert_handler(
    State(state): State<AppState>,
    Json(envelope): Json<Envelope>,
) -> Result<Json<StatusResponse>, RelayError> {
    apply_insert(&state, &envelope)?;
    let raw = serde_json::to_string(&envelope).expect("envelope always serializes");
    let _ = state.peers.send((NO_SENDER, raw));
    Ok(Json(StatusResponse { status: "ok" }))
}

async fn delete_handler(
    State(state): State<AppState>,
    Json(envelope): Json<Envelope>,
) -> Result<Json<StatusResponse>, RelayError> {
    apply_delete(&state, &envelope)?;
    let raw = serde_json::to_string(&envelope).expect("envelope always serializes");
    let _ = state.peers.send((NO_SENDER, raw));
    Ok(Json(StatusResponse { status: "ok" }))
}

async fn snapshot_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let doc = state.doc.read().expect("document lock poisoned");
    Json(serde_json::to_value(snapshot_of(&doc)).expect("snapshot always serializes"))
}

async fn health_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}
