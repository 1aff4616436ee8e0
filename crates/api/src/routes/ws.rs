//! Websocket transport for live vehicle tracking.
//!
//! One connection is one tracking session. Frames are JSON objects tagged
//! with an `event` name and an optional `data` body.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::Extensions,
    response::Response,
};
use domain::models::{LocationFix, NearestSignalsSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{ApiError, ErrorBody};
use crate::middleware::trace_id::get_request_id;
use crate::services::{FixOutcome, SessionManager};

/// Frames sent by the vehicle.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendCoords(LocationFix),
    Reset,
}

/// Frames sent back to the vehicle.
#[derive(Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NearestSignals(NearestSignalsSnapshot),
    NoSignals { city: String },
    Error(ErrorBody),
    ResetDone,
}

impl From<ApiError> for ServerEvent {
    fn from(err: ApiError) -> Self {
        ServerEvent::Error(ErrorBody::from(&err))
    }
}

/// Upgrades to a websocket carrying one tracking session.
///
/// GET /ws/location
pub async fn location_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    extensions: Extensions,
) -> Response {
    let request_id = get_request_id(&extensions);
    let sessions = state.sessions.clone();
    ws.on_upgrade(move |socket| run_session(socket, sessions, request_id))
}

async fn run_session(mut socket: WebSocket, sessions: Arc<SessionManager>, request_id: String) {
    let session_id = Uuid::new_v4();
    let span = tracing::info_span!("session", session_id = %session_id, request_id = %request_id);

    async move {
        sessions.open(session_id).await;
        info!("Tracking session opened");

        while let Some(message) = socket.recv().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Websocket receive failed");
                    break;
                }
            };

            let reply = match message {
                Message::Text(text) => handle_text(&sessions, session_id, &text).await,
                Message::Binary(_) => {
                    ApiError::Validation("Binary frames are not supported".into()).into()
                }
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            if let Err(e) = send_event(&mut socket, &reply).await {
                debug!(error = %e, "Websocket send failed");
                break;
            }
        }

        sessions.close(session_id).await;
        info!("Tracking session closed");
    }
    .instrument(span)
    .await
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).map_err(axum::Error::new)?;
    socket.send(Message::Text(text)).await
}

/// Handles one inbound text frame for `session_id` and returns the reply.
pub async fn handle_text(sessions: &SessionManager, session_id: Uuid, text: &str) -> ServerEvent {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "Malformed client frame");
            return ApiError::Validation(format!("Malformed message: {}", e)).into();
        }
    };

    match event {
        ClientEvent::SendCoords(fix) => match sessions.handle_fix(session_id, &fix).await {
            Ok(FixOutcome::Tracked { snapshot, .. }) => ServerEvent::NearestSignals(snapshot),
            Ok(FixOutcome::NoSignals { city }) => ServerEvent::NoSignals { city },
            Err(e) => {
                debug!(error = %e, "Location fix rejected");
                ApiError::from(e).into()
            }
        },
        ClientEvent::Reset => {
            sessions.reset(session_id).await;
            ServerEvent::ResetDone
        }
    }
}
