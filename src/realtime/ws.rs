//! WebSocket Endpoint for Realtime DMs
//!
//! `GET /ws/dm/{peer_sub}` joins the room for (caller, peer) and receives
//! push updates whenever either participant sends a message. The bearer
//! credential is verified before the upgrade is accepted; on failure the
//! connection is refused outright and no data path ever exists.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::auth::{credential_from_headers, TokenVerifier};
use crate::server::state::AppState;

use super::ConnectionHub;

/// WebSocket handler joining a DM room
///
/// Authentication happens first: an invalid credential is refused with a
/// plain 401 before any upgrade concern, so no data path ever exists. The
/// upgrade itself arrives as a `Result` so the credential check is not
/// preempted by a failed extraction.
pub async fn ws_dm(
    State(state): State<AppState>,
    Path(peer_sub): Path<String>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let claims = match authenticate(&state.verifier, &headers) {
        Ok(claims) => claims,
        Err(_) => {
            tracing::warn!("websocket open refused: invalid credential");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let hub = state.hub.clone();
    let me = claims.sub;
    ws.on_upgrade(move |socket| drive_dm_socket(socket, hub, me, peer_sub))
}

fn authenticate(
    verifier: &TokenVerifier,
    headers: &HeaderMap,
) -> Result<crate::auth::Claims, crate::error::Error> {
    let token = credential_from_headers(headers)?;
    verifier.verify(&token)
}

/// Pump pushed events to the client until either side goes away
///
/// The socket handshake has completed by the time this runs, so attaching
/// here means registration is only visible once the client can receive.
/// The channel is push-only: inbound frames are discarded.
async fn drive_dm_socket(socket: WebSocket, hub: Arc<ConnectionHub>, me: String, peer: String) {
    let mut member = hub.attach(&me, &peer);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = member.receiver.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("failed to serialize push event: {e}");
                        continue;
                    }
                };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Push-only channel; the server takes no instructions here.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.detach(member.connection_id, &me, &peer);
    tracing::debug!(%me, %peer, "dm socket closed");
}
