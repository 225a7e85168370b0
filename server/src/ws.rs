use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use ember_ids::UserId;
use ember_protocol::{ReadyPayload, ReadyServer, ServerEvent};
use ember_repo::ServerRepository;
use serde::Deserialize;
use tracing::warn;

use crate::auth::AuthProvider;
use crate::AppState;

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

/// Upgrade handler for `/ws`: authenticates the bearer token carried as a
/// query parameter (browsers cannot set `Authorization` on a WebSocket
/// handshake), assembles `ready`, then hands the socket to the hub for the
/// rest of the connection's life.
pub async fn upgrade(State(state): State<Arc<AppState>>, Query(query): Query<WsQuery>, ws: WebSocketUpgrade) -> Response {
    let user_id = match state.auth.authenticate(&query.token).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "websocket auth rejected");
            return axum::http::StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let hub = state.hub.clone();
    let ready = match build_ready(&state, user_id).await {
        Ok(ready) => ready,
        Err(e) => {
            warn!(%user_id, error = %e, "failed to build ready payload");
            return axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ws.on_upgrade(move |socket| async move {
        hub.handle_socket(socket, user_id, ServerEvent::Ready(ready)).await;
    })
}

async fn build_ready(state: &AppState, user_id: UserId) -> ember_model::DomainResult<ReadyPayload> {
    let servers = state.repo.list_for_user(user_id).await?;
    let mut ready_servers = Vec::with_capacity(servers.len());
    let mut voice_states = Vec::new();
    let mut muted_server_ids = Vec::new();

    for server in &servers {
        ready_servers.push(ReadyServer { id: server.id, name: server.name.clone(), icon_url: server.icon_url.clone() });
        voice_states.extend(state.voice.sync_for(server.id));
        if let Some(mute) = state.repo.get_mute(server.id, user_id).await? {
            if mute.is_active(chrono::Utc::now()) {
                muted_server_ids.push(server.id);
            }
        }
    }

    Ok(ReadyPayload { online_user_ids: state.hub.online_user_ids(), servers: ready_servers, muted_server_ids, voice_states })
}
