//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::SessionHandle;
use crate::http::AppError;
use crate::util::rate_limit::ClientRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;

    let client_id = Uuid::new_v4();
    info!(session_id = %session_id, client_id = %client_id, "WebSocket upgrade");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, client_id, session)))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, client_id: Uuid, session: SessionHandle) {
    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before reading the snapshot so no change is missed
    let events_rx = session.subscribe();

    let welcome = ServerMsg::Welcome {
        session_id: session.id,
        server_time: unix_millis(),
    };
    let current = ServerMsg::Snapshot {
        snapshot: Box::new(session.snapshot()),
    };
    for msg in [&welcome, &current] {
        if let Err(e) = send_msg(&mut ws_sink, msg).await {
            error!(client_id = %client_id, error = %e, "Failed to send welcome");
            return;
        }
    }

    run_connection(client_id, &session, ws_sink, ws_stream, events_rx).await;

    info!(session_id = %session.id, client_id = %client_id, "WebSocket connection closed");
}

/// Run the WebSocket connection with read/write split
async fn run_connection(
    client_id: Uuid,
    session: &SessionHandle,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut events_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ClientRateLimiter::new();

    // Spawn writer task: session events -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(msg) => {
                    let closing = matches!(msg, ServerMsg::SessionClosed { .. });
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(client_id = %client_id, error = %e, "WebSocket send failed");
                        break;
                    }
                    if closing {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        client_id = %client_id,
                        lagged_count = n,
                        "Client lagged, skipping {} events", n
                    );
                    // The next snapshot carries the full state
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(client_id = %client_id, "Event channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_command() {
                    warn!(client_id = %client_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => {
                        if session.send(Some(client_id), client_msg).await.is_err() {
                            debug!(client_id = %client_id, "Session ended");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(client_id = %client_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(client_id = %client_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(client_id = %client_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
