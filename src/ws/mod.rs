pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::Session;

/// Version announced in the welcome message
pub const PROTOCOL_VERSION: &str = "1.0";

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(session): State<Session>) -> impl IntoResponse {
    tracing::info!("WebSocket connection request for {} tab", session.role);
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, session: Session) {
    let (mut sender, mut receiver) = socket.split();
    let mut views = session.subscribe();
    let mut admin_verified = false;

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        role: session.role,
        tab_id: session.tab_id.clone(),
        state: Box::new(session.snapshot().await),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Some(msg) = encode(&welcome) {
        if sender.send(msg).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    loop {
        tokio::select! {
            // State pushes and sound cues from the tab
            view_msg = views.recv() => {
                let msg = match view_msg {
                    Ok(msg) => msg,
                    // Fell behind: the latest snapshot supersedes whatever was dropped
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("View lagged by {} messages, resending state", skipped);
                        ServerMessage::State { state: Box::new(session.snapshot().await) }
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Some(msg) = encode(&msg) {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &session, &mut admin_verified).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(msg) = response.as_ref().and_then(encode) {
                            if sender.send(msg).await.is_err() {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed for {} tab", session.role);
}
