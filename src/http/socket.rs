use super::state::AppState;
use crate::protocol::{Connection, Dispatch, SessionContext};
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-connection receive loop
///
/// Each frame is fully handled, including any upload it triggers, before the
/// next one is read. When the loop ends for any reason the connection is
/// closed, which frees the session even if the client never sent `end`.
/// Cancelling the state's shutdown token ends the loop between frames.
pub async fn run(socket: WebSocket, context: SessionContext, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut connection = Connection::new(
        context,
        Arc::clone(&state.pipeline),
        Arc::clone(&state.speech),
    );

    loop {
        let msg = tokio::select! {
            _ = state.shutdown.cancelled() => {
                info!(
                    "Closing session {} for shutdown",
                    connection.context().session_id
                );
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            msg = receiver.next() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        let dispatch = match msg {
            Ok(Message::Text(text)) => connection.handle_text(&text).await,
            Ok(Message::Binary(data)) => connection.handle_binary(Bytes::from(data)).await,
            // Pings are answered by the protocol layer
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                debug!("Client sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };

        match dispatch {
            Dispatch::Reply(reply) => {
                if sender.send(Message::Text(reply.to_json())).await.is_err() {
                    debug!("Client gone, dropping reply");
                    break;
                }
            }
            Dispatch::Close(reply) => {
                let _ = sender.send(Message::Text(reply.to_json())).await;
                let _ = sender.close().await;
                break;
            }
            Dispatch::Ignore => {}
        }
    }

    connection.close().await;
    info!(
        "Client disconnected with session {}",
        connection.context().session_id
    );
}
