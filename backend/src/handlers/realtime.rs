//! WebSocket stream of table changes

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::middleware::auth::{authenticate, AuthUser};
use crate::services::realtime::{ClientMessage, ServerMessage, Subscription};
use crate::AppState;

#[derive(Deserialize)]
pub struct SocketQuery {
    /// Access token; browsers cannot set headers on a WebSocket handshake
    pub token: String,
}

/// Upgrade to a socket that forwards every table change the user may see
pub async fn realtime_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
) -> Response {
    let user = match authenticate(&query.token, &state.config.jwt.secret) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    tracing::info!(user_id = %user.user_id, "Realtime socket requested");
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_socket(socket, state, user).await {
            tracing::warn!("Realtime socket closed with error: {:?}", e);
        }
    })
}

async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) -> anyhow::Result<()> {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.events.subscribe());
    let mut subscription = Subscription::default();

    send(
        &mut sender,
        &ServerMessage::Connected {
            tables: subscription.tables(),
        },
    )
    .await?;

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Subscribe { tables }) => {
                        subscription.set(tables);
                        tracing::debug!(user_id = %user.user_id, tables = ?subscription.tables(), "Subscription changed");
                        send(&mut sender, &ServerMessage::Connected { tables: subscription.tables() }).await?;
                    }
                    Err(e) => tracing::debug!("Ignoring client message: {}", e),
                },
                Some(Ok(Message::Ping(ping))) => sender.send(Message::Pong(ping)).await?,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if subscription.wants(&event) {
                        send(&mut sender, &ServerMessage::Change(event)).await?;
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(user_id = %user.user_id, skipped, "Realtime client lagged");
                    send(&mut sender, &ServerMessage::Lagged { skipped }).await?;
                }
                None => break,
            },
        }
    }

    tracing::info!(user_id = %user.user_id, "Realtime socket closed");
    Ok(())
}

async fn send<S>(sender: &mut S, message: &ServerMessage) -> anyhow::Result<()>
where
    S: futures::Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    sender
        .send(Message::Text(serde_json::to_string(message)?))
        .await?;
    Ok(())
}
