use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashSet;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc,
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{DirectReply, InboundEvent},
    services::dispatch::{ConnectionContext, dispatch},
    state::{
        Identity, SharedState,
        relay::{Envelope, Topic},
    },
};

/// Failure to hand a frame to the writer task.
#[derive(Debug, Error)]
enum SocketError {
    /// Writer channel closed; the connection should be terminated.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of one player's WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut context = ConnectionContext::new(Uuid::new_v4(), identity);
    let connection_id = context.connection_id();
    let user_id = context.identity().user_id.clone();

    // Subscribe before announcing presence so this connection sees its own online snapshot.
    let forwarder = spawn_forwarder(
        state.relay().subscribe(),
        context.subscriptions(),
        outbound_tx.clone(),
    );
    state.presence_service().connect(&user_id, connection_id);
    info!(%connection_id, user_id = %user_id, "player connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection_id, payload = %text, "received player message");

                let reply = match InboundEvent::from_json_str(&text) {
                    Ok(event) => dispatch(&state, &mut context, event),
                    Err(err) => {
                        warn!(%connection_id, error = %err, "failed to parse player message");
                        Some(DirectReply::InvalidMessage {
                            message: err.to_string(),
                        })
                    }
                };

                if let Some(reply) = reply {
                    if send_message_to_websocket(&outbound_tx, &reply).is_err() {
                        info!(%connection_id, "connection closed while replying, terminating");
                        break;
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, "player closed connection");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    let disconnect = context.disconnect_event();
    dispatch(&state, &mut context, disconnect);
    forwarder.abort();
    info!(%connection_id, user_id = %user_id, "player disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Forward relay envelopes whose topic the connection subscribed to.
fn spawn_forwarder(
    mut receiver: broadcast::Receiver<Envelope>,
    subscriptions: Arc<DashSet<Topic>>,
    outbound_tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(envelope) => {
                    if !subscriptions.contains(&envelope.topic) {
                        continue;
                    }
                    if send_message_to_websocket(&outbound_tx, &envelope).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket subscriber lagged; envelopes dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), SocketError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SocketError::ConnectionClosed)
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        dto::events::ServerEvent,
        state::relay::{BroadcastRelay, NotificationRelay},
    };

    #[tokio::test]
    async fn forwarder_only_relays_subscribed_topics() {
        let relay = BroadcastRelay::new(8);
        let subscriptions = Arc::new(DashSet::new());
        subscriptions.insert(Topic::Presence);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forwarder = spawn_forwarder(relay.subscribe(), subscriptions, tx);

        relay.publish(
            Topic::RoomState("other".into()),
            ServerEvent::json("room.state", &json!({})).unwrap(),
        );
        relay.publish(
            Topic::Presence,
            ServerEvent::json("presence", &json!({ "online": ["u"], "count": 1 })).unwrap(),
        );

        let Some(Message::Text(frame)) = rx.recv().await else {
            panic!("expected a text frame");
        };
        let frame: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(frame["topic"], "presence");
        assert_eq!(frame["event"], "presence");
        assert_eq!(frame["data"]["count"], 1);

        drop(relay);
        forwarder.await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn closed_writer_is_reported() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let reply = DirectReply::InvalidMessage {
            message: "bad".into(),
        };
        assert!(matches!(
            send_message_to_websocket(&tx, &reply),
            Err(SocketError::ConnectionClosed)
        ));
    }
}
