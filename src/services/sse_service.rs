use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    error::ServiceError,
    state::{
        SharedState,
        relay::{Envelope, Topic},
    },
};

/// Read-only feed: a relay subscription plus the topics it is allowed to see.
pub struct Feed {
    receiver: broadcast::Receiver<Envelope>,
    topics: Vec<Topic>,
}

/// Subscribe to the global presence topic.
pub fn subscribe_presence(state: &SharedState) -> Feed {
    Feed {
        receiver: state.relay().subscribe(),
        topics: vec![Topic::Presence],
    }
}

/// Subscribe to the public topics of an existing room.
pub fn subscribe_room(state: &SharedState, room_id: &str) -> Result<Feed, ServiceError> {
    if !state.rooms().contains(room_id) {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    }
    Ok(Feed {
        receiver: state.relay().subscribe(),
        topics: Topic::room_feed_topics(room_id).into(),
    })
}

/// Convert a feed into an SSE response, forwarding matching envelopes until
/// the client disconnects.
pub fn to_sse_stream(feed: Feed) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Feed {
        mut receiver,
        topics,
    } = feed;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(envelope) => {
                            if !topics.contains(&envelope.topic) {
                                continue;
                            }
                            let event = match Event::default()
                                .event(envelope.event.event.as_str())
                                .json_data(&envelope.event.data)
                            {
                                Ok(event) => event,
                                Err(err) => {
                                    warn!(topic = %envelope.topic, error = %err, "failed to encode SSE event");
                                    continue;
                                }
                            };

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        info!(topics = topics.len(), "SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
