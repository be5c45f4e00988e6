//! Realtime WebSocket transport over the pub/sub bus.
//!
//! Clients connect to `/ws`, send `subscribe`/`unsubscribe` messages carrying
//! a pipeline id, and receive one `event` message per output delivered to
//! that pipeline's room. Best-effort: a client that falls behind its room
//! buffer misses the oldest messages.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use engine::deliver::PushMessage;
use engine::RealtimeBus;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    Subscribe {
        #[serde(rename = "pipelineId")]
        pipeline_id: String,
    },
    Unsubscribe {
        #[serde(rename = "pipelineId")]
        pipeline_id: String,
    },
}

pub async fn serve(bind: &str, bus: Arc<RealtimeBus>) -> anyhow::Result<()> {
    let app = Router::new().route("/ws", get(ws_handler)).with_state(bus);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("realtime listener on ws://{bind}/ws");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(bus): State<Arc<RealtimeBus>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| client_loop(socket, bus))
}

async fn client_loop(mut socket: WebSocket, bus: Arc<RealtimeBus>) {
    // Forwarder tasks funnel room messages into one per-client queue so the
    // socket is written from a single place.
    let (out_tx, mut out_rx) = mpsc::channel::<PushMessage>(64);
    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(text) = message else { continue };
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Subscribe { pipeline_id }) => {
                        if subscriptions.contains_key(&pipeline_id) {
                            continue;
                        }
                        let mut receiver = bus.subscribe(&pipeline_id);
                        let forward = out_tx.clone();
                        let room = pipeline_id.clone();
                        let handle = tokio::spawn(async move {
                            loop {
                                match receiver.recv().await {
                                    Ok(message) => {
                                        if forward.send(message).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(RecvError::Lagged(skipped)) => {
                                        debug!("subscriber lagged room={room} skipped={skipped}");
                                    }
                                    Err(RecvError::Closed) => break,
                                }
                            }
                        });
                        subscriptions.insert(pipeline_id.clone(), handle);
                        let ack = json!({"type": "subscribed", "pipelineId": pipeline_id});
                        if socket.send(Message::Text(ack.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(ClientMessage::Unsubscribe { pipeline_id }) => {
                        if let Some(handle) = subscriptions.remove(&pipeline_id) {
                            handle.abort();
                        }
                    }
                    Err(e) => {
                        warn!("ignoring malformed client message: {e}");
                    }
                }
            }
            outgoing = out_rx.recv() => {
                let Some(message) = outgoing else { break };
                if socket.send(Message::Text(message.to_string().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    for (_, handle) in subscriptions {
        handle.abort();
    }
}
