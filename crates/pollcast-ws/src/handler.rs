use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use pollcast_core::AppState;
use pollcast_models::GatewayCommand;
use tokio::sync::broadcast::error::RecvError;

pub(crate) async fn handle_connection(socket: WebSocket, state: AppState) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut pushes = state.topic_bus.register_session(&session_id);
    let (mut sink, mut stream) = socket.split();
    tracing::debug!(session = %session_id, "realtime session opened");

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_command(&state, &session_id, text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session = %session_id, "realtime socket error: {e}");
                    break;
                }
            },
            push = pushes.recv() => match push {
                Ok(envelope) => {
                    let text = match serde_json::to_string(&envelope) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("failed to encode push envelope: {e}");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session = %session_id, skipped, "realtime session lagged, pushes dropped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = state.shutdown.notified() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.topic_bus.unregister_session(&session_id);
    tracing::debug!(session = %session_id, "realtime session closed");
}

fn handle_command(state: &AppState, session_id: &str, text: &str) {
    let command = match serde_json::from_str::<GatewayCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(session = %session_id, "ignoring malformed realtime frame: {e}");
            return;
        }
    };

    match command {
        GatewayCommand::Subscribe { topic } => {
            tracing::debug!(session = %session_id, topic = %topic, "subscribe");
            state.topic_bus.subscribe(session_id, topic);
        }
        GatewayCommand::Unsubscribe { topic } => {
            tracing::debug!(session = %session_id, topic = %topic, "unsubscribe");
            state.topic_bus.unsubscribe(session_id, &topic);
        }
    }
}
