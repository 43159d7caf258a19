use crate::error::ClientError;
use futures_util::{SinkExt, StreamExt};
use pollcast_models::{GatewayCommand, PushEnvelope, Topic};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Topic subscription handle for the push channel.
///
/// Calls return immediately; delivery of the subscription is asynchronous.
pub trait TopicSubscriber: Send + Sync {
    fn subscribe(&self, topic: &Topic);

    fn unsubscribe(&self, topic: &Topic);
}

/// WebSocket connection to the `/realtime` gateway.
///
/// Subscriptions are forwarded to a background task that owns the socket;
/// envelopes received from the gateway come out of the receiver returned by
/// [`RealtimeClient::connect`]. The receiver closes when the socket does.
#[derive(Debug, Clone)]
pub struct RealtimeClient {
    commands: mpsc::UnboundedSender<GatewayCommand>,
}

impl RealtimeClient {
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PushEnvelope>), ClientError> {
        let (socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        tracing::info!("realtime connected to {url}");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(socket, command_rx, push_tx));

        Ok((Self { commands: command_tx }, push_rx))
    }

    fn send(&self, command: GatewayCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("realtime connection closed, command dropped");
        }
    }
}

impl TopicSubscriber for RealtimeClient {
    fn subscribe(&self, topic: &Topic) {
        self.send(GatewayCommand::Subscribe {
            topic: topic.clone(),
        });
    }

    fn unsubscribe(&self, topic: &Topic) {
        self.send(GatewayCommand::Unsubscribe {
            topic: topic.clone(),
        });
    }
}

async fn run_socket(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut commands: mpsc::UnboundedReceiver<GatewayCommand>,
    pushes: mpsc::UnboundedSender<PushEnvelope>,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                };
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!("failed to encode gateway command: {e}");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<PushEnvelope>(text.as_str()) {
                        Ok(envelope) => {
                            if pushes.send(envelope).is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("ignoring malformed push frame: {e}"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("realtime socket error: {e}");
                    break;
                }
            },
        }
    }

    tracing::info!("realtime connection closed");
}
