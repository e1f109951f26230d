use async_trait::async_trait;
use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use super::{Link, Transport};
use crate::error::{MonitorError, Result};

/// WebSocket transport. Only text frames are surfaced; binary, ping and
/// pong frames are dropped (tungstenite answers pings itself).
#[derive(Debug, Default, Clone, Copy)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, endpoint: &str) -> Result<Link> {
        let (ws_stream, _) = connect_async(endpoint)
            .await
            .map_err(|e| MonitorError::Transport(format!("connect: {e}")))?;
        tracing::debug!(endpoint, "websocket handshake complete");

        let (write, read) = ws_stream.split();

        let sink = write
            .with(|text: String| future::ready(Ok::<_, tungstenite::Error>(Message::Text(text))))
            .sink_map_err(|e| MonitorError::Transport(format!("send: {e}")));

        let stream = read
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(_) => None,
                    Err(tungstenite::Error::ConnectionClosed) => None,
                    Err(e) => Some(Err(MonitorError::Transport(format!("read: {e}")))),
                })
            })
            .boxed();

        Ok(Link {
            sink: Box::pin(sink),
            stream,
        })
    }
}
