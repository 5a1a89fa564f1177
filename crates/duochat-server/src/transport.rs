//! WebSocket transport
//!
//! One task pair per connection. The writer owns the socket sink and drains
//! the session inbox; the reader parses text frames and queues them into a
//! bounded channel that a dispatch task feeds to the router in order.

use std::net::SocketAddr;
use std::sync::Arc;

use duochat_core::ChannelConfig;
use duochat_runtime::{DispatchRouter, SessionHandle, SessionInbox};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::error::Result;

type SocketSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Accepts WebSocket connections and binds each to a router session
pub struct WebSocketServer {
    router: Arc<DispatchRouter>,
    channels: ChannelConfig,
}

impl WebSocketServer {
    pub fn new(router: Arc<DispatchRouter>, channels: ChannelConfig) -> Self {
        Self { router, channels }
    }

    /// Accept connections until the listener fails
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            let router = Arc::clone(&self.router);
            let channels = self.channels.clone();

            tokio::spawn(async move {
                if let Err(e) = run_connection(router, channels, stream, peer).await {
                    warn!(peer = %peer, error = %e, "connection ended with error");
                }
            });
        }
    }
}

async fn run_connection(
    router: Arc<DispatchRouter>,
    channels: ChannelConfig,
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    let socket =
        tokio_tungstenite::accept_async_with_config(stream, Some(socket_config(&channels))).await?;
    let (sink, mut source) = socket.split();

    let (session, inbox) = router.open_session();
    info!(peer = %peer, session = %session.id(), "connection opened");

    let writer = tokio::spawn(writer_task(sink, inbox));
    let (frames, queued) = mpsc::channel::<String>(channels.inbound_buffer_size);
    let dispatcher = tokio::spawn(dispatch_task(
        Arc::clone(&router),
        session.clone(),
        queued,
    ));

    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => {
                // Tungstenite enforces the same limit while reading
                if text.len() > channels.max_frame_bytes {
                    debug!(session = %session.id(), len = text.len(), "oversized frame dropped");
                    continue;
                }
                if frames.send(text).await.is_err() {
                    break;
                }
            }
            Some(Ok(Message::Binary(data))) => {
                debug!(session = %session.id(), len = data.len(), "binary frame dropped");
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(session = %session.id(), reason = ?frame, "client initiated close");
                break;
            }
            // Ping replies are queued by tungstenite itself
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(session = %session.id(), error = %e, "websocket receive error");
                break;
            }
            None => break,
        }
    }

    // Let queued events finish before the session goes away
    drop(frames);
    if let Err(e) = dispatcher.await {
        warn!(session = %session.id(), error = %e, "dispatch task failed");
    }

    router.disconnect(&session);
    writer.abort();
    info!(peer = %peer, session = %session.id(), "connection closed");
    Ok(())
}

/// Socket limits derived from the channel configuration
///
/// Oversized messages fail the read before they are buffered in full, which
/// ends the connection.
fn socket_config(channels: &ChannelConfig) -> WebSocketConfig {
    WebSocketConfig {
        max_message_size: Some(channels.max_frame_bytes),
        max_frame_size: Some(channels.max_frame_bytes),
        ..WebSocketConfig::default()
    }
}

async fn dispatch_task(
    router: Arc<DispatchRouter>,
    session: SessionHandle,
    mut queued: mpsc::Receiver<String>,
) {
    while let Some(frame) = queued.recv().await {
        if let Err(e) = router.handle_frame(&session, &frame).await {
            warn!(session = %session.id(), error = %e, "event failed");
        }
    }
}

async fn writer_task(mut sink: SocketSink, mut inbox: SessionInbox) {
    while let Some(event) = inbox.recv().await {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event = event.name(), error = %e, "failed to encode outbound event");
                continue;
            }
        };
        if sink.send(Message::Text(frame)).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_limits_follow_channel_config() {
        let config = socket_config(&ChannelConfig::low_memory());
        assert_eq!(config.max_message_size, Some(16 * 1024));
        assert_eq!(config.max_frame_size, Some(16 * 1024));
    }
}
