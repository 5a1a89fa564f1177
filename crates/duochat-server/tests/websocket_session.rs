//! Integration tests for the WebSocket transport
//!
//! Starts the server on an ephemeral port and speaks the JSON event protocol
//! through real client sockets.

use std::net::SocketAddr;
use std::time::Duration;

use duochat_core::{DuochatConfig, OutboundEvent, UserId};
use duochat_runtime::RouterBuilder;
use duochat_server::WebSocketServer;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    let config = DuochatConfig::testing();
    let router = RouterBuilder::new()
        .with_config(config.clone())
        .build()
        .unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = WebSocketServer::new(router, config.channels);
    tokio::spawn(server.serve(listener));
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("handshake");
    client
}

async fn send(client: &mut Client, frame: &str) {
    client.send(Message::Text(frame.to_string())).await.unwrap();
}

async fn next_event(client: &mut Client) -> OutboundEvent {
    loop {
        let message = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("receive error");
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("valid outbound frame");
        }
    }
}

#[tokio::test]
async fn test_observer_tracks_presence_over_websocket() {
    let addr = start_server().await;
    let mut observer = connect(addr).await;
    send(&mut observer, r#"{"event":"register-observer"}"#).await;
    assert_eq!(
        next_event(&mut observer).await,
        OutboundEvent::OnlineSnapshot { users: vec![] }
    );

    let mut alice = connect(addr).await;
    send(&mut alice, r#"{"event":"register","data":"alice"}"#).await;
    assert_eq!(
        next_event(&mut observer).await,
        OutboundEvent::OnlineSnapshot {
            users: vec![UserId::new("alice")]
        }
    );

    alice.close(None).await.unwrap();
    assert_eq!(
        next_event(&mut observer).await,
        OutboundEvent::OnlineSnapshot { users: vec![] }
    );
}

#[tokio::test]
async fn test_message_and_status_round_trip() {
    let addr = start_server().await;
    let mut observer = connect(addr).await;
    send(&mut observer, r#"{"event":"register-observer"}"#).await;
    next_event(&mut observer).await;

    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    send(&mut alice, r#"{"event":"register","data":"alice"}"#).await;
    next_event(&mut observer).await;
    send(&mut bob, r#"{"event":"register","data":"bob"}"#).await;
    assert_eq!(
        next_event(&mut observer).await,
        OutboundEvent::OnlineSnapshot {
            users: vec![UserId::new("alice"), UserId::new("bob")]
        }
    );

    // Garbage is dropped without closing the connection
    send(&mut alice, "{not json").await;
    send(
        &mut alice,
        r#"{"event":"message-sent","data":{"from":"alice","to":"bob","payload":{"kind":"text","text":"hi"}}}"#,
    )
    .await;

    let message = match next_event(&mut bob).await {
        OutboundEvent::Message(message) => message,
        other => panic!("expected a message, got {other:?}"),
    };
    assert_eq!(message.from, UserId::new("alice"));
    assert!(!message.delivered);

    send(
        &mut bob,
        &format!(
            r#"{{"event":"status-update","data":{{"messageId":{},"delivered":true}}}}"#,
            message.id.value()
        ),
    )
    .await;

    match next_event(&mut alice).await {
        OutboundEvent::StatusUpdate(status) => {
            assert_eq!(status.message_id, message.id);
            assert!(status.delivered);
            assert_eq!(status.read_at, None);
        }
        other => panic!("expected a status update, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_frame_closes_connection() {
    let addr = start_server().await;
    let limit = DuochatConfig::testing().channels.max_frame_bytes;

    let mut alice = connect(addr).await;
    send(&mut alice, &"x".repeat(limit + 1)).await;

    let outcome = timeout(Duration::from_secs(2), alice.next())
        .await
        .expect("server should drop the connection");
    assert!(
        !matches!(outcome, Some(Ok(Message::Text(_)))),
        "no event expected, got {outcome:?}"
    );

    // Other connections are unaffected
    let mut observer = connect(addr).await;
    send(&mut observer, r#"{"event":"register-observer"}"#).await;
    assert_eq!(
        next_event(&mut observer).await,
        OutboundEvent::OnlineSnapshot { users: vec![] }
    );
}
