//! WebSocket transport implementation
//!
//! Opens one WebSocket per user and bridges it onto the engine's
//! channel-based connection handle: a read task maps server frames to
//! inbound events, a write task drains outbound requests, and the
//! close handle triggers a clean close of the socket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use chat_core::{Error, Result};
use chat_engine::{InboundEvent, OutboundRequest, Transport, TransportConnection};

use crate::config::WsConfig;
use crate::frame::{ClientFrame, ServerFrame};

/// WebSocket-backed `Transport`.
pub struct WsTransport {
    config: WsConfig,
}

impl WsTransport {
    /// Create a transport for the configured endpoint
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, user_id: &str) -> Result<TransportConnection> {
        let endpoint = self.config.endpoint_for(user_id);
        info!("Opening WebSocket connection: {}", endpoint);

        let (socket, _response) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<OutboundRequest>();
        let (close_tx, mut close_rx) = oneshot::channel::<()>();

        // Write task: outbound requests and the close handle
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    request = request_rx.recv() => {
                        let Some(request) = request else { break };
                        let frame = ClientFrame::from(request);
                        let json = match serde_json::to_string(&frame) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!("Failed to encode outbound frame: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(WsMessage::Text(json.into())).await {
                            warn!("WebSocket send failed: {}", e);
                            break;
                        }
                    }
                    _ = &mut close_rx => {
                        debug!("Close requested");
                        if let Err(e) = sink.send(WsMessage::Close(None)).await {
                            debug!("Close frame not sent: {}", e);
                        }
                        break;
                    }
                }
            }
            debug!("Write task ended");
        });

        // Read task: server frames to inbound events
        tokio::spawn(async move {
            loop {
                let Some(message) = stream.next().await else {
                    let _ = event_tx.send(InboundEvent::Closed { reason: None });
                    break;
                };
                match message {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                        Ok(frame) => {
                            if let Some(event) = frame.into_event() {
                                if event_tx.send(event).is_err() {
                                    break;
                                }
                            }
                        }
                        Err(e) => warn!("Dropping malformed frame: {}", e),
                    },
                    Ok(WsMessage::Close(frame)) => {
                        info!("Server closed connection");
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                        let _ = event_tx.send(InboundEvent::Closed { reason });
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error: {}", e);
                        let _ = event_tx.send(InboundEvent::Closed {
                            reason: Some(e.to_string()),
                        });
                        break;
                    }
                }
            }
            debug!("Read task ended");
        });

        Ok(TransportConnection::new(event_rx, request_tx, close_tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_engine::InboundMessage;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn bind_server() -> (TcpListener, WsTransport) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = WsTransport::new(WsConfig {
            url: format!("ws://{}/chat", addr),
        });
        (listener, transport)
    }

    #[tokio::test]
    async fn test_open_failure_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = WsTransport::new(WsConfig {
            url: format!("ws://{}/chat", addr),
        });
        let result = transport.open("u1").await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn test_inbound_frames_become_events() {
        let (listener, transport) = bind_server().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let json = r#"{"type":"message","id":"m-1","text":"hi","username":"bob","sent_at":"2026-08-29T10:00:00Z","own":false}"#;
            ws.send(WsMessage::Text(json.into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let conn = transport.open("u1").await.unwrap();
        let (mut events, _requests, _close) = conn.into_parts();

        match events.recv().await.unwrap() {
            InboundEvent::Message(InboundMessage {
                delivery_id,
                text,
                username,
                is_own,
                ..
            }) => {
                assert_eq!(delivery_id.as_deref(), Some("m-1"));
                assert_eq!(text, "hi");
                assert_eq!(username.as_deref(), Some("bob"));
                assert!(!is_own);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        assert!(matches!(
            events.recv().await.unwrap(),
            InboundEvent::Closed { .. }
        ));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_outbound_request_reaches_server() {
        let (listener, transport) = bind_server().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            match ws.next().await.unwrap().unwrap() {
                WsMessage::Text(text) => text.to_string(),
                other => panic!("unexpected message: {:?}", other),
            }
        });

        let conn = transport.open("u1").await.unwrap();
        let (_events, requests, _close) = conn.into_parts();
        requests
            .send(OutboundRequest::Message {
                text: "hello".to_string(),
                username: "alice".to_string(),
            })
            .unwrap();

        let text = server.await.unwrap();
        let frame: ClientFrame = serde_json::from_str(&text).unwrap();
        match frame {
            ClientFrame::Message { text, username } => {
                assert_eq!(text, "hello");
                assert_eq!(username, "alice");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_handle_closes_socket() {
        let (listener, transport) = bind_server().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            // Drain until the client's close frame ends the stream
            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, WsMessage::Close(_)) {
                    return true;
                }
            }
            false
        });

        let conn = transport.open("u1").await.unwrap();
        let (_events, _requests, close) = conn.into_parts();
        close.send(()).unwrap();

        assert!(server.await.unwrap());
    }
}
