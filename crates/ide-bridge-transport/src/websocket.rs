//! WebSocket transport to a running bridge.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use ide_bridge_core::{Endpoint, Transport, TransportError};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Half-duplex websocket channel: one text frame out, one frame back.
pub struct WebSocketTransport {
    endpoint: Endpoint,
    stream: Option<WsStream>,
    /// Set between writing a request and reading its reply.
    in_flight: bool,
}

impl WebSocketTransport {
    /// Create a transport for `endpoint`. Nothing is opened yet.
    #[must_use]
    pub const fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            stream: None,
            in_flight: false,
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Point at a different bridge. Drops the current connection if the
    /// address changed; the next request reconnects.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        if endpoint != self.endpoint {
            tracing::debug!(old = %self.endpoint, new = %endpoint, "Bridge endpoint changed");
            self.endpoint = endpoint;
            self.stream = None;
            self.in_flight = false;
        }
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        let endpoint = Endpoint {
            host: host.into(),
            port: self.endpoint.port,
        };
        self.set_endpoint(endpoint);
    }

    pub fn set_port(&mut self, port: u16) {
        let endpoint = Endpoint {
            host: self.endpoint.host.clone(),
            port,
        };
        self.set_endpoint(endpoint);
    }

    async fn connect(&self) -> Result<WsStream, TransportError> {
        let url = self.endpoint.url();
        tracing::debug!(%url, "Connecting to bridge");
        let (stream, _) = connect_async(url.clone())
            .await
            .map_err(|e| TransportError::Connect {
                url,
                reason: e.to_string(),
            })?;
        Ok(stream)
    }
}

async fn read_reply(stream: &mut WsStream) -> Result<String, TransportError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
            Some(Ok(Message::Binary(data))) => {
                return String::from_utf8(data.to_vec()).map_err(|_| TransportError::InvalidFrame);
            }
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(TransportError::ConnectionLost(e.to_string())),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&mut self, force: bool) -> Result<(), TransportError> {
        if force {
            self.close().await?;
        }
        if self.stream.is_none() {
            self.stream = Some(self.connect().await?);
            self.in_flight = false;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.in_flight = false;
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                tracing::debug!("Error while closing bridge connection: {e}");
            }
        }
        Ok(())
    }

    async fn send(&mut self, message: String) -> Result<String, TransportError> {
        if self.in_flight {
            tracing::warn!(endpoint = %self.endpoint, "Refusing request after an abandoned one");
            return Err(TransportError::Desynchronized);
        }
        self.open(false).await?;
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Closed);
        };

        self.in_flight = true;
        let result = match stream.send(Message::text(message)).await {
            Ok(()) => read_reply(stream).await,
            Err(e) => Err(TransportError::ConnectionLost(e.to_string())),
        };
        self.in_flight = false;

        if result.is_err() {
            self.stream = None;
        }
        result
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    /// Loopback bridge answering each text frame through `handler`.
    /// Frames for which the handler returns `None` get no reply; the
    /// frame `"bye"` makes the server close the connection.
    async fn spawn_bridge<F>(handler: F) -> (Endpoint, Arc<AtomicUsize>)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let connections = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(handler);

        let counter = Arc::clone(&connections);
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(tcp).await else {
                        return;
                    };
                    while let Some(Ok(msg)) = ws.next().await {
                        if let Message::Text(text) = msg {
                            if text.as_str() == "bye" {
                                let _ = ws.close(None).await;
                                return;
                            }
                            if let Some(reply) = handler(text.as_str()) {
                                if ws.send(Message::text(reply)).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                });
            }
        });

        (Endpoint::new(Some("127.0.0.1".to_string()), port), connections)
    }

    fn echo(text: &str) -> Option<String> {
        Some(format!("echo:{text}"))
    }

    #[tokio::test]
    async fn test_send_opens_lazily_and_pairs_replies() {
        let (endpoint, connections) = spawn_bridge(echo).await;
        let mut transport = WebSocketTransport::new(endpoint);
        assert!(!transport.is_open());

        assert_eq!(transport.send("one".to_string()).await.unwrap(), "echo:one");
        assert_eq!(transport.send("two".to_string()).await.unwrap(), "echo:two");
        assert!(transport.is_open());
        assert_eq!(connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (endpoint, _) = spawn_bridge(echo).await;
        let mut transport = WebSocketTransport::new(endpoint);
        assert_ok!(transport.open(false).await);
        assert_ok!(transport.close().await);
        assert_ok!(transport.close().await);
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_force_open_reconnects() {
        let (endpoint, connections) = spawn_bridge(echo).await;
        let mut transport = WebSocketTransport::new(endpoint);
        assert_ok!(transport.open(false).await);
        assert_ok!(transport.open(false).await);
        assert_ok!(transport.open(true).await);
        assert_eq!(transport.send("x".to_string()).await.unwrap(), "echo:x");
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = WebSocketTransport::new(Endpoint::new(Some("127.0.0.1".into()), port));
        let err = assert_err!(transport.send("x".to_string()).await);
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_abandoned_request_is_detected() {
        let (endpoint, _) = spawn_bridge(|text| (text != "slow").then(|| format!("echo:{text}"))).await;
        let mut transport = WebSocketTransport::new(endpoint);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), transport.send("slow".to_string())).await;
        assert!(abandoned.is_err());

        let err = assert_err!(transport.send("next".to_string()).await);
        assert!(matches!(err, TransportError::Desynchronized));

        assert_ok!(transport.open(true).await);
        assert_eq!(transport.send("next".to_string()).await.unwrap(), "echo:next");
    }

    #[tokio::test]
    async fn test_remote_close_drops_connection() {
        let (endpoint, connections) = spawn_bridge(echo).await;
        let mut transport = WebSocketTransport::new(endpoint);

        let err = assert_err!(transport.send("bye".to_string()).await);
        assert!(matches!(err, TransportError::Closed));
        assert!(!transport.is_open());

        assert_eq!(transport.send("again".to_string()).await.unwrap(), "echo:again");
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changing_endpoint_invalidates_connection() {
        let (first, _) = spawn_bridge(echo).await;
        let (second, _) = spawn_bridge(|t| Some(format!("second:{t}"))).await;
        let mut transport = WebSocketTransport::new(first);
        assert_ok!(transport.open(false).await);

        transport.set_port(second.port);
        assert!(!transport.is_open());
        assert_eq!(transport.send("x".to_string()).await.unwrap(), "second:x");

        // Same address keeps the connection.
        transport.set_host("127.0.0.1");
        assert!(transport.is_open());
    }
}
