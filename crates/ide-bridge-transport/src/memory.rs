//! In-process transport driven by a handler function.

use std::collections::VecDeque;

use async_trait::async_trait;
use ide_bridge_core::{Request, Transport, TransportError};
use serde_json::Value;

type Handler = Box<dyn FnMut(&str) -> Result<String, TransportError> + Send>;

/// Transport that answers each request by calling a handler in-process.
///
/// Every message sent is recorded, which makes it the transport of choice
/// for exercising the client without a running editor.
pub struct MemoryTransport {
    handler: Handler,
    sent: Vec<String>,
    open: bool,
    opens: usize,
}

impl MemoryTransport {
    /// Create a transport answering through `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&str) -> Result<String, TransportError> + Send + 'static,
    {
        Self {
            handler: Box::new(handler),
            sent: Vec::new(),
            open: false,
            opens: 0,
        }
    }

    /// Transport that returns `replies` in order, then reports the
    /// connection as closed.
    pub fn replying<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut queue: VecDeque<String> = replies.into_iter().map(|v| v.to_string()).collect();
        Self::new(move |_| queue.pop_front().ok_or(TransportError::Closed))
    }

    /// Raw messages sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Messages sent so far, decoded as requests. Undecodable ones are skipped.
    #[must_use]
    pub fn sent_requests(&self) -> Vec<Request> {
        self.sent
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect()
    }

    /// Number of times a connection was established.
    #[must_use]
    pub const fn opens(&self) -> usize {
        self.opens
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&mut self, force: bool) -> Result<(), TransportError> {
        if force || !self.open {
            self.open = true;
            self.opens += 1;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }

    async fn send(&mut self, message: String) -> Result<String, TransportError> {
        self.open(false).await?;
        let reply = (self.handler)(&message);
        self.sent.push(message);
        if reply.is_err() {
            self.open = false;
        }
        reply
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
