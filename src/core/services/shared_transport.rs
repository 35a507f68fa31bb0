//! Shared chat transport
//!
//! Every repository watcher posts through one connection. Lines are
//! written one at a time under a mutex, and the connection is
//! re-established lazily after any failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::core::error::TransportError;
use crate::core::ports::ChatTransport;

struct Link {
    transport: Box<dyn ChatTransport>,
    joined: bool,
}

impl Link {
    async fn ensure_ready(&mut self, channel: &str) -> Result<(), TransportError> {
        if !self.transport.is_connected() {
            self.joined = false;
            self.transport.connect().await?;
        }
        if !self.joined {
            self.transport.join(channel).await?;
            self.joined = true;
        }
        Ok(())
    }

    async fn reset(&mut self, limit: Duration) {
        self.joined = false;
        match tokio::time::timeout(limit, self.transport.disconnect()).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => log::debug!("Disconnect after failure: {e}"),
            Err(_) => log::debug!("Disconnect after failure timed out"),
        }
    }
}

/// Cloneable handle to the one chat connection
#[derive(Clone)]
pub struct SharedTransport {
    link: Arc<Mutex<Link>>,
    channel: Arc<str>,
}

impl std::fmt::Debug for SharedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTransport").field("channel", &self.channel).finish_non_exhaustive()
    }
}

impl SharedTransport {
    /// Share `transport`, posting to `channel`
    #[must_use]
    pub fn new(transport: Box<dyn ChatTransport>, channel: &str) -> Self {
        Self {
            link: Arc::new(Mutex::new(Link {
                transport,
                joined: false,
            })),
            channel: Arc::from(channel),
        }
    }

    /// The channel lines are posted to
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Connect and join now, instead of on the first delivery
    pub async fn open(&self, limit: Duration) -> Result<(), TransportError> {
        let mut link = self.link.lock().await;
        let result = tokio::time::timeout(limit, link.ensure_ready(&self.channel)).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                link.reset(limit).await;
                Err(e)
            },
            Err(_) => {
                link.reset(limit).await;
                Err(TransportError::Timeout(limit))
            },
        }
    }

    /// Post one line, connecting and joining first if needed
    ///
    /// Each step is bounded by `limit`. On failure the connection is torn
    /// down so the next delivery starts from a fresh connect.
    pub async fn deliver(&self, text: &str, limit: Duration) -> Result<(), TransportError> {
        let mut link = self.link.lock().await;

        let ready = tokio::time::timeout(limit, link.ensure_ready(&self.channel)).await;
        let result = match ready {
            Ok(Ok(())) => {
                match tokio::time::timeout(limit, link.transport.send_line(&self.channel, text)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(limit)),
                }
            },
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TransportError::Timeout(limit)),
        };

        if result.is_err() {
            link.reset(limit).await;
        }
        result
    }

    /// Leave the network if connected
    pub async fn close(&self, limit: Duration) {
        let mut link = self.link.lock().await;
        if link.transport.is_connected() {
            link.reset(limit).await;
        }
    }
}
