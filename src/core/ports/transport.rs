//! Chat transport port
//!
//! Defines the connect/join/send capability the notifier posts through.

use async_trait::async_trait;

use crate::core::error::TransportError;

/// A line-oriented chat connection
#[async_trait]
pub trait ChatTransport: Send {
    /// Open the connection and complete registration
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Join a channel
    async fn join(&mut self, channel: &str) -> Result<(), TransportError>;

    /// Post one line of text to a channel
    async fn send_line(&mut self, channel: &str, text: &str) -> Result<(), TransportError>;

    /// Leave the network and close the connection
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Whether the connection is believed to be alive
    fn is_connected(&self) -> bool;
}
