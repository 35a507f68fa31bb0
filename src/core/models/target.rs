//! Notification target
//!
//! Where announcements go: an IRC network and a channel on it.

use serde::{Deserialize, Serialize};

/// An IRC network address and channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    /// Server address as `host:port`
    pub address: String,
    /// Channel name, including its `#` or `&` prefix
    pub channel: String,
}

impl NotificationTarget {
    /// Create a target
    #[must_use]
    pub fn new(address: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            channel: channel.into(),
        }
    }

    /// Host part of the address
    #[must_use]
    pub fn host(&self) -> &str {
        self.address.rsplit_once(':').map_or(self.address.as_str(), |(host, _)| host)
    }
}

impl std::fmt::Display for NotificationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.channel, self.address)
    }
}
