//! Notification delivery with pluggable channel support.
//!
//! The decision engine only says *that* a message should go out. This
//! crate renders the text ([`message`]), builds channels from
//! configuration ([`plugin::ChannelRegistry`]) and fans the message out
//! to every configured channel ([`manager::NotificationManager`]).

pub mod channels;
pub mod error;
pub mod manager;
pub mod message;
pub mod plugin;
pub mod utils;


use async_trait::async_trait;
use error::Result;

/// A notification delivery channel that sends plain-text messages to an
/// external chat service.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers `message` through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, message: &str) -> Result<()>;

    /// Returns the channel type name (e.g., `"line"`, `"webhook"`).
    fn channel_type(&self) -> &str;
}
