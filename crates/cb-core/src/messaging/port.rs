use async_trait::async_trait;

use crate::{
    domain::{InboundMessage, MessageId, Moderator},
    Result,
};

/// Messaging-platform port.
///
/// Reddit is the only implementation; inbox, replies, announcements and the
/// moderator lookup used for authorization all go through here.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Unread private messages (and comment replies) in the bot's inbox.
    async fn fetch_unread(&self) -> Result<Vec<InboundMessage>>;

    async fn reply(&self, to: &str, subject: &str, body: &str) -> Result<()>;
    async fn mark_read(&self, id: &MessageId) -> Result<()>;

    /// Submit a link post into `destination`.
    async fn publish(&self, destination: &str, title: &str, url: &str) -> Result<()>;

    async fn list_moderators(&self, destination: &str) -> Result<Vec<Moderator>>;
}
