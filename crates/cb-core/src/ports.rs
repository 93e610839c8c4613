use async_trait::async_trait;

use crate::{
    domain::{Channel, FeedItem, ResolvedChannel},
    Result,
};

/// Video-platform port (YouTube today).
#[async_trait]
pub trait VideoPort: Send + Sync {
    /// Look up a channel by id (`by_id = true`) or by legacy username.
    ///
    /// `Ok(None)` means the lookup worked but produced no usable identity.
    async fn resolve_channel(&self, identifier: &str, by_id: bool)
        -> Result<Option<ResolvedChannel>>;

    /// Most recent uploads behind a feed cursor, newest first.
    async fn fetch_items(&self, feed_cursor: &str) -> Result<Vec<FeedItem>>;
}

/// Durable storage for the channel list.
///
/// The registry keeps the working copy and writes the full list back on every
/// mutation, so stores only need whole-list load/save.
pub trait ChannelStore: Send + Sync {
    fn load(&self) -> Result<Vec<Channel>>;
    fn save(&self, channels: &[Channel]) -> Result<()>;
}
