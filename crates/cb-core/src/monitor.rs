//! Feed monitor: polls every registered channel and announces new uploads.
//!
//! Dedup rules per item, in feed order:
//! - already in the channel's seen set: skip
//! - published before the channel was registered: remember, never announce
//! - otherwise: publish, and remember only once the publish succeeded
//!
//! A failed publish stays unseen and is retried on the next cycle, so a flaky
//! destination can produce a duplicate post but never a silent drop.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, error, info, warn};

use crate::{
    domain::{unix_now, Channel, FeedItem, Timestamp},
    messaging::port::MessagingPort,
    ports::VideoPort,
    registry::Registry,
    Result,
};

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Prepended to an item id to build the announced link.
    pub link_prefix: String,
    /// Upper bound on remembered ids per channel; `None` keeps everything.
    pub seen_items_cap: Option<usize>,
}

/// What one poll of one channel did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelPoll {
    pub announced: usize,
    pub backfilled: usize,
    pub failed_announcements: usize,
    /// The updated record could not be written back; seen ids from this poll
    /// are lost and its announcements may repeat.
    pub unsaved: bool,
}

/// Totals for one feed cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub channels: usize,
    pub skipped_channels: usize,
    pub announced: usize,
    pub backfilled: usize,
    pub failed_announcements: usize,
    pub unsaved_channels: usize,
}

pub struct FeedMonitor {
    registry: Arc<Registry>,
    messenger: Arc<dyn MessagingPort>,
    video: Arc<dyn VideoPort>,
    cfg: MonitorConfig,
}

impl FeedMonitor {
    pub fn new(
        registry: Arc<Registry>,
        messenger: Arc<dyn MessagingPort>,
        video: Arc<dyn VideoPort>,
        cfg: MonitorConfig,
    ) -> Self {
        Self {
            registry,
            messenger,
            video,
            cfg,
        }
    }

    pub async fn poll_all(&self) -> PollReport {
        self.poll_all_at(unix_now()).await
    }

    /// One feed cycle. Channels are polled one after another; a failing
    /// channel is logged and skipped without touching its record.
    pub async fn poll_all_at(&self, now: Timestamp) -> PollReport {
        let mut report = PollReport::default();

        for (index, channel) in self.registry.list().into_iter().enumerate() {
            report.channels += 1;
            let name = channel.display_name.clone();
            let destination = channel.destination.clone();

            match self.poll_channel(index, channel, now).await {
                Ok(poll) => {
                    report.announced += poll.announced;
                    report.backfilled += poll.backfilled;
                    report.failed_announcements += poll.failed_announcements;
                    if poll.unsaved {
                        report.unsaved_channels += 1;
                    }
                }
                Err(e) => {
                    warn!("Failed to poll channel '{name}' for /r/{destination}: {e}");
                    report.skipped_channels += 1;
                }
            }
        }

        if report.announced > 0 || report.skipped_channels > 0 || report.unsaved_channels > 0 {
            debug!(?report, "feed cycle finished");
        }
        report
    }

    /// Poll one channel (a registry copy at `index`) and write the result back.
    ///
    /// Only a feed failure is an error. A failed write-back is logged and
    /// flagged in the returned [`ChannelPoll`] since announcements may
    /// already have gone out.
    pub async fn poll_channel(
        &self,
        index: usize,
        mut channel: Channel,
        now: Timestamp,
    ) -> Result<ChannelPoll> {
        let items = self.video.fetch_items(&channel.feed_cursor).await?;
        let mut poll = ChannelPoll::default();

        for item in &items {
            if channel.seen_item_ids.contains(&item.item_id) {
                continue;
            }

            if item.published_at < channel.registered_at {
                channel.seen_item_ids.insert(item.item_id.clone());
                poll.backfilled += 1;
                continue;
            }

            if self.announce(&channel, item).await {
                channel.seen_item_ids.insert(item.item_id.clone());
                poll.announced += 1;
            } else {
                poll.failed_announcements += 1;
            }
        }

        if let Some(cap) = self.cfg.seen_items_cap {
            let on_page: HashSet<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
            channel
                .seen_item_ids
                .prune_oldest(cap, |id| on_page.contains(id));
        }

        channel.last_polled_at = Some(now);
        let (name, destination) = (channel.display_name.clone(), channel.destination.clone());
        if let Err(e) = self.registry.update(index, channel) {
            error!(
                "Failed to save channel '{name}' for /r/{destination} after {} announcement(s): {e}",
                poll.announced
            );
            poll.unsaved = true;
        }
        Ok(poll)
    }

    async fn announce(&self, channel: &Channel, item: &FeedItem) -> bool {
        let url = format!("{}{}", self.cfg.link_prefix, item.item_id);
        match self
            .messenger
            .publish(&channel.destination, &item.title, &url)
            .await
        {
            Ok(()) => {
                info!(
                    "Submitted \"{}\" from \"{}\" to /r/{}",
                    item.title, channel.display_name, channel.destination
                );
                true
            }
            Err(e) => {
                warn!(
                    "Failed to submit \"{}\", trying again later: {e}",
                    item.title
                );
                false
            }
        }
    }
}
