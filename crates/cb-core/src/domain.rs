use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds.
pub type Timestamp = i64;

pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Platform message id (Reddit "fullname", e.g. `t4_abc123`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A private message picked up from the bot's inbox.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub id: MessageId,
    pub author: String,
    pub subject: String,
    pub body: String,
    /// Set for comment replies that land in the inbox; these are never commands.
    pub is_reply: bool,
}

/// One watched feed + destination pair.
///
/// Field names on disk follow the ChannelBot 1.x storage rows so existing
/// `channels.json` files keep loading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: String,
    #[serde(rename = "channel")]
    pub display_name: String,
    #[serde(rename = "subreddit")]
    pub destination: String,
    #[serde(rename = "user")]
    pub owner: String,
    #[serde(rename = "register_date")]
    pub registered_at: Timestamp,
    #[serde(
        rename = "last_check",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_polled_at: Option<Timestamp>,
    #[serde(rename = "last_videos", default)]
    pub seen_item_ids: SeenItems,
    #[serde(rename = "upload_playlist")]
    pub feed_cursor: String,
}

impl Channel {
    /// True when this row watches `channel_id` into `destination`.
    ///
    /// Destinations are subreddit names, which Reddit treats case-insensitively.
    pub fn is_same_watch(&self, channel_id: &str, destination: &str) -> bool {
        self.channel_id == channel_id && self.destination.eq_ignore_ascii_case(destination)
    }
}

/// Insertion-ordered set of item ids (the dedup window).
///
/// Only membership matters to the monitor; order is kept so a cap can drop the
/// oldest ids first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenItems(Vec<String>);

impl SeenItems {
    pub fn contains(&self, item_id: &str) -> bool {
        self.0.iter().any(|id| id == item_id)
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, item_id: impl Into<String>) -> bool {
        let item_id = item_id.into();
        if self.contains(&item_id) {
            return false;
        }
        self.0.push(item_id);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Drop the oldest ids until at most `max` remain, never dropping an id
    /// for which `keep` returns true.
    pub fn prune_oldest(&mut self, max: usize, keep: impl Fn(&str) -> bool) {
        let mut excess = self.0.len().saturating_sub(max);
        if excess == 0 {
            return;
        }
        self.0.retain(|id| {
            if excess > 0 && !keep(id) {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

impl<S: Into<String>> FromIterator<S> for SeenItems {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut out = SeenItems::default();
        for id in iter {
            out.insert(id);
        }
        out
    }
}

/// A moderator entry as reported by the messaging platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Moderator {
    pub name: String,
    pub permissions: Vec<String>,
}

impl Moderator {
    pub fn has_full_permissions(&self) -> bool {
        self.permissions.iter().any(|p| p == "all")
    }
}

/// Canonical identity of a video channel after lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub id: String,
    pub display_name: String,
    pub feed_cursor: String,
}

/// One upload in a channel feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedItem {
    pub item_id: String,
    pub published_at: Timestamp,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_items_keep_insertion_order_and_reject_duplicates() {
        let mut seen: SeenItems = ["a", "b"].into_iter().collect();
        assert!(!seen.insert("a"));
        assert!(seen.insert("c"));
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        seen.prune_oldest(2, |_| false);
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(!seen.contains("a"));
    }

    #[test]
    fn prune_skips_pinned_ids() {
        let mut seen: SeenItems = ["a", "b", "c", "d"].into_iter().collect();
        seen.prune_oldest(2, |id| id == "a");
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["a", "d"]);

        let mut all_pinned: SeenItems = ["a", "b"].into_iter().collect();
        all_pinned.prune_oldest(1, |_| true);
        assert_eq!(all_pinned.len(), 2);
    }

    #[test]
    fn channel_roundtrips_legacy_storage_row() {
        let row = serde_json::json!({
            "channel": "SomeCreator",
            "channel_id": "UCabc",
            "subreddit": "videos",
            "user": "alice",
            "register_date": 1_400_000_000,
            "upload_playlist": "UUabc"
        });
        let ch: Channel = serde_json::from_value(row).unwrap();
        assert_eq!(ch.display_name, "SomeCreator");
        assert_eq!(ch.destination, "videos");
        assert_eq!(ch.last_polled_at, None);
        assert!(ch.seen_item_ids.is_empty());

        let back = serde_json::to_value(&ch).unwrap();
        assert_eq!(back["last_videos"], serde_json::json!([]));
        assert!(back.get("last_check").is_none());
    }

    #[test]
    fn same_watch_ignores_destination_case() {
        let ch = Channel {
            channel_id: "UCabc".into(),
            display_name: "x".into(),
            destination: "Videos".into(),
            owner: "alice".into(),
            registered_at: 0,
            last_polled_at: None,
            seen_item_ids: SeenItems::default(),
            feed_cursor: "UUabc".into(),
        };
        assert!(ch.is_same_watch("UCabc", "videos"));
        assert!(!ch.is_same_watch("UCabd", "videos"));
        assert!(!ch.is_same_watch("UCabc", "music"));
    }
}
