//! Fakes for the platform ports, shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    domain::{Channel, FeedItem, InboundMessage, MessageId, Moderator, ResolvedChannel, SeenItems},
    errors::Error,
    messaging::port::MessagingPort,
    ports::VideoPort,
    Result,
};

pub fn channel(channel_id: &str, destination: &str) -> Channel {
    Channel {
        channel_id: channel_id.to_string(),
        display_name: format!("name-{channel_id}"),
        destination: destination.to_string(),
        owner: "alice".to_string(),
        registered_at: 1_000,
        last_polled_at: None,
        seen_item_ids: SeenItems::default(),
        feed_cursor: format!("UU-{channel_id}"),
    }
}

pub fn message(id: &str, author: &str, subject: &str, body: &str) -> InboundMessage {
    InboundMessage {
        id: MessageId(id.to_string()),
        author: author.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        is_reply: false,
    }
}

pub fn item(item_id: &str, published_at: i64) -> FeedItem {
    FeedItem {
        item_id: item_id.to_string(),
        published_at,
        title: format!("title {item_id}"),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentReply {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct FakeMessenger {
    unread: Mutex<Vec<InboundMessage>>,
    moderators: Mutex<HashMap<String, Vec<Moderator>>>,
    failing_publish_urls: Mutex<HashSet<String>>,
    fail_fetch: Mutex<bool>,

    replies: Mutex<Vec<SentReply>>,
    read: Mutex<Vec<MessageId>>,
    published: Mutex<Vec<(String, String, String)>>,
    moderator_lookups: AtomicUsize,
}

impl FakeMessenger {
    pub fn set_unread(&self, msgs: Vec<InboundMessage>) {
        *self.unread.lock().unwrap() = msgs;
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        *self.fail_fetch.lock().unwrap() = fail;
    }

    pub fn add_moderator(&self, destination: &str, name: &str, permissions: &[&str]) {
        self.moderators
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_default()
            .push(Moderator {
                name: name.to_string(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            });
    }

    pub fn fail_publish(&self, url: &str, fail: bool) {
        let mut set = self.failing_publish_urls.lock().unwrap();
        if fail {
            set.insert(url.to_string());
        } else {
            set.remove(url);
        }
    }

    pub fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn read(&self) -> Vec<MessageId> {
        self.read.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<(String, String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub fn moderator_lookups(&self) -> usize {
        self.moderator_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn fetch_unread(&self) -> Result<Vec<InboundMessage>> {
        if *self.fail_fetch.lock().unwrap() {
            return Err(Error::External("inbox unavailable".to_string()));
        }
        Ok(self.unread.lock().unwrap().clone())
    }

    async fn reply(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.replies.lock().unwrap().push(SentReply {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn mark_read(&self, id: &MessageId) -> Result<()> {
        self.read.lock().unwrap().push(id.clone());
        Ok(())
    }

    async fn publish(&self, destination: &str, title: &str, url: &str) -> Result<()> {
        if self.failing_publish_urls.lock().unwrap().contains(url) {
            return Err(Error::External(format!("submit to {destination} failed")));
        }
        self.published.lock().unwrap().push((
            destination.to_string(),
            title.to_string(),
            url.to_string(),
        ));
        Ok(())
    }

    async fn list_moderators(&self, destination: &str) -> Result<Vec<Moderator>> {
        self.moderator_lookups.fetch_add(1, Ordering::SeqCst);
        self.moderators
            .lock()
            .unwrap()
            .get(destination)
            .cloned()
            .ok_or_else(|| Error::External(format!("/r/{destination} is private or banned")))
    }
}

#[derive(Default)]
pub struct FakeVideo {
    by_id: Mutex<HashMap<String, ResolvedChannel>>,
    by_name: Mutex<HashMap<String, ResolvedChannel>>,
    feeds: Mutex<HashMap<String, Vec<FeedItem>>>,
    failing_feeds: Mutex<HashSet<String>>,
    panic_on_resolve: Mutex<bool>,
    fail_resolve: Mutex<bool>,
    feed_gate: Mutex<Option<Arc<Notify>>>,
    fetches: AtomicUsize,
}

impl FakeVideo {
    pub fn add_channel(&self, name: &str, resolved: ResolvedChannel) {
        self.by_id
            .lock()
            .unwrap()
            .insert(resolved.id.clone(), resolved.clone());
        self.by_name
            .lock()
            .unwrap()
            .insert(name.to_string(), resolved);
    }

    pub fn set_feed(&self, cursor: &str, items: Vec<FeedItem>) {
        self.feeds.lock().unwrap().insert(cursor.to_string(), items);
    }

    pub fn fail_feed(&self, cursor: &str) {
        self.failing_feeds.lock().unwrap().insert(cursor.to_string());
    }

    pub fn set_panic_on_resolve(&self, panic: bool) {
        *self.panic_on_resolve.lock().unwrap() = panic;
    }

    /// Make the next `fetch_items` wait until the returned gate is notified.
    pub fn hold_feeds(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.feed_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_fail_resolve(&self, fail: bool) {
        *self.fail_resolve.lock().unwrap() = fail;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoPort for FakeVideo {
    async fn resolve_channel(
        &self,
        identifier: &str,
        by_id: bool,
    ) -> Result<Option<ResolvedChannel>> {
        if *self.panic_on_resolve.lock().unwrap() {
            panic!("resolver blew up");
        }
        if *self.fail_resolve.lock().unwrap() {
            return Err(Error::External("quotaExceeded".to_string()));
        }
        let map = if by_id { &self.by_id } else { &self.by_name };
        Ok(map.lock().unwrap().get(identifier).cloned())
    }

    async fn fetch_items(&self, feed_cursor: &str) -> Result<Vec<FeedItem>> {
        let gate = self.feed_gate.lock().unwrap().take();
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing_feeds.lock().unwrap().contains(feed_cursor) {
            return Err(Error::External(format!("playlist {feed_cursor} not found")));
        }
        Ok(self
            .feeds
            .lock()
            .unwrap()
            .get(feed_cursor)
            .cloned()
            .unwrap_or_default())
    }
}
