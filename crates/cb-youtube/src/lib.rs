//! YouTube adapter (Data API v3).
//!
//! Channel lookup uses `channels` (by id or legacy username); feeds are the
//! channel's uploads playlist read through `playlistItems`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;

use cb_core::{
    domain::{FeedItem, ResolvedChannel},
    errors::Error,
    ports::VideoPort,
    Result,
};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Items requested per feed poll.
pub const PAGE_SIZE: u32 = 25;

#[derive(Clone, Debug)]
pub struct YouTubeClient {
    api_key: String,
    http: reqwest::Client,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::External(format!("youtube client build error: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            http,
        })
    }

    async fn get(&self, resource: &str, params: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .http
            .get(format!("{API_BASE}/{resource}"))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::External(format!("youtube request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "youtube {resource} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::External(format!("youtube json error: {e}")))
    }
}

#[async_trait]
impl VideoPort for YouTubeClient {
    async fn resolve_channel(
        &self,
        identifier: &str,
        by_id: bool,
    ) -> Result<Option<ResolvedChannel>> {
        let lookup = if by_id { "id" } else { "forUsername" };
        let v = self
            .get(
                "channels",
                &[("part", "id,snippet,contentDetails"), (lookup, identifier)],
            )
            .await?;
        Ok(parse_channel(&v))
    }

    async fn fetch_items(&self, feed_cursor: &str) -> Result<Vec<FeedItem>> {
        let page_size = PAGE_SIZE.to_string();
        let v = self
            .get(
                "playlistItems",
                &[
                    ("part", "snippet,contentDetails"),
                    ("playlistId", feed_cursor),
                    ("maxResults", page_size.as_str()),
                ],
            )
            .await?;
        parse_playlist_items(&v)
    }
}

/// First channel of a `channels` response, if it has everything we need.
pub fn parse_channel(v: &Value) -> Option<ResolvedChannel> {
    let ch = v.get("items")?.as_array()?.first()?;
    let id = ch.get("id")?.as_str()?.to_string();
    let display_name = ch.pointer("/snippet/title")?.as_str()?.to_string();
    let feed_cursor = ch
        .pointer("/contentDetails/relatedPlaylists/uploads")?
        .as_str()?
        .to_string();
    Some(ResolvedChannel {
        id,
        display_name,
        feed_cursor,
    })
}

/// Map a `playlistItems` page to feed items, keeping the API's order.
///
/// Entries without a video id or a parseable publish time are dropped.
pub fn parse_playlist_items(v: &Value) -> Result<Vec<FeedItem>> {
    let items = v
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::External("youtube playlistItems response has no items".into()))?;

    Ok(items
        .iter()
        .filter_map(|it| {
            let item_id = it.pointer("/contentDetails/videoId")?.as_str()?.to_string();
            let published = it
                .pointer("/snippet/publishedAt")
                .or_else(|| it.pointer("/contentDetails/videoPublishedAt"))?
                .as_str()?;
            let published_at = DateTime::parse_from_rfc3339(published).ok()?.timestamp();
            let title = it
                .pointer("/snippet/title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(FeedItem {
                item_id,
                published_at,
                title,
            })
        })
        .collect())
}
